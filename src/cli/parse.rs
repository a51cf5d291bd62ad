//! CLI parse: clap types for simplify. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Simplify CLI - stack deployments with a local output ledger
#[derive(Parser, Debug)]
#[command(name = "simplify")]
#[command(version)]
#[command(about = "Deploy stacks, chain their outputs into parameters, and track them in a local ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides workspace config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment environment (selects the ledger and simplify.<env>.toml)
    #[arg(short = 'e', long = "env", global = true)]
    pub env: Option<String>,

    /// Region override
    #[arg(short = 'r', long, global = true)]
    pub region: Option<String>,

    /// Credentials profile override
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or update one unit's stack and record its outputs
    Deploy {
        /// Unit name (folder below the stack location)
        #[arg(short = 's', long)]
        stack: String,

        /// Template path or https URL (default: <location>/<stack>/template.yaml)
        #[arg(short = 't', long)]
        template: Option<String>,

        /// Stack folder override
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,

        /// Parameters as inline JSON or @file.json
        #[arg(long)]
        parameters: Option<String>,

        /// Single parameter, KEY=VALUE (repeatable)
        #[arg(short = 'p', long = "param")]
        param: Vec<String>,

        /// Never prompt; unresolved parameters fail the deploy
        #[arg(long)]
        headless: bool,

        /// Rewrite the unit's parameters snapshot
        #[arg(long)]
        save_parameters: bool,
    },
    /// Delete a unit's stack, or every recorded stack with "*"
    Destroy {
        /// Unit name or "*"
        #[arg(short = 's', long)]
        stack: String,

        /// Stack folder override
        #[arg(short = 'l', long)]
        location: Option<PathBuf>,

        /// Skip the confirmation for "*"
        #[arg(short = 'y', long)]
        yes: bool,

        /// Never prompt; "*" then requires --yes
        #[arg(long)]
        headless: bool,
    },
    /// List the units recorded for an environment
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Resolve a unit's parameters without deploying
    Plan {
        #[arg(short = 's', long)]
        stack: String,

        #[arg(short = 't', long)]
        template: Option<String>,

        #[arg(short = 'l', long)]
        location: Option<PathBuf>,

        #[arg(long)]
        parameters: Option<String>,

        #[arg(short = 'p', long = "param")]
        param: Vec<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
