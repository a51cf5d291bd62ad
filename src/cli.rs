//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, command_unit};
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_deploy_outcome, format_destroy_report, format_ledger_json, format_ledger_text,
    format_plan, resource_id,
};
pub use route::{GlobalOptions, RunContext};
