//! CLI help and command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string for log records (e.g. "deploy", "destroy.all").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Deploy { .. } => "deploy".to_string(),
        Commands::Destroy { stack, .. } if stack.trim() == "*" => "destroy.all".to_string(),
        Commands::Destroy { .. } => "destroy".to_string(),
        Commands::List { .. } => "list".to_string(),
        Commands::Plan { .. } => "plan".to_string(),
    }
}

/// Unit the command targets, if any.
pub fn command_unit(command: &Commands) -> Option<&str> {
    match command {
        Commands::Deploy { stack, .. }
        | Commands::Destroy { stack, .. }
        | Commands::Plan { stack, .. } => Some(stack.as_str()),
        Commands::List { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parse::Cli;
    use clap::Parser;

    #[test]
    fn test_command_names() {
        let cli = Cli::try_parse_from(["simplify", "destroy", "-s", "*"]).unwrap();
        assert_eq!(command_name(&cli.command), "destroy.all");
        assert_eq!(command_unit(&cli.command), Some("*"));

        let cli = Cli::try_parse_from(["simplify", "list"]).unwrap();
        assert_eq!(command_name(&cli.command), "list");
        assert_eq!(command_unit(&cli.command), None);
    }
}
