//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::Commands;

/// Command name recorded on the command span (e.g. "edit", "resolve").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Init => "init",
        Commands::Load { .. } => "load",
        Commands::Add { .. } => "add",
        Commands::Tree { .. } => "tree",
        Commands::Peek { .. } => "peek",
        Commands::Read { .. } => "read",
        Commands::Edit { .. } => "edit",
        Commands::Resolve { .. } => "resolve",
        Commands::Title { .. } => "title",
        Commands::Summarize { .. } => "summarize",
        Commands::Export { .. } => "export",
        Commands::Status { .. } => "status",
        Commands::Conflicts { .. } => "conflicts",
        Commands::Agents { .. } => "agents",
        Commands::Whoami => "whoami",
        Commands::Check { .. } => "check",
        Commands::Search { .. } => "search",
        Commands::History { .. } => "history",
        Commands::Rollback { .. } => "rollback",
        Commands::Cleanup { .. } => "cleanup",
    }
}

/// Whether the command only reads the store.
pub fn is_read_only(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Tree { .. }
            | Commands::Peek { .. }
            | Commands::Export { .. }
            | Commands::Status { .. }
            | Commands::Conflicts { .. }
            | Commands::Agents { .. }
            | Commands::Whoami
            | Commands::Check { .. }
            | Commands::Search { .. }
            | Commands::History { .. }
    ) || matches!(command, Commands::Edit { dry_run: true, .. })
}
