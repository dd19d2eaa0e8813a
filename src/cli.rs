//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the store facade.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_read_only};
pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::format_conflict_text;
pub use route::RunContext;
