//! CLI domain: parse, route, output and presentation only.
//! No pipeline logic; the route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, DocsCommands, ProviderCommands};
pub use presentation::ProviderTestReport;
pub use route::{test_provider, CommandOutput, CommandRunner};
