//! CLI command implementations.
//!
//! Each subcommand has its own module with an Args struct and a
//! `run()` function.

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod align;
pub mod completions;
pub mod search;

/// Dispatch a command to its handler.
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args),
        Commands::Align(args) => align::run(ctx, args),
        Commands::Completions(args) => completions::run(args),
    }
}
