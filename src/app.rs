//! Shared application context for CLI commands.

use std::path::Path;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;

/// Resolved configuration plus output-mode flags, built once per
/// invocation and passed to every command.
pub struct AppContext {
    pub config: Config,
    /// JSON output for machine consumption.
    pub robot_mode: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &cwd)?;
        Ok(Self {
            config,
            robot_mode: cli.robot,
        })
    }

    /// Context with a fixed project root, bypassing the cwd lookup.
    pub fn with_root(cli: &Cli, root: &Path) -> Result<Self> {
        let config = Config::load(cli.config.as_deref(), root)?;
        Ok(Self {
            config,
            robot_mode: cli.robot,
        })
    }
}
