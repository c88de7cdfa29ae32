//! Command-line interface definitions and handlers.
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;

/// clipseek - Hybrid retrieval over video frame and transcript evidence
#[derive(Parser, Debug)]
#[command(name = "clipseek")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable JSON output for machine consumption
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/clipseek/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a hybrid query over a frame + transcript corpus
    Search(commands::search::SearchArgs),
    /// Show transcript-to-frame temporal alignment for a corpus
    Align(commands::align::AlignArgs),
    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}
