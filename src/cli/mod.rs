//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{BuildCommand, HistoryCommand, ListCommand, ValidateCommand};

/// Declarative image-provisioning tool
#[derive(Debug, Parser, Clone)]
#[command(name = "bake")]
#[command(author = "Bake Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Build container images from declarative recipes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build an image from a recipe
    Build(BuildCommand),

    /// Validate a recipe
    Validate(ValidateCommand),

    /// List recipes with build history
    List(ListCommand),

    /// Show build history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
