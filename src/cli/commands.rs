//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Build an image from a recipe
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Path to recipe YAML file
    #[arg(short, long)]
    pub file: String,

    /// Build context directory (copied wholesale into the image)
    #[arg(long, default_value = ".")]
    pub context: PathBuf,

    /// Staging directory for the build (defaults to a per-build directory
    /// under the local cache)
    #[arg(long)]
    pub staging: Option<PathBuf>,

    /// Don't save the build to history
    #[arg(long)]
    pub no_history: bool,
}

/// Validate a recipe
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to recipe YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List recipes with build history
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show build counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show build history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Recipe name to filter by
    #[arg(short, long)]
    pub recipe: Option<String>,

    /// Number of recent builds to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show full details
    #[arg(long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a specific build ID
    #[arg(long)]
    pub build_id: Option<String>,
}
