//! Step domain model

use crate::core::image::ImageRef;
use crate::core::state::StepState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single step in the provisioning pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// The operation this step performs
    pub action: StepAction,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    pub fn new(id: impl Into<String>, action: StepAction) -> Self {
        Self {
            id: id.into(),
            action,
            state: StepState::Pending,
        }
    }

    /// The kind of operation, for display and events
    pub fn kind(&self) -> StepKind {
        self.action.kind()
    }
}

/// The eight provisioning operations, in their required pipeline order
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Establish the immutable base filesystem and runtime
    PullBase { image: ImageRef },

    /// Refresh the OS package index and install system-level packages,
    /// always non-interactively
    InstallSystemPackages { packages: Vec<String> },

    /// Download the package-manager installer, verify its digest, and
    /// execute it with the named interpreter
    FetchBootstrap {
        url: String,
        sha256: String,
        install_dir: PathBuf,
        interpreter: String,
        binary: String,
    },

    /// Prepend a directory to the executable search path
    ExtendPath { dir: PathBuf },

    /// Create (if absent) and record the default working directory
    SetWorkdir { path: PathBuf },

    /// Recursively copy the entire build context into the working
    /// directory, overwriting existing paths
    CopyContext,

    /// Resolve and install the dependencies declared by the manifest
    InstallDependencies {
        manifest: String,
        isolated_sandbox: bool,
        non_interactive: bool,
    },

    /// Register the default argv vector the produced image runs
    SetEntrypoint { argv: Vec<String> },
}

impl StepAction {
    pub fn kind(&self) -> StepKind {
        match self {
            StepAction::PullBase { .. } => StepKind::PullBase,
            StepAction::InstallSystemPackages { .. } => StepKind::InstallSystemPackages,
            StepAction::FetchBootstrap { .. } => StepKind::FetchBootstrap,
            StepAction::ExtendPath { .. } => StepKind::ExtendPath,
            StepAction::SetWorkdir { .. } => StepKind::SetWorkdir,
            StepAction::CopyContext => StepKind::CopyContext,
            StepAction::InstallDependencies { .. } => StepKind::InstallDependencies,
            StepAction::SetEntrypoint { .. } => StepKind::SetEntrypoint,
        }
    }

    /// Short human-readable description of the operation
    pub fn describe(&self) -> String {
        match self {
            StepAction::PullBase { image } => format!("pull base image {}", image),
            StepAction::InstallSystemPackages { packages } => {
                format!("install system packages [{}]", packages.join(", "))
            }
            StepAction::FetchBootstrap { url, binary, .. } => {
                format!("bootstrap {} from {}", binary, url)
            }
            StepAction::ExtendPath { dir } => format!("prepend {} to PATH", dir.display()),
            StepAction::SetWorkdir { path } => format!("set workdir {}", path.display()),
            StepAction::CopyContext => "copy build context".to_string(),
            StepAction::InstallDependencies { manifest, .. } => {
                format!("install dependencies from {}", manifest)
            }
            StepAction::SetEntrypoint { argv } => format!("set entrypoint {:?}", argv),
        }
    }
}

/// Step kind discriminant, used in events and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    PullBase,
    InstallSystemPackages,
    FetchBootstrap,
    ExtendPath,
    SetWorkdir,
    CopyContext,
    InstallDependencies,
    SetEntrypoint,
}

impl StepKind {
    /// Canonical step identifier
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::PullBase => "pull-base",
            StepKind::InstallSystemPackages => "system-packages",
            StepKind::FetchBootstrap => "bootstrap",
            StepKind::ExtendPath => "extend-path",
            StepKind::SetWorkdir => "workdir",
            StepKind::CopyContext => "copy-context",
            StepKind::InstallDependencies => "install-dependencies",
            StepKind::SetEntrypoint => "entrypoint",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
