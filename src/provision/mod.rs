//! Provisioners - the seam between the pipeline and the underlying tools

pub mod local;
pub mod report;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub use local::{LocalProvisioner, ToolSet};
pub use report::{ProvisionError, StepReport};

use crate::core::image::ImageRef;

/// Inputs of the bootstrap step
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
    /// Installer download URL
    pub url: String,

    /// Required SHA-256 digest (lowercase hex), verified before execution
    pub sha256: String,

    /// Directory the produced executable lands under
    pub install_dir: PathBuf,

    /// Interpreter used to run the installer
    pub interpreter: String,

    /// Name of the executable the installer produces
    pub binary: String,
}

/// Inputs of the dependency-install step
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Manifest filename, relative to the working directory
    pub manifest: String,

    /// Working directory the install runs in
    pub workdir: PathBuf,

    /// Install into an isolated sandbox instead of the shared runtime
    pub isolated_sandbox: bool,

    /// Non-interactive, non-decorated output mode
    pub non_interactive: bool,

    /// Search path the install process sees (the fold's PATH rendering)
    pub search_path: String,
}

/// Trait for the effectful provisioning operations - allows for different
/// implementations
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Establish the base filesystem snapshot
    async fn pull_base(&self, image: &ImageRef) -> Result<StepReport, ProvisionError>;

    /// Refresh the package index and install system packages,
    /// non-interactively
    async fn install_system_packages(
        &self,
        packages: &[String],
    ) -> Result<StepReport, ProvisionError>;

    /// Download, verify, and execute the package-manager installer
    async fn bootstrap_installer(
        &self,
        request: &BootstrapRequest,
    ) -> Result<StepReport, ProvisionError>;

    /// Create the working directory if absent
    async fn ensure_workdir(&self, path: &Path) -> Result<StepReport, ProvisionError>;

    /// Recursively copy the build context into the working directory,
    /// overwriting existing paths
    async fn copy_context(
        &self,
        context: &Path,
        workdir: &Path,
    ) -> Result<StepReport, ProvisionError>;

    /// Resolve and install the dependencies declared by the manifest
    async fn install_dependencies(
        &self,
        request: &InstallRequest,
    ) -> Result<StepReport, ProvisionError>;

    /// Discard everything staged so far; called when the build aborts
    async fn discard(&self) -> Result<(), ProvisionError>;
}
