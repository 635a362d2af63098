//! Provisioning step reports and the build error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for provisioning operations
///
/// Every variant is fatal: the first error aborts the build, and nothing
/// is retried.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Base image reference could not be resolved or fetched
    #[error("failed to pull base image {image}: {reason}")]
    ImagePull { image: String, reason: String },

    /// System-level package installation failed
    #[error("failed to install system packages {packages:?}: {reason}")]
    PackageInstall {
        packages: Vec<String>,
        reason: String,
    },

    /// Package-manager installer could not be fetched or executed
    #[error("bootstrap from {url} failed: {reason}")]
    Bootstrap { url: String, reason: String },

    /// Fetched installer did not match its required digest
    #[error("integrity check failed for {url}: expected sha256 {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    /// Project dependency installation failed (missing manifest,
    /// unresolvable constraints, network failure)
    #[error("dependency resolution failed: {reason}")]
    DependencyResolution { reason: String },

    /// Filesystem failure in the staging area or the context copy
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of a successfully applied provisioning step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Human-readable description of what the step did
    pub detail: String,
}

impl StepReport {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
