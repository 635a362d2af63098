//! Step executor - applies individual steps with the provisioner

use crate::{
    core::{ImageConfig, Step, StepAction},
    provision::{BootstrapRequest, InstallRequest, ProvisionError, Provisioner, StepReport},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Search path the base environment exposes before any extension
pub const BASE_SEARCH_PATH: &str =
    "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Applies a single step: one provisioner call plus a pure fold of the
/// image configuration record
///
/// Every step consumes the record its predecessor produced and returns an
/// updated copy; the executor never mutates shared state.
pub struct StepExecutor<P> {
    provisioner: Arc<P>,

    /// Build context directory copied by the context step
    context_dir: PathBuf,
}

impl<P: Provisioner> StepExecutor<P> {
    pub fn new(provisioner: Arc<P>, context_dir: PathBuf) -> Self {
        Self {
            provisioner,
            context_dir,
        }
    }

    /// Apply a step and return the updated configuration record
    pub async fn apply(
        &self,
        step: &Step,
        image: ImageConfig,
    ) -> Result<(ImageConfig, StepReport), ProvisionError> {
        info!("Applying step: {}", step.id);
        debug!("{}", step.action.describe());

        match &step.action {
            StepAction::PullBase { image: base } => {
                let report = self.provisioner.pull_base(base).await?;
                Ok((image.with_base(base.clone()), report))
            }

            StepAction::InstallSystemPackages { packages } => {
                let report = self.provisioner.install_system_packages(packages).await?;
                Ok((image, report))
            }

            StepAction::FetchBootstrap {
                url,
                sha256,
                install_dir,
                interpreter,
                binary,
            } => {
                let request = BootstrapRequest {
                    url: url.clone(),
                    sha256: sha256.clone(),
                    install_dir: install_dir.clone(),
                    interpreter: interpreter.clone(),
                    binary: binary.clone(),
                };
                let report = self.provisioner.bootstrap_installer(&request).await?;
                Ok((image, report))
            }

            StepAction::ExtendPath { dir } => {
                let image = image.with_path_entry(dir.clone());
                let rendered = image.search_path(BASE_SEARCH_PATH);
                let image = image.with_env("PATH", rendered);
                let report = StepReport::new(format!("prepended {} to PATH", dir.display()));
                Ok((image, report))
            }

            StepAction::SetWorkdir { path } => {
                let report = self.provisioner.ensure_workdir(path).await?;
                Ok((image.with_workdir(path.clone()), report))
            }

            StepAction::CopyContext => {
                let workdir = image.workdir.clone().ok_or_else(|| {
                    ProvisionError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "working directory not set before the context copy",
                    ))
                })?;
                let report = self
                    .provisioner
                    .copy_context(&self.context_dir, &workdir)
                    .await?;
                Ok((image, report))
            }

            StepAction::InstallDependencies {
                manifest,
                isolated_sandbox,
                non_interactive,
            } => {
                let workdir = image.workdir.clone().ok_or_else(|| {
                    ProvisionError::DependencyResolution {
                        reason: "working directory not set before the dependency install"
                            .to_string(),
                    }
                })?;
                let request = InstallRequest {
                    manifest: manifest.clone(),
                    workdir,
                    isolated_sandbox: *isolated_sandbox,
                    non_interactive: *non_interactive,
                    search_path: image.search_path(BASE_SEARCH_PATH),
                };
                let report = self.provisioner.install_dependencies(&request).await?;
                Ok((image, report))
            }

            StepAction::SetEntrypoint { argv } => {
                let report = StepReport::new(format!("registered entrypoint {:?}", argv));
                Ok((image.with_entrypoint(argv.clone()), report))
            }
        }
    }
}
