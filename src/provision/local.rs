//! Local provisioner - stages a build under a host directory
//!
//! Effectful operations run against a staging rootfs: the base image is
//! fetched and unpacked with `skopeo`/`umoci`, package installs run inside
//! the rootfs via `chroot`, and the installer download is verified against
//! its required digest before anything executes it.

use crate::core::image::ImageRef;
use crate::core::recipe::Recipe;
use crate::provision::{BootstrapRequest, InstallRequest, ProvisionError, Provisioner, StepReport};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// External tools the local provisioner shells out to
#[derive(Debug, Clone)]
pub struct ToolSet {
    /// Image transport tool
    pub skopeo: String,

    /// OCI layout unpacker
    pub umoci: String,

    /// Rootfs entry tool for in-image commands
    pub chroot: String,
}

impl Default for ToolSet {
    fn default() -> Self {
        Self {
            skopeo: "skopeo".to_string(),
            umoci: "umoci".to_string(),
            chroot: "chroot".to_string(),
        }
    }
}

/// Context-copy entries that are usually build-irrelevant; flagged with a
/// warning but copied anyway (the copy is unconditional)
const SUSPECT_CONTEXT_ENTRIES: &[&str] = &[".git", "__pycache__", ".venv", "node_modules"];

/// Provisioner that stages the image under a local directory
pub struct LocalProvisioner {
    /// Staging root; the rootfs lives at `<staging>/rootfs`
    staging: PathBuf,

    tools: ToolSet,

    http: reqwest::Client,

    /// Image-side path of the bootstrapped package manager, recorded by
    /// the bootstrap step and consumed by the dependency install
    manager: Mutex<Option<PathBuf>>,
}

impl LocalProvisioner {
    /// Create a provisioner staging under the given directory
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
            tools: ToolSet::default(),
            http: reqwest::Client::new(),
            manager: Mutex::new(None),
        }
    }

    /// Override the external tool names (e.g. for wrappers)
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// The staging directory
    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// The staged rootfs directory
    pub fn rootfs(&self) -> PathBuf {
        self.staging.join("rootfs")
    }

    /// Map an absolute image-side path onto the staged rootfs
    fn host_path(&self, image_path: &Path) -> PathBuf {
        let relative = image_path
            .strip_prefix("/")
            .unwrap_or(image_path)
            .to_path_buf();
        self.rootfs().join(relative)
    }

    /// Run an external tool and return its stdout, mapping a non-zero
    /// exit into the tool's stderr text
    async fn run_tool(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<String, String> {
        debug!("Running {} {:?}", program, args);

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);
        for (key, value) in envs {
            command.env(key, value);
        }

        let output = command
            .output()
            .await
            .map_err(|e| format!("failed to spawn {}: {}", program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", program, exit_code, stderr.trim());
            return Err(format!(
                "{} exited with code {}: {}",
                program,
                exit_code,
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a command inside the staged rootfs
    async fn run_in_rootfs(
        &self,
        argv: &[String],
        envs: &[(String, String)],
    ) -> Result<String, String> {
        let rootfs = self.rootfs();
        let mut full = vec![rootfs.display().to_string()];
        full.extend_from_slice(argv);
        self.run_tool(&self.tools.chroot, &full, envs).await
    }
}

/// Hex-encode the SHA-256 digest of a byte buffer
fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Verify downloaded bytes against a required digest
fn verify_digest(url: &str, bytes: &[u8], expected: &str) -> Result<(), ProvisionError> {
    let actual = sha256_hex(bytes);
    if actual != expected.to_lowercase() {
        return Err(ProvisionError::Integrity {
            url: url.to_string(),
            expected: expected.to_lowercase(),
            actual,
        });
    }
    Ok(())
}

#[async_trait]
impl Provisioner for LocalProvisioner {
    async fn pull_base(&self, image: &ImageRef) -> Result<StepReport, ProvisionError> {
        std::fs::create_dir_all(&self.staging)?;

        let layout = self.staging.join("base");
        let pull_err = |reason: String| ProvisionError::ImagePull {
            image: image.to_string(),
            reason,
        };

        self.run_tool(
            &self.tools.skopeo,
            &[
                "copy".to_string(),
                format!("docker://{}", image),
                format!("oci:{}:base", layout.display()),
            ],
            &[],
        )
        .await
        .map_err(pull_err)?;

        self.run_tool(
            &self.tools.umoci,
            &[
                "unpack".to_string(),
                "--rootless".to_string(),
                "--image".to_string(),
                format!("{}:base", layout.display()),
                self.rootfs().display().to_string(),
            ],
            &[],
        )
        .await
        .map_err(pull_err)?;

        Ok(StepReport::new(format!("unpacked base image {}", image)))
    }

    async fn install_system_packages(
        &self,
        packages: &[String],
    ) -> Result<StepReport, ProvisionError> {
        let install_err = |reason: String| ProvisionError::PackageInstall {
            packages: packages.to_vec(),
            reason,
        };
        let noninteractive = [(
            "DEBIAN_FRONTEND".to_string(),
            "noninteractive".to_string(),
        )];

        // Refresh the index first; a stale index is the usual cause of
        // unknown-package failures
        self.run_in_rootfs(
            &["apt-get".to_string(), "update".to_string()],
            &noninteractive,
        )
        .await
        .map_err(install_err)?;

        let mut argv = vec![
            "apt-get".to_string(),
            "install".to_string(),
            "-y".to_string(),
            "--no-install-recommends".to_string(),
        ];
        argv.extend(packages.iter().cloned());

        self.run_in_rootfs(&argv, &noninteractive)
            .await
            .map_err(install_err)?;

        Ok(StepReport::new(format!(
            "installed {} system package(s)",
            packages.len()
        )))
    }

    async fn bootstrap_installer(
        &self,
        request: &BootstrapRequest,
    ) -> Result<StepReport, ProvisionError> {
        let bootstrap_err = |reason: String| ProvisionError::Bootstrap {
            url: request.url.clone(),
            reason,
        };

        let response = self
            .http
            .get(&request.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| bootstrap_err(e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| bootstrap_err(e.to_string()))?;

        // The installer never executes unless its digest matches
        verify_digest(&request.url, &bytes, &request.sha256)?;

        let script = format!("/tmp/{}-installer", request.binary);
        let host_script = self.host_path(Path::new(&script));
        if let Some(parent) = host_script.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&host_script, &bytes)?;

        self.run_in_rootfs(
            &[request.interpreter.clone(), script.clone()],
            &[],
        )
        .await
        .map_err(bootstrap_err)?;

        let manager = request.install_dir.join(&request.binary);
        if !self.host_path(&manager).exists() {
            return Err(bootstrap_err(format!(
                "installer did not produce {}",
                manager.display()
            )));
        }

        *self.manager.lock().unwrap() = Some(manager.clone());

        Ok(StepReport::new(format!(
            "bootstrapped {} at {}",
            request.binary,
            manager.display()
        )))
    }

    async fn ensure_workdir(&self, path: &Path) -> Result<StepReport, ProvisionError> {
        let host = self.host_path(path);
        std::fs::create_dir_all(&host)?;
        Ok(StepReport::new(format!(
            "working directory {}",
            path.display()
        )))
    }

    async fn copy_context(
        &self,
        context: &Path,
        workdir: &Path,
    ) -> Result<StepReport, ProvisionError> {
        let target = self.host_path(workdir);
        std::fs::create_dir_all(&target)?;

        for suspect in SUSPECT_CONTEXT_ENTRIES {
            if context.join(suspect).exists() {
                warn!(
                    "build context contains '{}'; it will be copied into the image unfiltered",
                    suspect
                );
            }
        }

        let mut copied = 0usize;
        for entry in WalkDir::new(context) {
            let entry = entry.map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
            })?;

            let relative = entry
                .path()
                .strip_prefix(context)
                .expect("walkdir yields children of the context root");
            if relative.as_os_str().is_empty() {
                continue;
            }

            let dest = target.join(relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest)?;
            } else {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &dest)?;
                copied += 1;
            }
        }

        Ok(StepReport::new(format!(
            "copied {} file(s) into {}",
            copied,
            workdir.display()
        )))
    }

    async fn install_dependencies(
        &self,
        request: &InstallRequest,
    ) -> Result<StepReport, ProvisionError> {
        let resolution_err = |reason: String| ProvisionError::DependencyResolution { reason };

        let manifest_host = self.host_path(&request.workdir).join(&request.manifest);
        if !manifest_host.exists() {
            return Err(resolution_err(format!(
                "manifest '{}' not found in {}",
                request.manifest,
                request.workdir.display()
            )));
        }

        let declared = Recipe::parse_manifest(&std::fs::read_to_string(&manifest_host)?)
            .map_err(resolution_err)?;

        let manager = self
            .manager
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| resolution_err("package manager was not bootstrapped".to_string()))?;

        let mut cmdline = vec![manager.display().to_string(), "install".to_string()];
        if request.non_interactive {
            cmdline.push("--no-interaction".to_string());
            cmdline.push("--no-ansi".to_string());
        }

        let mut envs = vec![("PATH".to_string(), request.search_path.clone())];
        if !request.isolated_sandbox {
            // Installs land in the shared runtime, not a private sandbox
            let prefix = manager
                .file_name()
                .map(|n| n.to_string_lossy().to_uppercase())
                .unwrap_or_default();
            envs.push((format!("{}_VIRTUALENVS_CREATE", prefix), "false".to_string()));
        }

        let shell = format!(
            "cd {} && {}",
            request.workdir.display(),
            cmdline.join(" ")
        );
        self.run_in_rootfs(
            &["/bin/sh".to_string(), "-c".to_string(), shell],
            &envs,
        )
        .await
        .map_err(resolution_err)?;

        Ok(StepReport::new(format!(
            "installed {} declared dependenc(ies) from {}",
            declared.len(),
            request.manifest
        )))
    }

    async fn discard(&self) -> Result<(), ProvisionError> {
        if self.staging.exists() {
            debug!("Discarding staged build at {}", self.staging.display());
            tokio::fs::remove_dir_all(&self.staging).await?;
        }
        Ok(())
    }
}
