//! Test utility functions for bake

use bake::core::recipe::Recipe;
use bake::core::{BuildStatus, ImageConfig, ImageRef, Pipeline, Requirement, StepState};
use bake::execution::{BuildEngine, BuildEvent};
use bake::provision::{
    BootstrapRequest, InstallRequest, ProvisionError, Provisioner, StepReport,
};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Everything the mock provisioner records about effectful calls
#[derive(Debug, Clone, Default)]
pub struct ProvisionLog {
    /// Operation names, in call order
    pub calls: Vec<String>,

    /// The pulled base image reference
    pub pulled: Option<String>,

    /// System packages passed to the package install
    pub system_packages: Vec<String>,

    /// Whether the downloaded installer was executed
    pub executed_installer: bool,

    /// Dependencies parsed from the manifest at install time
    pub installed: Vec<Requirement>,

    /// The isolated-sandbox flag the dependency install saw
    pub sandboxed_install: Option<bool>,

    /// The search path the dependency install saw
    pub install_search_path: Option<String>,

    /// Whether the staged build was discarded
    pub discarded: bool,
}

/// Mock provisioner with scripted failures and a shared call log
pub struct MockProvisioner {
    log: Arc<Mutex<ProvisionLog>>,

    /// Content of the manifest "copied" into the image; `None` means the
    /// context had no manifest at all
    manifest: Option<String>,

    fail_pull: Option<String>,
    fail_packages: Option<String>,
    fail_bootstrap: Option<String>,

    /// Digest the "downloaded" installer actually hashes to, when it
    /// should mismatch the recipe's required digest
    integrity_mismatch: Option<String>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(ProvisionLog::default())),
            manifest: Some("requests==2.32.3\n".to_string()),
            fail_pull: None,
            fail_packages: None,
            fail_bootstrap: None,
            integrity_mismatch: None,
        }
    }

    /// Replace the manifest content the copied context carries
    pub fn with_manifest(mut self, content: &str) -> Self {
        self.manifest = Some(content.to_string());
        self
    }

    /// Simulate a context that does not contain the manifest
    pub fn without_manifest(mut self) -> Self {
        self.manifest = None;
        self
    }

    pub fn fail_pull(mut self, reason: &str) -> Self {
        self.fail_pull = Some(reason.to_string());
        self
    }

    pub fn fail_packages(mut self, reason: &str) -> Self {
        self.fail_packages = Some(reason.to_string());
        self
    }

    pub fn fail_bootstrap(mut self, reason: &str) -> Self {
        self.fail_bootstrap = Some(reason.to_string());
        self
    }

    /// Make the downloaded installer hash to the given digest
    pub fn with_installer_digest(mut self, actual: &str) -> Self {
        self.integrity_mismatch = Some(actual.to_string());
        self
    }

    /// Handle onto the shared log, valid after the engine consumed the mock
    pub fn log_handle(&self) -> Arc<Mutex<ProvisionLog>> {
        self.log.clone()
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().calls.push(call.to_string());
    }
}

impl Default for MockProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provisioner for MockProvisioner {
    async fn pull_base(&self, image: &ImageRef) -> Result<StepReport, ProvisionError> {
        self.record("pull_base");
        if let Some(reason) = &self.fail_pull {
            return Err(ProvisionError::ImagePull {
                image: image.to_string(),
                reason: reason.clone(),
            });
        }
        self.log.lock().unwrap().pulled = Some(image.to_string());
        Ok(StepReport::new(format!("pulled {}", image)))
    }

    async fn install_system_packages(
        &self,
        packages: &[String],
    ) -> Result<StepReport, ProvisionError> {
        self.record("install_system_packages");
        if let Some(reason) = &self.fail_packages {
            return Err(ProvisionError::PackageInstall {
                packages: packages.to_vec(),
                reason: reason.clone(),
            });
        }
        self.log.lock().unwrap().system_packages = packages.to_vec();
        Ok(StepReport::new(format!("{} package(s)", packages.len())))
    }

    async fn bootstrap_installer(
        &self,
        request: &BootstrapRequest,
    ) -> Result<StepReport, ProvisionError> {
        self.record("bootstrap_installer");
        if let Some(actual) = &self.integrity_mismatch {
            if actual != &request.sha256 {
                return Err(ProvisionError::Integrity {
                    url: request.url.clone(),
                    expected: request.sha256.clone(),
                    actual: actual.clone(),
                });
            }
        }
        if let Some(reason) = &self.fail_bootstrap {
            return Err(ProvisionError::Bootstrap {
                url: request.url.clone(),
                reason: reason.clone(),
            });
        }
        self.log.lock().unwrap().executed_installer = true;
        Ok(StepReport::new(format!("bootstrapped {}", request.binary)))
    }

    async fn ensure_workdir(&self, path: &Path) -> Result<StepReport, ProvisionError> {
        self.record("ensure_workdir");
        Ok(StepReport::new(format!("workdir {}", path.display())))
    }

    async fn copy_context(
        &self,
        _context: &Path,
        workdir: &Path,
    ) -> Result<StepReport, ProvisionError> {
        self.record("copy_context");
        Ok(StepReport::new(format!("copied into {}", workdir.display())))
    }

    async fn install_dependencies(
        &self,
        request: &InstallRequest,
    ) -> Result<StepReport, ProvisionError> {
        self.record("install_dependencies");

        let manifest = self.manifest.as_ref().ok_or_else(|| {
            ProvisionError::DependencyResolution {
                reason: format!(
                    "manifest '{}' not found in {}",
                    request.manifest,
                    request.workdir.display()
                ),
            }
        })?;

        let declared = Recipe::parse_manifest(manifest)
            .map_err(|reason| ProvisionError::DependencyResolution { reason })?;

        let mut log = self.log.lock().unwrap();
        log.installed = declared.clone();
        log.sandboxed_install = Some(request.isolated_sandbox);
        log.install_search_path = Some(request.search_path.clone());

        Ok(StepReport::new(format!(
            "installed {} dependenc(ies)",
            declared.len()
        )))
    }

    async fn discard(&self) -> Result<(), ProvisionError> {
        self.log.lock().unwrap().discarded = true;
        Ok(())
    }
}

/// Run a pipeline against a mock provisioner and collect everything a test
/// might want to assert on
pub async fn run_build_with_mock(
    pipeline: &mut Pipeline,
    mock: MockProvisioner,
) -> BuildTestResult {
    let log = mock.log_handle();
    let events = Arc::new(Mutex::new(Vec::new()));

    let engine = BuildEngine::new(mock, PathBuf::from("."));
    let sink = events.clone();
    engine
        .add_event_handler(move |event| sink.lock().unwrap().push(event))
        .await;

    let outcome = engine.execute(pipeline).await;

    let log = log.lock().unwrap().clone();
    let events = events.lock().unwrap().clone();

    BuildTestResult {
        pipeline: pipeline.clone(),
        outcome,
        log,
        events,
    }
}

/// Result of a test build
pub struct BuildTestResult {
    pub pipeline: Pipeline,
    pub outcome: Result<ImageConfig, ProvisionError>,
    pub log: ProvisionLog,
    pub events: Vec<BuildEvent>,
}

impl BuildTestResult {
    /// Check if the build completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self.pipeline.state.status, BuildStatus::Completed)
    }

    /// Check if the build aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.pipeline.state.status, BuildStatus::Aborted)
    }

    /// The final configuration record; panics if the build aborted
    pub fn image(&self) -> &ImageConfig {
        self.outcome
            .as_ref()
            .unwrap_or_else(|e| panic!("build aborted: {}", e))
    }

    /// The abort error; panics if the build completed
    pub fn error(&self) -> &ProvisionError {
        match &self.outcome {
            Err(e) => e,
            Ok(_) => panic!("build completed but an error was expected"),
        }
    }

    /// Get the state of a specific step
    pub fn step_state(&self, step_id: &str) -> &StepState {
        &self
            .pipeline
            .step(step_id)
            .unwrap_or_else(|| panic!("Step '{}' not found", step_id))
            .state
    }

    /// Step IDs that actually started, in event order
    pub fn started_order(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::StepStarted { step_id } => Some(step_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Completed steps, in chain order
    pub fn completed_steps(&self) -> Vec<String> {
        self.pipeline
            .steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Completed { .. }))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Get a summary of the result
    pub fn summary(&self) -> String {
        format!(
            "{:?} - {} steps completed",
            self.pipeline.state.status,
            self.completed_steps().len()
        )
    }
}

/// Assert a step completed
pub fn assert_step_completed(result: &BuildTestResult, step_id: &str) {
    assert!(
        matches!(result.step_state(step_id), StepState::Completed { .. }),
        "Step '{}' should be completed, but was in state: {:?}",
        step_id,
        result.step_state(step_id)
    );
}

/// Assert a step failed with a specific message
pub fn assert_step_failed(result: &BuildTestResult, step_id: &str, expected_error: &str) {
    let error = match result.step_state(step_id) {
        StepState::Failed { error, .. } => error.clone(),
        other => panic!(
            "Step '{}' should have failed, but was in state: {:?}",
            step_id, other
        ),
    };

    assert!(
        error.contains(expected_error),
        "Step '{}' error:\n{}\n\ndoes not contain:\n{}",
        step_id,
        error,
        expected_error
    );
}

/// Assert a step never left the pending state
pub fn assert_step_never_ran(result: &BuildTestResult, step_id: &str) {
    assert!(
        matches!(result.step_state(step_id), StepState::Pending),
        "Step '{}' should not have run, but was in state: {:?}",
        step_id,
        result.step_state(step_id)
    );
}

/// Assert the build completed successfully
pub fn assert_build_completed(result: &BuildTestResult) {
    assert!(
        result.is_success(),
        "Build should be completed, but was: {}",
        result.summary()
    );
}

/// Assert the build aborted
pub fn assert_build_aborted(result: &BuildTestResult) {
    assert!(
        result.is_aborted(),
        "Build should have aborted, but was: {}",
        result.summary()
    );
}

/// A digest that every valid sample recipe uses
pub fn sample_digest() -> String {
    "a".repeat(64)
}

/// Parse a recipe from a YAML string
pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    let recipe =
        Recipe::from_yaml(yaml).unwrap_or_else(|e| panic!("Failed to parse recipe YAML: {}", e));
    recipe.to_pipeline()
}

/// The canonical sample recipe: python base, one system package, a
/// poetry-style bootstrap, and a two-element entrypoint
pub fn sample_pipeline() -> Pipeline {
    let yaml = format!(
        r#"
name: "hw-02"
base: "python:3.12-slim"

system_packages:
  - curl

bootstrap:
  url: "https://install.python-poetry.org"
  sha256: "{}"
  install_dir: "/opt/poetry/bin"
  interpreter: "python3"
  binary: "poetry"

workdir: "/app"

dependencies:
  manifest: "requirements.txt"

entrypoint: ["python", "hw-02.py"]
"#,
        sample_digest()
    );
    pipeline_from_yaml(&yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_build_with_mock_simple() {
        let mut pipeline = sample_pipeline();
        let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

        assert_build_completed(&result);
        assert_step_completed(&result, "pull-base");
        assert_eq!(result.log.pulled.as_deref(), Some("python:3.12-slim"));
    }

    #[tokio::test]
    async fn test_assert_step_never_ran() {
        let mut pipeline = sample_pipeline();
        let result =
            run_build_with_mock(&mut pipeline, MockProvisioner::new().fail_pull("offline")).await;

        assert_build_aborted(&result);
        assert_step_never_ran(&result, "system-packages");
    }
}
