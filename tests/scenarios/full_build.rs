//! Test: Full Build - the complete provisioning chain

use crate::helpers::*;
use bake::core::StepState;

/// Test that all eight steps execute in their required order
#[tokio::test]
async fn test_full_chain_runs_in_order() {
    let mut pipeline = sample_pipeline();
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    assert_build_completed(&result);
    assert_eq!(
        result.started_order(),
        vec![
            "pull-base",
            "system-packages",
            "bootstrap",
            "extend-path",
            "workdir",
            "copy-context",
            "install-dependencies",
            "entrypoint",
        ]
    );

    for step_id in result.started_order() {
        assert_step_completed(&result, &step_id);
    }
}

/// Test that the final configuration record carries every fold
#[tokio::test]
async fn test_final_image_config() {
    let mut pipeline = sample_pipeline();
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    assert_build_completed(&result);

    let image = result.image();
    assert_eq!(image.base.as_ref().unwrap().to_string(), "python:3.12-slim");
    assert_eq!(
        image.workdir.as_ref().unwrap(),
        &std::path::PathBuf::from("/app")
    );
    assert!(image
        .env
        .get("PATH")
        .unwrap()
        .starts_with("/opt/poetry/bin:"));
}

/// The registered entrypoint is exactly the recipe's argv - two elements,
/// nothing silently appended
#[tokio::test]
async fn test_entrypoint_has_exactly_two_argv_elements() {
    let mut pipeline = sample_pipeline();
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    let entrypoint = result.image().entrypoint.as_ref().unwrap();
    assert_eq!(entrypoint.len(), 2);
    assert_eq!(entrypoint[0], "python");
    assert_eq!(entrypoint[1], "hw-02.py");
}

/// A recipe without system packages keeps the positional chain; the step
/// is skipped, not removed
#[tokio::test]
async fn test_empty_system_packages_are_skipped() {
    let yaml = format!(
        r#"
name: "no-packages"
base: "python:3.12-slim"
bootstrap:
  url: "https://install.python-poetry.org"
  sha256: "{}"
  install_dir: "/opt/poetry/bin"
  binary: "poetry"
workdir: "/app"
dependencies:
  manifest: "requirements.txt"
entrypoint: ["python", "hw-02.py"]
"#,
        sample_digest()
    );

    let mut pipeline = pipeline_from_yaml(&yaml);
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    assert_build_completed(&result);
    assert!(matches!(
        result.step_state("system-packages"),
        StepState::Skipped { .. }
    ));

    // The provisioner was never asked to install anything system-level
    assert!(!result
        .log
        .calls
        .iter()
        .any(|c| c == "install_system_packages"));
}
