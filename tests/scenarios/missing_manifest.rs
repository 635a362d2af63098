//! Test: Missing Manifest - the dependency install requires the copied
//! context to contain the manifest

use crate::helpers::*;
use bake::provision::ProvisionError;

/// A context without the manifest fails the install step and nothing
/// later executes
#[tokio::test]
async fn test_missing_manifest_fails_install() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().without_manifest();

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(matches!(
        result.error(),
        ProvisionError::DependencyResolution { .. }
    ));
    assert_step_failed(&result, "install-dependencies", "requirements.txt");

    // The copy itself succeeded; only the install failed
    assert_step_completed(&result, "copy-context");

    // The entrypoint was never registered
    assert_step_never_ran(&result, "entrypoint");
    assert!(result.outcome.is_err());
}

/// An unparseable requirement line is a resolution failure, not a crash
#[tokio::test]
async fn test_malformed_manifest_fails_install() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().with_manifest("requests>=2.0\n");

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(matches!(
        result.error(),
        ProvisionError::DependencyResolution { .. }
    ));
}
