//! Test: Failure Abort - fail-fast semantics of the step chain

use crate::helpers::*;
use bake::provision::ProvisionError;

/// An unknown system package aborts the build before the bootstrap step;
/// no later step has any side effect
#[tokio::test]
async fn test_unknown_package_aborts_before_bootstrap() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().fail_packages("Unable to locate package no-such-package");

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(matches!(
        result.error(),
        ProvisionError::PackageInstall { .. }
    ));
    assert_step_failed(&result, "system-packages", "Unable to locate package");

    // The provisioner never saw the bootstrap, copy, or install calls
    assert_eq!(
        result.log.calls,
        vec!["pull_base", "install_system_packages"]
    );

    for step_id in [
        "bootstrap",
        "extend-path",
        "workdir",
        "copy-context",
        "install-dependencies",
        "entrypoint",
    ] {
        assert_step_never_ran(&result, step_id);
    }
}

/// An unresolvable base image aborts at the very first step
#[tokio::test]
async fn test_pull_failure_aborts_everything() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().fail_pull("manifest unknown");

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(matches!(result.error(), ProvisionError::ImagePull { .. }));
    assert_eq!(result.log.calls, vec!["pull_base"]);
    assert_eq!(result.completed_steps().len(), 0);
}

/// A failing installer download aborts before the search path is extended
#[tokio::test]
async fn test_bootstrap_failure_stops_the_fold() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().fail_bootstrap("connection reset by peer");

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(matches!(result.error(), ProvisionError::Bootstrap { .. }));
    assert_step_never_ran(&result, "extend-path");

    // Nothing was folded past the failure: the outcome carries no record
    assert!(result.outcome.is_err());
}

/// Any abort discards the staged build
#[tokio::test]
async fn test_abort_discards_staged_build() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().fail_packages("boom");

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(result.log.discarded);
}

/// A successful build never discards its staging
#[tokio::test]
async fn test_success_keeps_staged_build() {
    let mut pipeline = sample_pipeline();
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    assert_build_completed(&result);
    assert!(!result.log.discarded);
}
