//! Test: Integrity Check - the fetched installer must match its digest
//! before anything executes it

use crate::helpers::*;
use bake::provision::ProvisionError;

/// A digest mismatch aborts with the distinct integrity error and the
/// installer never runs
#[tokio::test]
async fn test_digest_mismatch_aborts_before_execution() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().with_installer_digest(&"b".repeat(64));

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);

    match result.error() {
        ProvisionError::Integrity { expected, actual, .. } => {
            assert_eq!(expected, &sample_digest());
            assert_eq!(actual, &"b".repeat(64));
        }
        other => panic!("expected an integrity error, got: {}", other),
    }

    assert!(!result.log.executed_installer);
    assert_step_never_ran(&result, "extend-path");
}

/// A matching digest lets the installer run
#[tokio::test]
async fn test_matching_digest_executes_installer() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().with_installer_digest(&sample_digest());

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_completed(&result);
    assert!(result.log.executed_installer);
}

/// The mismatch also discards the staged build
#[tokio::test]
async fn test_integrity_failure_discards_staging() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().with_installer_digest(&"c".repeat(64));

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_aborted(&result);
    assert!(result.log.discarded);
}
