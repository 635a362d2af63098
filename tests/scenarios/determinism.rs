//! Test: Determinism - rerunning the pipeline produces an equivalent image

use crate::helpers::*;
use bake::execution::BASE_SEARCH_PATH;

/// Two runs from a clean state fold to identical configuration records:
/// same search-path augmentation, same workdir, same entrypoint
#[tokio::test]
async fn test_two_runs_fold_identically() {
    let first = {
        let mut pipeline = sample_pipeline();
        run_build_with_mock(&mut pipeline, MockProvisioner::new()).await
    };
    let second = {
        let mut pipeline = sample_pipeline();
        run_build_with_mock(&mut pipeline, MockProvisioner::new()).await
    };

    assert_build_completed(&first);
    assert_build_completed(&second);
    assert_eq!(first.image(), second.image());
}

/// Two runs install the same package set and dependency set
#[tokio::test]
async fn test_two_runs_install_the_same_sets() {
    let first = {
        let mut pipeline = sample_pipeline();
        run_build_with_mock(&mut pipeline, MockProvisioner::new()).await
    };
    let second = {
        let mut pipeline = sample_pipeline();
        run_build_with_mock(&mut pipeline, MockProvisioner::new()).await
    };

    assert_eq!(first.log.system_packages, second.log.system_packages);
    assert_eq!(first.log.installed, second.log.installed);
    assert_eq!(
        first.image().entrypoint.as_ref().unwrap(),
        second.image().entrypoint.as_ref().unwrap()
    );
}

/// The rendered search path and workdir are fixed values, not run-dependent
#[tokio::test]
async fn test_search_path_and_workdir_values() {
    let mut pipeline = sample_pipeline();
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    let image = result.image();
    assert_eq!(
        image.env.get("PATH").unwrap(),
        &format!("/opt/poetry/bin:{}", BASE_SEARCH_PATH)
    );
    assert_eq!(
        image.workdir.as_ref().unwrap(),
        &std::path::PathBuf::from("/app")
    );
}

/// Scenario: a manifest pinning one dependency `x==1.0` installs exactly
/// that version into the shared runtime - the isolated-sandbox flag is off
#[tokio::test]
async fn test_pinned_dependency_installs_into_shared_runtime() {
    let mut pipeline = sample_pipeline();
    let mock = MockProvisioner::new().with_manifest("x==1.0\n");

    let result = run_build_with_mock(&mut pipeline, mock).await;

    assert_build_completed(&result);
    assert_eq!(result.log.installed.len(), 1);
    assert_eq!(result.log.installed[0].name, "x");
    assert_eq!(result.log.installed[0].version.as_deref(), Some("1.0"));
    assert_eq!(result.log.sandboxed_install, Some(false));
}

/// The dependency install runs with the extended search path in effect
#[tokio::test]
async fn test_install_sees_extended_search_path() {
    let mut pipeline = sample_pipeline();
    let result = run_build_with_mock(&mut pipeline, MockProvisioner::new()).await;

    assert_build_completed(&result);
    assert_eq!(
        result.log.install_search_path.as_deref(),
        Some(format!("/opt/poetry/bin:{}", BASE_SEARCH_PATH).as_str())
    );
}
