//! Scenario-based tests for bake

mod determinism;
mod failure_abort;
mod full_build;
mod integrity_check;
mod missing_manifest;
