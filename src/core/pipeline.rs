//! Pipeline domain model

use crate::core::recipe::Recipe;
use crate::core::state::{BuildStatus, PipelineState, StepState};
use crate::core::step::{Step, StepAction, StepKind};

/// A provisioning pipeline: the fixed, ordered chain of steps derived
/// from a recipe
///
/// Order is positional; step `n + 1` never starts before step `n` reached
/// a terminal state, and any failure aborts the whole chain.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name (the recipe name)
    pub name: String,

    /// Steps in execution order
    pub steps: Vec<Step>,

    /// Build state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from a recipe
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let bootstrap = &recipe.bootstrap;

        let actions = vec![
            StepAction::PullBase {
                image: recipe.base_image(),
            },
            StepAction::InstallSystemPackages {
                packages: recipe.system_packages.clone(),
            },
            StepAction::FetchBootstrap {
                url: bootstrap.url.clone(),
                sha256: bootstrap.sha256.to_lowercase(),
                install_dir: bootstrap.install_dir.clone(),
                interpreter: bootstrap.interpreter.clone(),
                binary: bootstrap.binary.clone(),
            },
            StepAction::ExtendPath {
                dir: bootstrap.install_dir.clone(),
            },
            StepAction::SetWorkdir {
                path: recipe.workdir.clone(),
            },
            StepAction::CopyContext,
            StepAction::InstallDependencies {
                manifest: recipe.dependencies.manifest.clone(),
                isolated_sandbox: recipe.dependencies.isolated_sandbox,
                non_interactive: recipe.dependencies.non_interactive,
            },
            StepAction::SetEntrypoint {
                argv: recipe.entrypoint.clone(),
            },
        ];

        let steps = actions
            .into_iter()
            .map(|action| Step::new(action.kind().id(), action))
            .collect();

        Pipeline {
            name: recipe.name.clone(),
            steps,
            state: PipelineState::new(),
        }
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get a mutable step by ID
    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Get a step by kind
    pub fn step_by_kind(&self, kind: StepKind) -> Option<&Step> {
        self.steps.iter().find(|s| s.kind() == kind)
    }

    /// The index of the next step to run, if any
    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| matches!(s.state, StepState::Pending))
    }

    /// Check if every step reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if the build aborted
    pub fn has_aborted(&self) -> bool {
        self.state.status == BuildStatus::Aborted
    }

    /// Step IDs in execution order
    pub fn execution_order(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    /// An action that has no work to do is recorded as skipped instead of
    /// being run (the chain keeps its positional structure)
    pub fn skip_reason(action: &StepAction) -> Option<String> {
        match action {
            StepAction::InstallSystemPackages { packages } if packages.is_empty() => {
                Some("no system packages requested".to_string())
            }
            _ => None,
        }
    }
}
