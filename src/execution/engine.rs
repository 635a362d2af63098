//! Build engine - drives the whole provisioning chain

use crate::{
    core::{BuildStatus, ImageConfig, Pipeline, StepState},
    execution::StepExecutor,
    provision::{ProvisionError, Provisioner},
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a build
#[derive(Debug, Clone)]
pub enum BuildEvent {
    BuildStarted {
        build_id: Uuid,
        pipeline_name: String,
    },
    StepStarted {
        step_id: String,
    },
    StepCompleted {
        step_id: String,
        detail: String,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    BuildFinished {
        build_id: Uuid,
        status: BuildStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(BuildEvent) + Send + Sync>;

/// Drives the step chain: a left-fold of the image configuration record
/// over the ordered steps, aborting on the first failure
pub struct BuildEngine<P> {
    provisioner: Arc<P>,
    executor: StepExecutor<P>,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<P: Provisioner + Send + Sync + 'static> BuildEngine<P> {
    pub fn new(provisioner: P, context_dir: PathBuf) -> Self {
        let provisioner = Arc::new(provisioner);
        let executor = StepExecutor::new(provisioner.clone(), context_dir);

        Self {
            provisioner,
            executor,
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(BuildEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: BuildEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline and return the final configuration
    /// record
    ///
    /// Any step failure aborts the chain, discards the staged build, and
    /// propagates the error; steps after the failing one never run.
    pub async fn execute(
        &self,
        pipeline: &mut Pipeline,
    ) -> Result<ImageConfig, ProvisionError> {
        let build_id = pipeline.state.build_id;

        info!("Starting build: {} ({})", pipeline.name, build_id);
        self.emit_event(BuildEvent::BuildStarted {
            build_id,
            pipeline_name: pipeline.name.clone(),
        })
        .await;

        pipeline.state.start(pipeline.steps.len());

        let mut image = ImageConfig::new();

        for idx in 0..pipeline.steps.len() {
            let step = pipeline.steps[idx].clone();

            if let Some(reason) = Pipeline::skip_reason(&step.action) {
                pipeline.steps[idx].state = StepState::Skipped {
                    reason: reason.clone(),
                };
                pipeline.state.skipped_steps += 1;
                self.emit_event(BuildEvent::StepSkipped {
                    step_id: step.id.clone(),
                    reason,
                })
                .await;
                continue;
            }

            let started_at = Utc::now();
            pipeline.steps[idx].state = StepState::Running { started_at };
            self.emit_event(BuildEvent::StepStarted {
                step_id: step.id.clone(),
            })
            .await;

            // `image` still holds the pre-step record here; a failing step
            // never contributes to the fold
            match self.executor.apply(&step, image.clone()).await {
                Ok((next, report)) => {
                    pipeline.steps[idx].state = StepState::Completed {
                        detail: report.detail.clone(),
                        started_at,
                        completed_at: Utc::now(),
                    };
                    pipeline.state.completed_steps += 1;
                    image = next;

                    self.emit_event(BuildEvent::StepCompleted {
                        step_id: step.id.clone(),
                        detail: report.detail,
                    })
                    .await;
                }
                Err(e) => {
                    error!("Step {} failed: {}", step.id, e);
                    pipeline.steps[idx].state = StepState::Failed {
                        error: e.to_string(),
                        started_at,
                        failed_at: Utc::now(),
                    };
                    pipeline.state.abort();

                    self.emit_event(BuildEvent::StepFailed {
                        step_id: step.id.clone(),
                        error: e.to_string(),
                    })
                    .await;
                    self.emit_event(BuildEvent::BuildFinished {
                        build_id,
                        status: BuildStatus::Aborted,
                    })
                    .await;

                    // No partial artifact survives an abort
                    if let Err(discard_err) = self.provisioner.discard().await {
                        warn!("Failed to discard staged build: {}", discard_err);
                    }

                    return Err(e);
                }
            }
        }

        pipeline.state.complete();
        info!("Build finished: {} - {:?}", pipeline.name, pipeline.state.status);
        self.emit_event(BuildEvent::BuildFinished {
            build_id,
            status: BuildStatus::Completed,
        })
        .await;

        Ok(image)
    }
}
