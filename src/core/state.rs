//! Build state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall build status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    /// Build has not started
    Pending,
    /// Build is currently running
    Running,
    /// Build completed successfully
    Completed,
    /// Build aborted on the first failing step
    Aborted,
}

/// State of a single provisioning step
///
/// Steps move along a linear chain: `Pending -> Running -> Completed` (or
/// `Skipped`), with a single failure transition to `Failed`. There are no
/// retries anywhere in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step is waiting for its positional predecessor
    Pending,
    /// Step is currently running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Step completed successfully
    Completed {
        detail: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step failed; the build aborts here
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step had nothing to do (e.g. no system packages requested)
    Skipped {
        reason: String,
    },
}

impl StepState {
    /// Check if the step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Completed { .. } | StepState::Failed { .. } | StepState::Skipped { .. }
        )
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique build ID
    pub build_id: Uuid,

    /// Current build status
    pub status: BuildStatus,

    /// When the build started
    pub started_at: Option<DateTime<Utc>>,

    /// When the build completed or aborted
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps in the chain
    pub total_steps: usize,

    /// Number of completed steps
    pub completed_steps: usize,

    /// Number of skipped steps
    pub skipped_steps: usize,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            build_id: Uuid::new_v4(),
            status: BuildStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            skipped_steps: 0,
        }
    }

    /// Mark the build as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = BuildStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Mark the build as completed
    pub fn complete(&mut self) {
        self.status = BuildStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the build as aborted
    pub fn abort(&mut self) {
        self.status = BuildStatus::Aborted;
        self.completed_at = Some(Utc::now());
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.completed_steps + self.skipped_steps) as f64 / self.total_steps as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
