//! Persistence layer for build history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteBuildStore;

pub use crate::core::BuildStatus;
use crate::core::Pipeline;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of a build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Unique build ID
    pub build_id: Uuid,

    /// Recipe name
    pub recipe_name: String,

    /// Base image reference
    pub base_image: String,

    /// Build status
    pub status: BuildStatus,

    /// When the build started
    pub started_at: DateTime<Utc>,

    /// When the build completed or aborted
    pub completed_at: Option<DateTime<Utc>>,

    /// Progress (0.0 to 1.0)
    pub progress: f64,

    /// Number of completed steps
    pub completed_steps: usize,

    /// Total number of steps
    pub total_steps: usize,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a build
    async fn save_build(&self, build: &BuildSummary) -> Result<()>;

    /// Load a build by ID
    async fn load_build(&self, build_id: Uuid) -> Result<Option<BuildSummary>>;

    /// List all builds for a recipe
    async fn list_builds(&self, recipe_name: &str) -> Result<Vec<BuildSummary>>;

    /// List all recipe names
    async fn list_recipes(&self) -> Result<Vec<String>>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    builds: tokio::sync::RwLock<std::collections::HashMap<Uuid, BuildSummary>>,
    by_recipe: tokio::sync::RwLock<std::collections::HashMap<String, Vec<Uuid>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            builds: tokio::sync::RwLock::new(std::collections::HashMap::new()),
            by_recipe: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_build(&self, build: &BuildSummary) -> Result<()> {
        let mut builds = self.builds.write().await;
        builds.insert(build.build_id, build.clone());

        let mut by_recipe = self.by_recipe.write().await;
        by_recipe
            .entry(build.recipe_name.clone())
            .or_insert_with(Vec::new)
            .push(build.build_id);

        Ok(())
    }

    async fn load_build(&self, build_id: Uuid) -> Result<Option<BuildSummary>> {
        let builds = self.builds.read().await;
        Ok(builds.get(&build_id).cloned())
    }

    async fn list_builds(&self, recipe_name: &str) -> Result<Vec<BuildSummary>> {
        let builds = self.builds.read().await;
        let by_recipe = self.by_recipe.read().await;

        if let Some(ids) = by_recipe.get(recipe_name) {
            let mut result = Vec::new();
            for id in ids {
                if let Some(build) = builds.get(id) {
                    result.push(build.clone());
                }
            }
            Ok(result)
        } else {
            Ok(Vec::new())
        }
    }

    async fn list_recipes(&self) -> Result<Vec<String>> {
        let by_recipe = self.by_recipe.read().await;
        Ok(by_recipe.keys().cloned().collect())
    }
}

/// Create a summary from a pipeline
pub fn create_summary(pipeline: &Pipeline, base_image: &str) -> BuildSummary {
    BuildSummary {
        build_id: pipeline.state.build_id,
        recipe_name: pipeline.name.clone(),
        base_image: base_image.to_string(),
        status: pipeline.state.status,
        started_at: pipeline.state.started_at.unwrap_or_else(Utc::now),
        completed_at: pipeline.state.completed_at,
        progress: pipeline.state.progress(),
        completed_steps: pipeline.state.completed_steps,
        total_steps: pipeline.state.total_steps,
    }
}
