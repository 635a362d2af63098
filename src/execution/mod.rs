//! Pipeline execution engine

pub mod engine;
pub mod executor;

pub use engine::{BuildEngine, BuildEvent, EventHandler};
pub use executor::{StepExecutor, BASE_SEARCH_PATH};
