//! Core domain models for the provisioning pipeline
//!
//! This module defines the fundamental data structures that represent
//! recipes, the step chain, and the image configuration record.

pub mod image;
pub mod pipeline;
pub mod recipe;
pub mod state;
pub mod step;

pub use image::*;
pub use pipeline::*;
pub use state::*;
pub use step::*;
