//! CLI output formatting

use crate::{
    core::{BuildStatus, StepState},
    execution::BuildEvent,
    persistence::BuildSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the step chain
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format a build status for display
pub fn format_status(status: BuildStatus) -> String {
    match status {
        BuildStatus::Pending => style("PENDING").dim().to_string(),
        BuildStatus::Running => style("RUNNING").yellow().to_string(),
        BuildStatus::Completed => style("COMPLETED").green().to_string(),
        BuildStatus::Aborted => style("ABORTED").red().to_string(),
    }
}

/// Format a build summary for display
pub fn format_build_summary(summary: &BuildSummary) -> String {
    let status_icon = match summary.status {
        BuildStatus::Completed => CHECK,
        BuildStatus::Aborted => CROSS,
        BuildStatus::Running => SPINNER,
        _ => INFO,
    };

    format!(
        "{} {} - {} ({}) - {} ({}/{}) - {}",
        status_icon,
        style(&summary.build_id.to_string()[..8]).dim(),
        style(&summary.recipe_name).bold(),
        style(&summary.base_image).dim(),
        format_status(summary.status),
        summary.completed_steps,
        summary.total_steps,
        style(format!("{:.0}%", summary.progress * 100.0)).cyan()
    )
}

/// Format a build event for display
pub fn format_build_event(event: &BuildEvent) -> String {
    match event {
        BuildEvent::BuildStarted {
            build_id,
            pipeline_name,
        } => format!(
            "{} Building {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&build_id.to_string()[..8]).dim()
        ),
        BuildEvent::StepStarted { step_id } => {
            format!("{} {}", SPINNER, style(step_id).cyan())
        }
        BuildEvent::StepCompleted { step_id, detail } => {
            format!(
                "{} {} {}",
                CHECK,
                style(step_id).green(),
                style(detail).dim()
            )
        }
        BuildEvent::StepSkipped { step_id, reason } => {
            format!(
                "{} {} skipped ({})",
                INFO,
                style(step_id).dim(),
                style(reason).dim()
            )
        }
        BuildEvent::StepFailed { step_id, error } => {
            format!("{} {}: {}", CROSS, style(step_id).red(), style(error).dim())
        }
        BuildEvent::BuildFinished { build_id, status } => {
            let status_str = match status {
                BuildStatus::Completed => format!("{} completed", style("successfully").green()),
                BuildStatus::Aborted => style("aborted").red().to_string(),
                _ => format!("{:?}", status),
            };
            format!(
                "{} Build ({}) {}",
                INFO,
                style(&build_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}
