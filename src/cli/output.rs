//! CLI output formatting

use crate::core::ExecutionStatus;
use crate::execution::ExecutionEvent;
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
///
/// Step failures return `None`; the caller reports them on stderr.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting pipeline {} ({} steps, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted {
            index,
            total,
            step_name,
        } => format!(
            "{} [{}/{}] Running step: {}",
            SPINNER,
            index + 1,
            total,
            style(step_name).cyan()
        ),
        ExecutionEvent::StepCompleted { step_name, .. } => format!(
            "{} Step {} completed successfully.",
            CHECK,
            style(step_name).green()
        ),
        ExecutionEvent::StepFailed { .. } => return None,
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
            completed_steps,
            total_steps,
        } => format!(
            "{} Pipeline ({}) {} - {}/{} steps",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status),
            completed_steps,
            total_steps
        ),
    };
    Some(line)
}
