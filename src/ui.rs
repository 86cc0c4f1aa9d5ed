use colored::Colorize;
use pipeline::{ExecutionPlan, PatchOperation, PipelineResult, PlannedStep, StepTarget};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.len()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{}/{}]", num, total).blue().bold(), msg);
}

// ============================================================================
// Plan rendering
// ============================================================================

/// One-line description of what a step acts on
pub fn describe_target(step: &PlannedStep) -> String {
    match &step.target {
        StepTarget::Trigger { resource_id, .. } => {
            format!("self ({resource_id})")
        }
        StepTarget::Dependent {
            resource_type,
            template_name,
        } => format!("{resource_type} '{template_name}'"),
    }
}

/// One-line description of a resolved patch operation
pub fn describe_operation(operation: &PatchOperation) -> String {
    match operation {
        PatchOperation::Set { .. } => "set".to_string(),
        PatchOperation::Array { substitution, .. } => match substitution {
            pipeline::ArraySubstitution::Replace { match_field } => {
                format!("replace element keyed by '{match_field}'")
            }
            pipeline::ArraySubstitution::Remove { match_field } => {
                format!("remove element keyed by '{match_field}'")
            }
        },
    }
}

/// Render an execution plan for operator review
pub fn render_plan(plan: &ExecutionPlan) {
    header(&format!(
        "Plan: {} of '{}'",
        plan.action, plan.trigger_id
    ));

    let total = plan.steps.len();
    for (index, planned) in plan.steps.iter().enumerate() {
        step(
            index + 1,
            total,
            &format!("{} → {}", planned.action.bold(), describe_target(planned)),
        );
        dim(&format!("id: {}", planned.step_id));
        for patch in &planned.patches {
            kv(&patch.property, &describe_operation(&patch.operation));
        }
    }
}

/// Render the outcome of a run
pub fn render_result(result: &PipelineResult) {
    println!();
    if result.is_success() {
        success(&format!(
            "Pipeline completed: {} step(s) applied",
            result.completed_steps.len()
        ));
    } else {
        error(&format!(
            "Pipeline halted at step {} ('{}')",
            result.failed_step_index.map_or(0, |i| i + 1),
            result.failed_step.as_deref().unwrap_or("?")
        ));
        if let Some(cause) = &result.cause {
            dim(cause);
        }
        if !result.completed_steps.is_empty() {
            dim(&format!(
                "already applied (not rolled back): {}",
                result.completed_steps.join(", ")
            ));
        }
    }
}
