//! `gantry apply` - plan a lifecycle event, confirm, then execute it
//! against the local state snapshot.

use crate::cli::ApplyArgs;
use crate::schema::{self, TemplateDocument};
use crate::state::{SnapshotDispatcher, StateSnapshot};
use crate::{config, ui, Context};
use anyhow::{bail, Result};
use dialoguer::Confirm;
use pipeline::{execute, Error, LifecycleAction, PlannedStep, StepObserver};

/// Renders step progress as the executor advances
struct CliObserver {
    total: usize,
}

impl StepObserver for CliObserver {
    fn on_step_start(&mut self, index: usize, step: &PlannedStep) {
        ui::step(
            index + 1,
            self.total,
            &format!("{} → {}", step.action, ui::describe_target(step)),
        );
    }

    fn on_step_complete(&mut self, _index: usize, step: &PlannedStep) {
        log::info!("step '{}' completed", step.step_id);
    }

    fn on_step_failed(&mut self, _index: usize, step: &PlannedStep, error: &Error) {
        log::error!("step '{}' failed: {error}", step.step_id);
    }
}

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let template = TemplateDocument::load(&args.template)?;
    let trigger = schema::load_trigger(&args.trigger)?;
    let action: LifecycleAction = args.action.into();

    let execution_plan = pipeline::plan(action, &template.pipeline_or_default(), &trigger)?;

    if !ctx.quiet {
        ui::render_plan(&execution_plan);
        println!();
    }

    if args.dry_run {
        ui::info("Dry run - nothing dispatched");
        return Ok(());
    }

    if !args.yes
        && !Confirm::new()
            .with_prompt(format!("Apply {} step(s)?", execution_plan.steps.len()))
            .default(false)
            .interact()?
    {
        ui::warn("Aborted");
        return Ok(());
    }

    let state_path = config::state_path(args.state.clone())?;
    log::debug!("state snapshot: {}", state_path.display());
    let dispatcher = SnapshotDispatcher::new(StateSnapshot::load_or_default(&state_path)?);

    let mut observer = CliObserver {
        total: execution_plan.steps.len(),
    };
    let result = execute(&execution_plan, &dispatcher, &mut observer);

    // applied steps are never rolled back - persist whatever happened
    dispatcher.into_snapshot().save(&state_path)?;

    ui::render_result(&result);
    if !result.is_success() {
        bail!("pipeline failed; retry the same action once the cause is resolved");
    }
    Ok(())
}
