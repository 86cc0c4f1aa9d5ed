//! `gantry plan` - resolve a pipeline into an execution plan without
//! dispatching anything. The rendered (or JSON) plan is the audit
//! artifact: it shows exactly which resources a lifecycle event would
//! touch and how.

use crate::cli::PlanArgs;
use crate::schema::{self, TemplateDocument};
use crate::{ui, Context};
use anyhow::Result;
use pipeline::LifecycleAction;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let template = TemplateDocument::load(&args.template)?;
    let trigger = schema::load_trigger(&args.trigger)?;
    let action: LifecycleAction = args.action.into();

    log::debug!(
        "planning {action} of '{}' from template '{}'",
        trigger.id,
        template.name
    );
    let execution_plan = pipeline::plan(action, &template.pipeline_or_default(), &trigger)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&execution_plan)?);
        return Ok(());
    }

    ui::render_plan(&execution_plan);
    if !ctx.quiet {
        println!();
        ui::info(&format!(
            "{} step(s); nothing dispatched",
            execution_plan.steps.len()
        ));
    }
    Ok(())
}
