//! `gantry status` - inspect the resources recorded in the state
//! snapshot.

use crate::cli::StatusArgs;
use crate::state::StateSnapshot;
use crate::{config, ui};
use anyhow::Result;
use chrono::DateTime;

pub fn run(args: &StatusArgs) -> Result<()> {
    let path = config::state_path(args.state.clone())?;
    let snapshot = StateSnapshot::load_or_default(&path)?;

    ui::header("Deployed resources");
    ui::dim(&format!("snapshot: {}", path.display()));

    if snapshot.resources.is_empty() {
        ui::info("No resources recorded");
        return Ok(());
    }

    for stored in &snapshot.resources {
        ui::section(&format!(
            "{} ({})",
            stored.resource.id, stored.resource.resource_type
        ));
        let version = if stored.resource.template_version.is_empty() {
            "unversioned".to_string()
        } else {
            stored.resource.template_version.clone()
        };
        ui::kv(
            "template",
            &format!("{}@{}", stored.resource.template_name, version),
        );
        ui::kv("properties", &stored.resource.properties.len().to_string());
        if stored.updated_when > 0.0 {
            ui::kv("updated", &format_epoch(stored.updated_when));
        }
    }
    Ok(())
}

fn format_epoch(epoch: f64) -> String {
    DateTime::from_timestamp(epoch as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| epoch.to_string())
}
