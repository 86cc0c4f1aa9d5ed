use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default location of the resource state snapshot
pub fn default_state_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home
        .join(".local")
        .join("state")
        .join("gantry")
        .join("resources.json"))
}

/// Resolve the snapshot path from an optional CLI override
pub fn state_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path),
        None => default_state_path(),
    }
}
