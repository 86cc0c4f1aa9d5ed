//! `gantry validate` - structural checks on catalog documents, without
//! needing a trigger resource.

use crate::cli::ValidateArgs;
use crate::schema::TemplateDocument;
use crate::ui;
use anyhow::{bail, Result};
use pipeline::validate_definition;

pub fn run(args: &ValidateArgs) -> Result<()> {
    let mut failures = 0usize;

    for path in &args.files {
        let outcome = TemplateDocument::load(path).and_then(|doc| {
            validate_definition(&doc.pipeline_or_default()).map_err(Into::into)
        });
        match outcome {
            Ok(()) => ui::success(&path.display().to_string()),
            Err(err) => {
                failures += 1;
                ui::error(&format!("{}: {err:#}", path.display()));
            }
        }
    }

    if failures > 0 {
        bail!(
            "{failures} of {} document(s) failed validation",
            args.files.len()
        );
    }
    Ok(())
}
