//! Match-field keyed array patching.
//!
//! Array-valued properties shared between pipelines (e.g. a firewall's
//! rule collections) are patched by a caller-declared match field, never
//! by position or deep equality. The applier only ever inspects the
//! match field of each element and never reorders untouched elements,
//! so concurrent owners of the same collection cannot clobber each
//! other's entries.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an array-typed property patch substitutes its element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArraySubstitution {
    /// Upsert: replace the element sharing the match key in place,
    /// append when absent. Exactly one element per match key remains.
    Replace { match_field: String },
    /// Delete the first element sharing the match key; an absent key is
    /// a no-op, not an error.
    Remove { match_field: String },
}

impl ArraySubstitution {
    /// Build from the document form (`arraySubstitutionAction` +
    /// `arrayMatchField`). Unknown actions return `None`.
    pub fn from_document(action: &str, match_field: &str) -> Option<Self> {
        let match_field = match_field.to_string();
        match action {
            "replace" => Some(Self::Replace { match_field }),
            "remove" => Some(Self::Remove { match_field }),
            _ => None,
        }
    }

    pub fn match_field(&self) -> &str {
        match self {
            Self::Replace { match_field } | Self::Remove { match_field } => match_field,
        }
    }
}

/// Compute the new value of an array property under a substitution.
///
/// `resolved` is the fully-resolved element to insert/replace, or, for
/// `remove`, a value carrying at least the match field. A resolved value
/// without the match field is a [`Error::PatchConflict`] - the match key
/// cannot be computed. Applying the same patch twice yields the same
/// array.
pub fn apply(
    property: &str,
    current: &[Value],
    substitution: &ArraySubstitution,
    resolved: &Value,
) -> Result<Vec<Value>> {
    let field = substitution.match_field();
    let key = resolved.get(field).ok_or_else(|| Error::PatchConflict {
        property: property.to_string(),
        message: format!("resolved value carries no match field '{field}'"),
    })?;

    let position = current
        .iter()
        .position(|element| element.get(field) == Some(key));

    let mut next = current.to_vec();
    match substitution {
        ArraySubstitution::Replace { .. } => match position {
            Some(index) => next[index] = resolved.clone(),
            None => next.push(resolved.clone()),
        },
        ArraySubstitution::Remove { .. } => {
            if let Some(index) = position {
                next.remove(index);
            }
        }
    }
    Ok(next)
}
