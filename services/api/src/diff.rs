//! Field-level change tracking between two states of one entity
//!
//! Both sides are serialized to JSON objects and compared key by key, so the
//! comparison sees exactly what the store would persist. Identity and
//! timestamps are excluded: they change on every write and are not edits.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::Entity;

/// Fields never reported as changes
const IGNORED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Changed fields mapped to `(old, new)`
pub type Changes = BTreeMap<String, (Value, Value)>;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("{kind} cannot be compared: {message}")]
    NotComparable { kind: &'static str, message: String },
}

fn to_object<T: Entity>(value: &T) -> Result<Map<String, Value>, DiffError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DiffError::NotComparable {
            kind: T::KIND,
            message: format!("expected an object, found {}", other),
        }),
        Err(e) => Err(DiffError::NotComparable {
            kind: T::KIND,
            message: e.to_string(),
        }),
    }
}

/// Fields whose values differ between `before` and `after`
pub fn diff<T: Entity>(before: &T, after: &T) -> Result<Changes, DiffError> {
    let old = to_object(before)?;
    let mut new = to_object(after)?;
    let mut changes = Changes::new();

    for (field, old_value) in old {
        if IGNORED_FIELDS.contains(&field.as_str()) {
            new.remove(&field);
            continue;
        }
        let new_value = new.remove(&field).unwrap_or(Value::Null);
        if old_value != new_value {
            changes.insert(field, (old_value, new_value));
        }
    }
    for (field, new_value) in new {
        if !IGNORED_FIELDS.contains(&field.as_str()) && !new_value.is_null() {
            changes.insert(field, (Value::Null, new_value));
        }
    }

    Ok(changes)
}

/// Whether any field differs
pub fn has_changes<T: Entity>(before: &T, after: &T) -> Result<bool, DiffError> {
    Ok(!diff(before, after)?.is_empty())
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "none".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One markdown line per change, used as the body of audit events
pub fn describe_changes(changes: &Changes) -> String {
    changes
        .iter()
        .map(|(field, (old, new))| {
            format!(
                "- **{}** changed from '{}' to '{}'",
                field,
                render(old),
                render(new)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Item, Storage, StorageType};

    #[test]
    fn identical_values_have_no_changes() {
        let storage = Storage::new("Fridge", "s1", StorageType::Fridge, None);
        assert!(diff(&storage, &storage).unwrap().is_empty());
        assert!(!has_changes(&storage, &storage.clone()).unwrap());
    }

    #[test]
    fn timestamps_are_not_changes() {
        let storage = Storage::new("Fridge", "s1", StorageType::Fridge, None);
        let mut touched = storage.clone();
        touched.meta.updated_at = touched.meta.updated_at + chrono::Duration::seconds(5);
        assert!(!has_changes(&storage, &touched).unwrap());
    }

    #[test]
    fn reports_old_and_new_values() {
        let before = Storage::new("Fridge", "s1", StorageType::Fridge, None);
        let mut after = before.clone();
        after.name = "Freezer".to_string();
        after.kind = StorageType::Freezer;

        let changes = diff(&before, &after).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["name"], (Value::from("Fridge"), Value::from("Freezer")));
        assert_eq!(changes["type"], (Value::from("fridge"), Value::from("freezer")));
    }

    #[test]
    fn describes_changes_as_markdown_lines() {
        let before = Item {
            name: "Milk".to_string(),
            current_quantity: 2.0,
            ..Item::default()
        };
        let mut after = before.clone();
        after.current_quantity = 1.5;
        after.cost = Some(3.0);

        let text = describe_changes(&diff(&before, &after).unwrap());
        assert_eq!(
            text,
            "- **cost** changed from 'none' to '3.0'\n\
             - **current_quantity** changed from '2.0' to '1.5'"
        );
    }
}
