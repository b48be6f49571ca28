//! JSON diffs for audit details
//!
//! Compares before/after snapshots of a record and lists the changed fields,
//! recursing into nested objects. Numbers are compared with a tolerance so
//! float round-trips do not register as changes.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

const FLOAT_EPSILON: f64 = 1e-9;

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < FLOAT_EPSILON,
            _ => a == b,
        },
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, va)| b.get(k).is_some_and(|vb| values_equal(va, vb)))
        }
        _ => a == b,
    }
}

/// A changed field, dotted path for nested objects
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: Value,
    pub to: Value,
}

/// Fields never written to audit details for a resource type.
///
/// Bookkeeping columns change on every write and would drown the real change.
fn excluded_fields(resource_type: &str) -> &'static [&'static str] {
    match resource_type {
        "appointment" | "patient" | "queue_entry" => {
            &["id", "tenant_id", "updated_at", "created_at"]
        }
        "invoice" => &["id", "tenant_id", "updated_at", "created_at", "items"],
        _ => &["id", "tenant_id"],
    }
}

fn diff_recursive(from: &Value, to: &Value, path: &str, changes: &mut Vec<FieldChange>) {
    match (from, to) {
        (Value::Object(from_obj), Value::Object(to_obj)) => {
            // Sorted keys keep the change list stable
            let keys: BTreeSet<&String> = from_obj.keys().chain(to_obj.keys()).collect();
            for key in keys {
                let field_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let f = from_obj.get(key).unwrap_or(&Value::Null);
                let t = to_obj.get(key).unwrap_or(&Value::Null);
                diff_recursive(f, t, &field_path, changes);
            }
        }
        (f, t) => {
            if !values_equal(f, t) {
                changes.push(FieldChange {
                    field: path.to_string(),
                    from: f.clone(),
                    to: t.clone(),
                });
            }
        }
    }
}

fn filtered_value<T: Serialize>(value: &T, resource_type: &str) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(mut json) => {
            if let Value::Object(obj) = &mut json {
                for field in excluded_fields(resource_type) {
                    obj.remove(*field);
                }
            }
            Some(json)
        }
        Err(e) => {
            tracing::error!(resource_type, "Failed to serialize audit snapshot: {e}");
            None
        }
    }
}

/// Snapshot of a created or deleted record, excluded fields removed
pub fn create_snapshot<T: Serialize>(value: &T, resource_type: &str) -> Value {
    filtered_value(value, resource_type).unwrap_or_else(|| json!({"error": "serialization_failed"}))
}

/// Changed fields between two versions of a record
pub fn diff_fields<T: Serialize>(from: &T, to: &T, resource_type: &str) -> Vec<FieldChange> {
    let (Some(from_json), Some(to_json)) = (
        filtered_value(from, resource_type),
        filtered_value(to, resource_type),
    ) else {
        return Vec::new();
    };
    let mut changes = Vec::new();
    diff_recursive(&from_json, &to_json, "", &mut changes);
    changes
}

/// Audit details for an update: `{"changes": [...]}`
pub fn create_diff<T: Serialize>(from: &T, to: &T, resource_type: &str) -> Value {
    let changes = diff_fields(from, to, resource_type);
    if changes.is_empty() {
        json!({"changes": [], "note": "no_changes_detected"})
    } else {
        json!({"changes": changes})
    }
}

/// Audit details for a transition: full before/after snapshots plus the diff
pub fn create_transition<T: Serialize>(from: &T, to: &T, resource_type: &str) -> Value {
    json!({
        "before": create_snapshot(from, resource_type),
        "after": create_snapshot(to, resource_type),
        "changes": diff_fields(from, to, resource_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Visit {
        id: i64,
        tenant_id: String,
        status: String,
        start_time: String,
        fee: f64,
        updated_at: i64,
    }

    fn visit(status: &str, start: &str, fee: f64, updated_at: i64) -> Visit {
        Visit {
            id: 7,
            tenant_id: "clinic-a".into(),
            status: status.into(),
            start_time: start.into(),
            fee,
            updated_at,
        }
    }

    #[test]
    fn test_snapshot_drops_bookkeeping_fields() {
        let snapshot = create_snapshot(&visit("scheduled", "09:00", 10.0, 1), "appointment");
        let obj = snapshot.as_object().unwrap();
        assert!(obj.contains_key("status"));
        assert!(!obj.contains_key("id"));
        assert!(!obj.contains_key("tenant_id"));
        assert!(!obj.contains_key("updated_at"));
    }

    #[test]
    fn test_diff_lists_changed_fields_only() {
        let before = visit("scheduled", "09:00", 10.0, 1);
        let after = visit("confirmed", "09:00", 10.0, 2);
        let changes = diff_fields(&before, &after, "appointment");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "status");
        assert_eq!(changes[0].from, json!("scheduled"));
        assert_eq!(changes[0].to, json!("confirmed"));
    }

    #[test]
    fn test_diff_tolerates_float_noise() {
        let before = visit("scheduled", "09:00", 0.1 + 0.2, 1);
        let after = visit("scheduled", "09:00", 0.3, 1);
        let diff = create_diff(&before, &after, "appointment");
        assert!(diff["changes"].as_array().unwrap().is_empty());
        assert_eq!(diff["note"], "no_changes_detected");
    }

    #[test]
    fn test_nested_objects_use_dotted_paths() {
        let before = json!({"contact": {"phone": "1", "email": "a@b.c"}});
        let after = json!({"contact": {"phone": "2", "email": "a@b.c"}});
        let changes = diff_fields(&before, &after, "patient");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "contact.phone");
    }

    #[test]
    fn test_transition_carries_before_and_after() {
        let before = visit("in_progress", "09:00", 10.0, 1);
        let after = visit("completed", "09:00", 10.0, 2);
        let details = create_transition(&before, &after, "appointment");
        assert_eq!(details["before"]["status"], "in_progress");
        assert_eq!(details["after"]["status"], "completed");
        assert_eq!(details["changes"].as_array().unwrap().len(), 1);
    }
}
