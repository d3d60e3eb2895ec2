//! Shallow merge of a stored blob over the default profile.

use quest_core::{default_subjects, Achievement, Profile, Task};
use serde_json::{Map, Value};
use tracing::warn;

/// Decode a stored blob. Never fails: unusable input yields defaults and
/// unusable fields keep their default value.
pub fn decode_profile(raw: &str) -> Profile {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => merge_over_defaults(fields),
        Ok(other) => {
            warn!(kind = kind_of(&other), "saved profile is not an object, using defaults");
            Profile::default()
        }
        Err(e) => {
            warn!(error = %e, "saved profile is not valid json, using defaults");
            Profile::default()
        }
    }
}

fn merge_over_defaults(stored: Map<String, Value>) -> Profile {
    let defaults = Profile::default();
    let mut merged = match serde_json::to_value(&defaults) {
        Ok(Value::Object(map)) => map,
        _ => return defaults,
    };

    for (key, value) in stored {
        let value = match key.as_str() {
            "activeTasks" => repair_tasks(value),
            "subjects" => match repair_subjects(value) {
                Some(v) => v,
                None => continue,
            },
            "achievements" => match repair_achievements(value) {
                Some(v) => v,
                None => continue,
            },
            _ => value,
        };
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<Profile>(Value::Object(candidate.clone())).is_ok() {
            merged = candidate;
        } else {
            warn!(field = %key, "discarding malformed saved field");
        }
    }

    let mut profile = match serde_json::from_value::<Profile>(Value::Object(merged)) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "merged profile failed to decode, using defaults");
            return defaults;
        }
    };
    for fix in profile.repair_catalog() {
        warn!(%fix, "repaired saved profile");
    }
    profile
}

/// A non-list task field becomes an empty list; malformed entries are dropped.
fn repair_tasks(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(keep_decodable::<Task>(items, "task")),
        _ => {
            warn!("saved task list is not a list, clearing it");
            Value::Array(Vec::new())
        }
    }
}

/// `None` keeps the default catalog: a missing, non-list or empty subject list.
fn repair_subjects(value: Value) -> Option<Value> {
    let items = match value {
        Value::Array(items) => items,
        _ => return None,
    };
    let subjects: Vec<Value> = items.into_iter().filter(Value::is_string).collect();
    if subjects.is_empty() {
        warn!(default = ?default_subjects(), "saved subject list is empty, restoring defaults");
        return None;
    }
    Some(Value::Array(subjects))
}

fn repair_achievements(value: Value) -> Option<Value> {
    match value {
        Value::Array(items) => Some(Value::Array(keep_decodable::<Achievement>(
            items,
            "achievement",
        ))),
        _ => None,
    }
}

fn keep_decodable<T: serde::de::DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| {
            let ok = serde_json::from_value::<T>(item.clone()).is_ok();
            if !ok {
                warn!(entry = %item, "dropping malformed saved {what}");
            }
            ok
        })
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
