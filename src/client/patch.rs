//! JSON Patch construction for metadata writes.
//!
//! The metadata write endpoint takes a JSON Patch (RFC 6902) against one
//! target of the item document. Patches are computed from the item's current
//! document so only changed fields are sent.

use serde_json::{json, Map, Value};

use super::types::Item;

/// Select the part of the item document a target refers to.
///
/// `metadata` maps to the item's metadata mapping, `files/<name>` to the file
/// entry with that name, anything else to the top-level key of the same name.
pub fn target_document(item: &Item, target: &str) -> Value {
    if target == "metadata" {
        return Value::Object(item.metadata.clone());
    }

    if let Some(name) = target.strip_prefix("files/") {
        return item
            .raw
            .get("files")
            .and_then(Value::as_array)
            .and_then(|files| {
                files
                    .iter()
                    .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
            })
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
    }

    item.raw
        .get(target)
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

fn escape_pointer_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Merge an appended value onto the existing one.
///
/// Strings are joined with a single space; lists are extended.
fn appended_value(existing: &Value, new: &Value) -> Value {
    match (existing, new) {
        (Value::String(old), Value::String(add)) => Value::String(format!("{} {}", old, add)),
        (Value::Array(old), Value::Array(add)) => {
            Value::Array(old.iter().chain(add.iter()).cloned().collect())
        }
        (Value::Array(old), add) => {
            let mut merged = old.clone();
            merged.push(add.clone());
            Value::Array(merged)
        }
        (_, add) => add.clone(),
    }
}

/// Build the patch operations that turn `current` into `current` + `fields`.
pub fn build_patch(current: &Value, fields: &Map<String, Value>, append: bool) -> Value {
    let mut ops = Vec::new();

    for (key, value) in fields {
        let path = format!("/{}", escape_pointer_token(key));
        match current.get(key) {
            None => ops.push(json!({"op": "add", "path": path, "value": value})),
            Some(existing) => {
                let new_value = if append {
                    appended_value(existing, value)
                } else {
                    value.clone()
                };
                if &new_value != existing {
                    ops.push(json!({"op": "replace", "path": path, "value": new_value}));
                }
            }
        }
    }

    Value::Array(ops)
}
