// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use formwire_path::{Path, Segment};
use serde_json::{Map, Value};

use crate::{ITEMS, PROPERTIES, SchemaError};

/// Place `leaf` at `path` inside an otherwise empty schema tree.
///
/// Each key segment wraps the accumulated schema as `{"properties": {key: ..}}`; each index
/// segment, and the wildcard key `*`, wraps it as `{"items": ..}`. The root path returns
/// `leaf` unchanged.
///
/// A relative path without `..` levels is placed as if rooted.
pub fn build_schema(path: &Path, leaf: &Value) -> Result<Value, SchemaError> {
    if path.up() > 0 {
        return Err(SchemaError::UnresolvedPath(path.to_string()));
    }
    let mut acc = leaf.clone();
    for segment in path.segments().iter().rev() {
        let mut node = Map::new();
        match segment {
            Segment::Key(k) if k != "*" => {
                let mut props = Map::new();
                props.insert(k.clone(), acc);
                node.insert(PROPERTIES.to_string(), Value::Object(props));
            }
            Segment::Key(_) | Segment::Index(_) => {
                node.insert(ITEMS.to_string(), acc);
            }
        }
        acc = Value::Object(node);
    }
    Ok(acc)
}

/// Deep-merge `source` into `target`.
///
/// `properties` are merged per property and a single-schema `items` is merged recursively.
/// Any other keyword in `source`, including positional `items`, replaces the one in
/// `target`. A non-object `target` is replaced by `source`.
///
/// ```
/// use formwire_path::Path;
/// use formwire_schema::{build_schema, merge_schema};
/// use serde_json::json;
///
/// let mut form = json!({});
/// for (path, leaf) in [("/name", json!({"presence": true})), ("/age", json!({"type": "number"}))] {
///     let lifted = build_schema(&path.parse::<Path>().unwrap(), &leaf).unwrap();
///     merge_schema(&mut form, &lifted);
/// }
/// assert_eq!(
///     form,
///     json!({"properties": {"name": {"presence": true}, "age": {"type": "number"}}})
/// );
/// ```
pub fn merge_schema(target: &mut Value, source: &Value) {
    if !(target.is_object() && source.is_object()) {
        *target = source.clone();
        return;
    }
    let (Value::Object(into), Value::Object(from)) = (target, source) else {
        return;
    };
    for (key, value) in from {
        match (key.as_str(), into.get_mut(key)) {
            (PROPERTIES, Some(Value::Object(existing))) => {
                if let Value::Object(children) = value {
                    for (name, child) in children {
                        match existing.get_mut(name) {
                            Some(slot) => merge_schema(slot, child),
                            None => {
                                existing.insert(name.clone(), child.clone());
                            }
                        }
                    }
                } else {
                    into.insert(key.clone(), value.clone());
                }
            }
            (ITEMS, Some(existing)) if existing.is_object() && value.is_object() => {
                merge_schema(existing, value);
            }
            _ => {
                into.insert(key.clone(), value.clone());
            }
        }
    }
}
