// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use formwire_path::{Path, Segment};
use serde_json::Value;

use crate::{ITEMS, PROPERTIES};

/// The schema node that applies to the value at `path`, if the schema declares one.
///
/// Keys descend through `properties`. Indices descend through a single `items` schema or
/// pick the matching entry of positional `items`; on a node without `items` an index names
/// a property, as it does in the data. The wildcard key `*` only descends through a single
/// `items` schema.
///
/// ```
/// use formwire_path::Path;
/// use formwire_schema::schema_at;
/// use serde_json::json;
///
/// let schema = json!({"properties": {"todos": {"items": {"properties": {
///     "title": {"presence": true}
/// }}}}});
/// let path: Path = "/todos/4/title".parse().unwrap();
/// assert_eq!(schema_at(&schema, &path), Some(&json!({"presence": true})));
/// ```
pub fn schema_at<'a>(schema: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(schema, |node, segment| child(node, segment))
}

fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match segment {
        Segment::Key(k) if k != "*" => node.get(PROPERTIES)?.get(k.as_str()),
        Segment::Key(_) => node.get(ITEMS).filter(|items| items.is_object()),
        Segment::Index(i) => match node.get(ITEMS) {
            Some(Value::Array(list)) => list.get(*i),
            Some(single) => Some(single),
            None => node.get(PROPERTIES)?.get(i.to_string()),
        },
    }
}
