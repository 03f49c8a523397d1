// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use formwire_path::Path;
use serde_json::Value;

use crate::{ITEMS, PROPERTIES};

/// Keywords that annotate a schema node without constraining its value.
pub const METADATA_KEYWORDS: &[&str] = &[
    "default",
    "filter",
    "error",
    "errors",
    "warning",
    "warnings",
    "removeAdditional",
];

/// Whether `node` carries at least one rule keyword.
///
/// Structural keywords and [`METADATA_KEYWORDS`] do not count.
pub fn has_rules(node: &Value) -> bool {
    node.as_object().is_some_and(|map| map.keys().any(|k| is_rule(k)))
}

fn is_rule(keyword: &str) -> bool {
    keyword != PROPERTIES && keyword != ITEMS && !METADATA_KEYWORDS.contains(&keyword)
}

/// List the paths in `schema` whose values affect validity.
///
/// `schema` is treated as the schema of the value at `from`. The subtree at `exclude`, if
/// any, is skipped. See the [crate docs](crate) for the traversal order.
pub fn props_to_observe(schema: &Value, from: &Path, exclude: Option<&Path>) -> Vec<Path> {
    let mut out = Vec::new();
    walk(schema, from, exclude, &mut out);
    tracing::trace!(from = %from, count = out.len(), "derived observation paths");
    out
}

fn walk(node: &Value, path: &Path, exclude: Option<&Path>, out: &mut Vec<Path>) {
    if exclude == Some(path) {
        return;
    }
    let Value::Object(map) = node else {
        return;
    };
    if map.keys().any(|k| is_rule(k)) {
        out.push(path.clone());
    }
    for (keyword, value) in map {
        match keyword.as_str() {
            PROPERTIES => walk_properties(value, path, exclude, out),
            ITEMS => match value {
                Value::Array(list) => {
                    for (i, child) in list.iter().enumerate() {
                        walk(child, &path.child_index(i), exclude, out);
                    }
                }
                single => walk(single, &path.child_key("*"), exclude, out),
            },
            _ => {}
        }
    }
}

fn walk_properties(value: &Value, path: &Path, exclude: Option<&Path>, out: &mut Vec<Path>) {
    let Some(children) = value.as_object() else {
        return;
    };
    for (name, child) in children {
        walk(child, &path.child(name), exclude, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(text: &str) -> Path {
        text.parse().unwrap()
    }

    fn show(paths: &[Path]) -> Vec<String> {
        paths.iter().map(ToString::to_string).collect()
    }

    fn sample() -> Value {
        json!({"properties": {
            "foo": {"default": ""},
            "bar": {"presence": true, "properties": {"a": {"type": "string"}}},
            "car": {"presence": true},
        }})
    }

    #[test]
    fn excluding_a_subtree() {
        let schema = sample();
        let root = Path::root();
        assert_eq!(
            show(&props_to_observe(&schema, &root, Some(&p("/bar")))),
            ["/car"]
        );
        assert_eq!(
            show(&props_to_observe(&schema, &root, Some(&p("/car")))),
            ["/bar", "/bar/a"]
        );
        assert_eq!(
            show(&props_to_observe(&schema, &root, Some(&p("/foo")))),
            ["/bar", "/bar/a", "/car"]
        );
    }

    #[test]
    fn without_exclusion_everything_meaningful_is_listed() {
        assert_eq!(
            show(&props_to_observe(&sample(), &Path::root(), None)),
            ["/bar", "/bar/a", "/car"]
        );
    }

    #[test]
    fn excluding_a_leaf_inside_a_meaningful_parent() {
        assert_eq!(
            show(&props_to_observe(&sample(), &Path::root(), Some(&p("/bar/a")))),
            ["/bar", "/car"]
        );
    }

    #[test]
    fn order_follows_declaration_not_alphabet() {
        let schema = json!({"properties": {
            "zeta": {"presence": true},
            "alpha": {"presence": true},
        }});
        assert_eq!(
            show(&props_to_observe(&schema, &Path::root(), None)),
            ["/zeta", "/alpha"]
        );
    }

    #[test]
    fn items_before_or_after_properties_by_declaration() {
        let items_first = json!({"items": {"min": 1}, "properties": {"len": {"min": 0}}});
        let props_first = json!({"properties": {"len": {"min": 0}}, "items": {"min": 1}});
        let from = p("/list");
        assert_eq!(
            show(&props_to_observe(&items_first, &from, None)),
            ["/list/*", "/list/len"]
        );
        assert_eq!(
            show(&props_to_observe(&props_first, &from, None)),
            ["/list/len", "/list/*"]
        );
    }

    #[test]
    fn positional_items_use_indices() {
        let schema = json!({"properties": {"pair": {"items": [
            {"type": "string"},
            {"default": 0},
            {"type": "number"},
        ]}}});
        assert_eq!(
            show(&props_to_observe(&schema, &Path::root(), None)),
            ["/pair/0", "/pair/2"]
        );
    }

    #[test]
    fn root_node_with_rules_is_listed() {
        let schema = json!({"custom": "check", "properties": {"a": {"presence": true}}});
        assert_eq!(
            show(&props_to_observe(&schema, &Path::root(), None)),
            ["/", "/a"]
        );
        assert!(props_to_observe(&schema, &Path::root(), Some(&Path::root())).is_empty());
    }

    #[test]
    fn metadata_only_nodes_are_not_meaningful() {
        assert!(!has_rules(&json!({"default": 1, "errors": {}, "removeAdditional": true})));
        assert!(!has_rules(&json!({"properties": {}, "items": {}})));
        assert!(has_rules(&json!({"format": "email"})));
        assert!(!has_rules(&json!(true)));
    }

    #[test]
    fn numeric_property_names_match_parsed_paths() {
        let schema = json!({"properties": {
            "0": {"presence": true},
            "b": {"presence": true},
        }});
        let observed = props_to_observe(&schema, &Path::root(), Some(&p("/0")));
        assert_eq!(show(&observed), ["/b"]);
        let all = props_to_observe(&schema, &Path::root(), None);
        assert_eq!(all[0], p("/0"));
    }

    #[test]
    fn non_object_schemas_contribute_nothing() {
        let schema = json!({"properties": {"a": true, "b": null}});
        assert!(props_to_observe(&schema, &Path::root(), None).is_empty());
    }
}
