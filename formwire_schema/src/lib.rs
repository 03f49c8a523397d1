// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Formwire Schema: structural transforms over declarative validation schemas.
//!
//! ## Overview
//!
//! Schemas are JSON objects in the familiar shape: `properties` maps property names to
//! child schemas, `items` holds either one schema for every array element or a list of
//! schemas applied by position, and every other keyword is an opaque rule for the external
//! validator. This crate never interprets rules. It only moves schemas between paths and
//! tells which paths carry rules.
//!
//! - [`build_schema`] lifts a field's leaf schema to the field's path.
//! - [`merge_schema`] assembles lifted field schemas into one form schema.
//! - [`props_to_observe`] walks a schema and lists the paths whose values affect validity,
//!   so that a dependent computation can watch exactly those.
//! - [`schema_at`] looks up the schema that applies to one data path.
//!
//! ## Lifting
//!
//! ```
//! use formwire_path::Path;
//! use formwire_schema::build_schema;
//! use serde_json::json;
//!
//! let path: Path = "/foo/bar".parse().unwrap();
//! assert_eq!(
//!     build_schema(&path, &json!({"type": "number"})).unwrap(),
//!     json!({"properties": {"foo": {"properties": {"bar": {"type": "number"}}}}})
//! );
//!
//! let path: Path = "/2/3".parse().unwrap();
//! assert_eq!(
//!     build_schema(&path, &json!({"type": "number"})).unwrap(),
//!     json!({"items": {"items": {"type": "number"}}})
//! );
//! ```
//!
//! ## Observation
//!
//! A node is *meaningful* when it has at least one keyword that is neither structural
//! (`properties`, `items`) nor metadata (see [`METADATA_KEYWORDS`]). Traversal is
//! depth-first, emits each meaningful node once before its children, and visits keywords
//! in the order they are declared in the node. A single `items` schema contributes a `*`
//! segment, positional `items` contribute indices. The excluded subtree is skipped
//! entirely, which lets a field avoid observing itself.
//!
//! ```
//! use formwire_path::Path;
//! use formwire_schema::props_to_observe;
//! use serde_json::json;
//!
//! let schema = json!({"properties": {
//!     "foo": {"default": ""},
//!     "bar": {"presence": true, "properties": {"a": {"type": "string"}}},
//!     "car": {"presence": true},
//! }});
//! let root = Path::root();
//! let show = |paths: Vec<Path>| paths.iter().map(ToString::to_string).collect::<Vec<_>>();
//!
//! let bar: Path = "/bar".parse().unwrap();
//! assert_eq!(show(props_to_observe(&schema, &root, Some(&bar))), ["/car"]);
//! let foo: Path = "/foo".parse().unwrap();
//! assert_eq!(
//!     show(props_to_observe(&schema, &root, Some(&foo))),
//!     ["/bar", "/bar/a", "/car"]
//! );
//! ```
//!
//! Object key order is preserved (`serde_json` is built with `preserve_order`), so results
//! can be used directly as watch lists without sorting.

mod lift;
mod navigate;
mod observe;

pub use lift::{build_schema, merge_schema};
pub use navigate::schema_at;
pub use observe::{METADATA_KEYWORDS, has_rules, props_to_observe};

/// Structural keyword holding per-property child schemas.
pub const PROPERTIES: &str = "properties";

/// Structural keyword holding array element schemas.
pub const ITEMS: &str = "items";

/// Errors raised by schema transforms.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The path still has `..` levels and cannot be placed in a schema tree.
    #[error("cannot place a schema at unresolved path `{0}`")]
    UnresolvedPath(String),
}
