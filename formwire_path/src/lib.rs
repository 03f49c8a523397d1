// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Formwire Path: addressing values inside a nested data tree.
//!
//! ## Overview
//!
//! A [`Path`] is an ordered sequence of [`Segment`]s, each either a property name
//! ([`Segment::Key`]) or an array index ([`Segment::Index`]). Paths are written with `/`
//! as the delimiter; a leading `/` marks an absolute path.
//!
//! - Decimal segments become indices: `/items/0/name` is `[Key("items"), Index(0), Key("name")]`.
//! - Equivalent spellings normalize to the same value: `/a/0`, `/a/0/`, and `/a/./0` are equal.
//! - `..` pops one level. In an absolute path this is applied while parsing; in a relative
//!   path, leading `..` segments are kept until the path is resolved against a base.
//!
//! ## Scopes
//!
//! UI fields are usually declared with a path relative to the scope they live in.
//! [`Path::resolve`] turns such a relative path into an absolute one:
//!
//! ```
//! use formwire_path::Path;
//!
//! let scope: Path = "/users/3".parse().unwrap();
//! let field: Path = "../2/name".parse().unwrap();
//! assert_eq!(field.resolve(&scope).unwrap().to_string(), "/users/2/name");
//!
//! // Absolute paths resolve to themselves regardless of the base.
//! let abs: Path = "/settings".parse().unwrap();
//! assert_eq!(abs.resolve(&scope).unwrap(), abs);
//!
//! // Ascending above the root is an error.
//! assert!(formwire_path::resolve("..", "/").is_err());
//! ```
//!
//! Resolution is deterministic: identical inputs always produce equal paths, so paths can
//! be used directly as map keys and event topics.
//!
//! ## Wildcards
//!
//! The keys `*` and `**` have no special meaning here. They are ordinary keys that the
//! event bus reinterprets as single-level and multi-level wildcards.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod error;
mod path;
mod segment;

pub use error::PathError;
pub use path::{Path, resolve};
pub use segment::Segment;
