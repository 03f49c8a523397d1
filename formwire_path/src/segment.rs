// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::{String, ToString};
use core::fmt;

/// One step of a [`Path`](crate::Path).
///
/// Segments order indices before keys, and otherwise by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Array position.
    Index(usize),
    /// Property name.
    Key(String),
}

impl Segment {
    /// Build a key segment.
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }

    /// Classify a raw textual segment: all-digit text is an index, anything else a key.
    ///
    /// Returns `None` for all-digit text that does not fit in `usize`.
    pub(crate) fn from_text(text: &str) -> Option<Self> {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            text.parse().ok().map(Self::Index)
        } else {
            Some(Self::Key(text.to_string()))
        }
    }

    /// The key name, if this is a key segment.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Index(_) => None,
        }
    }

    /// The index, if this is an index segment.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}
