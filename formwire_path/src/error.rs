// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;

/// Errors raised while parsing or resolving a [`Path`](crate::Path).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The text cannot be split into segments, for example `/a//b`.
    #[error("malformed path `{path}`: {reason}")]
    Malformed {
        /// The offending input.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A `..` segment tried to ascend above the root.
    #[error("cannot resolve `{path}` against `{base}`: ascends past the root")]
    Resolution {
        /// The path being resolved.
        path: String,
        /// The base it was resolved against.
        base: String,
    },
}
