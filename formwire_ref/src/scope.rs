// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use formwire_path::{Path, PathError};

/// An absolute base path that nested components resolve their own paths against.
///
/// Scopes compose: a scope nested inside another resolves relative to it, and a field at
/// any depth ends up with exactly one absolute path.
///
/// ```
/// use formwire_ref::Scope;
///
/// let todos = Scope::root().nest("todos").unwrap();
/// let second = todos.nest("1").unwrap();
/// assert_eq!(second.resolve("title").unwrap().to_string(), "/todos/1/title");
/// assert_eq!(second.resolve("../0/title").unwrap().to_string(), "/todos/0/title");
/// assert_eq!(second.resolve("/settings").unwrap().to_string(), "/settings");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope {
    path: Path,
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    /// The scope of the whole form.
    pub fn root() -> Self {
        Self { path: Path::root() }
    }

    /// A scope at `path`, taken from the root when relative.
    pub fn new(path: &str) -> Result<Self, PathError> {
        Self::root().nest(path)
    }

    /// A child scope at `relative`, resolved against this one.
    pub fn nest(&self, relative: &str) -> Result<Self, PathError> {
        Ok(Self {
            path: self.resolve(relative)?,
        })
    }

    /// The absolute path of `relative` inside this scope.
    pub fn resolve(&self, relative: &str) -> Result<Path, PathError> {
        self.resolve_path(&Path::parse(relative)?)
    }

    /// Like [`Scope::resolve`], with an already parsed path.
    pub fn resolve_path(&self, relative: &Path) -> Result<Path, PathError> {
        relative.resolve(&self.path)
    }

    /// The absolute path of this scope.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<Path> for Scope {
    /// Relative paths are taken from the root.
    fn from(path: Path) -> Self {
        if path.is_absolute() {
            Self { path }
        } else {
            Self {
                path: Path::from_segments(path.segments().iter().cloned()),
            }
        }
    }
}
