// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Path`] type: parsing, resolution, and derivation of child paths.

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use smallvec::SmallVec;

use crate::error::PathError;
use crate::segment::Segment;

/// A normalized, slash-delimited data path.
///
/// Absolute paths start at the root of the data tree. Relative paths carry a count of
/// leading `..` levels (`up`) and are resolved against a base with [`Path::resolve`].
///
/// ## Example
///
/// ```
/// use formwire_path::{Path, Segment};
///
/// let p: Path = "/todos/2/title".parse().unwrap();
/// assert!(p.is_absolute());
/// assert_eq!(
///     p.segments(),
///     &[Segment::key("todos"), Segment::Index(2), Segment::key("title")]
/// );
/// assert_eq!(p.parent().unwrap().to_string(), "/todos/2");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    absolute: bool,
    up: usize,
    segments: SmallVec<[Segment; 4]>,
}

impl Path {
    /// The absolute root path, `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            up: 0,
            segments: SmallVec::new(),
        }
    }

    /// The empty relative path, `.`. It resolves to its base.
    pub fn current() -> Self {
        Self {
            absolute: false,
            up: 0,
            segments: SmallVec::new(),
        }
    }

    /// Build an absolute path from segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        Self {
            absolute: true,
            up: 0,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a textual path.
    ///
    /// - `""`, `"."` are the empty relative path; `"/"` is the root.
    /// - A single trailing `/` is ignored.
    /// - Empty segments (`/a//b`) are rejected with [`PathError::Malformed`].
    /// - `.` segments are dropped; `..` pops the previous segment. An absolute path that
    ///   ascends above the root fails with [`PathError::Resolution`].
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let (absolute, body) = match text.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let body = body.strip_suffix('/').unwrap_or(body);
        let mut out = Self {
            absolute,
            up: 0,
            segments: SmallVec::new(),
        };
        if body.is_empty() {
            return Ok(out);
        }
        for raw in body.split('/') {
            match raw {
                "" => return Err(malformed(text, "empty segment")),
                "." => {}
                ".." => {
                    if out.segments.pop().is_none() {
                        if absolute {
                            return Err(PathError::Resolution {
                                path: text.to_string(),
                                base: "/".to_string(),
                            });
                        }
                        out.up += 1;
                    }
                }
                _ => {
                    let segment = Segment::from_text(raw)
                        .ok_or_else(|| malformed(text, "index does not fit in usize"))?;
                    out.segments.push(segment);
                }
            }
        }
        Ok(out)
    }

    /// Resolve this path against an absolute `base`.
    ///
    /// An absolute path is returned unchanged. A relative path pops one segment off the base
    /// per leading `..` and then appends its own segments. Popping past the root of an
    /// absolute base fails with [`PathError::Resolution`]; against a relative base the
    /// remaining levels carry over.
    pub fn resolve(&self, base: &Self) -> Result<Self, PathError> {
        if self.absolute {
            return Ok(self.clone());
        }
        let mut segments = base.segments.clone();
        let mut up = base.up;
        for _ in 0..self.up {
            if segments.pop().is_none() {
                if base.absolute {
                    return Err(PathError::Resolution {
                        path: self.to_string(),
                        base: base.to_string(),
                    });
                }
                up += 1;
            }
        }
        segments.extend(self.segments.iter().cloned());
        Ok(Self {
            absolute: base.absolute,
            up,
            segments,
        })
    }

    /// Whether the path starts at the root.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Whether this is the absolute root `/`.
    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// Number of leading `..` levels of a relative path. Always zero for absolute paths.
    pub fn up(&self) -> usize {
        self.up
    }

    /// The normalized segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether there are no segments (the root, or `.`).
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The path with its final segment removed, or `None` when there is none to remove.
    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        parent.segments.pop()?;
        Some(parent)
    }

    /// Append one segment in place.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.segments.push(segment.into());
    }

    /// A copy of this path with one trailing segment.
    pub fn join(&self, segment: impl Into<Segment>) -> Self {
        let mut out = self.clone();
        out.push(segment);
        out
    }

    /// A copy of this path with a trailing property name.
    ///
    /// Unlike parsing, the name is taken verbatim: `"3"` stays a key. Such a path prints
    /// as text that parses back to a different path, see [`Path::child`].
    pub fn child_key(&self, name: &str) -> Self {
        self.join(Segment::Key(name.to_string()))
    }

    /// A copy of this path with a trailing segment named `name`, classified as
    /// [`Path::parse`] would: all-digit names become indices.
    ///
    /// ```
    /// use formwire_path::{Path, Segment};
    ///
    /// let root = Path::root();
    /// assert_eq!(root.child("0"), "/0".parse().unwrap());
    /// assert_eq!(root.child("zip").last(), Some(&Segment::key("zip")));
    /// ```
    pub fn child(&self, name: &str) -> Self {
        self.join(Segment::from_text(name).unwrap_or_else(|| Segment::key(name)))
    }

    /// A copy of this path with a trailing array index.
    pub fn child_index(&self, index: usize) -> Self {
        self.join(Segment::Index(index))
    }

    /// Whether `prefix` addresses this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.absolute == prefix.absolute
            && self.up == prefix.up
            && self.segments.starts_with(&prefix.segments)
    }
}

/// Resolve textual `path` against textual `base`.
///
/// Both inputs are parsed with [`Path::parse`] first.
///
/// ```
/// assert_eq!(formwire_path::resolve("..", "/a/b").unwrap().to_string(), "/a");
/// assert_eq!(formwire_path::resolve("c", "/a/b").unwrap().to_string(), "/a/b/c");
/// ```
pub fn resolve(path: &str, base: &str) -> Result<Path, PathError> {
    Path::parse(path)?.resolve(&Path::parse(base)?)
}

fn malformed(text: &str, reason: &'static str) -> PathError {
    PathError::Malformed {
        path: String::from(text),
        reason,
    }
}

/// Canonical text: `/` separated, `/` for the root and `.` for the empty relative path.
///
/// Text produced for a parsed path parses back to the same path. Keys added verbatim with
/// [`Path::child_key`] or [`Segment::Key`] round-trip only when they are not all digits,
/// not `.` or `..`, not empty and contain no `/`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            if self.segments.is_empty() {
                return f.write_str("/");
            }
            for s in &self.segments {
                write!(f, "/{s}")?;
            }
            return Ok(());
        }
        if self.up == 0 && self.segments.is_empty() {
            return f.write_str(".");
        }
        let mut first = true;
        for _ in 0..self.up {
            if !first {
                f.write_str("/")?;
            }
            f.write_str("..")?;
            first = false;
        }
        for s in &self.segments {
            if !first {
                f.write_str("/")?;
            }
            write!(f, "{s}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = PathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn p(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[test]
    fn root_spellings() {
        assert!(p("/").is_root());
        assert!(p("//").is_root());
        assert_eq!(p("/").to_string(), "/");
        assert_eq!(p(""), Path::current());
        assert_eq!(p("."), Path::current());
    }

    #[test]
    fn equivalent_forms_normalize() {
        assert_eq!(p("/a/0"), p("/a/0/"));
        assert_eq!(p("/a/0"), p("/a/./0"));
        assert_eq!(p("/a/0"), p("/a/b/../0"));
        assert_eq!(p("a/0").resolve(&Path::root()).unwrap(), p("/a/0"));
    }

    #[test]
    fn typed_segments() {
        let path = p("/list/10/name");
        let segs: Vec<_> = path.segments().to_vec();
        assert_eq!(
            segs,
            vec![Segment::key("list"), Segment::Index(10), Segment::key("name")]
        );
    }

    #[test]
    fn doubled_delimiter_is_malformed() {
        assert!(matches!(
            Path::parse("/a//b"),
            Err(PathError::Malformed { .. })
        ));
        assert!(matches!(Path::parse("a//"), Err(PathError::Malformed { .. })));
    }

    #[test]
    fn absolute_parse_cannot_ascend_past_root() {
        assert!(matches!(
            Path::parse("/a/../.."),
            Err(PathError::Resolution { .. })
        ));
    }

    #[test]
    fn resolve_parent() {
        assert_eq!(resolve("..", "/a/b").unwrap(), p("/a"));
        assert_eq!(resolve("../..", "/a/b").unwrap(), Path::root());
        assert!(matches!(
            resolve("..", "/"),
            Err(PathError::Resolution { .. })
        ));
    }

    #[test]
    fn resolve_absolute_ignores_base() {
        assert_eq!(resolve("/x/y", "/a/b").unwrap(), p("/x/y"));
    }

    #[test]
    fn resolve_relative_against_relative_base_carries_levels() {
        let out = p("../../c").resolve(&p("a")).unwrap();
        assert!(!out.is_absolute());
        assert_eq!(out.up(), 1);
        assert_eq!(out.to_string(), "../c");
    }

    #[test]
    fn relative_display() {
        assert_eq!(p("../a/1").to_string(), "../a/1");
        assert_eq!(p("../..").to_string(), "../..");
        assert_eq!(p("a/b").to_string(), "a/b");
    }

    #[test]
    fn child_derivation() {
        let base = p("/items");
        assert_eq!(base.child_index(2).to_string(), "/items/2");
        assert_eq!(base.child_key("*").to_string(), "/items/*");
        // Keys added programmatically stay keys even when they look numeric.
        assert_eq!(base.child_key("2").last(), Some(&Segment::key("2")));
        assert_eq!(base.child_index(2).parent(), Some(base));
        assert_eq!(Path::root().parent(), None);
    }

    #[test]
    fn child_classifies_like_parse() {
        let base = p("/items");
        assert_eq!(base.child("2"), p("/items/2"));
        assert_eq!(base.child("name"), p("/items/name"));
        assert_eq!(base.child("*").last(), Some(&Segment::key("*")));
        let text = base.child("7").to_string();
        assert_eq!(p(&text), base.child("7"));
    }

    #[test]
    fn verbatim_keys_do_not_round_trip_through_text() {
        let numeric = p("/a").child_key("2");
        assert_eq!(numeric.to_string(), "/a/2");
        assert_ne!(p(&numeric.to_string()), numeric);
        let dots = p("/a").child_key("..");
        assert_eq!(p(&dots.to_string()), Path::root());
    }

    #[test]
    fn prefix_checks() {
        assert!(p("/a/b/c").starts_with(&p("/a/b")));
        assert!(p("/a/b").starts_with(&p("/a/b")));
        assert!(p("/a").starts_with(&Path::root()));
        assert!(!p("/a/bc").starts_with(&p("/a/b")));
        assert!(!p("a/b").starts_with(&p("/a")));
    }

    #[test]
    fn from_segments_builds_absolute() {
        let path = Path::from_segments([Segment::key("a"), Segment::Index(1)]);
        assert_eq!(path, p("/a/1"));
    }
}
