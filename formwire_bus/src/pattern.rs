// Copyright 2025 the Formwire Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Topic patterns and matching.
//!
//! A pattern is a path template. Its segments align one-to-one with topic segments,
//! except:
//!
//! - `*` matches exactly one segment (key or index);
//! - a trailing `**` matches zero or more remaining segments.
//!
//! ```
//! use formwire_bus::Pattern;
//! use formwire_path::Path;
//!
//! let one: Pattern = "/a/*".parse().unwrap();
//! let many: Pattern = "/a/**".parse().unwrap();
//! let topic = |s: &str| s.parse::<Path>().unwrap();
//!
//! assert!(one.matches(&topic("/a/b")));
//! assert!(one.matches(&topic("/a/0")));
//! assert!(!one.matches(&topic("/a/b/c")));
//! assert!(!one.matches(&topic("/a")));
//!
//! assert!(many.matches(&topic("/a")));
//! assert!(many.matches(&topic("/a/b/c")));
//! ```

use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use formwire_path::{Path, PathError, Segment};
use smallvec::SmallVec;

/// Errors raised while building a [`Pattern`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// The pattern text is not a valid path.
    #[error(transparent)]
    Path(#[from] PathError),
    /// Patterns address absolute topics; `..` has nothing to pop.
    #[error("pattern `{0}` is not absolute")]
    NotAbsolute(String),
    /// `**` may only appear as the final segment.
    #[error("`**` must be the last segment of `{0}`")]
    RestNotLast(String),
}

/// One segment of a [`Pattern`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// Matches exactly this segment.
    Exact(Segment),
    /// `*`: matches any single segment.
    Any,
    /// `**`: matches any number of trailing segments, including none.
    Rest,
}

/// A subscription topic pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Pattern {
    segments: SmallVec<[PatternSegment; 4]>,
}

impl Pattern {
    /// Parse a textual pattern such as `/users/*/name` or `/settings/**`.
    ///
    /// Relative text without leading `..` (for example `a/b`) is taken as rooted.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let path = Path::parse(text)?;
        if path.up() > 0 {
            return Err(PatternError::NotAbsolute(text.to_string()));
        }
        Self::from_path(&path)
    }

    /// Reinterpret a path as a pattern: the keys `*` and `**` become wildcards.
    pub fn from_path(path: &Path) -> Result<Self, PatternError> {
        let count = path.len();
        let mut segments = SmallVec::with_capacity(count);
        for (i, s) in path.segments().iter().enumerate() {
            let seg = match s.as_key() {
                Some("*") => PatternSegment::Any,
                Some("**") if i + 1 == count => PatternSegment::Rest,
                Some("**") => return Err(PatternError::RestNotLast(path.to_string())),
                _ => PatternSegment::Exact(s.clone()),
            };
            segments.push(seg);
        }
        Ok(Self { segments })
    }

    /// A pattern matching exactly one topic.
    pub fn exact(path: &Path) -> Self {
        Self {
            segments: path
                .segments()
                .iter()
                .cloned()
                .map(PatternSegment::Exact)
                .collect(),
        }
    }

    /// The pattern segments.
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Whether the pattern contains no wildcard.
    pub fn is_exact(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, PatternSegment::Exact(_)))
    }

    /// The single topic this pattern matches, when it has no wildcard.
    pub fn as_path(&self) -> Option<Path> {
        let mut segs = SmallVec::<[Segment; 4]>::new();
        for s in &self.segments {
            match s {
                PatternSegment::Exact(seg) => segs.push(seg.clone()),
                PatternSegment::Any | PatternSegment::Rest => return None,
            }
        }
        Some(Path::from_segments(segs))
    }

    /// Whether `topic` matches this pattern.
    ///
    /// Only the segments of `topic` are compared; topics are expected to be absolute.
    pub fn matches(&self, topic: &Path) -> bool {
        let mut rest = topic.segments();
        for s in &self.segments {
            match s {
                PatternSegment::Rest => return true,
                PatternSegment::Any => match rest.split_first() {
                    Some((_, tail)) => rest = tail,
                    None => return false,
                },
                PatternSegment::Exact(want) => match rest.split_first() {
                    Some((got, tail)) if got == want => rest = tail,
                    _ => return false,
                },
            }
        }
        rest.is_empty()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for s in &self.segments {
            match s {
                PatternSegment::Exact(seg) => write!(f, "/{seg}")?,
                PatternSegment::Any => f.write_str("/*")?,
                PatternSegment::Rest => f.write_str("/**")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&Path> for Pattern {
    /// Same as [`Pattern::exact`]: wildcard-looking keys are matched literally.
    fn from(path: &Path) -> Self {
        Self::exact(path)
    }
}
