//! Document coordinates: paths, points and ranges.
//!
//! Offsets are character (Unicode scalar) offsets into a text node's string.
//! The native surface speaks UTF-16 code units; conversion happens in the
//! position translator and nowhere else.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Child-index route from the document root to a node.
///
/// The empty path addresses the root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Path of the child at `index` below this one.
    pub fn child(&self, index: usize) -> Path {
        let mut segments = self.0.clone();
        segments.push(index);
        Path(segments)
    }

    /// Parent path. The root is its own parent.
    pub fn parent(&self) -> Path {
        let mut segments = self.0.clone();
        segments.pop();
        Path(segments)
    }

    /// The first `depth` segments.
    pub fn prefix(&self, depth: usize) -> Path {
        Path(self.0[..depth.min(self.0.len())].to_vec())
    }

    /// Concatenate a relative path onto this one.
    pub fn join(&self, relative: &[usize]) -> Path {
        let mut segments = self.0.clone();
        segments.extend_from_slice(relative);
        Path(segments)
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// True if `other` is `self` or lies below it.
    pub fn contains(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn into_inner(self) -> Vec<usize> {
        self.0
    }
}

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(segments: Vec<usize>) -> Self {
        Path(segments)
    }
}

impl From<&[usize]> for Path {
    fn from(segments: &[usize]) -> Self {
        Path(segments.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(segments: [usize; N]) -> Self {
        Path(segments.to_vec())
    }
}

/// A location inside a text node: its path plus a character offset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Selection direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Which end of a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Start,
    End,
    Anchor,
    Focus,
}

/// A document range. The anchor is where the selection started, the focus
/// is where it ends up; they may be in any order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocRange {
    pub anchor: Point,
    pub focus: Point,
}

impl DocRange {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// A caret at `point`.
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    /// Focus precedes anchor in document order.
    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn direction(&self) -> Direction {
        if self.is_backward() {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    /// Ordered (start, end) bounds.
    pub fn edges(&self) -> (&Point, &Point) {
        if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        }
    }

    pub fn start(&self) -> &Point {
        self.edges().0
    }

    pub fn end(&self) -> &Point {
        self.edges().1
    }

    /// True if `point` lies within the inclusive bounds of the range.
    pub fn includes(&self, point: &Point) -> bool {
        let (start, end) = self.edges();
        start <= point && point <= end
    }

    /// Overlap of two ranges as a forward range, or `None` if disjoint.
    ///
    /// Touching ranges intersect in a collapsed range.
    pub fn intersection(&self, other: &DocRange) -> Option<DocRange> {
        let (s1, e1) = self.edges();
        let (s2, e2) = other.edges();
        let start = s1.max(s2);
        let end = e1.min(e2);
        if end < start {
            None
        } else {
            Some(DocRange::new(start.clone(), end.clone()))
        }
    }
}
