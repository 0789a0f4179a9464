//! Abstract native surface.
//!
//! The bridge reads the rendered tree through [`NativeDom`] so the same
//! translation logic runs against the browser DOM and against the in-memory
//! arena used in tests.

mod memory;
mod normalize;

pub use memory::{MemNodeId, MemoryDom};
pub use normalize::normalize_point;

use std::fmt;

use crate::error::NativeError;

/// Attribute names written by the render pipeline and read back by the
/// translators.
pub mod attr {
    pub const NODE: &str = "data-quire-node";
    pub const EDITOR: &str = "data-quire-editor";
    pub const LEAF: &str = "data-quire-leaf";
    pub const STRING: &str = "data-quire-string";
    pub const ZERO_WIDTH: &str = "data-quire-zero-width";
    pub const LENGTH: &str = "data-quire-length";
    pub const VOID: &str = "data-quire-void";
    pub const INLINE: &str = "data-quire-inline";
    pub const SPACER: &str = "data-quire-spacer";
    pub const FRAGMENT: &str = "data-quire-fragment";
    pub const CONTENT_EDITABLE: &str = "contenteditable";
    pub const ID: &str = "id";
}

/// Placeholder character occupying empty text runs.
pub const ZERO_WIDTH_CHAR: char = '\u{FEFF}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Other,
}

/// Axis-aligned box in viewport coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// A native position. `offset` counts UTF-16 code units inside text nodes
/// and child indices inside elements.
#[derive(Clone, Debug, PartialEq)]
pub struct NativePoint<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> NativePoint<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// An immutable start/end range, as delivered by `beforeinput` target ranges.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeRange<N> {
    pub start: NativePoint<N>,
    pub end: NativePoint<N>,
}

impl<N: Clone + PartialEq> NativeRange<N> {
    pub fn new(start: NativePoint<N>, end: NativePoint<N>) -> Self {
        Self { start, end }
    }

    pub fn collapsed(point: NativePoint<N>) -> Self {
        Self {
            start: point.clone(),
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Snapshot of the live native selection. Endpoints are absent when the
/// selection holds no range.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeSelection<N> {
    pub anchor: Option<NativePoint<N>>,
    pub focus: Option<NativePoint<N>>,
}

impl<N: Clone + PartialEq> NativeSelection<N> {
    pub fn new(anchor: NativePoint<N>, focus: NativePoint<N>) -> Self {
        Self {
            anchor: Some(anchor),
            focus: Some(focus),
        }
    }

    pub fn empty() -> Self {
        Self {
            anchor: None,
            focus: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor.is_none() || self.focus.is_none()
    }

    /// Compares endpoints directly; some engines misreport their own
    /// collapsed flag inside shadow trees.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Read access to the rendered native tree.
pub trait NativeDom {
    type Node: Clone + PartialEq + fmt::Debug;

    /// The element carrying the editor root attributes.
    fn editor_root(&self) -> Self::Node;

    /// Node type. Probing a foreign node may be refused.
    fn kind(&self, node: &Self::Node) -> Result<NodeKind, NativeError>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn text_content(&self, node: &Self::Node) -> String;

    /// Element with the given `id` inside the editor root.
    fn find_by_id(&self, id: &str) -> Option<Self::Node>;

    fn bounding_rect(&self, node: &Self::Node) -> Option<Rect>;

    /// Caret position under a viewport coordinate, if the platform offers it.
    fn caret_from_point(&self, x: f64, y: f64) -> Option<NativePoint<Self::Node>>;

    fn is_element(&self, node: &Self::Node) -> bool {
        matches!(self.kind(node), Ok(NodeKind::Element))
    }

    fn is_text(&self, node: &Self::Node) -> bool {
        matches!(self.kind(node), Ok(NodeKind::Text))
    }

    fn is_comment(&self, node: &Self::Node) -> bool {
        matches!(self.kind(node), Ok(NodeKind::Comment))
    }

    fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// The node itself if it is an element, otherwise its parent element.
    fn element_of(&self, node: &Self::Node) -> Result<Option<Self::Node>, NativeError> {
        match self.kind(node)? {
            NodeKind::Element => Ok(Some(node.clone())),
            _ => Ok(self.parent(node).filter(|p| self.is_element(p))),
        }
    }

    /// Closest element, starting at `node`, that satisfies `pred`.
    fn closest(
        &self,
        node: &Self::Node,
        pred: impl Fn(&Self, &Self::Node) -> bool,
    ) -> Option<Self::Node>
    where
        Self: Sized,
    {
        let mut current = self.element_of(node).ok().flatten();
        while let Some(el) = current {
            if pred(self, &el) {
                return Some(el);
            }
            current = self.parent(&el).filter(|p| self.is_element(p));
        }
        None
    }

    /// Closest element carrying attribute `name`.
    fn closest_with(&self, node: &Self::Node, name: &str) -> Option<Self::Node>
    where
        Self: Sized,
    {
        self.closest(node, |dom, el| dom.has_attribute(el, name))
    }

    /// True if `node` is `ancestor` or lies below it.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if &n == ancestor {
                return true;
            }
            current = self.parent(&n);
        }
        false
    }

    /// All nodes below `node` in document order.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Self::Node> = self.children(node).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            stack.extend(self.children(&n).into_iter().rev());
            out.push(n);
        }
        out
    }

    /// First child that is not a comment.
    fn first_content_child(&self, node: &Self::Node) -> Option<Self::Node> {
        self.children(node).into_iter().find(|c| !self.is_comment(c))
    }

    /// Inherited editability: the nearest `contenteditable` attribute wins.
    fn is_content_editable(&self, node: &Self::Node) -> bool {
        let mut current = self.element_of(node).ok().flatten();
        while let Some(el) = current {
            match self.attribute(&el, attr::CONTENT_EDITABLE).as_deref() {
                Some("false") => return false,
                Some(_) => return true,
                None => current = self.parent(&el),
            }
        }
        false
    }
}

/// UTF-16 length of `s`.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// UTF-16 offset of the `chars`-th character, clamped to the string end.
pub fn char_to_utf16(s: &str, chars: usize) -> usize {
    s.chars().take(chars).map(char::len_utf16).sum()
}

/// Longest prefix of `s` that fits in `units` UTF-16 code units.
pub fn utf16_prefix(s: &str, units: usize) -> &str {
    let mut used = 0;
    for (byte, ch) in s.char_indices() {
        used += ch.len_utf16();
        if used > units {
            return &s[..byte];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_conversions() {
        let s = "a😀b";
        assert_eq!(utf16_len(s), 4);
        assert_eq!(char_to_utf16(s, 2), 3);
        assert_eq!(char_to_utf16(s, 10), 4);
        assert_eq!(utf16_prefix(s, 3), "a😀");
        assert_eq!(utf16_prefix(s, 2), "a");
        assert_eq!(utf16_prefix(s, 99), s);
    }
}
