//! Leaf splitting and the leaf renderer seam.
//!
//! A text node is cut into leaves wherever the set of covering decorations
//! changes. Leaves partition the text exactly and no two neighbours carry the
//! same decoration set.

use std::ops::Range;

use serde_json::{Map, Value};
use smol_str::SmolStr;

use super::decorate::{Decoration, PLACEHOLDER};
use crate::document::Text;
use crate::dom::attr;
use crate::types::{Path, Point};
use crate::vnode::{VElement, VNode};

/// A run of a text node under a uniform decoration set.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf<'a> {
    pub text: &'a str,
    /// Character range within the text node.
    pub range: Range<usize>,
    /// Indices into the decoration list passed to [`split_leaves`].
    pub decorations: Vec<usize>,
    /// Merged properties of the covering decorations.
    pub props: Map<String, Value>,
}

impl Leaf<'_> {
    pub fn placeholder(&self) -> Option<&str> {
        self.props.get(PLACEHOLDER).and_then(Value::as_str)
    }
}

/// Split `text` (at `path`) by the decorations that touch it.
///
/// Collapsed decorations only apply to an empty text, which always yields a
/// single empty leaf.
pub fn split_leaves<'a>(text: &'a str, path: &Path, decorations: &[Decoration]) -> Vec<Leaf<'a>> {
    let len = text.chars().count();
    let spans: Vec<(usize, usize)> = decorations
        .iter()
        .map(|d| local_span(d, path, len))
        .collect();

    if len == 0 {
        let start = Point::new(path.clone(), 0);
        let touching: Vec<usize> = decorations
            .iter()
            .enumerate()
            .filter(|(_, d)| d.range.includes(&start))
            .map(|(i, _)| i)
            .collect();
        let props = merged_props(decorations, &touching);
        return vec![Leaf {
            text,
            range: 0..0,
            decorations: touching,
            props,
        }];
    }

    let mut bounds = vec![0, len];
    for &(s, e) in &spans {
        bounds.push(s);
        bounds.push(e);
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut runs: Vec<(Range<usize>, Vec<usize>)> = Vec::new();
    for pair in bounds.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let covering: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|&(_, &(s, e))| s < e && s <= a && b <= e)
            .map(|(i, _)| i)
            .collect();
        match runs.last_mut() {
            Some((range, set)) if *set == covering => range.end = b,
            _ => runs.push((a..b, covering)),
        }
    }

    runs.into_iter()
        .map(|(range, set)| Leaf {
            text: char_slice(text, range.clone()),
            props: merged_props(decorations, &set),
            range,
            decorations: set,
        })
        .collect()
}

/// Decoration extent in this text's character offsets.
fn local_span(decoration: &Decoration, path: &Path, len: usize) -> (usize, usize) {
    let (start, end) = decoration.range.edges();
    let s = if start.path == *path {
        start.offset.min(len)
    } else if start.path < *path {
        0
    } else {
        len
    };
    let e = if end.path == *path {
        end.offset.min(len)
    } else if end.path > *path {
        len
    } else {
        0
    };
    (s, e.max(s))
}

fn merged_props(decorations: &[Decoration], set: &[usize]) -> Map<String, Value> {
    let mut props = Map::new();
    for &i in set {
        for (k, v) in &decorations[i].props {
            props.insert(k.clone(), v.clone());
        }
    }
    props
}

fn char_slice(text: &str, range: Range<usize>) -> &str {
    let byte = |n: usize| {
        text.char_indices()
            .nth(n)
            .map(|(b, _)| b)
            .unwrap_or(text.len())
    };
    &text[byte(range.start)..byte(range.end)]
}

/// Attributes a leaf renderer must put on its outermost element.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafAttributes {
    pub id: SmolStr,
}

impl LeafAttributes {
    pub fn apply(&self, el: VElement) -> VElement {
        el.attr(attr::ID, self.id.as_str()).attr(attr::LEAF, "true")
    }
}

pub struct RenderLeafProps<'a> {
    pub leaf: &'a Leaf<'a>,
    pub text: &'a Text,
    pub attributes: LeafAttributes,
    /// Placeholder (if any) followed by the string run.
    pub children: Vec<VNode>,
}

/// Wraps a leaf's string run; marks and decoration props are exposed so the
/// host can add formatting elements around the children.
pub trait LeafRenderer {
    fn render_leaf(&self, props: RenderLeafProps<'_>) -> VNode;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLeafRenderer;

impl LeafRenderer for DefaultLeafRenderer {
    fn render_leaf(&self, props: RenderLeafProps<'_>) -> VNode {
        props
            .attributes
            .apply(VElement::new("span"))
            .children(props.children)
            .into()
    }
}

impl LeafRenderer for Box<dyn LeafRenderer> {
    fn render_leaf(&self, props: RenderLeafProps<'_>) -> VNode {
        (**self).render_leaf(props)
    }
}

/// Closure-backed leaf renderer.
pub struct LeafFn<F>(pub F);

impl<F> LeafRenderer for LeafFn<F>
where
    F: Fn(RenderLeafProps<'_>) -> VNode,
{
    fn render_leaf(&self, props: RenderLeafProps<'_>) -> VNode {
        (self.0)(props)
    }
}
