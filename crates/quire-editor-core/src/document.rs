//! Document tree as seen by the bridge.
//!
//! The edit engine owns the authoritative tree; these types are the shape it
//! exposes. Element properties and text marks are open JSON maps so hosts can
//! carry whatever schema they like (`type`, `url`, `bold`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::identity::{KeySlot, Keyed};
use crate::types::{DocRange, Path, Point};

/// A node in the document: an element with children, or a text leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

/// Element node. `props` holds everything except `children`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub children: Vec<Node>,
    #[serde(flatten)]
    pub props: Map<String, Value>,
    #[serde(skip)]
    slot: KeySlot,
}

/// Text leaf. `marks` holds formatting flags such as `bold`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(flatten)]
    pub marks: Map<String, Value>,
    #[serde(skip)]
    slot: KeySlot,
}

/// The root of the tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
    slot: KeySlot,
}

/// Schema queries the bridge asks of the edit engine.
pub trait Capabilities {
    /// Void elements render opaque content plus a hidden spacer.
    fn is_void(&self, element: &Element) -> bool;
    /// Inline elements flow within text instead of forming blocks.
    fn is_inline(&self, element: &Element) -> bool;
}

/// Capabilities keyed off the element's `type` property.
#[derive(Clone, Debug, Default)]
pub struct TypeSchema {
    pub voids: Vec<SmolStr>,
    pub inlines: Vec<SmolStr>,
}

impl TypeSchema {
    pub fn new(
        voids: impl IntoIterator<Item = &'static str>,
        inlines: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self {
            voids: voids.into_iter().map(SmolStr::new_static).collect(),
            inlines: inlines.into_iter().map(SmolStr::new_static).collect(),
        }
    }
}

impl Capabilities for TypeSchema {
    fn is_void(&self, element: &Element) -> bool {
        element
            .kind()
            .is_some_and(|kind| self.voids.iter().any(|v| v == kind))
    }

    fn is_inline(&self, element: &Element) -> bool {
        element
            .kind()
            .is_some_and(|kind| self.inlines.iter().any(|v| v == kind))
    }
}

impl<C: Capabilities + ?Sized> Capabilities for &C {
    fn is_void(&self, element: &Element) -> bool {
        (**self).is_void(element)
    }

    fn is_inline(&self, element: &Element) -> bool {
        (**self).is_inline(element)
    }
}

impl Element {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Element with a `type` property.
    pub fn typed(kind: &str, children: Vec<Node>) -> Self {
        Self::new(children).with_prop("type", kind)
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    /// The `type` property, if present.
    pub fn kind(&self) -> Option<&str> {
        self.props.get("type").and_then(Value::as_str)
    }

    /// True if every child is text or an inline element.
    pub fn has_inlines(&self, caps: &dyn Capabilities) -> bool {
        self.children.iter().all(|child| match child {
            Node::Text(_) => true,
            Node::Element(el) => caps.is_inline(el),
        })
    }

    /// Concatenated text of all descendants.
    pub fn string(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_string(&mut out);
        }
        out
    }

    /// First text descendant and its path relative to this element.
    pub fn first_text(&self) -> Option<(Vec<usize>, &Text)> {
        for (i, child) in self.children.iter().enumerate() {
            match child {
                Node::Text(t) => return Some((vec![i], t)),
                Node::Element(el) => {
                    if let Some((mut rel, t)) = el.first_text() {
                        rel.insert(0, i);
                        return Some((rel, t));
                    }
                }
            }
        }
        None
    }
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_mark(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.marks.insert(key.to_string(), value.into());
        self
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn element(kind: &str, children: Vec<Node>) -> Self {
        Node::Element(Element::typed(kind, children))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Text(_) => &[],
        }
    }

    pub fn string(&self) -> String {
        let mut out = String::new();
        self.push_string(&mut out);
        out
    }

    fn push_string(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Element(el) => {
                for child in &el.children {
                    child.push_string(out);
                }
            }
        }
    }
}

/// Borrowed view of any node, the root included.
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    Document(&'a Document),
    Element(&'a Element),
    Text(&'a Text),
}

impl<'a> NodeRef<'a> {
    pub fn children(&self) -> &'a [Node] {
        match *self {
            NodeRef::Document(doc) => &doc.children,
            NodeRef::Element(el) => &el.children,
            NodeRef::Text(_) => &[],
        }
    }

    pub fn as_element(&self) -> Option<&'a Element> {
        match *self {
            NodeRef::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&'a Text> {
        match *self {
            NodeRef::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn string(&self) -> String {
        match *self {
            NodeRef::Document(doc) => doc.children.iter().map(Node::string).collect(),
            NodeRef::Element(el) => el.string(),
            NodeRef::Text(t) => t.text.clone(),
        }
    }

    /// Whether this node flows inline. The root never does.
    pub fn is_inline(&self, caps: &dyn Capabilities) -> bool {
        match *self {
            NodeRef::Element(el) => caps.is_inline(el),
            NodeRef::Document(_) => false,
            NodeRef::Text(_) => true,
        }
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Element(el) => NodeRef::Element(el),
            Node::Text(t) => NodeRef::Text(t),
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            slot: KeySlot::default(),
        }
    }

    /// Node at `path`, or `None` if any index is out of range.
    pub fn node(&self, path: &Path) -> Option<NodeRef<'_>> {
        let mut current = NodeRef::Document(self);
        for &index in path.iter() {
            current = current.children().get(index)?.into();
        }
        Some(current)
    }

    /// Every text node below `path`, in document order.
    pub fn texts_under(&self, path: &Path) -> Vec<(Path, &Text)> {
        let mut out = Vec::new();
        if let Some(node) = self.node(path) {
            collect_texts(node, path.clone(), &mut out);
        }
        out
    }

    pub fn texts(&self) -> Vec<(Path, &Text)> {
        self.texts_under(&Path::root())
    }

    pub fn string(&self, path: &Path) -> String {
        self.node(path).map(|n| n.string()).unwrap_or_default()
    }

    /// Start of the first text below `path`.
    pub fn start(&self, path: &Path) -> Option<Point> {
        let texts = self.texts_under(path);
        let (first, _) = texts.first()?;
        Some(Point::new(first.clone(), 0))
    }

    /// End of the last text below `path`.
    pub fn end(&self, path: &Path) -> Option<Point> {
        let texts = self.texts_under(path);
        let (last, text) = texts.last()?;
        Some(Point::new(last.clone(), text.len()))
    }

    /// Range spanning the whole subtree at `path`.
    pub fn range_of(&self, path: &Path) -> Option<DocRange> {
        Some(DocRange::new(self.start(path)?, self.end(path)?))
    }

    /// Closest void element at or above `path`.
    pub fn void_ancestor(&self, path: &Path, caps: &dyn Capabilities) -> Option<Path> {
        (1..=path.len()).rev().map(|depth| path.prefix(depth)).find(|p| {
            matches!(self.node(p), Some(NodeRef::Element(el)) if caps.is_void(el))
        })
    }

    /// End of the last text preceding the subtree at `path`.
    pub fn point_before(&self, path: &Path) -> Option<Point> {
        self.texts()
            .into_iter()
            .filter(|(p, _)| p < path && !path.contains(p))
            .last()
            .map(|(p, t)| Point::new(p, t.len()))
    }

    /// Start of the first text following the subtree at `path`.
    pub fn point_after(&self, path: &Path) -> Option<Point> {
        self.texts()
            .into_iter()
            .find(|(p, _)| p > path && !path.contains(p))
            .map(|(p, _)| Point::new(p, 0))
    }
}

fn collect_texts<'a>(node: NodeRef<'a>, path: Path, out: &mut Vec<(Path, &'a Text)>) {
    match node {
        NodeRef::Text(t) => out.push((path, t)),
        _ => {
            for (i, child) in node.children().iter().enumerate() {
                collect_texts(child.into(), path.child(i), out);
            }
        }
    }
}

impl Keyed for Document {
    fn key_slot(&self) -> &KeySlot {
        &self.slot
    }
}

impl Keyed for Element {
    fn key_slot(&self) -> &KeySlot {
        &self.slot
    }
}

impl Keyed for Text {
    fn key_slot(&self) -> &KeySlot {
        &self.slot
    }
}

impl Keyed for Node {
    fn key_slot(&self) -> &KeySlot {
        match self {
            Node::Element(el) => &el.slot,
            Node::Text(t) => &t.slot,
        }
    }
}

impl Keyed for NodeRef<'_> {
    fn key_slot(&self) -> &KeySlot {
        match self {
            NodeRef::Document(doc) => &doc.slot,
            NodeRef::Element(el) => &el.slot,
            NodeRef::Text(t) => &t.slot,
        }
    }
}
