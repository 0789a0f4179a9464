//! Arena-backed native tree.
//!
//! Mirrors the subset of DOM behaviour the bridge relies on. Render output
//! can be materialized into it with [`MemoryDom::from_vnode`], which lets the
//! full render -> translate -> reconcile loop run without a browser.

use std::collections::{HashMap, HashSet};

use smol_str::SmolStr;

use super::{NativeDom, NativePoint, NodeKind, Rect, attr};
use crate::error::NativeError;
use crate::vnode::{VElement, VNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemNodeId(usize);

#[derive(Clone, Debug)]
enum MemData {
    Element {
        tag: SmolStr,
        attrs: Vec<(SmolStr, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Clone, Debug)]
struct MemNode {
    parent: Option<MemNodeId>,
    children: Vec<MemNodeId>,
    data: MemData,
}

#[derive(Clone, Debug)]
pub struct MemoryDom {
    nodes: Vec<MemNode>,
    restricted: HashSet<MemNodeId>,
    rects: HashMap<MemNodeId, Rect>,
    carets: Vec<((f64, f64), NativePoint<MemNodeId>)>,
}

impl MemoryDom {
    /// New tree whose root element is the editor root.
    pub fn new(tag: &str, attrs: &[(&str, &str)]) -> Self {
        let root = MemNode {
            parent: None,
            children: Vec::new(),
            data: MemData::Element {
                tag: SmolStr::new(tag),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (SmolStr::new(k), v.to_string()))
                    .collect(),
            },
        };
        Self {
            nodes: vec![root],
            restricted: HashSet::new(),
            rects: HashMap::new(),
            carets: Vec::new(),
        }
    }

    /// Materialize a rendered element tree. `root` becomes the editor root.
    pub fn from_vnode(root: &VElement) -> Self {
        let attrs: Vec<(&str, &str)> = root
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut dom = Self::new(&root.tag, &attrs);
        let id = dom.root();
        for child in &root.children {
            dom.append_vnode(id, child);
        }
        dom
    }

    pub fn root(&self) -> MemNodeId {
        MemNodeId(0)
    }

    fn push(&mut self, parent: MemNodeId, data: MemData) -> MemNodeId {
        let id = MemNodeId(self.nodes.len());
        self.nodes.push(MemNode {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element(
        &mut self,
        parent: MemNodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> MemNodeId {
        self.push(
            parent,
            MemData::Element {
                tag: SmolStr::new(tag),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (SmolStr::new(k), v.to_string()))
                    .collect(),
            },
        )
    }

    pub fn append_text(&mut self, parent: MemNodeId, text: &str) -> MemNodeId {
        self.push(parent, MemData::Text(text.to_string()))
    }

    pub fn append_comment(&mut self, parent: MemNodeId, text: &str) -> MemNodeId {
        self.push(parent, MemData::Comment(text.to_string()))
    }

    pub fn append_vnode(&mut self, parent: MemNodeId, node: &VNode) -> MemNodeId {
        match node {
            VNode::Text(text) => self.append_text(parent, text),
            VNode::Element(el) => {
                let attrs: Vec<(&str, &str)> = el
                    .attrs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                let id = self.append_element(parent, &el.tag, &attrs);
                for child in &el.children {
                    self.append_vnode(id, child);
                }
                id
            }
        }
    }

    /// Replace a text node's content, as an IME or spellchecker would.
    pub fn set_text(&mut self, node: MemNodeId, text: &str) {
        if let MemData::Text(t) = &mut self.nodes[node.0].data {
            *t = text.to_string();
        }
    }

    /// Make probing `node` fail with a permission error.
    pub fn restrict(&mut self, node: MemNodeId) {
        self.restricted.insert(node);
    }

    pub fn set_rect(&mut self, node: MemNodeId, rect: Rect) {
        self.rects.insert(node, rect);
    }

    /// Register the caret position reported for a viewport coordinate.
    pub fn set_caret(&mut self, x: f64, y: f64, point: NativePoint<MemNodeId>) {
        self.carets.push(((x, y), point));
    }

    pub fn tag(&self, node: MemNodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            MemData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// First text node whose content is exactly `content`.
    pub fn find_text(&self, content: &str) -> Option<MemNodeId> {
        self.nodes
            .iter()
            .position(|n| matches!(&n.data, MemData::Text(t) if t == content))
            .map(MemNodeId)
    }

    /// First element with `name` set to `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<MemNodeId> {
        (0..self.nodes.len())
            .map(MemNodeId)
            .find(|&id| self.attribute(&id, name).as_deref() == Some(value))
    }
}

impl NativeDom for MemoryDom {
    type Node = MemNodeId;

    fn editor_root(&self) -> MemNodeId {
        self.root()
    }

    fn kind(&self, node: &MemNodeId) -> Result<NodeKind, NativeError> {
        if self.restricted.contains(node) {
            return Err(NativeError::PermissionDenied(format!(
                "node {} belongs to another origin",
                node.0
            )));
        }
        Ok(match self.nodes.get(node.0).map(|n| &n.data) {
            Some(MemData::Element { .. }) => NodeKind::Element,
            Some(MemData::Text(_)) => NodeKind::Text,
            Some(MemData::Comment(_)) => NodeKind::Comment,
            None => NodeKind::Other,
        })
    }

    fn parent(&self, node: &MemNodeId) -> Option<MemNodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn children(&self, node: &MemNodeId) -> Vec<MemNodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, node: &MemNodeId, name: &str) -> Option<String> {
        match &self.nodes.get(node.0)?.data {
            MemData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn text_content(&self, node: &MemNodeId) -> String {
        match self.nodes.get(node.0).map(|n| &n.data) {
            Some(MemData::Text(t)) => t.clone(),
            Some(MemData::Comment(_)) | None => String::new(),
            Some(MemData::Element { .. }) => self
                .descendants(node)
                .iter()
                .filter_map(|d| match &self.nodes[d.0].data {
                    MemData::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    fn find_by_id(&self, id: &str) -> Option<MemNodeId> {
        self.find_by_attr(attr::ID, id)
    }

    fn bounding_rect(&self, node: &MemNodeId) -> Option<Rect> {
        self.rects.get(node).copied()
    }

    fn caret_from_point(&self, x: f64, y: f64) -> Option<NativePoint<MemNodeId>> {
        self.carets
            .iter()
            .find(|((cx, cy), _)| (cx - x).abs() < f64::EPSILON && (cy - y).abs() < f64::EPSILON)
            .map(|(_, p)| p.clone())
    }
}
