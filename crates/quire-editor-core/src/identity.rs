//! Stable node identities and the parent/index links used to recover paths.
//!
//! Every document node carries an identity slot. A key is assigned lazily on
//! first request and stays with that node instance; cloning a node yields an
//! unkeyed copy. Links are rebuilt from scratch on every render pass, so the
//! path computed from them always reflects the last rendered tree.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use smol_str::{SmolStr, format_smolstr};

use crate::document::{Document, Node, NodeRef};
use crate::engine::{Operation, OperationHook};
use crate::error::{BridgeError, Result};
use crate::types::Path;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

const KEY_PREFIX: &str = "qk-";

/// Process-unique node identity. Never reused across node instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl NodeKey {
    fn fresh() -> Self {
        NodeKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// The value written to the rendered element's `id` attribute.
    pub fn id(&self) -> SmolStr {
        format_smolstr!("{KEY_PREFIX}{}", self.0)
    }

    /// Parse a rendered `id` attribute back into a key.
    pub fn parse(id: &str) -> Option<Self> {
        id.strip_prefix(KEY_PREFIX)?.parse().ok().map(NodeKey)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KEY_PREFIX}{}", self.0)
    }
}

/// Identity slot embedded in a node. Clones start empty and equality
/// ignores it, so structurally equal nodes compare equal regardless of key.
#[derive(Default)]
pub struct KeySlot(Cell<Option<NodeKey>>);

impl KeySlot {
    pub fn get(&self) -> Option<NodeKey> {
        self.0.get()
    }

    pub(crate) fn set(&self, key: NodeKey) {
        self.0.set(Some(key));
    }

    fn get_or_assign(&self) -> NodeKey {
        match self.0.get() {
            Some(key) => key,
            None => {
                let key = NodeKey::fresh();
                self.0.set(Some(key));
                key
            }
        }
    }
}

impl Clone for KeySlot {
    fn clone(&self) -> Self {
        KeySlot::default()
    }
}

impl PartialEq for KeySlot {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for KeySlot {}

impl fmt::Debug for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(key) => write!(f, "{key}"),
            None => f.write_str("_"),
        }
    }
}

/// Anything that carries an identity slot.
pub trait Keyed {
    fn key_slot(&self) -> &KeySlot;
}

#[derive(Clone, Copy, Debug)]
struct Link {
    parent: NodeKey,
    index: usize,
}

/// Per-editor table of node links.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    links: HashMap<NodeKey, Link>,
    root: Option<NodeKey>,
    pending: Vec<(Path, NodeKey)>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of `node`, assigning a fresh one if it has none.
    pub fn identity_of(&self, node: &(impl Keyed + ?Sized)) -> NodeKey {
        node.key_slot().get_or_assign()
    }

    /// Key of `node`, failing if it was never keyed (never rendered).
    pub fn require_identity_of(&self, node: &(impl Keyed + ?Sized)) -> Result<NodeKey> {
        node.key_slot()
            .get()
            .ok_or_else(|| BridgeError::not_found("node has no identity; was it rendered?"))
    }

    /// Start a new render pass: drop all links and key the root.
    pub fn begin_pass(&mut self, root: &Document) -> NodeKey {
        self.links.clear();
        let key = self.identity_of(root);
        self.root = Some(key);
        key
    }

    /// Record that `child` sits at `index` below `parent`.
    pub fn link(&mut self, child: &(impl Keyed + ?Sized), parent: NodeKey, index: usize) -> NodeKey {
        let key = self.identity_of(child);
        self.links.insert(key, Link { parent, index });
        key
    }

    /// Link the whole tree without rendering it.
    pub fn index_tree(&mut self, root: &Document) {
        let key = self.begin_pass(root);
        self.link_children(&root.children, key);
    }

    pub(crate) fn link_children(&mut self, children: &[Node], parent: NodeKey) {
        for (i, child) in children.iter().enumerate() {
            let key = self.link(child, parent, i);
            if let Node::Element(el) = child {
                self.link_children(&el.children, key);
            }
        }
    }

    /// Key of the root as of the last render pass.
    pub fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// Parent key and child index recorded for `key`.
    pub fn parent_of(&self, key: NodeKey) -> Option<(NodeKey, usize)> {
        self.links.get(&key).map(|link| (link.parent, link.index))
    }

    pub fn path_of(&self, node: &(impl Keyed + ?Sized)) -> Result<Path> {
        let key = self.require_identity_of(node)?;
        self.path_of_key(key)
    }

    /// Walk links upward from `key` until the root.
    pub fn path_of_key(&self, key: NodeKey) -> Result<Path> {
        let root = self
            .root
            .ok_or_else(|| BridgeError::not_found("no render pass has run"))?;
        let mut segments = Vec::new();
        let mut current = key;
        // A well-formed chain is never longer than the link table.
        for _ in 0..=self.links.len() {
            if current == root {
                segments.reverse();
                return Ok(Path::from(segments));
            }
            let link = self
                .links
                .get(&current)
                .ok_or_else(|| BridgeError::not_found(format!("no parent link for {current}")))?;
            segments.push(link.index);
            current = link.parent;
        }
        Err(BridgeError::not_found(format!(
            "link chain from {key} does not reach the root"
        )))
    }

    /// Node at `path` below `root`.
    pub fn resolve<'a>(root: &'a Document, path: &Path) -> Result<NodeRef<'a>> {
        root.node(path)
            .ok_or_else(|| BridgeError::not_found(format!("no node at path {:?}", &path[..])))
    }
}

impl IdentityRegistry {
    /// Capture the keys along `op`'s anchor path, root included.
    pub fn capture_for(&mut self, document: &Document, op: &Operation) {
        self.pending.clear();
        let Some(anchor) = op.identity_anchor() else {
            return;
        };
        for depth in 0..=anchor.len() {
            let path = anchor.prefix(depth);
            if let Some(node) = document.node(&path) {
                let key = self.identity_of(&node);
                self.pending.push((path, key));
            }
        }
    }

    /// Re-attach the captured keys to whatever now sits at those paths.
    pub fn restore(&mut self, document: &Document) {
        for (path, key) in self.pending.drain(..) {
            if let Some(node) = document.node(&path) {
                tracing::trace!(target: "quire::identity", %key, ?path, "re-propagating identity");
                node.key_slot().set(key);
            }
        }
    }
}

impl OperationHook for IdentityRegistry {
    fn will_apply(&mut self, document: &Document, op: &Operation) {
        self.capture_for(document, op);
    }

    fn did_apply(&mut self, document: &Document, _op: &Operation) {
        self.restore(document);
    }
}
