//! Point translation between the document and the rendered surface.
//!
//! The rendered tree is the only ground truth for native offsets: a leaf's
//! string run may hold a synthetic character (zero-width runs) or an extra
//! trailing space, so lengths are read from the `data-quire-length` marker
//! where one exists rather than from the text itself.

use crate::document::{Capabilities, Document, NodeRef};
use crate::dom::{NativeDom, NativePoint, attr, char_to_utf16, normalize_point, utf16_len, utf16_prefix};
use crate::error::{BridgeError, NativeError, Result};
use crate::identity::{IdentityRegistry, NodeKey};
use crate::types::{Path, Point};

/// Translates points and ranges for one rendered state of the document.
pub struct Translator<'a, D: NativeDom> {
    pub(crate) dom: &'a D,
    pub(crate) document: &'a Document,
    pub(crate) caps: &'a dyn Capabilities,
    pub(crate) registry: &'a IdentityRegistry,
}

impl<'a, D: NativeDom> Translator<'a, D> {
    pub fn new(
        dom: &'a D,
        document: &'a Document,
        caps: &'a dyn Capabilities,
        registry: &'a IdentityRegistry,
    ) -> Self {
        Self {
            dom,
            document,
            caps,
            registry,
        }
    }

    /// Rendered element for a keyed document node.
    pub fn native_node(&self, key: NodeKey) -> Result<D::Node> {
        if self.registry.root() == Some(key) {
            return Ok(self.dom.editor_root());
        }
        self.dom
            .find_by_id(&key.id())
            .ok_or_else(|| BridgeError::resolution("node", format!("{key} is not rendered")))
    }

    /// Document point to native (text node, UTF-16 offset).
    pub fn to_native(&self, point: &Point) -> Result<NativePoint<D::Node>> {
        let node = IdentityRegistry::resolve(self.document, &point.path)?;
        let key = self.registry.require_identity_of(&node)?;
        let element = self.native_node(key)?;

        // Inside a void the only addressable position is the start.
        let offset = if self
            .document
            .void_ancestor(&point.path, self.caps)
            .is_some()
        {
            0
        } else {
            point.offset
        };

        let mut start = 0;
        for run in self.runs(&element) {
            let Some(text_node) = self.dom.first_content_child(&run) else {
                continue;
            };
            let rendered = self.dom.text_content(&text_node);
            let end = start + self.logical_len(&run, &rendered);
            if offset <= end {
                let within = offset.saturating_sub(start);
                let native = char_to_utf16(&rendered, within).min(utf16_len(&rendered));
                return Ok(NativePoint::new(text_node, native));
            }
            start = end;
        }

        tracing::debug!(
            target: "quire::position",
            path = ?&point.path[..],
            offset = point.offset,
            "point lies past every rendered run"
        );
        Err(BridgeError::resolution(
            "point",
            format!("offset {} exceeds rendered length {start}", point.offset),
        ))
    }

    /// Native point to document point.
    pub fn to_document(&self, native: &NativePoint<D::Node>) -> Result<Point> {
        let NativePoint { node, offset } = normalize_point(self.dom, native);
        let parent = self
            .dom
            .parent(&node)
            .ok_or_else(|| BridgeError::resolution("native point", "node is detached"))?;

        let (text_element, offset) = if let Some(leaf) = self.dom.closest_with(&parent, attr::LEAF) {
            let text_element = self.text_element(&leaf)?;
            // Zero-width runs are skipped while measuring: a caret after the
            // synthetic character, or after IME text typed into the run,
            // stays at the run's start. The clamp drops the extra space
            // after a trailing newline.
            let measured = self
                .measure(&text_element, &node, offset)
                .min(self.logical_total(&text_element));
            (text_element, measured)
        } else if let Some(void) = self.dom.closest_with(&parent, attr::VOID) {
            // Clicks land on the void's content rather than in its spacer;
            // resolve to the end of the spacer's leaf.
            let leaf = self
                .dom
                .descendants(&void)
                .into_iter()
                .find(|n| self.dom.has_attribute(n, attr::LEAF))
                .ok_or_else(|| BridgeError::resolution("native point", "void has no leaf"))?;
            let text_element = self.text_element(&leaf)?;
            let length = self.logical_total(&leaf);
            (text_element, length)
        } else {
            return Err(BridgeError::resolution(
                "native point",
                "not inside a rendered leaf",
            ));
        };

        let key = self.key_of_element(&text_element)?;
        let path = self.registry.path_of_key(key)?;
        tracing::trace!(target: "quire::position", path = ?&path[..], offset, "native point resolved");
        Ok(Point::new(path, offset))
    }

    /// Document key for a native node: the closest rendered document node.
    pub fn key_of(&self, node: &D::Node) -> Result<NodeKey> {
        let element = match self.dom.element_of(node) {
            Ok(Some(el)) => el,
            Ok(None) => return Err(BridgeError::resolution("native node", "no element")),
            Err(e) => return Err(e.into()),
        };
        let marked = self
            .dom
            .closest_with(&element, attr::NODE)
            .ok_or_else(|| BridgeError::resolution("native node", "outside rendered content"))?;
        self.key_of_element(&marked)
    }

    /// Document path for a native node.
    pub fn path_of_native(&self, node: &D::Node) -> Result<Path> {
        let key = self.key_of(node)?;
        self.registry.path_of_key(key)
    }

    /// True if `target` is inside this editor (and editable, if asked).
    ///
    /// Permission errors from probing foreign nodes mean "no".
    pub fn has_dom_node(&self, target: &D::Node, editable: bool) -> bool {
        let element = match self.dom.element_of(target) {
            Ok(Some(el)) => el,
            Ok(None) => return false,
            Err(NativeError::PermissionDenied(_)) => return false,
            Err(e) => {
                tracing::warn!(target: "quire::position", error = %e, "failed to probe event target");
                return false;
            }
        };
        let root = self.dom.editor_root();
        let owner = self.dom.closest_with(&element, attr::EDITOR);
        owner.as_ref() == Some(&root)
            && (!editable
                || self.dom.is_content_editable(&element)
                || self.dom.has_attribute(&element, attr::ZERO_WIDTH))
    }

    pub fn has_editable_target(&self, target: &D::Node) -> bool {
        self.has_dom_node(target, true)
    }

    /// True if `target` maps to a void element.
    pub fn is_target_inside_void(&self, target: &D::Node) -> bool {
        self.has_dom_node(target, false)
            && self
                .path_of_native(target)
                .ok()
                .and_then(|path| self.document.node(&path))
                .is_some_and(|node| matches!(node, NodeRef::Element(el) if self.caps.is_void(el)))
    }

    fn key_of_element(&self, element: &D::Node) -> Result<NodeKey> {
        if self.dom.has_attribute(element, attr::EDITOR) {
            return self
                .registry
                .root()
                .ok_or_else(|| BridgeError::not_found("no render pass has run"));
        }
        let id = self
            .dom
            .attribute(element, attr::ID)
            .ok_or_else(|| BridgeError::resolution("native node", "rendered node has no id"))?;
        NodeKey::parse(&id)
            .ok_or_else(|| BridgeError::resolution("native node", format!("malformed key id {id:?}")))
    }

    fn text_element(&self, leaf: &D::Node) -> Result<D::Node> {
        self.dom
            .closest(leaf, |dom, el| dom.attribute(el, attr::NODE).as_deref() == Some("text"))
            .ok_or_else(|| BridgeError::resolution("native point", "leaf outside a text node"))
    }

    /// String and zero-width runs below `element`, in order.
    fn runs(&self, element: &D::Node) -> Vec<D::Node> {
        self.dom
            .descendants(element)
            .into_iter()
            .filter(|n| {
                self.dom.has_attribute(n, attr::STRING) || self.dom.has_attribute(n, attr::ZERO_WIDTH)
            })
            .collect()
    }

    /// Summed logical length of the runs below `element`.
    fn logical_total(&self, element: &D::Node) -> usize {
        self.runs(element)
            .iter()
            .map(|run| {
                let rendered = self
                    .dom
                    .first_content_child(run)
                    .map(|t| self.dom.text_content(&t))
                    .unwrap_or_default();
                self.logical_len(run, &rendered)
            })
            .sum()
    }

    fn logical_len(&self, run: &D::Node, rendered: &str) -> usize {
        self.dom
            .attribute(run, attr::LENGTH)
            .and_then(|len| len.parse().ok())
            .unwrap_or_else(|| rendered.chars().count())
    }

    /// Characters of visible text in `container` before (`target`, `offset`),
    /// ignoring zero-width runs and non-editable islands such as placeholders.
    fn measure(&self, container: &D::Node, target: &D::Node, offset: usize) -> usize {
        let mut collected = String::new();
        self.collect_until(container, target, offset, false, &mut collected);
        collected.chars().count()
    }

    fn collect_until(
        &self,
        node: &D::Node,
        target: &D::Node,
        offset: usize,
        skipping: bool,
        out: &mut String,
    ) -> bool {
        if node == target {
            if self.dom.is_text(node) {
                if !skipping {
                    out.push_str(utf16_prefix(&self.dom.text_content(node), offset));
                }
            } else {
                for child in self.dom.children(node).iter().take(offset) {
                    self.collect_all(child, skipping, out);
                }
            }
            return true;
        }
        if self.dom.is_text(node) {
            if !skipping {
                out.push_str(&self.dom.text_content(node));
            }
            return false;
        }
        let skipping = skipping || self.is_stripped(node);
        for child in self.dom.children(node) {
            if self.collect_until(&child, target, offset, skipping, out) {
                return true;
            }
        }
        false
    }

    fn collect_all(&self, node: &D::Node, skipping: bool, out: &mut String) {
        if self.dom.is_text(node) {
            if !skipping {
                out.push_str(&self.dom.text_content(node));
            }
            return;
        }
        let skipping = skipping || self.is_stripped(node);
        for child in self.dom.children(node) {
            self.collect_all(&child, skipping, out);
        }
    }

    fn is_stripped(&self, node: &D::Node) -> bool {
        self.dom.is_element(node)
            && (self.dom.has_attribute(node, attr::ZERO_WIDTH)
                || self.dom.attribute(node, attr::CONTENT_EDITABLE).as_deref() == Some("false"))
    }
}
