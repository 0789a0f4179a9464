//! The rendered editor tree, read through the browser DOM.

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Node};

use quire_editor_core::{NativeDom, NativeError, NativePoint, NodeKind, Rect};

// === Caret hit-testing bindings ===
//
// `caretPositionFromPoint` (standard, Firefox and recent Chromium) and
// `caretRangeFromPoint` (WebKit) are each missing somewhere, so both are
// bound with `catch` and probed at call time.

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(extends = web_sys::Document)]
    type CaretDocument;

    type CaretPosition;

    #[wasm_bindgen(method, catch, js_name = caretPositionFromPoint)]
    fn caret_position_from_point(
        this: &CaretDocument,
        x: f64,
        y: f64,
    ) -> Result<Option<CaretPosition>, JsValue>;

    #[wasm_bindgen(method, catch, js_name = caretRangeFromPoint)]
    fn caret_range_from_point(
        this: &CaretDocument,
        x: f64,
        y: f64,
    ) -> Result<Option<web_sys::Range>, JsValue>;

    #[wasm_bindgen(method, getter, js_name = offsetNode)]
    fn offset_node(this: &CaretPosition) -> Option<Node>;

    #[wasm_bindgen(method, getter)]
    fn offset(this: &CaretPosition) -> u32;
}

/// A mounted editor root.
#[derive(Clone, Debug)]
pub struct WebDom {
    root: Element,
}

impl WebDom {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Look the editor root up by element id.
    pub fn by_id(editor_id: &str) -> Option<Self> {
        let document = web_sys::window()?.document()?;
        document.get_element_by_id(editor_id).map(Self::new)
    }

    pub fn root_element(&self) -> &Element {
        &self.root
    }
}

impl NativeDom for WebDom {
    type Node = Node;

    fn editor_root(&self) -> Node {
        self.root.clone().unchecked_into()
    }

    fn kind(&self, node: &Node) -> Result<NodeKind, NativeError> {
        // Nodes from a foreign frame throw on property access; reading
        // through Reflect turns the throw into an Err.
        let value = Reflect::get(node, &JsValue::from_str("nodeType"))
            .map_err(|e| NativeError::PermissionDenied(format!("{e:?}")))?;
        Ok(match value.as_f64().map(|v| v as u16) {
            Some(Node::ELEMENT_NODE) => NodeKind::Element,
            Some(Node::TEXT_NODE) => NodeKind::Text,
            Some(Node::COMMENT_NODE) => NodeKind::Comment,
            _ => NodeKind::Other,
        })
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn text_content(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn find_by_id(&self, id: &str) -> Option<Node> {
        let selector = format!("[id=\"{id}\"]");
        self.root
            .query_selector(&selector)
            .ok()
            .flatten()
            .map(|el| el.unchecked_into())
    }

    fn bounding_rect(&self, node: &Node) -> Option<Rect> {
        let element = match node.dyn_ref::<Element>() {
            Some(el) => el.clone(),
            None => node.parent_element()?,
        };
        let rect = element.get_bounding_client_rect();
        Some(Rect {
            left: rect.left(),
            top: rect.top(),
            width: rect.width(),
            height: rect.height(),
        })
    }

    fn caret_from_point(&self, x: f64, y: f64) -> Option<NativePoint<Node>> {
        let document: CaretDocument = self.root.owner_document()?.unchecked_into();
        if let Ok(Some(position)) = document.caret_position_from_point(x, y) {
            return position
                .offset_node()
                .map(|node| NativePoint::new(node, position.offset() as usize));
        }
        match document.caret_range_from_point(x, y) {
            Ok(Some(range)) => {
                let node = range.start_container().ok()?;
                let offset = range.start_offset().ok()?;
                Some(NativePoint::new(node, offset as usize))
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(target: "quire::position", error = ?e, "no caret hit-testing available");
                None
            }
        }
    }

    fn contains(&self, ancestor: &Node, node: &Node) -> bool {
        ancestor.contains(Some(node))
    }
}
