//! The document's live Selection object.

use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, Node};

use quire_editor_core::{NativeError, NativePoint, NativeSelection, SelectionPlatform};

/// Selection access scoped to one editor root.
#[derive(Clone, Debug)]
pub struct WebSelection {
    root: HtmlElement,
}

impl WebSelection {
    pub fn new(root: HtmlElement) -> Self {
        Self { root }
    }

    fn selection(&self) -> Option<web_sys::Selection> {
        web_sys::window()?.get_selection().ok().flatten()
    }
}

impl SelectionPlatform<Node> for WebSelection {
    fn snapshot(&self) -> Option<NativeSelection<Node>> {
        let selection = self.selection()?;
        if selection.range_count() == 0 {
            return Some(NativeSelection::empty());
        }
        let point = |node: Option<Node>, offset: u32| node.map(|n| NativePoint::new(n, offset as usize));
        Some(NativeSelection {
            anchor: point(selection.anchor_node(), selection.anchor_offset()),
            focus: point(selection.focus_node(), selection.focus_offset()),
        })
    }

    fn set_base_and_extent(
        &mut self,
        anchor: &NativePoint<Node>,
        focus: &NativePoint<Node>,
    ) -> Result<(), NativeError> {
        let selection = self.selection().ok_or("no selection object")?;
        selection
            .set_base_and_extent(
                &anchor.node,
                anchor.offset as u32,
                &focus.node,
                focus.offset as u32,
            )
            .map_err(|e| NativeError::Platform(format!("set_base_and_extent failed: {e:?}")))
    }

    fn remove_all_ranges(&mut self) {
        if let Some(selection) = self.selection() {
            if let Err(e) = selection.remove_all_ranges() {
                tracing::warn!(target: "quire::reconcile", "remove_all_ranges failed: {:?}", e);
            }
        }
    }

    fn scroll_into_view(&mut self, node: &Node) {
        let element = match node.dyn_ref::<Element>() {
            Some(el) => Some(el.clone()),
            None => node.parent_element(),
        };
        if let Some(element) = element {
            element.scroll_into_view_with_bool(false);
        }
    }

    fn focus_editor(&mut self) {
        if let Err(e) = self.root.focus() {
            tracing::debug!(target: "quire::events", "focus failed: {:?}", e);
        }
    }
}
