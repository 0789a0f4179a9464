//! Pushes the document selection back onto the native selection after a
//! render.

use crate::context::BridgeContext;
use crate::dom::NativeDom;
use crate::engine::EditEngine;
use crate::error::Result;
use crate::platform::SelectionPlatform;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Composing, unfocused, or no native selection to speak of.
    Skipped,
    /// Native and document selection already agree.
    InSync,
    /// The native selection was rewritten. The host must call
    /// [`BridgeContext::release_guard`] on the next tick, and refocus the
    /// editor first when `refocus` is set.
    Applied { refocus: bool },
}

/// Make the native selection match the engine's selection.
///
/// On error the guard is not held and the native selection is untouched.
pub fn reconcile<D, E, S>(
    cx: &mut BridgeContext,
    dom: &D,
    engine: &E,
    native: &mut S,
) -> Result<ReconcileOutcome>
where
    D: NativeDom,
    E: EditEngine,
    S: SelectionPlatform<D::Node>,
{
    if cx.is_composing() || !cx.is_focused() {
        return Ok(ReconcileOutcome::Skipped);
    }
    let Some(snapshot) = native.snapshot() else {
        return Ok(ReconcileOutcome::Skipped);
    };
    let selection = engine.selection();
    let has_native = !snapshot.is_empty();
    if selection.is_none() && !has_native {
        return Ok(ReconcileOutcome::InSync);
    }

    let root = dom.editor_root();
    let in_editor = [&snapshot.anchor, &snapshot.focus]
        .into_iter()
        .all(|p| p.as_ref().is_some_and(|p| dom.contains(&root, &p.node)));

    let target = {
        let translator = cx.translator(dom, engine);
        if let (true, Some(selection)) = (has_native && in_editor, selection) {
            match translator.to_document_range(snapshot) {
                Ok(current) if current == *selection => return Ok(ReconcileOutcome::InSync),
                Ok(_) => {}
                Err(e) => {
                    tracing::trace!(target: "quire::reconcile", error = %e, "native selection unresolvable");
                }
            }
        }
        match selection {
            Some(selection) => Some((
                translator.to_native_endpoints(selection)?,
                selection.is_backward(),
            )),
            None => None,
        }
    };

    cx.hold_guard();
    match target {
        Some(((anchor, focus), backward)) => {
            if let Err(e) = native.set_base_and_extent(&anchor, &focus) {
                cx.release_guard();
                return Err(e.into());
            }
            let start = if backward { &focus } else { &anchor };
            native.scroll_into_view(&start.node);
            tracing::debug!(target: "quire::reconcile", backward, "native selection rewritten");
            Ok(ReconcileOutcome::Applied {
                refocus: cx.quirks.refocus_after_selection,
            })
        }
        None => {
            native.remove_all_ranges();
            tracing::debug!(target: "quire::reconcile", "native selection cleared");
            Ok(ReconcileOutcome::Applied { refocus: false })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::dom::{MemNodeId, MemoryDom, NativePoint};
    use crate::platform::{MemorySelection, Quirks};
    use crate::test_support::{RecordingEngine, caret, paragraphs, range, render_into};

    fn setup(texts: &[&str]) -> (BridgeContext, RecordingEngine, MemoryDom) {
        let mut cx = BridgeContext::new(EditorConfig::default(), Quirks::default());
        cx.set_focused(true);
        let engine = RecordingEngine::new(paragraphs(texts));
        let dom = render_into(&mut cx.registry, &engine.doc, &engine.caps);
        (cx, engine, dom)
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let (mut cx, engine, dom) = setup(&["hello", "world"]);
        let engine = engine.with_selection(range((&[0, 0], 1), (&[1, 0], 3)));
        let mut native = MemorySelection::<MemNodeId>::new();

        let first = reconcile(&mut cx, &dom, &engine, &mut native).unwrap();
        assert_eq!(first, ReconcileOutcome::Applied { refocus: false });
        assert_eq!(native.writes, 1);
        assert!(cx.is_reconciling());
        cx.release_guard();

        let second = reconcile(&mut cx, &dom, &engine, &mut native).unwrap();
        assert_eq!(second, ReconcileOutcome::InSync);
        assert_eq!(native.writes, 1);
        assert!(!cx.is_reconciling());
    }

    #[test]
    fn test_backward_selection_written_backward() {
        let (mut cx, engine, dom) = setup(&["hello", "world"]);
        let engine = engine.with_selection(range((&[1, 0], 3), (&[0, 0], 1)));
        let mut native = MemorySelection::new();
        reconcile(&mut cx, &dom, &engine, &mut native).unwrap();

        let world = dom.find_text("world").unwrap();
        let hello = dom.find_text("hello").unwrap();
        assert_eq!(native.current.anchor, Some(NativePoint::new(world, 3)));
        assert_eq!(native.current.focus, Some(NativePoint::new(hello, 1)));
        assert_eq!(native.scrolled, vec![hello]);
    }

    #[test]
    fn test_skipped_while_composing_or_unfocused() {
        let (mut cx, engine, dom) = setup(&["a"]);
        let engine = engine.with_selection(caret(&[0, 0], 1));
        let mut native = MemorySelection::new();

        cx.set_focused(false);
        assert_eq!(
            reconcile(&mut cx, &dom, &engine, &mut native).unwrap(),
            ReconcileOutcome::Skipped
        );
        cx.set_focused(true);
        cx.begin_composition();
        assert_eq!(
            reconcile(&mut cx, &dom, &engine, &mut native).unwrap(),
            ReconcileOutcome::Skipped
        );
        assert_eq!(native.writes, 0);
    }

    #[test]
    fn test_cleared_document_selection_clears_native() {
        let (mut cx, engine, dom) = setup(&["abc"]);
        let text = dom.find_text("abc").unwrap();
        let mut native = MemorySelection::new();
        native.place(NativePoint::new(text, 1), NativePoint::new(text, 1));

        let outcome = reconcile(&mut cx, &dom, &engine, &mut native).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied { refocus: false });
        assert!(native.current.is_empty());

        cx.release_guard();
        assert_eq!(
            reconcile(&mut cx, &dom, &engine, &mut native).unwrap(),
            ReconcileOutcome::InSync
        );
    }

    #[test]
    fn test_unrenderable_selection_leaves_guard_down() {
        let (mut cx, engine, dom) = setup(&["abc"]);
        let engine = engine.with_selection(caret(&[0, 0], 9));
        let mut native = MemorySelection::new();
        let err = reconcile(&mut cx, &dom, &engine, &mut native).unwrap_err();
        assert!(err.is_resolution());
        assert!(!cx.is_reconciling());
        assert_eq!(native.writes, 0);
    }

    #[test]
    fn test_refocus_quirk_reported() {
        let (mut cx, engine, dom) = setup(&["abc"]);
        cx.quirks.refocus_after_selection = true;
        let engine = engine.with_selection(caret(&[0, 0], 2));
        let mut native = MemorySelection::new();
        assert_eq!(
            reconcile(&mut cx, &dom, &engine, &mut native).unwrap(),
            ReconcileOutcome::Applied { refocus: true }
        );
    }
}
