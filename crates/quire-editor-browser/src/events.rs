//! Extraction of browser event fields into core event pieces.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Node;

use quire_editor_core::{HostEvent, KeyCombo, NativePoint, NativeRange, TEXT_MIME};

// === StaticRange binding ===
//
// `InputEvent.getTargetRanges()` returns StaticRange objects, which web-sys
// does not expose.

#[wasm_bindgen]
extern "C" {
    pub type StaticRange;

    #[wasm_bindgen(method, getter, structural, js_name = startContainer)]
    pub fn start_container(this: &StaticRange) -> Node;

    #[wasm_bindgen(method, getter, structural, js_name = startOffset)]
    pub fn start_offset(this: &StaticRange) -> u32;

    #[wasm_bindgen(method, getter, structural, js_name = endContainer)]
    pub fn end_container(this: &StaticRange) -> Node;

    #[wasm_bindgen(method, getter, structural, js_name = endOffset)]
    pub fn end_offset(this: &StaticRange) -> u32;
}

/// The event target as a DOM node.
pub fn event_target(evt: &web_sys::Event) -> Option<Node> {
    evt.target()?.dyn_into::<Node>().ok()
}

/// `getTargetRanges()` of a `beforeinput` event.
pub fn target_ranges(evt: &web_sys::InputEvent) -> Vec<NativeRange<Node>> {
    let ranges = evt.get_target_ranges();
    ranges
        .iter()
        .map(|value| {
            let range: StaticRange = value.unchecked_into();
            NativeRange::new(
                NativePoint::new(range.start_container(), range.start_offset() as usize),
                NativePoint::new(range.end_container(), range.end_offset() as usize),
            )
        })
        .collect()
}

pub fn key_combo(evt: &web_sys::KeyboardEvent) -> KeyCombo {
    KeyCombo {
        ctrl: evt.ctrl_key(),
        alt: evt.alt_key(),
        shift: evt.shift_key(),
        meta: evt.meta_key(),
        ..KeyCombo::new(&evt.key())
    }
}

/// "Paste and match style" delivers only `text/plain`.
pub fn is_plain_text_paste(data: &web_sys::DataTransfer) -> bool {
    let types = data.types();
    types.length() == 1
        && types.get(0).as_string().as_deref() == Some(TEXT_MIME)
        && data.get_data(TEXT_MIME).is_ok_and(|text| !text.is_empty())
}

/// DOM event name and JSON detail for a host notification.
pub fn host_event_payload(event: &HostEvent) -> (&'static str, String) {
    match event {
        HostEvent::ValueChanged(children) => (
            "quire-change",
            serde_json::to_string(children).unwrap_or_default(),
        ),
        HostEvent::SelectionChanged(selection) => (
            "quire-selection",
            serde_json::to_string(selection).unwrap_or_default(),
        ),
        HostEvent::Bubbled(kind) => ("quire-unhandled", format!("\"{kind}\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_editor_core::{DocRange, EventKind, Node as DocNode, Point};

    #[test]
    fn test_host_event_payloads() {
        let value = HostEvent::ValueChanged(vec![DocNode::element(
            "paragraph",
            vec![DocNode::text("hi")],
        )]);
        assert_eq!(
            host_event_payload(&value),
            (
                "quire-change",
                r#"[{"children":[{"text":"hi"}],"type":"paragraph"}]"#.to_string()
            )
        );

        let selection =
            HostEvent::SelectionChanged(Some(DocRange::collapsed(Point::new([0, 0], 1))));
        let (name, detail) = host_event_payload(&selection);
        assert_eq!(name, "quire-selection");
        assert!(detail.contains(r#""offset":1"#));

        assert_eq!(
            host_event_payload(&HostEvent::SelectionChanged(None)),
            ("quire-selection", "null".to_string())
        );
        assert_eq!(
            host_event_payload(&HostEvent::Bubbled(EventKind::KeyDown)),
            ("quire-unhandled", "\"keydown\"".to_string())
        );
    }
}
