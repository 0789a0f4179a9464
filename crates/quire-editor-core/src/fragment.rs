//! Clipboard and drag payloads.
//!
//! A copied selection is written three ways: the structured fragment under
//! [`FRAGMENT_MIME`] (Base64 of its JSON), `text/html` rendered through the
//! pipeline with the fragment also attached as an attribute, and
//! `text/plain`. Pasting prefers the structured fragment and falls back to
//! plain text, one line per block.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::context::BridgeContext;
use crate::document::{Capabilities, Node};
use crate::dom::attr;
use crate::engine::{Command, EditEngine};
use crate::error::{BridgeError, Result};
use crate::render::{Decorate, ElementRenderer, LeafRenderer, RenderPipeline};
use crate::vnode::{VElement, VNode};

pub const FRAGMENT_MIME: &str = "application/x-quire-fragment";
pub const HTML_MIME: &str = "text/html";
pub const TEXT_MIME: &str = "text/plain";

/// The clipboard/drag data object of a native event.
pub trait DataTransfer {
    /// Data stored under `mime`; empty when absent.
    fn get_data(&self, mime: &str) -> String;
    fn set_data(&mut self, mime: &str, data: &str);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryDataTransfer {
    pub entries: HashMap<String, String>,
}

impl MemoryDataTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mime: &str, data: &str) -> Self {
        self.set_data(mime, data);
        self
    }
}

impl DataTransfer for MemoryDataTransfer {
    fn get_data(&self, mime: &str) -> String {
        self.entries.get(mime).cloned().unwrap_or_default()
    }

    fn set_data(&mut self, mime: &str, data: &str) {
        self.entries.insert(mime.to_string(), data.to_string());
    }
}

/// Renders detached nodes for the `text/html` payload.
pub trait FragmentExport {
    fn export_html(&self, nodes: &[Node], caps: &dyn Capabilities) -> Vec<VNode>;
}

impl<D: Decorate, R: ElementRenderer, L: LeafRenderer> FragmentExport for RenderPipeline<D, R, L> {
    fn export_html(&self, nodes: &[Node], caps: &dyn Capabilities) -> Vec<VNode> {
        self.render_fragment(nodes, caps)
    }
}

pub fn encode_fragment(nodes: &[Node]) -> Result<String> {
    let json = serde_json::to_string(nodes).map_err(|e| BridgeError::Fragment(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

pub fn decode_fragment(encoded: &str) -> Result<Vec<Node>> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| BridgeError::Fragment(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| BridgeError::Fragment(e.to_string()))
}

/// Plain-text rendering: one line per top-level block.
pub fn plain_text(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(Node::string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the engine's selected fragment to `data`.
///
/// A collapsed selection writes nothing unless it sits inside a void.
pub fn set_fragment_data<E: EditEngine>(
    engine: &E,
    export: &dyn FragmentExport,
    data: &mut dyn DataTransfer,
) -> Result<bool> {
    let Some(selection) = engine.selection() else {
        return Ok(false);
    };
    let (start, _) = selection.edges();
    if selection.is_collapsed() && engine.document().void_ancestor(&start.path, engine).is_none() {
        return Ok(false);
    }

    let fragment = engine.fragment();
    let encoded = encode_fragment(&fragment)?;

    let mut html = export.export_html(&fragment, engine);
    for node in &mut html {
        node.visit_elements_mut(&mut strip_zero_width);
    }
    let attach = html
        .iter_mut()
        .filter_map(VNode::as_element_mut)
        .find(|el| !el.text_content().trim().is_empty());
    if let Some(el) = attach {
        el.set_attr(attr::FRAGMENT, encoded.clone());
    }
    let html: String = html.iter().map(VNode::to_html).collect();

    data.set_data(FRAGMENT_MIME, &encoded);
    data.set_data(HTML_MIME, &html);
    data.set_data(TEXT_MIME, &plain_text(&fragment));
    tracing::debug!(target: "quire::fragment", blocks = fragment.len(), "fragment written");
    Ok(true)
}

/// Zero-width runs carry no content outside the editor.
fn strip_zero_width(el: &mut VElement) {
    if let Some(kind) = el.get_attr(attr::ZERO_WIDTH) {
        let text = if kind == "n" { "\n" } else { "" };
        el.children = vec![VNode::from(text)];
    }
}

/// Fragment attached to pasted HTML, for clipboards that keep only
/// `text/html`. Accepts double-quoted, single-quoted and unquoted values
/// and decodes character references in them.
fn fragment_attribute(html: &str) -> Option<String> {
    let mut from = 0;
    while let Some(found) = html[from..].find(attr::FRAGMENT) {
        let start = from + found;
        from = start + attr::FRAGMENT.len();
        // Only a whole attribute name counts.
        let preceded = html[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_whitespace() || c == '<' || c == '/');
        if !preceded {
            continue;
        }
        let rest = html[from..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();
        let raw = match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                &body[..body.find(quote)?]
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                &rest[..end]
            }
            None => return None,
        };
        return Some(unescape_html(raw));
    }
    None
}

/// Decode the character references an HTML serializer may emit inside an
/// attribute value. Unknown references are kept verbatim.
fn unescape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|end| {
            let name = &rest[1..end];
            let c = match name {
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "lt" => Some('<'),
                "gt" => Some('>'),
                _ => {
                    let code = match name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name.strip_prefix('#').and_then(|dec| dec.parse().ok()),
                    };
                    code.and_then(char::from_u32)
                }
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Insert pasted or dropped data at the engine's selection. Returns false
/// when the payload held nothing to insert.
pub fn insert_data<E: EditEngine>(
    cx: &mut BridgeContext,
    engine: &mut E,
    data: &dyn DataTransfer,
) -> bool {
    let mut encoded = data.get_data(FRAGMENT_MIME);
    if encoded.is_empty() {
        encoded = fragment_attribute(&data.get_data(HTML_MIME)).unwrap_or_default();
    }
    if !encoded.is_empty() {
        match decode_fragment(&encoded) {
            Ok(fragment) => {
                cx.dispatch(engine, Command::InsertFragment(fragment));
                return true;
            }
            Err(e) => {
                tracing::warn!(target: "quire::fragment", error = %e, "ignoring malformed fragment payload");
            }
        }
    }

    let text = data.get_data(TEXT_MIME);
    if text.is_empty() {
        return false;
    }
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    for (i, line) in normalized.split('\n').enumerate() {
        if i > 0 {
            cx.dispatch(engine, Command::SplitNodes { always: true });
        }
        cx.dispatch(engine, Command::InsertText(line.to_string()));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::document::Document;
    use crate::platform::Quirks;
    use crate::test_support::{RecordingEngine, caret, paragraphs, range};

    fn cx() -> BridgeContext {
        BridgeContext::new(EditorConfig::default(), Quirks::default())
    }

    #[test]
    fn test_copy_then_paste_inserts_same_fragment() {
        let source = RecordingEngine::new(paragraphs(&["hello", "world"]))
            .with_selection(range((&[0, 0], 1), (&[1, 0], 3)));
        let mut clipboard = MemoryDataTransfer::new();
        let written =
            set_fragment_data(&source, &RenderPipeline::default(), &mut clipboard).unwrap();
        assert!(written);
        assert_eq!(clipboard.get_data(TEXT_MIME), "ello\nwor");

        let mut cx = cx();
        let mut target = RecordingEngine::new(paragraphs(&[""])).with_selection(caret(&[0, 0], 0));
        insert_data(&mut cx, &mut target, &clipboard);
        assert_eq!(
            target.take_commands(),
            vec![Command::InsertFragment(source.fragment())]
        );
    }

    #[test]
    fn test_html_payload_carries_fragment_attribute() {
        let source = RecordingEngine::new(paragraphs(&["", "two"]))
            .with_selection(range((&[0, 0], 0), (&[1, 0], 3)));
        let mut clipboard = MemoryDataTransfer::new();
        set_fragment_data(&source, &RenderPipeline::default(), &mut clipboard).unwrap();
        let html = clipboard.get_data(HTML_MIME);
        assert!(!html.contains('\u{FEFF}'));
        assert!(!html.contains("<br>"));
        let encoded = clipboard.get_data(FRAGMENT_MIME);
        assert_eq!(fragment_attribute(&html), Some(encoded));
        // The empty first block is skipped when attaching.
        let first_block_end = html.find("</div>").unwrap();
        assert!(!html[..first_block_end].contains(attr::FRAGMENT));
    }

    #[test]
    fn test_html_only_clipboard_still_pastes_fragment() {
        let fragment = paragraphs(&["x"]).children;
        let html = format!(
            "<div {}=\"{}\">x</div>",
            attr::FRAGMENT,
            encode_fragment(&fragment).unwrap()
        );
        let data = MemoryDataTransfer::new().with(HTML_MIME, &html);
        let mut cx = cx();
        let mut engine = RecordingEngine::new(paragraphs(&[""]));
        insert_data(&mut cx, &mut engine, &data);
        assert_eq!(engine.take_commands(), vec![Command::InsertFragment(fragment)]);
    }

    #[test]
    fn test_fragment_attribute_quoting_and_entities() {
        let encoded = encode_fragment(&paragraphs(&["quoted?>"]).children).unwrap();
        let escaped = encoded.replace('+', "&#43;").replace('/', "&#x2F;").replace('=', "&#61;");
        for html in [
            format!("<div {}='{}'>x</div>", attr::FRAGMENT, encoded),
            format!("<div {} = \"{}\">x</div>", attr::FRAGMENT, escaped),
            format!("<div {}={}>x</div>", attr::FRAGMENT, encoded),
        ] {
            assert_eq!(fragment_attribute(&html).as_deref(), Some(encoded.as_str()), "{html}");
        }
        // A longer attribute name that merely ends with ours is not a match.
        let prefixed = format!("<div x-{}=\"junk\">x</div>", attr::FRAGMENT);
        assert_eq!(fragment_attribute(&prefixed), None);
        assert_eq!(unescape_html("a&amp;b&bogus;c&"), "a&b&bogus;c&");
    }

    #[test]
    fn test_plain_text_lines_split_blocks() {
        let data = MemoryDataTransfer::new().with(TEXT_MIME, "a\nb");
        let mut cx = cx();
        let mut engine = RecordingEngine::new(paragraphs(&[""]));
        insert_data(&mut cx, &mut engine, &data);
        assert_eq!(
            engine.take_commands(),
            vec![
                Command::InsertText("a".into()),
                Command::SplitNodes { always: true },
                Command::InsertText("b".into()),
            ]
        );
    }

    #[test]
    fn test_crlf_counts_as_one_break() {
        let data = MemoryDataTransfer::new().with(TEXT_MIME, "a\r\nb\rc");
        let mut cx = cx();
        let mut engine = RecordingEngine::new(paragraphs(&[""]));
        insert_data(&mut cx, &mut engine, &data);
        let splits = engine
            .take_commands()
            .iter()
            .filter(|c| matches!(c, Command::SplitNodes { .. }))
            .count();
        assert_eq!(splits, 2);
    }

    #[test]
    fn test_malformed_fragment_falls_back_to_text() {
        let data = MemoryDataTransfer::new()
            .with(FRAGMENT_MIME, "%%%not-base64")
            .with(TEXT_MIME, "plain");
        let mut cx = cx();
        let mut engine = RecordingEngine::new(paragraphs(&[""]));
        insert_data(&mut cx, &mut engine, &data);
        assert_eq!(
            engine.take_commands(),
            vec![Command::InsertText("plain".into())]
        );
    }

    #[test]
    fn test_collapsed_selection_writes_nothing_outside_void() {
        let engine = RecordingEngine::new(paragraphs(&["abc"])).with_selection(caret(&[0, 0], 1));
        let mut clipboard = MemoryDataTransfer::new();
        assert!(!set_fragment_data(&engine, &RenderPipeline::default(), &mut clipboard).unwrap());
        assert!(clipboard.entries.is_empty());
    }

    #[test]
    fn test_collapsed_selection_in_void_is_copied() {
        let doc = Document::new(vec![Node::element("image", vec![Node::text("")])]);
        let engine = RecordingEngine::new(doc).with_selection(caret(&[0, 0], 0));
        let mut clipboard = MemoryDataTransfer::new();
        assert!(set_fragment_data(&engine, &RenderPipeline::default(), &mut clipboard).unwrap());
        let pasted = decode_fragment(&clipboard.get_data(FRAGMENT_MIME)).unwrap();
        assert_eq!(pasted, engine.fragment());
    }

    #[test]
    fn test_fragment_json_shape() {
        let nodes = vec![Node::element("paragraph", vec![Node::text("hi")])];
        let json = serde_json::to_string(&nodes).unwrap();
        assert_eq!(json, r#"[{"children":[{"text":"hi"}],"type":"paragraph"}]"#);
    }
}
