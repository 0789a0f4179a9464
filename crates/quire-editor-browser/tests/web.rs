//! Browser tests. Run with `wasm-pack test --headless --firefox` (or
//! `--chrome`).

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use gloo_timers::future::TimeoutFuture;
use serde_json::{Map, Value};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Element, HtmlElement, Node};

use quire_editor_browser::render::{DecorateFn, DefaultElementRenderer, DefaultLeafRenderer};
use quire_editor_browser::{
    BrowserEditor, Capabilities, Command, DocRange, Decoration, Document, EditEngine, EditorConfig,
    Element as DocElement, NativeDom, NativePoint, NodeKind, NodeRef, Operation, OperationHook, Path,
    Point, RenderPipeline, SelectionPlatform, TypeSchema, WebDom, WebSelection, attr, detect_quirks,
    quirks,
};

wasm_bindgen_test_configure!(run_in_browser);

/// Single-paragraph engine that applies selection and text insertion.
struct TestEngine {
    doc: Document,
    schema: TypeSchema,
    selection: Option<DocRange>,
    revision: u64,
}

impl TestEngine {
    fn new(text: &str) -> Self {
        Self {
            doc: Document::new(vec![quire_editor_browser::Node::element(
                "paragraph",
                vec![quire_editor_browser::Node::text(text)],
            )]),
            schema: TypeSchema::default(),
            selection: None,
            revision: 0,
        }
    }

    fn text(&self) -> String {
        self.doc.texts().first().map(|(_, t)| t.text.clone()).unwrap_or_default()
    }
}

impl Capabilities for TestEngine {
    fn is_void(&self, element: &DocElement) -> bool {
        self.schema.is_void(element)
    }

    fn is_inline(&self, element: &DocElement) -> bool {
        self.schema.is_inline(element)
    }
}

impl EditEngine for TestEngine {
    fn document(&self) -> &Document {
        &self.doc
    }

    fn selection(&self) -> Option<&DocRange> {
        self.selection.as_ref()
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn apply(&mut self, op: Operation, hook: &mut dyn OperationHook) {
        hook.will_apply(&self.doc, &op);
        match &op {
            Operation::InsertText { offset, text, .. } => {
                if let Some(quire_editor_browser::Node::Element(p)) = self.doc.children.first_mut() {
                    if let Some(quire_editor_browser::Node::Text(t)) = p.children.first_mut() {
                        t.text.insert_str(*offset, text);
                        self.revision += 1;
                    }
                }
            }
            Operation::SetSelection { selection } => self.selection = selection.clone(),
            _ => {}
        }
        hook.did_apply(&self.doc, &op);
    }

    fn execute(&mut self, command: Command, hook: &mut dyn OperationHook) {
        match command {
            Command::Select(range) => self.apply(
                Operation::SetSelection {
                    selection: Some(range),
                },
                hook,
            ),
            Command::InsertText(text) => {
                let Some(at) = self.selection.as_ref().map(|s| s.focus.clone()) else {
                    return;
                };
                let len = text.chars().count();
                self.apply(
                    Operation::InsertText {
                        path: at.path.clone(),
                        offset: at.offset,
                        text,
                    },
                    hook,
                );
                self.apply(
                    Operation::SetSelection {
                        selection: Some(DocRange::collapsed(Point::new(at.path, at.offset + len))),
                    },
                    hook,
                );
            }
            _ => {}
        }
    }

    fn fragment(&self) -> Vec<quire_editor_browser::Node> {
        Vec::new()
    }

    fn marks(&self) -> Map<String, Value> {
        Map::new()
    }

    fn add_mark(&mut self, _key: &str, _value: Value, _hook: &mut dyn OperationHook) {}

    fn remove_mark(&mut self, _key: &str, _hook: &mut dyn OperationHook) {}
}

fn container() -> Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let container = document.create_element("div").unwrap();
    document.body().unwrap().append_child(&container).unwrap();
    container
}

fn config(id: &str) -> EditorConfig {
    EditorConfig {
        editor_id: id.into(),
        ..Default::default()
    }
}

/// The first text node under `root`.
fn first_text(root: &Node) -> Node {
    let document = web_sys::window().unwrap().document().unwrap();
    let walker = document.create_tree_walker_with_what_to_show(root, 0x4).unwrap();
    walker.next_node().unwrap().unwrap()
}

#[wasm_bindgen_test]
fn test_quirks_are_cached() {
    assert_eq!(quirks(), detect_quirks());
    assert!(quirks().has_caret_position_from_point);
}

#[wasm_bindgen_test]
fn test_web_dom_reads_nodes() {
    let root = container();
    root.set_inner_html(r#"<span id="a" data-quire-leaf="true">hi</span><!--c-->"#);
    let dom = WebDom::new(root.clone());

    let children = dom.children(&dom.editor_root());
    assert_eq!(children.len(), 2);
    assert_eq!(dom.kind(&children[0]).unwrap(), NodeKind::Element);
    assert_eq!(dom.kind(&children[1]).unwrap(), NodeKind::Comment);
    assert_eq!(dom.attribute(&children[0], attr::LEAF).as_deref(), Some("true"));

    let found = dom.find_by_id("a").unwrap();
    assert_eq!(found, children[0]);
    assert_eq!(dom.text_content(&found), "hi");
    assert!(dom.contains(&dom.editor_root(), &first_text(&found)));
    assert!(dom.find_by_id("missing").is_none());
}

#[wasm_bindgen_test]
fn test_web_selection_round_trip() {
    let root = container();
    root.set_attribute("contenteditable", "true").unwrap();
    root.set_inner_html("<p>hello</p>");
    let html: HtmlElement = root.clone().dyn_into().unwrap();
    let mut selection = WebSelection::new(html);

    let text = first_text(&root);
    selection
        .set_base_and_extent(&NativePoint::new(text.clone(), 1), &NativePoint::new(text.clone(), 4))
        .unwrap();
    let snapshot = selection.snapshot().unwrap();
    assert_eq!(snapshot.anchor, Some(NativePoint::new(text.clone(), 1)));
    assert_eq!(snapshot.focus, Some(NativePoint::new(text, 4)));

    selection.remove_all_ranges();
    let cleared = selection.snapshot().unwrap();
    assert!(cleared.anchor.is_none());
}

#[wasm_bindgen_test]
fn test_mount_renders_the_document() {
    let parent = container();
    let editor = BrowserEditor::mount(&parent, TestEngine::new("hello"), config("mount-test")).unwrap();

    let root = editor.root();
    assert_eq!(root.id(), "mount-test");
    assert_eq!(root.get_attribute(attr::CONTENT_EDITABLE).as_deref(), Some("true"));
    assert_eq!(root.get_attribute(attr::EDITOR).as_deref(), Some("true"));
    assert_eq!(root.text_content().as_deref(), Some("hello"));

    editor.set_read_only(true);
    assert!(editor.root().get_attribute(attr::CONTENT_EDITABLE).is_none());

    editor.unmount();
    assert_eq!(parent.child_element_count(), 0);
}

fn highlight_first_char(node: NodeRef<'_>, path: &Path) -> Vec<Decoration> {
    match node {
        NodeRef::Text(_) => vec![
            Decoration::new(DocRange::new(Point::new(path.clone(), 0), Point::new(path.clone(), 1)))
                .with_prop("hl", true),
        ],
        _ => Vec::new(),
    }
}

#[wasm_bindgen_test]
fn test_mount_with_custom_pipeline() {
    let parent = container();
    let pipeline = RenderPipeline::new(
        DecorateFn(highlight_first_char),
        DefaultElementRenderer,
        DefaultLeafRenderer,
    );
    let mut engine = TestEngine::new("hello");
    engine.selection = Some(DocRange::collapsed(Point::new([0, 0], 5)));
    let editor =
        BrowserEditor::mount_with_pipeline(&parent, engine, config("pipeline-test"), pipeline).unwrap();

    let leaves = editor
        .root()
        .query_selector_all(&format!("[{}]", attr::LEAF))
        .unwrap();
    assert_eq!(leaves.length(), 2);
    assert_eq!(leaves.get(0).unwrap().text_content().as_deref(), Some("h"));

    // Re-renders keep using the custom pipeline.
    editor.dispatch(Command::InsertText("!".into()));
    let leaves = editor
        .root()
        .query_selector_all(&format!("[{}]", attr::LEAF))
        .unwrap();
    assert_eq!(leaves.length(), 2);
    assert_eq!(editor.root().text_content().as_deref(), Some("hello!"));
}

#[wasm_bindgen_test]
fn test_dispatch_rerenders_and_notifies() {
    let parent = container();
    let mut engine = TestEngine::new("ab");
    engine.selection = Some(DocRange::collapsed(Point::new([0, 0], 1)));
    let editor = BrowserEditor::mount(&parent, engine, config("dispatch-test")).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let _listener = {
        let seen = seen.clone();
        EventListener::new(editor.root(), "quire-change", move |evt| {
            let detail = evt.unchecked_ref::<web_sys::CustomEvent>().detail();
            seen.borrow_mut().push(js_sys::JSON::stringify(&detail).unwrap().as_string().unwrap());
        })
    };

    editor.dispatch(Command::InsertText("X".into()));

    assert_eq!(editor.with_engine(TestEngine::text), "aXb");
    assert_eq!(editor.root().text_content().as_deref(), Some("aXb"));
    assert_eq!(
        seen.borrow().as_slice(),
        [r#"[{"children":[{"text":"aXb"}],"type":"paragraph"}]"#]
    );
}

#[wasm_bindgen_test]
async fn test_focused_selection_is_reconciled() {
    let parent = container();
    let editor = BrowserEditor::mount(&parent, TestEngine::new("hello"), config("reconcile-test")).unwrap();
    // Let the deferred listener setup run.
    TimeoutFuture::new(0).await;
    editor.focus();
    editor.dispatch(Command::Select(DocRange::new(
        Point::new([0, 0], 1),
        Point::new([0, 0], 3),
    )));

    let native = WebSelection::new(editor.root().clone()).snapshot().unwrap();
    let text = first_text(editor.root());
    assert_eq!(native.anchor, Some(NativePoint::new(text.clone(), 1)));
    assert_eq!(native.focus, Some(NativePoint::new(text, 3)));
}
