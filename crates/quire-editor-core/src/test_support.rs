//! Fixtures shared by the unit tests.

use serde_json::{Map, Value};

use crate::document::{Capabilities, Document, Element, Node, Text, TypeSchema};
use crate::dom::MemoryDom;
use crate::engine::{Command, EditEngine, Operation, OperationHook};
use crate::identity::IdentityRegistry;
use crate::position::Translator;
use crate::render::{Decoration, RenderPass, RenderPipeline};
use crate::types::{DocRange, Path, Point};

pub(crate) fn schema() -> TypeSchema {
    TypeSchema::new(["image", "mention"], ["link", "mention"])
}

pub(crate) fn paragraphs(texts: &[&str]) -> Document {
    Document::new(
        texts
            .iter()
            .map(|t| Node::element("paragraph", vec![Node::text(*t)]))
            .collect(),
    )
}

/// Render `doc` with the default pipeline into a fresh arena.
pub(crate) fn render_into(
    registry: &mut IdentityRegistry,
    doc: &Document,
    caps: &dyn Capabilities,
) -> MemoryDom {
    render_decorated(registry, doc, caps, &[])
}

pub(crate) fn render_decorated(
    registry: &mut IdentityRegistry,
    doc: &Document,
    caps: &dyn Capabilities,
    decorations: &[Decoration],
) -> MemoryDom {
    let pass = RenderPass {
        document: doc,
        caps,
        selection: None,
        decorations,
        read_only: false,
    };
    let root = RenderPipeline::default().render_editor(
        registry,
        &pass,
        &Default::default(),
        &Default::default(),
    );
    MemoryDom::from_vnode(&root)
}

/// A document together with its rendered surface.
pub(crate) struct Rendered {
    pub doc: Document,
    pub caps: TypeSchema,
    pub registry: IdentityRegistry,
    pub dom: MemoryDom,
}

impl Rendered {
    pub fn new(doc: Document) -> Self {
        Self::decorated(doc, &[])
    }

    /// Rendered with root-level decorations splitting the leaves.
    pub fn decorated(doc: Document, decorations: &[Decoration]) -> Self {
        let caps = schema();
        let mut registry = IdentityRegistry::new();
        let dom = render_decorated(&mut registry, &doc, &caps, decorations);
        Self {
            doc,
            caps,
            registry,
            dom,
        }
    }

    pub fn translator(&self) -> Translator<'_, MemoryDom> {
        Translator::new(&self.dom, &self.doc, &self.caps, &self.registry)
    }
}

/// Engine that records commands and applies only the operations the
/// bridge tests need.
pub(crate) struct RecordingEngine {
    pub doc: Document,
    pub caps: TypeSchema,
    pub selection: Option<DocRange>,
    pub revision: u64,
    pub commands: Vec<Command>,
    pub marks: Map<String, Value>,
}

impl RecordingEngine {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            caps: schema(),
            selection: None,
            revision: 0,
            commands: Vec::new(),
            marks: Map::new(),
        }
    }

    pub fn with_selection(mut self, range: DocRange) -> Self {
        self.selection = Some(range);
        self
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

fn text_mut<'a>(children: &'a mut [Node], path: &[usize]) -> Option<&'a mut Text> {
    let (first, rest) = path.split_first()?;
    match children.get_mut(*first)? {
        Node::Text(t) if rest.is_empty() => Some(t),
        Node::Element(el) => text_mut(&mut el.children, rest),
        Node::Text(_) => None,
    }
}

fn byte_at(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(b, _)| b).unwrap_or(s.len())
}

impl Capabilities for RecordingEngine {
    fn is_void(&self, element: &Element) -> bool {
        self.caps.is_void(element)
    }

    fn is_inline(&self, element: &Element) -> bool {
        self.caps.is_inline(element)
    }
}

impl EditEngine for RecordingEngine {
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
            Operation::InsertText { path, offset, text } => {
                if let Some(t) = text_mut(&mut self.doc.children, path) {
                    let at = byte_at(&t.text, *offset);
                    t.text.insert_str(at, text);
                    self.revision += 1;
                }
            }
            Operation::RemoveText { path, offset, text } => {
                if let Some(t) = text_mut(&mut self.doc.children, path) {
                    let at = byte_at(&t.text, *offset);
                    let end = byte_at(&t.text, offset + text.chars().count());
                    t.text.replace_range(at..end, "");
                    self.revision += 1;
                }
            }
            Operation::SetSelection { selection } => self.selection = selection.clone(),
            _ => {}
        }
        hook.did_apply(&self.doc, &op);
    }

    fn execute(&mut self, command: Command, hook: &mut dyn OperationHook) {
        self.commands.push(command.clone());
        match command {
            Command::Select(range) => self.apply(
                Operation::SetSelection {
                    selection: Some(range),
                },
                hook,
            ),
            Command::Deselect => self.apply(Operation::SetSelection { selection: None }, hook),
            Command::InsertText(text) => {
                let Some(at) = self
                    .selection
                    .as_ref()
                    .filter(|s| s.is_collapsed())
                    .map(|s| s.focus.clone())
                else {
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
                let caret = Point::new(at.path, at.offset + len);
                self.apply(
                    Operation::SetSelection {
                        selection: Some(DocRange::collapsed(caret)),
                    },
                    hook,
                );
            }
            _ => {}
        }
    }

    fn fragment(&self) -> Vec<Node> {
        let Some(selection) = &self.selection else {
            return Vec::new();
        };
        let (start, end) = selection.edges();
        let (Some(&first), Some(&last)) = (start.path.first(), end.path.first()) else {
            return Vec::new();
        };
        let mut blocks: Vec<Node> = self.doc.children[first..=last].to_vec();
        for (path, text) in self.doc.texts() {
            if path[0] < first || path[0] > last {
                continue;
            }
            let mut relative = path.to_vec();
            relative[0] -= first;
            let Some(target) = text_mut(&mut blocks, &relative) else {
                continue;
            };
            let len = text.len();
            let from = if path == start.path {
                start.offset
            } else if path < start.path {
                len
            } else {
                0
            };
            let to = if path == end.path {
                end.offset
            } else if path > end.path {
                0
            } else {
                len
            };
            let (from, to) = (byte_at(&text.text, from), byte_at(&text.text, to.max(from)));
            target.text = text.text[from..to.max(from)].to_string();
        }
        blocks
    }

    fn marks(&self) -> Map<String, Value> {
        self.marks.clone()
    }

    fn add_mark(&mut self, key: &str, value: Value, _hook: &mut dyn OperationHook) {
        self.marks.insert(key.to_string(), value);
    }

    fn remove_mark(&mut self, key: &str, _hook: &mut dyn OperationHook) {
        self.marks.remove(key);
    }
}

pub(crate) fn range(anchor: (&[usize], usize), focus: (&[usize], usize)) -> DocRange {
    DocRange::new(
        Point::new(Path::from(anchor.0), anchor.1),
        Point::new(Path::from(focus.0), focus.1),
    )
}

pub(crate) fn caret(path: &[usize], offset: usize) -> DocRange {
    DocRange::collapsed(Point::new(Path::from(path), offset))
}
