//! Render pipeline: document tree to native element tree.
//!
//! Each pass re-keys the tree, rebuilds the identity links and emits the
//! marker attributes the translators later read back. The host decides
//! presentation through three provider seams, each with a default:
//!
//! - [`Decorate`]: transient ranges layered over the text
//! - [`ElementRenderer`]: the element shell around rendered children
//! - [`LeafRenderer`]: the wrapper around each leaf's string run

pub mod decorate;
pub mod element;
pub mod leaf;

pub use decorate::{Decorate, DecorateFn, Decoration, PLACEHOLDER};
pub use element::{
    DefaultElementRenderer, ElementAttributes, ElementFn, ElementRenderer, RenderElementProps,
};
pub use leaf::{
    DefaultLeafRenderer, Leaf, LeafAttributes, LeafFn, LeafRenderer, RenderLeafProps,
    split_leaves,
};

use smol_str::format_smolstr;

use crate::config::EditorConfig;
use crate::document::{Capabilities, Document, Element, Node, NodeRef, Text};
use crate::dom::{ZERO_WIDTH_CHAR, attr};
use crate::identity::{IdentityRegistry, NodeKey};
use crate::platform::Quirks;
use crate::types::{DocRange, Path};
use crate::vnode::{VElement, VNode};

const SPACER_STYLE: &str = "height: 0; color: transparent; outline: none; position: absolute";
const PLACEHOLDER_STYLE: &str = "pointer-events: none; display: inline-block; width: 0; \
     max-width: 100%; white-space: nowrap; opacity: 0.333; user-select: none";
const EDITOR_STYLE: &str = "outline: none; white-space: pre-wrap; overflow-wrap: break-word";

/// Inputs for one render pass.
pub struct RenderPass<'a> {
    pub document: &'a Document,
    pub caps: &'a dyn Capabilities,
    pub selection: Option<&'a DocRange>,
    /// Root-level decorations, typically from [`RenderPipeline::root_decorations`].
    pub decorations: &'a [Decoration],
    pub read_only: bool,
}

/// Renderer configuration. Generic over the three provider seams so hosts
/// only pay for the customisation they use.
pub struct RenderPipeline<D = (), R = DefaultElementRenderer, L = DefaultLeafRenderer> {
    pub decorate: D,
    pub element: R,
    pub leaf: L,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self {
            decorate: (),
            element: DefaultElementRenderer,
            leaf: DefaultLeafRenderer,
        }
    }
}

impl<D, R, L> RenderPipeline<D, R, L> {
    pub fn new(decorate: D, element: R, leaf: L) -> Self {
        Self {
            decorate,
            element,
            leaf,
        }
    }
}

impl<D: Decorate, R: ElementRenderer, L: LeafRenderer> RenderPipeline<D, R, L> {
    /// Decorations for the root, plus the placeholder when the document is
    /// a single empty block.
    pub fn root_decorations(&self, document: &Document, placeholder: Option<&str>) -> Vec<Decoration> {
        let mut out = self
            .decorate
            .decorate(NodeRef::Document(document), &Path::root());
        if let Some(text) = placeholder.filter(|p| !p.is_empty()) {
            let texts = document.texts();
            let empty = document.children.len() == 1 && texts.len() == 1 && texts[0].1.is_empty();
            if let Some(start) = document.start(&Path::root()).filter(|_| empty) {
                out.push(Decoration::placeholder(start, text));
            }
        }
        out
    }

    /// Render the document's children, rebuilding every identity link.
    pub fn render_children(&self, registry: &mut IdentityRegistry, pass: &RenderPass<'_>) -> Vec<VNode> {
        let root_key = registry.begin_pass(pass.document);
        let mut walker = Walker {
            pipeline: self,
            registry,
            pass,
        };
        let children = walker.children(
            NodeRef::Document(pass.document),
            &Path::root(),
            root_key,
            pass.selection.cloned(),
            pass.decorations,
        );
        tracing::trace!(
            target: "quire::render",
            blocks = children.len(),
            decorations = pass.decorations.len(),
            "render pass complete"
        );
        children
    }

    /// Render the full editor root element.
    pub fn render_editor(
        &self,
        registry: &mut IdentityRegistry,
        pass: &RenderPass<'_>,
        config: &EditorConfig,
        quirks: &Quirks,
    ) -> VElement {
        let children = self.render_children(registry, pass);
        editor_root(config, quirks).children(children)
    }

    /// Render detached nodes (a clipboard fragment) with a scratch registry.
    pub fn render_fragment(&self, nodes: &[Node], caps: &dyn Capabilities) -> Vec<VNode> {
        let document = Document::new(nodes.to_vec());
        let mut registry = IdentityRegistry::new();
        let pass = RenderPass {
            document: &document,
            caps,
            selection: None,
            decorations: &[],
            read_only: false,
        };
        self.render_children(&mut registry, &pass)
    }
}

/// Attributes of the editor root element.
pub fn editor_root(config: &EditorConfig, quirks: &Quirks) -> VElement {
    // Without beforeinput the native autocorrect would edit the DOM behind
    // our back.
    let (spellcheck, auto_correct, auto_capitalize) = if quirks.has_before_input_support {
        (
            config.spellcheck,
            config.auto_correct.as_str(),
            config.auto_capitalize.as_str(),
        )
    } else {
        (false, "off", "none")
    };
    let mut root = VElement::new("div")
        .attr(attr::ID, config.editor_id.as_str())
        .attr(attr::EDITOR, "true")
        .attr(attr::NODE, "editor")
        .attr("role", "textbox")
        .attr("spellcheck", spellcheck.to_string())
        .attr("autocorrect", auto_correct)
        .attr("autocapitalize", auto_capitalize)
        .attr("data-gramm", "false")
        .attr("style", EDITOR_STYLE);
    if !config.read_only {
        root.set_attr(attr::CONTENT_EDITABLE, "true");
    }
    root
}

struct Walker<'p, 'a, D, R, L> {
    pipeline: &'p RenderPipeline<D, R, L>,
    registry: &'p mut IdentityRegistry,
    pass: &'p RenderPass<'a>,
}

impl<'p, 'a, D: Decorate, R: ElementRenderer, L: LeafRenderer> Walker<'p, 'a, D, R, L> {
    fn children(
        &mut self,
        parent: NodeRef<'a>,
        parent_path: &Path,
        parent_key: NodeKey,
        selection: Option<DocRange>,
        decorations: &[Decoration],
    ) -> Vec<VNode> {
        let caps = self.pass.caps;
        let is_leaf_block = matches!(
            parent,
            NodeRef::Element(el) if !caps.is_inline(el) && el.has_inlines(caps)
        );
        let children = parent.children();
        let mut out = Vec::with_capacity(children.len());

        for (i, child) in children.iter().enumerate() {
            let path = parent_path.child(i);
            let key = self.registry.link(child, parent_key, i);
            let range = self.pass.document.range_of(&path);
            let selected = match (&selection, &range) {
                (Some(sel), Some(range)) => sel.intersection(range),
                _ => None,
            };
            let mut ds = self.pipeline.decorate.decorate(child.into(), &path);
            if let Some(range) = &range {
                ds.extend(decorations.iter().filter_map(|d| d.clip(range)));
            }

            out.push(match child {
                Node::Element(el) => self.element(el, &path, key, selected, ds),
                Node::Text(text) => {
                    let is_last = is_leaf_block && i + 1 == children.len();
                    self.text(text, &path, key, parent, &ds, is_last)
                }
            });
        }
        out
    }

    fn element(
        &mut self,
        element: &'a Element,
        path: &Path,
        key: NodeKey,
        selection: Option<DocRange>,
        decorations: Vec<Decoration>,
    ) -> VNode {
        let caps = self.pass.caps;
        let inline = caps.is_inline(element);
        let void = caps.is_void(element);
        let mut attributes = ElementAttributes {
            key,
            inline,
            void,
            non_editable: false,
            dir: None,
        };
        if !inline && element.has_inlines(caps) && is_rtl(&element.string()) {
            attributes.dir = Some("rtl");
        }

        let children = if void {
            attributes.non_editable = !self.pass.read_only && inline;
            self.registry.link_children(&element.children, key);
            if self.pass.read_only {
                Vec::new()
            } else {
                self.spacer(element, path, inline)
            }
        } else {
            self.children(
                NodeRef::Element(element),
                path,
                key,
                selection.clone(),
                &decorations,
            )
        };

        self.pipeline.element.render_element(RenderElementProps {
            element,
            path,
            attributes,
            children,
            selected: selection.is_some(),
        })
    }

    /// Hidden editable text inside a void, so the caret has somewhere to sit.
    fn spacer(&mut self, element: &'a Element, path: &Path, inline: bool) -> Vec<VNode> {
        let Some((relative, text)) = element.first_text() else {
            return Vec::new();
        };
        let text_path = path.join(&relative);
        let key = self.registry.identity_of(text);
        let parent = self
            .pass
            .document
            .node(&text_path.parent())
            .unwrap_or(NodeRef::Element(element));
        let rendered = self.text(text, &text_path, key, parent, &[], false);
        let tag = if inline { "span" } else { "div" };
        vec![
            VElement::new(tag)
                .attr(attr::SPACER, "true")
                .attr("style", SPACER_STYLE)
                .child(rendered)
                .into(),
        ]
    }

    fn text(
        &mut self,
        text: &'a Text,
        path: &Path,
        key: NodeKey,
        parent: NodeRef<'a>,
        decorations: &[Decoration],
        is_last: bool,
    ) -> VNode {
        let leaves = split_leaves(&text.text, path, decorations);
        let count = leaves.len();
        let children = leaves
            .iter()
            .enumerate()
            .map(|(i, leaf)| self.leaf(leaf, text, key, i, parent, is_last && i + 1 == count))
            .collect::<Vec<_>>();
        VElement::new("span")
            .attr(attr::NODE, "text")
            .attr(attr::ID, key.id().as_str())
            .children(children)
            .into()
    }

    fn leaf(
        &self,
        leaf: &Leaf<'_>,
        text: &Text,
        key: NodeKey,
        index: usize,
        parent: NodeRef<'_>,
        is_last: bool,
    ) -> VNode {
        let mut children = Vec::with_capacity(2);
        if let Some(placeholder) = leaf.placeholder() {
            children.push(
                VElement::new("span")
                    .attr(attr::CONTENT_EDITABLE, "false")
                    .attr("class", "placeholder")
                    .attr("style", PLACEHOLDER_STYLE)
                    .child(placeholder)
                    .into(),
            );
        }
        children.push(self.string(leaf, text, parent, is_last));
        self.pipeline.leaf.render_leaf(RenderLeafProps {
            leaf,
            text,
            attributes: LeafAttributes {
                id: format_smolstr!("{key}-{index}"),
            },
            children,
        })
    }

    /// The innermost run the translators measure.
    fn string(&self, leaf: &Leaf<'_>, text: &Text, parent: NodeRef<'_>, is_last: bool) -> VNode {
        let caps = self.pass.caps;
        if let Some(el) = parent.as_element().filter(|el| caps.is_void(el)) {
            return zero_width(false, el.string().chars().count());
        }
        let is_last_text = matches!(
            parent.children().last(),
            Some(Node::Text(t)) if std::ptr::eq(t, text)
        );
        if leaf.text.is_empty()
            && is_last_text
            && !parent.is_inline(caps)
            && parent.string().is_empty()
        {
            return zero_width(true, 0);
        }
        if leaf.text.is_empty() {
            return zero_width(false, 0);
        }
        if is_last && leaf.text.ends_with('\n') {
            // A trailing newline only takes up vertical space if something follows it.
            return string_run(format!("{} ", leaf.text))
                .attr(attr::LENGTH, leaf.text.chars().count().to_string())
                .into();
        }
        string_run(leaf.text.to_string()).into()
    }
}

fn string_run(text: String) -> VElement {
    VElement::new("span").attr(attr::STRING, "true").child(text)
}

/// Zero-width placeholder run. `line_break` marks the empty-block variant,
/// which also needs a `<br>` to keep the line open.
fn zero_width(line_break: bool, length: usize) -> VNode {
    let mut el = VElement::new("span")
        .attr(attr::ZERO_WIDTH, if line_break { "n" } else { "z" })
        .attr(attr::LENGTH, length.to_string())
        .child(ZERO_WIDTH_CHAR.to_string());
    if line_break {
        el = el.child(VElement::new("br"));
    }
    el.into()
}

/// Base direction from the first strong character.
fn is_rtl(text: &str) -> bool {
    let info = unicode_bidi::BidiInfo::new(text, None);
    info.paragraphs.first().is_some_and(|p| p.level.is_rtl())
}
