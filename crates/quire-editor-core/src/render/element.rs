use crate::document::Element;
use crate::dom::attr;
use crate::identity::NodeKey;
use crate::types::Path;
use crate::vnode::{VElement, VNode};

/// Attributes an element renderer must put on its outermost element.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementAttributes {
    pub key: NodeKey,
    pub inline: bool,
    pub void: bool,
    /// Inline voids are islands the caret must not enter.
    pub non_editable: bool,
    pub dir: Option<&'static str>,
}

impl ElementAttributes {
    pub fn apply(&self, mut el: VElement) -> VElement {
        el.set_attr(attr::NODE, "element");
        el.set_attr(attr::ID, self.key.id().as_str());
        if self.inline {
            el.set_attr(attr::INLINE, "true");
        }
        if self.void {
            el.set_attr(attr::VOID, "true");
        }
        if self.non_editable {
            el.set_attr(attr::CONTENT_EDITABLE, "false");
        }
        if let Some(dir) = self.dir {
            el.set_attr("dir", dir);
        }
        el
    }
}

pub struct RenderElementProps<'a> {
    pub element: &'a Element,
    pub path: &'a Path,
    pub attributes: ElementAttributes,
    /// Rendered children, or the hidden spacer for voids.
    pub children: Vec<VNode>,
    /// The element intersects the current selection.
    pub selected: bool,
}

pub trait ElementRenderer {
    fn render_element(&self, props: RenderElementProps<'_>) -> VNode;
}

/// `div` for blocks, `span` for inlines.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultElementRenderer;

impl ElementRenderer for DefaultElementRenderer {
    fn render_element(&self, props: RenderElementProps<'_>) -> VNode {
        let tag = if props.attributes.inline { "span" } else { "div" };
        props
            .attributes
            .apply(VElement::new(tag))
            .attr("style", "position: relative")
            .children(props.children)
            .into()
    }
}

impl ElementRenderer for Box<dyn ElementRenderer> {
    fn render_element(&self, props: RenderElementProps<'_>) -> VNode {
        (**self).render_element(props)
    }
}

/// Closure-backed element renderer.
pub struct ElementFn<F>(pub F);

impl<F> ElementRenderer for ElementFn<F>
where
    F: Fn(RenderElementProps<'_>) -> VNode,
{
    fn render_element(&self, props: RenderElementProps<'_>) -> VNode {
        (self.0)(props)
    }
}
