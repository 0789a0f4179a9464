use serde_json::{Map, Value};

use crate::document::NodeRef;
use crate::types::{DocRange, Path, Point};

/// Decoration property that turns a leaf into a placeholder host.
pub const PLACEHOLDER: &str = "placeholder";

/// Transient formatting over a document range. Never stored in the document.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoration {
    pub range: DocRange,
    pub props: Map<String, Value>,
}

impl Decoration {
    pub fn new(range: DocRange) -> Self {
        Self {
            range,
            props: Map::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    /// Collapsed placeholder decoration at `at`.
    pub fn placeholder(at: Point, text: &str) -> Self {
        Self::new(DocRange::collapsed(at)).with_prop(PLACEHOLDER, text)
    }

    pub fn placeholder_text(&self) -> Option<&str> {
        self.props.get(PLACEHOLDER).and_then(Value::as_str)
    }

    /// This decoration clipped to `range`.
    pub fn clip(&self, range: &DocRange) -> Option<Decoration> {
        self.range.intersection(range).map(|range| Decoration {
            range,
            props: self.props.clone(),
        })
    }
}

/// Computes decorations for a node during rendering.
pub trait Decorate {
    fn decorate(&self, node: NodeRef<'_>, path: &Path) -> Vec<Decoration>;
}

impl Decorate for () {
    fn decorate(&self, _: NodeRef<'_>, _: &Path) -> Vec<Decoration> {
        Vec::new()
    }
}

impl Decorate for Box<dyn Decorate> {
    fn decorate(&self, node: NodeRef<'_>, path: &Path) -> Vec<Decoration> {
        (**self).decorate(node, path)
    }
}

/// Closure-backed decorator.
pub struct DecorateFn<F>(pub F);

impl<F> Decorate for DecorateFn<F>
where
    F: Fn(NodeRef<'_>, &Path) -> Vec<Decoration>,
{
    fn decorate(&self, node: NodeRef<'_>, path: &Path) -> Vec<Decoration> {
        (self.0)(node, path)
    }
}
