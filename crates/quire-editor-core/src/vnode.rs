//! Render output tree.
//!
//! The render pipeline produces a [`VNode`] tree. Hosts either serialize it
//! to HTML (browser) or materialize it into a [`MemoryDom`](crate::dom::MemoryDom).

use std::fmt;

use markdown_weaver_escape::{StrWrite, escape_html, escape_html_body_text};
use smol_str::SmolStr;

/// Elements serialized without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr"];

#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Element(VElement),
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct VElement {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    pub children: Vec<VNode>,
}

impl VElement {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing any existing value.
    pub fn attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_attr(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.push_text(&mut out);
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut writer = HtmlWriter::default();
        match self.write_html(&mut writer) {
            Ok(()) => writer.out,
            Err(_) => String::new(),
        }
    }

    /// Serialized children only; used when the host owns the outer element.
    pub fn inner_html(&self) -> String {
        let mut writer = HtmlWriter::default();
        for child in &self.children {
            if child.write_html(&mut writer).is_err() {
                return String::new();
            }
        }
        writer.out
    }

    pub fn write_html<W: StrWrite>(&self, w: &mut W) -> Result<(), W::Error> {
        w.write_str("<")?;
        w.write_str(&self.tag)?;
        for (name, value) in &self.attrs {
            w.write_str(" ")?;
            w.write_str(name)?;
            w.write_str("=\"")?;
            escape_html(&mut *w, value)?;
            w.write_str("\"")?;
        }
        w.write_str(">")?;
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return Ok(());
        }
        for child in &self.children {
            child.write_html(w)?;
        }
        w.write_str("</")?;
        w.write_str(&self.tag)?;
        w.write_str(">")
    }
}

impl VNode {
    pub fn text(text: impl Into<String>) -> Self {
        VNode::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&VElement> {
        match self {
            VNode::Element(el) => Some(el),
            VNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut VElement> {
        match self {
            VNode::Element(el) => Some(el),
            VNode::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            VNode::Text(t) => out.push_str(t),
            VNode::Element(el) => {
                for child in &el.children {
                    child.push_text(out);
                }
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut writer = HtmlWriter::default();
        match self.write_html(&mut writer) {
            Ok(()) => writer.out,
            Err(_) => String::new(),
        }
    }

    pub fn write_html<W: StrWrite>(&self, w: &mut W) -> Result<(), W::Error> {
        match self {
            VNode::Text(text) => escape_html_body_text(&mut *w, text),
            VNode::Element(el) => el.write_html(w),
        }
    }

    /// Depth-first visit of every element, parents first.
    pub fn visit_elements_mut(&mut self, f: &mut impl FnMut(&mut VElement)) {
        if let VNode::Element(el) = self {
            f(el);
            for child in &mut el.children {
                child.visit_elements_mut(f);
            }
        }
    }
}

impl From<VElement> for VNode {
    fn from(el: VElement) -> Self {
        VNode::Element(el)
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::Text(text.to_string())
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::Text(text)
    }
}

#[derive(Default)]
struct HtmlWriter {
    out: String,
}

impl StrWrite for HtmlWriter {
    type Error = fmt::Error;

    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(&mut self.out, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_attributes_and_void_tags() {
        let el = VElement::new("span")
            .attr("data-quire-zero-width", "n")
            .attr("data-quire-length", "0")
            .child("\u{FEFF}")
            .child(VElement::new("br"));
        assert_eq!(
            el.to_html(),
            "<span data-quire-zero-width=\"n\" data-quire-length=\"0\">\u{FEFF}<br></span>"
        );
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let el = VElement::new("span").attr("title", "a<b").child("x & y");
        insta::assert_snapshot!(el.to_html(), @r#"<span title="a&lt;b">x &amp; y</span>"#);
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut el = VElement::new("div").attr("id", "a");
        el.set_attr("id", "b");
        assert_eq!(el.get_attr("id"), Some("b"));
        assert_eq!(el.attrs.len(), 1);
        el.remove_attr("id");
        assert_eq!(el.get_attr("id"), None);
    }
}
