use super::{NativeDom, NativePoint, attr, utf16_len};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    Forward,
    Backward,
}

/// Push an element-level point down to a concrete leaf.
///
/// Elements report offsets as child indices. This descends into the child
/// at that index (or the last child, when the offset sits past the end),
/// skipping comments, empty elements and non-editable islands, until it
/// reaches a node with no children. The offset becomes 0, or the leaf's
/// text length when approached from the end.
pub fn normalize_point<D: NativeDom>(
    dom: &D,
    point: &NativePoint<D::Node>,
) -> NativePoint<D::Node> {
    let mut node = point.node.clone();
    let mut offset = point.offset;

    if !dom.is_element(&node) {
        return NativePoint::new(node, offset);
    }
    let children = dom.children(&node);
    if children.is_empty() {
        return NativePoint::new(node, offset);
    }

    let mut is_last = offset >= children.len();
    let index = if is_last { children.len() - 1 } else { offset };
    let step = if is_last { Step::Backward } else { Step::Forward };
    let (child, found) = editable_child(dom, &children, index, step);

    // A backward search that landed before the requested index means the
    // caret belongs at the end of that child.
    is_last = found < offset;
    node = child;

    while dom.is_element(&node) {
        let children = dom.children(&node);
        if children.is_empty() {
            break;
        }
        let (index, step) = if is_last {
            (children.len() - 1, Step::Backward)
        } else {
            (0, Step::Forward)
        };
        node = editable_child(dom, &children, index, step).0;
    }

    offset = if is_last {
        utf16_len(&dom.text_content(&node))
    } else {
        0
    };
    NativePoint::new(node, offset)
}

fn is_skippable<D: NativeDom>(dom: &D, node: &D::Node) -> bool {
    if dom.is_comment(node) {
        return true;
    }
    dom.is_element(node)
        && (dom.children(node).is_empty()
            || dom.attribute(node, attr::CONTENT_EDITABLE).as_deref() == Some("false"))
}

/// Nearest usable sibling around `index`, trying `step` first and then the
/// other direction. Returns the original child when nothing better exists.
fn editable_child<D: NativeDom>(
    dom: &D,
    children: &[D::Node],
    mut index: usize,
    mut step: Step,
) -> (D::Node, usize) {
    let len = children.len() as isize;
    let mut child = children[index].clone();
    let mut i = index as isize;
    let mut tried_forward = false;
    let mut tried_backward = false;

    while is_skippable(dom, &child) {
        if tried_forward && tried_backward {
            break;
        }
        if i >= len {
            tried_forward = true;
            i = index as isize - 1;
            step = Step::Backward;
            continue;
        }
        if i < 0 {
            tried_backward = true;
            i = index as isize + 1;
            step = Step::Forward;
            continue;
        }
        child = children[i as usize].clone();
        index = i as usize;
        i += match step {
            Step::Forward => 1,
            Step::Backward => -1,
        };
    }
    (child, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn test_text_point_is_unchanged() {
        let mut dom = MemoryDom::new("div", &[]);
        let root = dom.root();
        let text = dom.append_text(root, "abc");
        let p = normalize_point(&dom, &NativePoint::new(text, 2));
        assert_eq!(p, NativePoint::new(text, 2));
    }

    #[test]
    fn test_element_offset_descends_to_leaf() {
        let mut dom = MemoryDom::new("div", &[]);
        let root = dom.root();
        let a = dom.append_element(root, "span", &[]);
        let a_text = dom.append_text(a, "ab");
        let b = dom.append_element(root, "span", &[]);
        let b_text = dom.append_text(b, "cde");

        assert_eq!(
            normalize_point(&dom, &NativePoint::new(root, 1)),
            NativePoint::new(b_text, 0)
        );
        // Past the end lands at the end of the last leaf.
        assert_eq!(
            normalize_point(&dom, &NativePoint::new(root, 2)),
            NativePoint::new(b_text, 3)
        );
        assert_eq!(
            normalize_point(&dom, &NativePoint::new(root, 0)),
            NativePoint::new(a_text, 0)
        );
    }

    #[test]
    fn test_skips_comments_and_non_editable() {
        let mut dom = MemoryDom::new("div", &[]);
        let root = dom.root();
        dom.append_comment(root, "marker");
        let island = dom.append_element(root, "span", &[("contenteditable", "false")]);
        dom.append_text(island, "placeholder");
        let span = dom.append_element(root, "span", &[]);
        let text = dom.append_text(span, "real");

        assert_eq!(
            normalize_point(&dom, &NativePoint::new(root, 0)),
            NativePoint::new(text, 0)
        );
    }
}
