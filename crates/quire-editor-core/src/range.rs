//! Range translation on top of [`Translator`] point translation.

use crate::dom::{NativeDom, NativePoint, NativeRange, NativeSelection, attr};
use crate::error::{BridgeError, Result};
use crate::platform::Quirks;
use crate::position::Translator;
use crate::types::{DocRange, Path, Point};

/// Native input to [`Translator::to_document_range`].
#[derive(Clone, Debug)]
pub enum NativeRangeInput<N> {
    /// A live selection, which carries its own direction.
    Selection(NativeSelection<N>),
    /// An immutable start/end range, read as forward.
    Static(NativeRange<N>),
}

impl<N> From<NativeSelection<N>> for NativeRangeInput<N> {
    fn from(selection: NativeSelection<N>) -> Self {
        NativeRangeInput::Selection(selection)
    }
}

impl<N> From<NativeRange<N>> for NativeRangeInput<N> {
    fn from(range: NativeRange<N>) -> Self {
        NativeRangeInput::Static(range)
    }
}

impl<D: NativeDom> Translator<'_, D> {
    /// Document range to a native start/end range in document order.
    pub fn to_native_range(&self, range: &DocRange) -> Result<NativeRange<D::Node>> {
        let anchor = self.to_native(&range.anchor)?;
        let focus = if range.is_collapsed() {
            anchor.clone()
        } else {
            self.to_native(&range.focus)?
        };
        let (start, end) = if range.is_backward() {
            (focus, anchor)
        } else {
            (anchor, focus)
        };
        Ok(NativeRange::new(
            self.selection_point(start),
            self.selection_point(end),
        ))
    }

    /// Native endpoints for base/extent assignment, keeping the direction of
    /// `range`: the first point is the anchor.
    pub fn to_native_endpoints(
        &self,
        range: &DocRange,
    ) -> Result<(NativePoint<D::Node>, NativePoint<D::Node>)> {
        let native = self.to_native_range(range)?;
        Ok(if range.is_backward() {
            (native.end, native.start)
        } else {
            (native.start, native.end)
        })
    }

    pub fn to_document_range(
        &self,
        input: impl Into<NativeRangeInput<D::Node>>,
    ) -> Result<DocRange> {
        let (anchor, focus) = match input.into() {
            NativeRangeInput::Selection(selection) => {
                let collapsed = selection.is_collapsed();
                match (selection.anchor, selection.focus) {
                    (Some(anchor), Some(focus)) => {
                        let anchor = self.to_document(&anchor)?;
                        let focus = if collapsed {
                            anchor.clone()
                        } else {
                            self.to_document(&focus)?
                        };
                        (anchor, focus)
                    }
                    _ => {
                        return Err(BridgeError::resolution(
                            "native selection",
                            "selection holds no range",
                        ));
                    }
                }
            }
            NativeRangeInput::Static(range) => {
                let start = self.to_document(&range.start)?;
                let end = if range.is_collapsed() {
                    start.clone()
                } else {
                    self.to_document(&range.end)?
                };
                (start, end)
            }
        };
        Ok(DocRange::new(anchor, focus))
    }

    /// Collapsed document range under a pointer event at (`x`, `y`).
    ///
    /// Events over a void resolve to the void's near edge; elsewhere the
    /// platform's caret hit-test is used, or the start of `target` when the
    /// platform has none.
    pub fn event_range(&self, target: &D::Node, x: f64, y: f64, quirks: &Quirks) -> Result<DocRange> {
        if self.is_target_inside_void(target) {
            let path = self.path_of_native(target)?;
            let element = self.native_node(self.key_of(target)?)?;
            let rect = self
                .dom
                .bounding_rect(&element)
                .ok_or_else(|| BridgeError::resolution("event target", "void has no layout"))?;
            let is_prev = if self.is_inline_at(&path) {
                x - rect.left < rect.left + rect.width - x
            } else {
                y - rect.top < rect.top + rect.height - y
            };
            let edge = if is_prev {
                self.document.point_before(&path)
            } else {
                self.document.point_after(&path)
            };
            let point = edge
                .or_else(|| self.document.start(&path))
                .ok_or_else(|| BridgeError::resolution("event target", "void has no text"))?;
            return Ok(DocRange::collapsed(point));
        }

        let native = if quirks.has_caret_position_from_point {
            self.dom
                .caret_from_point(x, y)
                .ok_or_else(|| BridgeError::resolution("event target", "no caret at pointer"))?
        } else {
            NativePoint::new(target.clone(), 0)
        };
        let point: Point = self.to_document(&native)?;
        Ok(DocRange::collapsed(point))
    }

    fn is_inline_at(&self, path: &Path) -> bool {
        self.document
            .node(path)
            .is_some_and(|node| node.is_inline(self.caps))
    }

    /// Native selections report a caret in a zero-width run after its
    /// synthetic character.
    fn selection_point(&self, point: NativePoint<D::Node>) -> NativePoint<D::Node> {
        let in_zero_width = self
            .dom
            .element_of(&point.node)
            .ok()
            .flatten()
            .is_some_and(|el| self.dom.has_attribute(&el, attr::ZERO_WIDTH));
        if in_zero_width {
            NativePoint::new(point.node, 1)
        } else {
            point
        }
    }
}
