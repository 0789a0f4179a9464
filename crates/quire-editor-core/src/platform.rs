//! Platform capability table and the native selection seam.
//!
//! Browser differences are folded into a [`Quirks`] value computed once by
//! the host; the bridge branches on its flags and never sniffs anything
//! itself.

use crate::dom::{NativePoint, NativeSelection};
use crate::error::NativeError;

/// Capability and bug flags for the hosting browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quirks {
    /// `beforeinput` is delivered with usable input types and target ranges.
    pub has_before_input_support: bool,
    /// Apple keyboard conventions (Cmd as the primary modifier).
    pub is_apple: bool,
    /// No `beforeinput` arrives for committed IME text, so composition end
    /// has to insert it.
    pub composition_end_inserts_text: bool,
    /// Programmatic selection changes blur the editor and need a refocus.
    pub refocus_after_selection: bool,
    /// Focus landing on a nested editable must be redirected to the root.
    pub redirect_nested_focus: bool,
    /// Dropped content does not arrive through `beforeinput`.
    pub drop_needs_manual_insert: bool,
    /// `caretPositionFromPoint` (or an equivalent) is available.
    pub has_caret_position_from_point: bool,
}

impl Default for Quirks {
    /// A modern Chromium-like engine.
    fn default() -> Self {
        Self {
            has_before_input_support: true,
            is_apple: false,
            composition_end_inserts_text: true,
            refocus_after_selection: false,
            redirect_nested_focus: false,
            drop_needs_manual_insert: true,
            has_caret_position_from_point: true,
        }
    }
}

/// Read/write access to the live native selection.
pub trait SelectionPlatform<N> {
    /// Snapshot of the current selection; `None` if the platform has none.
    fn snapshot(&self) -> Option<NativeSelection<N>>;

    fn set_base_and_extent(
        &mut self,
        anchor: &NativePoint<N>,
        focus: &NativePoint<N>,
    ) -> Result<(), NativeError>;

    fn remove_all_ranges(&mut self);

    /// Bring the element containing `node` into view.
    fn scroll_into_view(&mut self, node: &N);

    /// Move keyboard focus to the editor root.
    fn focus_editor(&mut self);
}

/// In-memory selection used by tests and headless hosts.
#[derive(Clone, Debug)]
pub struct MemorySelection<N> {
    pub current: NativeSelection<N>,
    /// Count of programmatic writes, for asserting idempotence.
    pub writes: usize,
    pub scrolled: Vec<N>,
    pub focus_requests: usize,
}

impl<N: Clone + PartialEq> Default for MemorySelection<N> {
    fn default() -> Self {
        Self {
            current: NativeSelection::empty(),
            writes: 0,
            scrolled: Vec::new(),
            focus_requests: 0,
        }
    }
}

impl<N: Clone + PartialEq> MemorySelection<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the selection as a user would, without counting a write.
    pub fn place(&mut self, anchor: NativePoint<N>, focus: NativePoint<N>) {
        self.current = NativeSelection::new(anchor, focus);
    }
}

impl<N: Clone + PartialEq> SelectionPlatform<N> for MemorySelection<N> {
    fn snapshot(&self) -> Option<NativeSelection<N>> {
        Some(self.current.clone())
    }

    fn set_base_and_extent(
        &mut self,
        anchor: &NativePoint<N>,
        focus: &NativePoint<N>,
    ) -> Result<(), NativeError> {
        self.writes += 1;
        self.current = NativeSelection::new(anchor.clone(), focus.clone());
        Ok(())
    }

    fn remove_all_ranges(&mut self) {
        self.writes += 1;
        self.current = NativeSelection::empty();
    }

    fn scroll_into_view(&mut self, node: &N) {
        self.scrolled.push(node.clone());
    }

    fn focus_editor(&mut self) {
        self.focus_requests += 1;
    }
}
