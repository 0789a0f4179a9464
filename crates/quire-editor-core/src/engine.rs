//! The edit engine seam.
//!
//! The engine owns the document, the selection, normalization and history.
//! The bridge only ever asks it questions and hands it intents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{Capabilities, Document, Node};
use crate::types::{DocRange, Edge, Path};

/// Granularity of a deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteUnit {
    Character,
    Word,
    Line,
    Block,
}

/// Granularity of a caret move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveUnit {
    Character,
    Word,
    Line,
}

/// High-level intents the bridge dispatches.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Select(DocRange),
    Deselect,
    InsertText(String),
    InsertFragment(Vec<Node>),
    InsertBreak,
    DeleteFragment,
    DeleteBackward(DeleteUnit),
    DeleteForward(DeleteUnit),
    SplitNodes {
        always: bool,
    },
    /// Move the caret; `edge` limits the move to one end (extends the selection).
    Move {
        unit: MoveUnit,
        reverse: bool,
        edge: Option<Edge>,
    },
    Collapse(Edge),
    Undo,
    Redo,
}

/// Normalized low-level operations an engine applies.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
        node: Node,
    },
    SplitNode {
        path: Path,
        position: usize,
    },
    MergeNode {
        path: Path,
        position: usize,
    },
    WrapNode {
        path: Path,
        element: Node,
    },
    UnwrapNode {
        path: Path,
    },
    MoveNode {
        path: Path,
        new_path: Path,
    },
    SetNode {
        path: Path,
        properties: Map<String, Value>,
    },
    SetSelection {
        selection: Option<DocRange>,
    },
}

impl Operation {
    /// Deepest path whose ancestors (inclusive) keep their identity across
    /// this operation. `None` means nothing is carried over.
    pub fn identity_anchor(&self) -> Option<Path> {
        match self {
            Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::SetNode { path, .. } => Some(path.clone()),
            Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::WrapNode { path, .. }
            | Operation::UnwrapNode { path } => Some(path.parent()),
            Operation::MoveNode { .. } | Operation::SetSelection { .. } => None,
        }
    }
}

/// Called by the engine around every operation it applies.
pub trait OperationHook {
    fn will_apply(&mut self, document: &Document, op: &Operation);
    fn did_apply(&mut self, document: &Document, op: &Operation);
}

impl OperationHook for () {
    fn will_apply(&mut self, _: &Document, _: &Operation) {}
    fn did_apply(&mut self, _: &Document, _: &Operation) {}
}

/// The external editing engine.
///
/// Engines must invoke the hook around each operation they apply,
/// including those produced while executing a [`Command`].
pub trait EditEngine: Capabilities {
    fn document(&self) -> &Document;

    fn selection(&self) -> Option<&DocRange>;

    /// Content revision; changes whenever the document changes.
    fn revision(&self) -> u64;

    fn apply(&mut self, op: Operation, hook: &mut dyn OperationHook);

    fn execute(&mut self, command: Command, hook: &mut dyn OperationHook);

    /// Content of the current selection.
    fn fragment(&self) -> Vec<Node>;

    /// Marks that the next insertion will carry.
    fn marks(&self) -> Map<String, Value>;

    fn add_mark(&mut self, key: &str, value: Value, hook: &mut dyn OperationHook);

    fn remove_mark(&mut self, key: &str, hook: &mut dyn OperationHook);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_anchor_levels() {
        let text_op = Operation::InsertText {
            path: Path::from([0, 1]),
            offset: 0,
            text: "x".into(),
        };
        assert_eq!(text_op.identity_anchor(), Some(Path::from([0, 1])));

        let split = Operation::SplitNode {
            path: Path::from([0, 1]),
            position: 2,
        };
        assert_eq!(split.identity_anchor(), Some(Path::from([0])));

        let moved = Operation::MoveNode {
            path: Path::from([0]),
            new_path: Path::from([2]),
        };
        assert_eq!(moved.identity_anchor(), None);
    }
}
