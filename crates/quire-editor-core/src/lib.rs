//! quire-editor-core: the model/DOM bridge of the quire rich-text editor.
//!
//! The editing engine owns a tree document; the browser owns an editable
//! element tree. This crate keeps the two in correspondence without
//! depending on either:
//!
//! - `identity`: stable node keys across immutable document versions
//! - `position`, `range`: document points/ranges to native ones and back
//! - `render`: document tree to a virtual element tree with marker attributes
//! - `events`: native input events to engine commands
//! - `reconcile`: engine selection back onto the native selection
//! - `fragment`: clipboard and drag payloads
//!
//! The native surface is reached through the [`NativeDom`] and
//! [`SelectionPlatform`] traits; `quire-editor-browser` implements them on
//! `web-sys`, and [`MemoryDom`] implements them in memory.

pub mod config;
pub mod context;
pub mod document;
pub mod dom;
pub mod editable;
pub mod engine;
pub mod error;
pub mod events;
pub mod fragment;
pub mod identity;
pub mod keys;
pub mod platform;
pub mod position;
pub mod range;
pub mod reconcile;
pub mod render;
pub mod types;
pub mod vnode;

#[cfg(test)]
mod test_support;

pub use config::{AutoCapitalize, AutoCorrect, EditorConfig};
pub use context::{BridgeContext, HostEvent, Phase};
pub use document::{Capabilities, Document, Element, Node, NodeRef, Text, TypeSchema};
pub use dom::{
    MemNodeId, MemoryDom, NativeDom, NativePoint, NativeRange, NativeSelection, NodeKind, Rect,
    ZERO_WIDTH_CHAR, attr,
};
pub use editable::Editable;
pub use engine::{Command, DeleteUnit, EditEngine, MoveUnit, Operation, OperationHook};
pub use error::{BridgeError, NativeError, Result};
pub use events::{EventEnv, EventKind, EventResult, InputData, NativeEvent, handle_event};
pub use fragment::{
    DataTransfer, FRAGMENT_MIME, FragmentExport, HTML_MIME, MemoryDataTransfer, TEXT_MIME,
    decode_fragment, encode_fragment, insert_data, set_fragment_data,
};
pub use identity::{IdentityRegistry, KeySlot, Keyed, NodeKey};
pub use keys::{Hotkey, KeyCombo};
pub use platform::{MemorySelection, Quirks, SelectionPlatform};
pub use position::Translator;
pub use range::NativeRangeInput;
pub use reconcile::{ReconcileOutcome, reconcile};
pub use render::{Decorate, Decoration, ElementRenderer, LeafRenderer, RenderPass, RenderPipeline};
pub use smol_str::SmolStr;
pub use types::{DocRange, Direction, Edge, Path, Point};
pub use vnode::{VElement, VNode};
