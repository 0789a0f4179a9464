//! Browser layer for the quire editor bridge.
//!
//! Implements the native seams of `quire-editor-core` on `web-sys` and
//! wires an editor instance to a live contenteditable element. Assumes a
//! `wasm32-unknown-unknown` target.
//!
//! # Architecture
//!
//! - `dom`: [`WebDom`], the rendered tree read through the DOM
//! - `selection`: [`WebSelection`], the document's Selection object
//! - `clipboard`: [`WebDataTransfer`] over event data transfers
//! - `events`: native event extraction into core events
//! - `platform`: user agent and feature detection into `Quirks`
//! - `editor`: [`BrowserEditor`], mounting and listener wiring
//!
//! # Re-exports
//!
//! This crate re-exports `quire-editor-core` so consumers only need to
//! depend on `quire-editor-browser`.

pub use quire_editor_core;
pub use quire_editor_core::*;

pub mod clipboard;
pub mod dom;
pub mod editor;
pub mod events;
pub mod platform;
pub mod selection;

pub use clipboard::WebDataTransfer;
pub use dom::WebDom;
pub use editor::BrowserEditor;
pub use platform::{detect_quirks, quirks};
pub use selection::WebSelection;

/// Install the panic hook and a console tracing subscriber. Safe to call
/// more than once.
pub fn init_logging() {
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::{EnvFilter, Registry};

    console_error_panic_hook::set_once();

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );
    let filter = EnvFilter::new("warn,quire=trace");
    let _ = tracing::subscriber::set_global_default(Registry::default().with(filter).with(wasm_layer));
}
