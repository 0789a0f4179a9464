//! Clipboard and drag data transfers.

use quire_editor_core::DataTransfer;

/// The `DataTransfer` of a clipboard or drag event.
///
/// Drop and paste transfers are read-only; writes to them are logged and
/// ignored by the browser.
pub struct WebDataTransfer {
    inner: web_sys::DataTransfer,
}

impl WebDataTransfer {
    pub fn new(inner: web_sys::DataTransfer) -> Self {
        Self { inner }
    }

    pub fn from_clipboard(evt: &web_sys::ClipboardEvent) -> Option<Self> {
        evt.clipboard_data().map(Self::new)
    }

    pub fn from_drag(evt: &web_sys::DragEvent) -> Option<Self> {
        evt.data_transfer().map(Self::new)
    }

    pub fn has_files(&self) -> bool {
        self.inner.files().is_some_and(|files| files.length() > 0)
    }
}

impl DataTransfer for WebDataTransfer {
    fn get_data(&self, mime: &str) -> String {
        self.inner.get_data(mime).unwrap_or_default()
    }

    fn set_data(&mut self, mime: &str, data: &str) {
        if let Err(e) = self.inner.set_data(mime, data) {
            tracing::warn!(target: "quire::fragment", mime, "data transfer write failed: {:?}", e);
        }
    }
}
