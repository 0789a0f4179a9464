//! Error types for the model/DOM bridge.

use miette::Diagnostic;
use thiserror::Error;

/// Failure raised by a native surface probe or mutation.
///
/// Browsers raise a permission error when a node from a foreign frame or a
/// closed shadow tree is inspected; callers that only test membership treat
/// `PermissionDenied` as "not one of ours".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NativeError {
    #[error("permission denied inspecting native node: {0}")]
    PermissionDenied(String),

    #[error("native platform error: {0}")]
    Platform(String),
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::Platform(s.to_string())
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::Platform(s)
    }
}

/// Errors produced while translating between the document tree and the
/// rendered native surface.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BridgeError {
    /// A point, range or node has no counterpart on the other side.
    #[error("cannot resolve {what}: {detail}")]
    #[diagnostic(
        code(quire::resolution),
        help("the rendered surface is out of sync with the document; the edit is dropped")
    )]
    Resolution { what: &'static str, detail: String },

    /// An identity or path link is missing.
    #[error("not found: {0}")]
    #[diagnostic(code(quire::not_found))]
    NotFound(String),

    /// A clipboard or drag payload could not be decoded.
    #[error("malformed fragment payload: {0}")]
    #[diagnostic(code(quire::fragment))]
    Fragment(String),

    #[error(transparent)]
    #[diagnostic(code(quire::native))]
    Native(#[from] NativeError),
}

impl BridgeError {
    pub(crate) fn resolution(what: &'static str, detail: impl Into<String>) -> Self {
        BridgeError::Resolution {
            what,
            detail: detail.into(),
        }
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        BridgeError::NotFound(detail.into())
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, BridgeError::Resolution { .. })
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
