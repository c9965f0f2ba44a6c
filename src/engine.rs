//! The seam between a session and the engine that speaks FTP on the wire.
//!
//! A [`TransferEngine`] hands out [`TransferHandle`]s. A handle is configured
//! one [`Directive`] at a time and then asked to `perform` a single
//! request/response exchange. Dropping the handle releases it.

use std::error::Error;
use std::fmt;

use super::directive::Directive;

/// Numeric failure codes reported by an engine.
pub mod code {
    pub const URL_MALFORMAT: u32 = 3;
    pub const NOT_BUILT_IN: u32 = 4;
    pub const COULDNT_RESOLVE_HOST: u32 = 6;
    pub const COULDNT_CONNECT: u32 = 7;
    pub const WEIRD_SERVER_REPLY: u32 = 8;
    pub const REMOTE_ACCESS_DENIED: u32 = 9;
    pub const QUOTE_ERROR: u32 = 21;
    pub const UPLOAD_FAILED: u32 = 25;
    pub const OPERATION_TIMEDOUT: u32 = 28;
    pub const PORT_FAILED: u32 = 30;
    pub const SSL_CONNECT_ERROR: u32 = 35;
    pub const BAD_FUNCTION_ARGUMENT: u32 = 43;
    pub const SEND_ERROR: u32 = 55;
    pub const RECV_ERROR: u32 = 56;
    pub const LOGIN_DENIED: u32 = 67;
    pub const REMOTE_FILE_NOT_FOUND: u32 = 78;
}

/// Failure reported by an engine: a numeric code plus a diagnostic string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: u32,
    pub message: String,
}

impl EngineError {
    pub fn new<S: Into<String>>(code: u32, message: S) -> EngineError {
        EngineError {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "engine error {}: {}", self.code, self.message)
    }
}

impl Error for EngineError {}

/// An allocated, exclusively owned transfer handle.
pub trait TransferHandle {
    /// Apply one directive. Directives persist until overwritten.
    fn set(&mut self, directive: Directive) -> Result<(), EngineError>;

    /// Run exactly one exchange with the currently applied directives.
    fn perform(&mut self) -> Result<Vec<u8>, EngineError>;
}

/// Hands out transfer handles.
pub trait TransferEngine {
    type Handle: TransferHandle;

    /// Allocate a fresh handle, `None` when the engine cannot provide one.
    fn allocate(&self) -> Option<Self::Handle>;
}
