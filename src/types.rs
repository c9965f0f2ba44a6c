//! Error and record types shared by the whole crate.

use std::io;

use thiserror::Error;

use super::directive::DirectiveKey;

/// A shorthand for a Result whose error type is always an FtpError.
pub type Result<T> = ::std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while using a session.
#[derive(Debug, Error)]
pub enum FtpError {
    /// Missing or invalid connection parameters, found before any network activity.
    #[error("FTP ConfigurationError: {0}")]
    ConfigurationError(String),
    /// The engine could not allocate a transfer handle.
    #[error("FTP TransportInitError: transfer handle allocation failed")]
    TransportInitError,
    #[error("FTP DirectiveError: {key} rejected with code {code}: {message}")]
    DirectiveError {
        key: DirectiveKey,
        code: u32,
        message: String,
    },
    #[error("FTP TransferError: '{path}' failed with code {code}: {message}")]
    TransferError {
        path: String,
        code: u32,
        message: String,
    },
    /// An operation was issued on a session that is not connected.
    #[error("FTP NotConnected: session has no transfer handle")]
    NotConnected,
    #[error("FTP StagingError: {0}")]
    StagingError(#[from] io::Error),
}

impl FtpError {
    /// The engine's numeric code, for failures that carry one.
    pub fn code(&self) -> Option<u32> {
        match *self {
            FtpError::DirectiveError { code, .. } | FtpError::TransferError { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The line as returned by the server
    pub text: String,
    /// The entry's absolute path, built from the session's current path
    pub id: String,
}
