//! The closed set of directives a transfer handle understands.

use std::fmt;
use std::fs::File;
use std::time::Duration;

/// Value of the active-port directive asking the engine to pick an
/// ephemeral local port on the control connection's interface.
pub const ACTIVE_PORT_ANY: &str = "-";

/// Whether the control and data exchanges are protected by TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureMode {
    /// Plain FTP
    None,
    /// TLS on both the control and every data channel
    All,
}

/// How the TLS session is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Explicit TLS: connect in plain text, then `AUTH TLS`.
    Tls,
    /// Implicit SSL: the handshake starts with the first byte.
    Ssl,
}

/// A single configuration unit applied to a transfer handle.
#[derive(Debug)]
pub enum Directive {
    Port(u16),
    /// Combined `user:password` credential string
    Credentials(String),
    Timeout(Duration),
    HeaderEcho(bool),
    Upload(bool),
    CaptureResponse(bool),
    FollowRedirects(bool),
    SecureTransport(SecureMode),
    VerifyPeer(bool),
    VerifyHost(bool),
    AuthMode(AuthMode),
    /// `Some(ACTIVE_PORT_ANY)` or an address forces active mode, `None` is passive.
    ActivePort(Option<String>),
    ListOnly(bool),
    Url(String),
    InputSource(Option<File>),
    InputSize(Option<u64>),
    PreTransferCommands(Vec<String>),
}

/// The name of a directive, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKey {
    Port,
    Credentials,
    Timeout,
    HeaderEcho,
    Upload,
    CaptureResponse,
    FollowRedirects,
    SecureTransport,
    VerifyPeer,
    VerifyHost,
    AuthMode,
    ActivePort,
    ListOnly,
    Url,
    InputSource,
    InputSize,
    PreTransferCommands,
}

impl Directive {
    pub fn key(&self) -> DirectiveKey {
        match *self {
            Directive::Port(_) => DirectiveKey::Port,
            Directive::Credentials(_) => DirectiveKey::Credentials,
            Directive::Timeout(_) => DirectiveKey::Timeout,
            Directive::HeaderEcho(_) => DirectiveKey::HeaderEcho,
            Directive::Upload(_) => DirectiveKey::Upload,
            Directive::CaptureResponse(_) => DirectiveKey::CaptureResponse,
            Directive::FollowRedirects(_) => DirectiveKey::FollowRedirects,
            Directive::SecureTransport(_) => DirectiveKey::SecureTransport,
            Directive::VerifyPeer(_) => DirectiveKey::VerifyPeer,
            Directive::VerifyHost(_) => DirectiveKey::VerifyHost,
            Directive::AuthMode(_) => DirectiveKey::AuthMode,
            Directive::ActivePort(_) => DirectiveKey::ActivePort,
            Directive::ListOnly(_) => DirectiveKey::ListOnly,
            Directive::Url(_) => DirectiveKey::Url,
            Directive::InputSource(_) => DirectiveKey::InputSource,
            Directive::InputSize(_) => DirectiveKey::InputSize,
            Directive::PreTransferCommands(_) => DirectiveKey::PreTransferCommands,
        }
    }
}

impl DirectiveKey {
    pub fn as_str(&self) -> &'static str {
        match *self {
            DirectiveKey::Port => "port",
            DirectiveKey::Credentials => "credentials",
            DirectiveKey::Timeout => "timeout",
            DirectiveKey::HeaderEcho => "header-echo",
            DirectiveKey::Upload => "upload",
            DirectiveKey::CaptureResponse => "capture-response",
            DirectiveKey::FollowRedirects => "follow-redirects",
            DirectiveKey::SecureTransport => "secure-transport",
            DirectiveKey::VerifyPeer => "verify-peer",
            DirectiveKey::VerifyHost => "verify-host",
            DirectiveKey::AuthMode => "auth-mode",
            DirectiveKey::ActivePort => "active-port",
            DirectiveKey::ListOnly => "list-only",
            DirectiveKey::Url => "url",
            DirectiveKey::InputSource => "input-source",
            DirectiveKey::InputSize => "input-size",
            DirectiveKey::PreTransferCommands => "pre-transfer-commands",
        }
    }
}

impl fmt::Display for DirectiveKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
