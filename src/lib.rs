#![crate_name = "ftp_session"]
#![crate_type = "lib"]

//! ftp_session is a session-oriented FTP/FTPS client.
//!
//! A [`Session`] owns one transfer handle, the connection parameters and a
//! current path. Every operation is a single blocking exchange: the session
//! resolves a URL from the current path, applies the operation's directives
//! to the handle and lets the engine perform the transfer.
//!
//! The wire protocol is left to a [`TransferEngine`]. The crate ships
//! [`FtpEngine`], built on `std::net`; FTPS needs the `secure` feature.
//!
//! ### Usage
//!
//! ```rust,no_run
//! use ftp_session::{ConnectOptions, FtpEngine, Session};
//!
//! let mut session = Session::new(FtpEngine);
//! session.open(&ConnectOptions {
//!     passive: true,
//!     ..ConnectOptions::new("127.0.0.1")
//! }).unwrap_or_else(|err| panic!("{}", err));
//! session.cd("/pub/");
//! for entry in session.ls().unwrap() {
//!     println!("{}", entry.id);
//! }
//! session.write("hello.txt", "hello").unwrap();
//! session.close();
//! ```

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod data_stream;
mod executor;
mod ftp;
mod status;

pub mod directive;
pub mod engine;
pub mod resolver;
pub mod session;
pub mod staging;
pub mod types;

pub use self::directive::{AuthMode, Directive, DirectiveKey, SecureMode};
pub use self::engine::{EngineError, TransferEngine, TransferHandle};
pub use self::ftp::{FtpEngine, FtpHandle};
pub use self::session::{ConnectOptions, ConnectParams, Session};
pub use self::types::{Entry, FtpError, Result};
