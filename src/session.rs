//! The stateful surface: connection lifecycle and current path.

use std::time::Duration;

use super::directive::{AuthMode, Directive, SecureMode, ACTIVE_PORT_ANY};
use super::engine::TransferEngine;
use super::executor;
use super::resolver::Resolver;
use super::types::{Entry, FtpError, Result};

pub const DEFAULT_PORT: u16 = 21;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const ANONYMOUS_USER: &str = "anonymous";
pub const ANONYMOUS_PASSWORD: &str = "anonymous@noserver.com";

/// Connection options as a caller writes them. Every field but `host` has a
/// default, see [`ConnectOptions::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Explicit TLS (`AUTH TLS` on the plain control connection)
    pub use_tls: bool,
    /// Implicit SSL (TLS from the first byte)
    pub use_ssl: bool,
    /// Defaults to active mode.
    pub passive: bool,
    pub timeout_secs: u64,
    /// Off by default: secure sessions accept any certificate and host name.
    pub verify_certificates: bool,
}

impl Default for ConnectOptions {
    fn default() -> ConnectOptions {
        ConnectOptions {
            host: String::new(),
            port: DEFAULT_PORT,
            user: None,
            password: None,
            use_tls: false,
            use_ssl: false,
            passive: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_certificates: false,
        }
    }
}

impl ConnectOptions {
    pub fn new<S: Into<String>>(host: S) -> ConnectOptions {
        ConnectOptions {
            host: host.into(),
            ..ConnectOptions::default()
        }
    }

    /// Fill in credentials and check the host.
    ///
    /// A missing user becomes `anonymous`. A missing password becomes
    /// `anonymous@noserver.com` for the anonymous user and empty otherwise.
    pub fn resolve(&self) -> Result<ConnectParams> {
        if self.host.trim().is_empty() {
            return Err(FtpError::ConfigurationError("host is empty".to_owned()));
        }
        let user = self
            .user
            .clone()
            .unwrap_or_else(|| ANONYMOUS_USER.to_owned());
        let password = match self.password {
            Some(ref password) => password.clone(),
            None if user == ANONYMOUS_USER => ANONYMOUS_PASSWORD.to_owned(),
            None => String::new(),
        };
        Ok(ConnectParams {
            host: self.host.clone(),
            port: self.port,
            user,
            password,
            use_tls: self.use_tls,
            use_ssl: self.use_ssl,
            passive: self.passive,
            timeout: Duration::from_secs(self.timeout_secs),
            verify_certificates: self.verify_certificates,
        })
    }
}

/// Fully resolved parameters for [`Session::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub passive: bool,
    pub timeout: Duration,
    pub verify_certificates: bool,
}

impl ConnectParams {
    /// Anonymous, plain, passive parameters on port 21.
    pub fn new<S: Into<String>>(host: S) -> ConnectParams {
        ConnectParams {
            host: host.into(),
            port: DEFAULT_PORT,
            user: ANONYMOUS_USER.to_owned(),
            password: ANONYMOUS_PASSWORD.to_owned(),
            use_tls: false,
            use_ssl: false,
            passive: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_certificates: false,
        }
    }

    fn directives(&self) -> Vec<Directive> {
        let mut directives = vec![
            Directive::Port(self.port),
            Directive::Credentials(format!("{}:{}", self.user, self.password)),
            Directive::Timeout(self.timeout),
            Directive::HeaderEcho(false),
            Directive::Upload(false),
            Directive::CaptureResponse(true),
            Directive::FollowRedirects(true),
        ];
        if self.use_tls || self.use_ssl {
            directives.push(Directive::SecureTransport(SecureMode::All));
            directives.push(Directive::VerifyPeer(self.verify_certificates));
            directives.push(Directive::VerifyHost(self.verify_certificates));
            directives.push(Directive::AuthMode(if self.use_tls {
                AuthMode::Tls
            } else {
                AuthMode::Ssl
            }));
        }
        if !self.passive {
            directives.push(Directive::ActivePort(Some(ACTIVE_PORT_ANY.to_owned())));
        }
        directives
    }
}

/// A single logical connection to an FTP server.
///
/// The session exclusively owns its transfer handle. It is not meant to be
/// shared between concurrent callers; use one session per unit of work.
pub struct Session<E: TransferEngine> {
    engine: E,
    handle: Option<E::Handle>,
    host: Option<String>,
    current_path: String,
    secure: bool,
}

impl<E: TransferEngine> Session<E> {
    pub fn new(engine: E) -> Session<E> {
        Session {
            engine,
            handle: None,
            host: None,
            current_path: "/".to_owned(),
            secure: false,
        }
    }

    /// Connect with options, filling in defaults first. Fails before any
    /// network activity when the host is empty.
    pub fn open(&mut self, options: &ConnectOptions) -> Result<()> {
        let params = options.resolve()?;
        self.connect(&params)
    }

    pub fn connect(&mut self, params: &ConnectParams) -> Result<()> {
        if params.host.trim().is_empty() {
            return Err(FtpError::ConfigurationError("host is empty".to_owned()));
        }
        self.close();

        let mut handle = self.engine.allocate().ok_or(FtpError::TransportInitError)?;
        let secure = params.use_tls || params.use_ssl;
        if secure && !params.verify_certificates {
            warn!(
                "certificate verification disabled for {}:{}",
                params.host, params.port
            );
        }
        for directive in params.directives() {
            executor::apply(&mut handle, directive)?;
        }

        // The session only holds the handle once it is fully configured; a
        // failed configuration drops it right here.
        let resolver = Resolver::new(&params.host, "/", secure);
        executor::execute_exchange(&mut handle, &resolver, None)?;

        info!(
            "connected to {}:{} as {} ({})",
            params.host,
            params.port,
            params.user,
            if secure { "ftps" } else { "ftp" }
        );
        self.handle = Some(handle);
        self.host = Some(params.host.clone());
        self.secure = secure;
        Ok(())
    }

    /// Release the transfer handle and reset to defaults. Closing a closed
    /// session does nothing.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            info!("closed session to {}", self.host.as_deref().unwrap_or(""));
        }
        self.host = None;
        self.current_path = "/".to_owned();
        self.secure = false;
    }

    /// Change the current path. Purely local, nothing is sent to the server.
    pub fn cd<S: Into<String>>(&mut self, path: S) {
        self.current_path = path.into();
        debug!("cd {}", self.current_path);
    }

    pub fn ls(&mut self) -> Result<Vec<Entry>> {
        let (handle, target) = self.parts()?;
        executor::list(handle, &target)
    }

    pub fn read(&mut self, file_name: &str) -> Result<Vec<u8>> {
        let (handle, target) = self.parts()?;
        executor::read(handle, &target, file_name)
    }

    pub fn read_to_string(&mut self, file_name: &str) -> Result<String> {
        self.read(file_name)
            .map(|content| String::from_utf8_lossy(&content).into_owned())
    }

    pub fn write<C: AsRef<[u8]>>(&mut self, file_name: &str, content: C) -> Result<()> {
        let (handle, target) = self.parts()?;
        executor::write(handle, &target, file_name, content.as_ref())
    }

    /// Delete `file_name` from the current path, returning the server's raw
    /// acknowledgment.
    pub fn rm(&mut self, file_name: &str) -> Result<Vec<u8>> {
        let (handle, target) = self.parts()?;
        executor::remove(handle, &target, file_name)
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    fn parts(&mut self) -> Result<(&mut E::Handle, Resolver<'_>)> {
        match (self.handle.as_mut(), self.host.as_deref()) {
            (Some(handle), Some(host)) => Ok((
                handle,
                Resolver::new(host, &self.current_path, self.secure),
            )),
            _ => Err(FtpError::NotConnected),
        }
    }
}

impl<E: TransferEngine> Drop for Session<E> {
    fn drop(&mut self) {
        self.close();
    }
}
