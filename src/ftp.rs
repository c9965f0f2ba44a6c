//! The bundled engine: FTP and FTPS over blocking `std::net` sockets.
//!
//! An [`FtpHandle`] keeps its control connection open between exchanges and
//! only reconnects when the host, port, credentials or security settings
//! change, or when the previous exchange broke the connection.

use std::fs::File;
use std::io::{self, copy, BufRead, BufReader, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "secure")]
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use regex::Regex;

use super::data_stream::{set_socket_timeout, DataStream};
use super::directive::{AuthMode, Directive, SecureMode, ACTIVE_PORT_ANY};
use super::engine::{code, EngineError, TransferEngine, TransferHandle};
use super::status;

lazy_static! {
    // This regex extracts IP and Port details from PASV command response.
    // The regex looks for the pattern (h1,h2,h3,h4,p1,p2).
    static ref PORT_RE: Regex = Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();

    // ftp[s]://host[:port]/path, where host may be a bracketed IPv6 literal.
    static ref URL_RE: Regex =
        Regex::new(r"^(ftps?)://(\[[0-9A-Fa-f:.]+\]|[^/:\[\]\s]+)(?::(\d+))?/(.*)$").unwrap();
}

const DEFAULT_FTP_PORT: u16 = 21;
const DEFAULT_FTPS_PORT: u16 = 990;
const ACCEPT_POLL: Duration = Duration::from_millis(10);

type EngineResult<T> = Result<T, EngineError>;

/// Reply code and the last line of a server reply.
#[derive(Debug)]
struct Line(u32, String);

/// Allocates [`FtpHandle`]s. Allocation never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FtpEngine;

impl TransferEngine for FtpEngine {
    type Handle = FtpHandle;

    fn allocate(&self) -> Option<FtpHandle> {
        Some(FtpHandle::new())
    }
}

#[derive(Debug)]
struct Settings {
    port: Option<u16>,
    credentials: Option<String>,
    timeout: Duration,
    header_echo: bool,
    upload: bool,
    capture: bool,
    follow_redirects: bool,
    secure: SecureMode,
    verify_peer: bool,
    verify_host: bool,
    auth: AuthMode,
    active_port: Option<String>,
    list_only: bool,
    url: Option<String>,
    input: Option<File>,
    input_size: Option<u64>,
    quote: Vec<String>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            port: None,
            credentials: None,
            timeout: Duration::from_secs(0),
            header_echo: false,
            upload: false,
            capture: true,
            follow_redirects: false,
            secure: SecureMode::None,
            verify_peer: true,
            verify_host: true,
            auth: AuthMode::Tls,
            active_port: None,
            list_only: false,
            url: None,
            input: None,
            input_size: None,
            quote: Vec::new(),
        }
    }
}

/// The resource named by a URL directive.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    secure: bool,
    host: String,
    port: Option<u16>,
    dir: String,
    file: String,
}

fn parse_url(url: &str) -> EngineResult<Target> {
    let caps = URL_RE
        .captures(url)
        .ok_or_else(|| EngineError::new(code::URL_MALFORMAT, format!("malformed URL: {}", url)))?;
    let port = match caps.get(3) {
        Some(port) => Some(port.as_str().parse::<u16>().map_err(|e| {
            EngineError::new(code::URL_MALFORMAT, format!("bad port in {}: {}", url, e))
        })?),
        None => None,
    };
    let path = &caps[4];
    let (dir, file) = match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    };
    Ok(Target {
        secure: &caps[1] == "ftps",
        host: caps[2].trim_start_matches('[').trim_end_matches(']').to_owned(),
        port,
        dir: dir.to_owned(),
        file: file.to_owned(),
    })
}

/// Everything that must match for a control connection to be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectionKey {
    host: String,
    port: u16,
    credentials: Option<String>,
    secure: bool,
    implicit: bool,
    verify_peer: bool,
    verify_host: bool,
}

impl ConnectionKey {
    fn new(target: &Target, settings: &Settings) -> ConnectionKey {
        let secure = target.secure || settings.secure == SecureMode::All;
        let implicit = secure && settings.auth == AuthMode::Ssl;
        let default_port = if implicit {
            DEFAULT_FTPS_PORT
        } else {
            DEFAULT_FTP_PORT
        };
        ConnectionKey {
            host: target.host.clone(),
            port: settings.port.or(target.port).unwrap_or(default_port),
            credentials: settings.credentials.clone(),
            secure,
            implicit,
            verify_peer: settings.verify_peer,
            verify_host: settings.verify_host,
        }
    }

    fn login(&self) -> (&str, &str) {
        match self.credentials {
            Some(ref credentials) => match credentials.find(':') {
                Some(idx) => (&credentials[..idx], &credentials[idx + 1..]),
                None => (credentials.as_str(), ""),
            },
            None => ("anonymous", "anonymous@"),
        }
    }
}

/// Map an I/O failure to an engine code, reporting timeouts as such.
fn io_error(fallback: u32) -> impl Fn(io::Error) -> EngineError {
    move |e| match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            EngineError::new(code::OPERATION_TIMEDOUT, e.to_string())
        }
        _ => EngineError::new(fallback, e.to_string()),
    }
}

fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> EngineResult<TcpStream> {
    let mut last = None;
    for addr in addrs {
        let attempt = if timeout == Duration::from_secs(0) {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(addr, timeout)
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("connect to {} failed: {}", addr, e);
                last = Some(e)
            }
        }
    }
    Err(match last {
        Some(e) => io_error(code::COULDNT_CONNECT)(e),
        None => EngineError::new(code::COULDNT_RESOLVE_HOST, "no address to connect to"),
    })
}

/// Wait for the server to open an active-mode data connection.
fn accept(listener: &TcpListener, timeout: Duration) -> EngineResult<TcpStream> {
    listener
        .set_nonblocking(true)
        .map_err(io_error(code::PORT_FAILED))?;
    let started = Instant::now();
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!("data connection from {}", peer);
                stream
                    .set_nonblocking(false)
                    .map_err(io_error(code::PORT_FAILED))?;
                return Ok(stream);
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                if timeout != Duration::from_secs(0) && started.elapsed() >= timeout {
                    return Err(EngineError::new(
                        code::OPERATION_TIMEDOUT,
                        "server did not open the data connection",
                    ));
                }
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => return Err(io_error(code::PORT_FAILED)(e)),
        }
    }
}

#[cfg(feature = "secure")]
struct Tls {
    connector: SslConnector,
    domain: String,
    verify_host: bool,
}

#[cfg(feature = "secure")]
impl Tls {
    fn new(domain: &str, verify_peer: bool, verify_host: bool) -> EngineResult<Tls> {
        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| EngineError::new(code::SSL_CONNECT_ERROR, e.to_string()))?;
        if !verify_peer {
            builder.set_verify(SslVerifyMode::NONE);
        }
        Ok(Tls {
            connector: builder.build(),
            domain: domain.to_owned(),
            verify_host,
        })
    }

    fn wrap(&self, stream: TcpStream) -> EngineResult<DataStream> {
        let mut config = self
            .connector
            .configure()
            .map_err(|e| EngineError::new(code::SSL_CONNECT_ERROR, e.to_string()))?;
        config.set_verify_hostname(self.verify_host);
        config
            .connect(&self.domain, stream)
            .map(|stream| DataStream::Ssl(Box::new(stream)))
            .map_err(|e| EngineError::new(code::SSL_CONNECT_ERROR, e.to_string()))
    }
}

#[cfg(not(feature = "secure"))]
struct Tls;

#[cfg(not(feature = "secure"))]
impl Tls {
    fn new(_domain: &str, _verify_peer: bool, _verify_host: bool) -> EngineResult<Tls> {
        Err(not_built_in())
    }

    fn wrap(&self, _stream: TcpStream) -> EngineResult<DataStream> {
        Err(not_built_in())
    }
}

#[cfg(not(feature = "secure"))]
fn not_built_in() -> EngineError {
    EngineError::new(
        code::NOT_BUILT_IN,
        "FTPS support requires the `secure` feature",
    )
}

enum DataChannel {
    Passive(TcpStream),
    Active(TcpListener),
}

/// An open, logged-in control connection.
struct Control {
    key: ConnectionKey,
    reader: BufReader<DataStream>,
    tls: Option<Tls>,
    home: String,
    transcript: Vec<String>,
    broken: bool,
}

impl Control {
    fn connect(key: ConnectionKey, timeout: Duration) -> EngineResult<Control> {
        let addrs: Vec<SocketAddr> = (key.host.as_str(), key.port)
            .to_socket_addrs()
            .map_err(|e| {
                EngineError::new(code::COULDNT_RESOLVE_HOST, format!("{}: {}", key.host, e))
            })?
            .collect();
        let stream = connect_any(&addrs, timeout)?;
        set_socket_timeout(&stream, timeout).map_err(io_error(code::COULDNT_CONNECT))?;
        debug!("connected to {}:{}", key.host, key.port);

        let tls = if key.secure {
            Some(Tls::new(&key.host, key.verify_peer, key.verify_host)?)
        } else {
            None
        };
        let stream = match tls {
            Some(ref tls) if key.implicit => tls.wrap(stream)?,
            _ => DataStream::Tcp(stream),
        };

        let mut control = Control {
            key,
            reader: BufReader::new(stream),
            tls,
            home: String::from("/"),
            transcript: Vec::new(),
            broken: false,
        };
        match control.handshake() {
            Ok(()) => Ok(control),
            Err(e) => {
                control.broken = breaks_connection(&e);
                Err(e)
            }
        }
    }

    fn handshake(&mut self) -> EngineResult<()> {
        self.expect(&[status::READY], code::WEIRD_SERVER_REPLY)?;
        if self.key.secure && !self.key.implicit {
            self.command("AUTH TLS", &[status::AUTH_OK], code::SSL_CONNECT_ERROR)?;
            self.start_tls()?;
        }
        self.login()?;
        if self.key.secure {
            // Set protection buffer size
            self.command("PBSZ 0", &[status::COMMAND_OK], code::SSL_CONNECT_ERROR)?;
            // Change the level of data protection to Private
            self.command("PROT P", &[status::COMMAND_OK], code::SSL_CONNECT_ERROR)?;
        }
        self.command("TYPE I", &[status::COMMAND_OK], code::WEIRD_SERVER_REPLY)?;
        self.home = self.pwd()?;
        Ok(())
    }

    /// Switch the plain control connection to TLS after `AUTH TLS`.
    fn start_tls(&mut self) -> EngineResult<()> {
        let stream = self
            .reader
            .get_ref()
            .get_ref()
            .try_clone()
            .map_err(io_error(code::SSL_CONNECT_ERROR))?;
        let secured = match self.tls {
            Some(ref tls) => tls.wrap(stream)?,
            None => DataStream::Tcp(stream),
        };
        self.reader = BufReader::new(secured);
        Ok(())
    }

    fn login(&mut self) -> EngineResult<()> {
        let (user, password) = {
            let (user, password) = self.key.login();
            (user.to_owned(), password.to_owned())
        };
        let Line(reply, _) = self.command(
            &format!("USER {}", user),
            &[status::LOGGED_IN, status::NEED_PASSWORD],
            code::LOGIN_DENIED,
        )?;
        if reply == status::NEED_PASSWORD {
            self.command(
                &format!("PASS {}", password),
                &[status::LOGGED_IN],
                code::LOGIN_DENIED,
            )?;
        }
        Ok(())
    }

    fn pwd(&mut self) -> EngineResult<String> {
        let Line(_, content) =
            self.command("PWD", &[status::PATH_CREATED], code::WEIRD_SERVER_REPLY)?;
        match (content.find('"'), content.rfind('"')) {
            (Some(begin), Some(end)) if begin < end => Ok(content[begin + 1..end].to_string()),
            _ => {
                debug!("unparsable PWD reply, assuming /: {}", content.trim_end());
                Ok(String::from("/"))
            }
        }
    }

    fn exchange(&mut self, settings: &mut Settings, target: &Target) -> EngineResult<Vec<u8>> {
        self.transcript.clear();
        for command in settings.quote.iter() {
            self.send(command)?;
            let Line(reply, line) = self.read_reply()?;
            if reply >= status::FIRST_NEGATIVE {
                return Err(EngineError::new(
                    code::QUOTE_ERROR,
                    format!("{}: {}", command, line.trim_end()),
                ));
            }
        }

        let home = self.home.clone();
        self.cwd(&home)?;
        if !target.dir.is_empty() {
            self.cwd(&target.dir)?;
        }

        let payload = if target.file.is_empty() {
            if settings.upload {
                return Err(EngineError::new(
                    code::UPLOAD_FAILED,
                    "cannot upload to a directory",
                ));
            }
            let command = if settings.list_only { "NLST" } else { "LIST" };
            self.download(
                command,
                settings,
                &[status::REQUEST_FILE_ACTION_IGNORED],
                code::RECV_ERROR,
            )?
        } else if settings.upload {
            self.upload(&format!("STOR {}", target.file), settings)?;
            Vec::new()
        } else {
            self.download(
                &format!("RETR {}", target.file),
                settings,
                &[],
                code::REMOTE_FILE_NOT_FOUND,
            )?
        };

        if !settings.capture {
            return Ok(Vec::new());
        }
        if settings.header_echo {
            let mut echoed = self.transcript.join("\r\n").into_bytes();
            echoed.extend_from_slice(b"\r\n");
            echoed.extend(payload);
            return Ok(echoed);
        }
        Ok(payload)
    }

    fn cwd(&mut self, path: &str) -> EngineResult<()> {
        self.command(
            &format!("CWD {}", path),
            &[status::REQUESTED_FILE_ACTION_OK, status::COMMAND_OK],
            code::REMOTE_ACCESS_DENIED,
        )
        .map(|_| ())
    }

    /// Run `command` and collect what the data stream carries. A reply in
    /// `empty` instead of a transfer start means there is nothing to send.
    fn download(
        &mut self,
        command: &str,
        settings: &Settings,
        empty: &[u32],
        failure: u32,
    ) -> EngineResult<Vec<u8>> {
        let mut payload = Vec::new();
        {
            let mut data_stream = match self.data_command(command, settings, empty, failure)? {
                Some(data_stream) => data_stream,
                None => return Ok(payload),
            };
            data_stream
                .read_to_end(&mut payload)
                .map_err(io_error(code::RECV_ERROR))?;
        }
        self.expect(
            &[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK],
            code::RECV_ERROR,
        )?;
        Ok(payload)
    }

    fn upload(&mut self, command: &str, settings: &mut Settings) -> EngineResult<()> {
        let mut data_stream = self
            .data_command(command, settings, &[], code::UPLOAD_FAILED)?
            .ok_or_else(|| EngineError::new(code::UPLOAD_FAILED, "no data connection"))?;
        let sent = match (settings.input.as_mut(), settings.input_size) {
            (Some(input), Some(size)) => copy(&mut Read::by_ref(input).take(size), &mut data_stream),
            (Some(input), None) => copy(input, &mut data_stream),
            (None, _) => Ok(0),
        };
        let sent = sent.map_err(io_error(code::SEND_ERROR))?;
        data_stream.finish().map_err(io_error(code::SEND_ERROR))?;
        debug!("sent {} bytes", sent);
        self.expect(
            &[status::CLOSING_DATA_CONNECTION, status::REQUESTED_FILE_ACTION_OK],
            code::UPLOAD_FAILED,
        )
        .map(|_| ())
    }

    /// Execute command which send data back in a separate stream
    ///
    /// Returns `None`, dropping the prepared channel, when the server answers
    /// with one of `empty` and opens no stream.
    fn data_command(
        &mut self,
        command: &str,
        settings: &Settings,
        empty: &[u32],
        failure: u32,
    ) -> EngineResult<Option<DataStream>> {
        let channel = match settings.active_port {
            Some(ref address) => DataChannel::Active(self.port(address)?),
            None => DataChannel::Passive(self.pasv(settings.timeout)?),
        };
        self.send(command)?;
        let line = self.read_reply()?;
        if empty.contains(&line.0) {
            debug!("{}: {}", command, line.1.trim_end());
            return Ok(None);
        }
        check(line, &[status::ABOUT_TO_SEND, status::ALREADY_OPEN], failure)?;
        let stream = match channel {
            DataChannel::Passive(stream) => stream,
            DataChannel::Active(listener) => accept(&listener, settings.timeout)?,
        };
        set_socket_timeout(&stream, settings.timeout).map_err(io_error(code::RECV_ERROR))?;
        match self.tls {
            Some(ref tls) => tls.wrap(stream).map(Some),
            None => Ok(Some(DataStream::Tcp(stream))),
        }
    }

    /// Runs the PASV command and connects to the announced port.
    fn pasv(&mut self, timeout: Duration) -> EngineResult<TcpStream> {
        // PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
        let Line(_, line) = self.command("PASV", &[status::PASSIVE_MODE], code::WEIRD_SERVER_REPLY)?;
        let caps = PORT_RE.captures(&line).ok_or_else(|| {
            EngineError::new(
                code::WEIRD_SERVER_REPLY,
                format!("Invalid PASV response: {}", line.trim_end()),
            )
        })?;
        let (msb, lsb) = match (caps[5].parse::<u8>(), caps[6].parse::<u8>()) {
            (Ok(msb), Ok(lsb)) => (msb, lsb),
            _ => {
                return Err(EngineError::new(
                    code::WEIRD_SERVER_REPLY,
                    format!("Invalid PASV port: {}", line.trim_end()),
                ))
            }
        };
        let port = (u16::from(msb) << 8) + u16::from(lsb);
        // The announced host is ignored: servers behind NAT announce private addresses.
        let ip = self
            .reader
            .get_ref()
            .get_ref()
            .peer_addr()
            .map_err(io_error(code::COULDNT_CONNECT))?
            .ip();
        connect_any(&[SocketAddr::new(ip, port)], timeout)
    }

    /// Listens for an active-mode data connection and announces it with PORT or EPRT.
    fn port(&mut self, address: &str) -> EngineResult<TcpListener> {
        let ip = if address == ACTIVE_PORT_ANY {
            self.reader
                .get_ref()
                .get_ref()
                .local_addr()
                .map_err(io_error(code::PORT_FAILED))?
                .ip()
        } else {
            address.parse::<IpAddr>().map_err(|e| {
                EngineError::new(code::PORT_FAILED, format!("{}: {}", address, e))
            })?
        };
        let listener = TcpListener::bind((ip, 0)).map_err(io_error(code::PORT_FAILED))?;
        let bound = listener.local_addr().map_err(io_error(code::PORT_FAILED))?;
        let command = match bound {
            SocketAddr::V4(addr) => {
                let octets = addr.ip().octets();
                format!(
                    "PORT {},{},{},{},{},{}",
                    octets[0],
                    octets[1],
                    octets[2],
                    octets[3],
                    addr.port() >> 8,
                    addr.port() & 0xff
                )
            }
            SocketAddr::V6(addr) => format!("EPRT |2|{}|{}|", addr.ip(), addr.port()),
        };
        self.command(&command, &[status::COMMAND_OK], code::PORT_FAILED)?;
        Ok(listener)
    }

    fn command(&mut self, command: &str, expected: &[u32], failure: u32) -> EngineResult<Line> {
        self.send(command)?;
        self.expect(expected, failure)
    }

    fn send(&mut self, command: &str) -> EngineResult<()> {
        if command.starts_with("PASS ") {
            trace!("CMD PASS ****");
        } else {
            trace!("CMD {}", command);
        }
        let stream = self.reader.get_mut();
        stream
            .write_all(format!("{}\r\n", command).as_bytes())
            .and_then(|_| stream.flush())
            .map_err(io_error(code::SEND_ERROR))
    }

    fn expect(&mut self, expected: &[u32], failure: u32) -> EngineResult<Line> {
        let line = self.read_reply()?;
        check(line, expected, failure)
    }

    /// Read a complete, possibly multi-line, reply.
    fn read_reply(&mut self) -> EngineResult<Line> {
        let mut line = self.read_line()?;
        let code: u32 = match line.get(0..3).map(|code| code.parse::<u32>()) {
            Some(Ok(code)) => code,
            _ => {
                return Err(EngineError::new(
                    code::WEIRD_SERVER_REPLY,
                    format!("could not parse reply code: {}", line.trim_end()),
                ))
            }
        };

        // multiple line reply
        // loop until a line carries the code without the continuation mark
        let expected = line[0..3].to_owned();
        while !is_last_line(&line, &expected) {
            line = self.read_line()?;
        }
        Ok(Line(code, line))
    }

    fn read_line(&mut self) -> EngineResult<String> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(io_error(code::RECV_ERROR))?;
        if read == 0 {
            return Err(EngineError::new(
                code::RECV_ERROR,
                "control connection closed by server",
            ));
        }
        trace!("FTP {}", line.trim_end());
        self.transcript.push(line.trim_end().to_owned());
        Ok(line)
    }
}

impl Drop for Control {
    fn drop(&mut self) {
        if self.broken {
            if let Err(e) = self.reader.get_ref().get_ref().shutdown(Shutdown::Both) {
                debug!("shutdown of broken control connection failed: {}", e);
            }
        } else if self.send("QUIT").is_ok() {
            if let Err(e) = self.expect(&[status::CLOSING], code::RECV_ERROR) {
                debug!("QUIT not acknowledged: {}", e);
            }
        }
        debug!("disconnected from {}:{}", self.key.host, self.key.port);
    }
}

fn check(line: Line, expected: &[u32], failure: u32) -> EngineResult<Line> {
    if expected.iter().any(|ec| line.0 == *ec) {
        Ok(line)
    } else {
        Err(EngineError::new(
            failure,
            format!("Expected code {:?}, got response: {}", expected, line.1.trim_end()),
        ))
    }
}

/// `NNN text`, or a bare `NNN`, ends a reply; `NNN-text` continues it.
fn is_last_line(line: &str, code: &str) -> bool {
    line.get(0..3) == Some(code) && line.as_bytes().get(3) != Some(&b'-')
}

/// Failures after which the control connection is in an unknown state.
fn breaks_connection(error: &EngineError) -> bool {
    match error.code {
        code::QUOTE_ERROR
        | code::REMOTE_ACCESS_DENIED
        | code::REMOTE_FILE_NOT_FOUND
        | code::UPLOAD_FAILED => false,
        _ => true,
    }
}

/// A transfer handle holding its directives and, once used, an open
/// control connection.
pub struct FtpHandle {
    settings: Settings,
    control: Option<Control>,
}

impl FtpHandle {
    pub fn new() -> FtpHandle {
        FtpHandle {
            settings: Settings::default(),
            control: None,
        }
    }

    fn ensure_connected(&mut self, target: &Target) -> EngineResult<()> {
        let key = ConnectionKey::new(target, &self.settings);
        let reusable = match self.control {
            Some(ref control) => control.key == key,
            None => false,
        };
        if !reusable {
            self.control = None;
            self.control = Some(Control::connect(key, self.settings.timeout)?);
        }
        Ok(())
    }
}

impl Default for FtpHandle {
    fn default() -> FtpHandle {
        FtpHandle::new()
    }
}

impl TransferHandle for FtpHandle {
    fn set(&mut self, directive: Directive) -> EngineResult<()> {
        let settings = &mut self.settings;
        match directive {
            Directive::Port(0) => {
                return Err(EngineError::new(code::BAD_FUNCTION_ARGUMENT, "port 0"));
            }
            Directive::Port(port) => settings.port = Some(port),
            Directive::Credentials(credentials) => settings.credentials = Some(credentials),
            Directive::Timeout(timeout) => settings.timeout = timeout,
            Directive::HeaderEcho(on) => settings.header_echo = on,
            Directive::Upload(on) => settings.upload = on,
            Directive::CaptureResponse(on) => settings.capture = on,
            // FTP has no redirects.
            Directive::FollowRedirects(on) => settings.follow_redirects = on,
            Directive::SecureTransport(mode) => {
                #[cfg(not(feature = "secure"))]
                {
                    if mode == SecureMode::All {
                        return Err(not_built_in());
                    }
                }
                settings.secure = mode
            }
            Directive::VerifyPeer(on) => settings.verify_peer = on,
            Directive::VerifyHost(on) => settings.verify_host = on,
            Directive::AuthMode(mode) => settings.auth = mode,
            Directive::ActivePort(address) => {
                if let Some(ref address) = address {
                    if address != ACTIVE_PORT_ANY && address.parse::<IpAddr>().is_err() {
                        return Err(EngineError::new(
                            code::BAD_FUNCTION_ARGUMENT,
                            format!("invalid active port address: {}", address),
                        ));
                    }
                }
                settings.active_port = address
            }
            Directive::ListOnly(on) => settings.list_only = on,
            Directive::Url(url) => settings.url = Some(url),
            Directive::InputSource(input) => settings.input = input,
            Directive::InputSize(size) => settings.input_size = size,
            Directive::PreTransferCommands(commands) => settings.quote = commands,
        }
        Ok(())
    }

    fn perform(&mut self) -> EngineResult<Vec<u8>> {
        let target = match self.settings.url {
            Some(ref url) => parse_url(url)?,
            None => return Err(EngineError::new(code::URL_MALFORMAT, "no URL set")),
        };
        if self.settings.follow_redirects {
            trace!("redirect following has no effect on FTP");
        }

        self.ensure_connected(&target)?;
        let outcome = match self.control {
            Some(ref mut control) => control.exchange(&mut self.settings, &target),
            None => Err(EngineError::new(code::COULDNT_CONNECT, "no control connection")),
        };
        if let Err(ref e) = outcome {
            if breaks_connection(e) {
                debug!("dropping control connection after: {}", e);
                if let Some(mut control) = self.control.take() {
                    control.broken = true;
                }
            }
        }
        outcome
    }
}
