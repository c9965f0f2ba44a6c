extern crate ftp_session;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::rc::Rc;

use ftp_session::engine::code;
use ftp_session::{
    ConnectOptions, ConnectParams, Directive, DirectiveKey, EngineError, Entry, FtpError,
    Session, TransferEngine, TransferHandle,
};

fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the stub server holds and what the handles did to it.
#[derive(Default)]
struct Remote {
    files: BTreeMap<String, Vec<u8>>,
    allocations: usize,
    releases: usize,
    applied: Vec<DirectiveKey>,
    exchanges: Vec<String>,
    quotes: Vec<String>,
    // mirror of the live handle's per-operation directives
    upload: bool,
    input_bound: bool,
    input_size: Option<u64>,
    pending_quotes: Vec<String>,
    list_only: bool,
    // failure injection
    refuse_allocation: bool,
    fail_exchanges: Option<u32>,
    reject: Option<DirectiveKey>,
}

#[derive(Clone, Default)]
struct StubEngine(Rc<RefCell<Remote>>);

impl StubEngine {
    fn with_files(files: &[(&str, &str)]) -> StubEngine {
        let engine = StubEngine::default();
        for &(path, content) in files {
            engine
                .remote()
                .files
                .insert(path.to_owned(), content.as_bytes().to_vec());
        }
        engine
    }

    fn remote(&self) -> std::cell::RefMut<Remote> {
        self.0.borrow_mut()
    }
}

struct StubHandle {
    remote: Rc<RefCell<Remote>>,
    url: Option<String>,
    upload: bool,
    input: Option<File>,
    input_size: Option<u64>,
    quotes: Vec<String>,
}

impl TransferEngine for StubEngine {
    type Handle = StubHandle;

    fn allocate(&self) -> Option<StubHandle> {
        let mut remote = self.remote();
        if remote.refuse_allocation {
            return None;
        }
        remote.allocations += 1;
        Some(StubHandle {
            remote: self.0.clone(),
            url: None,
            upload: false,
            input: None,
            input_size: None,
            quotes: Vec::new(),
        })
    }
}

impl Drop for StubHandle {
    fn drop(&mut self) {
        self.remote.borrow_mut().releases += 1;
    }
}

impl TransferHandle for StubHandle {
    fn set(&mut self, directive: Directive) -> Result<(), EngineError> {
        let mut remote = self.remote.borrow_mut();
        if remote.reject == Some(directive.key()) {
            return Err(EngineError::new(code::BAD_FUNCTION_ARGUMENT, "rejected"));
        }
        remote.applied.push(directive.key());
        match directive {
            Directive::Url(url) => self.url = Some(url),
            Directive::Upload(on) => {
                self.upload = on;
                remote.upload = on;
            }
            Directive::InputSource(input) => {
                remote.input_bound = input.is_some();
                self.input = input;
            }
            Directive::InputSize(size) => {
                remote.input_size = size;
                self.input_size = size;
            }
            Directive::PreTransferCommands(commands) => {
                remote.pending_quotes = commands.clone();
                self.quotes = commands;
            }
            Directive::ListOnly(on) => remote.list_only = on,
            _ => {}
        }
        Ok(())
    }

    fn perform(&mut self) -> Result<Vec<u8>, EngineError> {
        let mut remote = self.remote.borrow_mut();
        let url = self.url.clone().expect("url directive");
        remote.exchanges.push(url.clone());
        if let Some(code) = remote.fail_exchanges {
            return Err(EngineError::new(code, "injected failure"));
        }

        // ftp://host/path -> path
        let path = url.splitn(4, '/').nth(3).unwrap_or("").to_owned();
        for command in self.quotes.iter() {
            remote.quotes.push(command.clone());
            if let Some(victim) = command.strip_prefix("DELE /") {
                if remote.files.remove(victim).is_none() {
                    return Err(EngineError::new(code::QUOTE_ERROR, "550 No such file"));
                }
            }
        }

        if self.upload {
            let mut content = Vec::new();
            let input = self.input.as_mut().expect("input source");
            input
                .take(self.input_size.expect("input size"))
                .read_to_end(&mut content)
                .unwrap();
            remote.files.insert(path, content);
            return Ok(Vec::new());
        }

        if path.is_empty() || path.ends_with('/') {
            assert!(remote.list_only, "directory exchange without list-only");
            let names: Vec<&str> = remote
                .files
                .keys()
                .filter_map(|key| key.strip_prefix(path.as_str()))
                .filter(|rest| !rest.contains('/'))
                .collect();
            return Ok(names.join("\n").into_bytes());
        }

        assert!(!remote.list_only, "file exchange in list-only mode");
        remote
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| EngineError::new(code::REMOTE_FILE_NOT_FOUND, "550 No such file"))
    }
}

fn open(engine: &StubEngine) -> Session<StubEngine> {
    log_init();
    let mut session = Session::new(engine.clone());
    session.open(&ConnectOptions::new("example.org")).unwrap();
    session
}

#[test]
fn empty_host_fails_before_any_network_activity() {
    log_init();
    let engine = StubEngine::default();
    let mut session = Session::new(engine.clone());
    match session.open(&ConnectOptions::default()) {
        Err(FtpError::ConfigurationError(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
    match session.connect(&ConnectParams::new("")) {
        Err(FtpError::ConfigurationError(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(engine.remote().allocations, 0);
    assert!(engine.remote().exchanges.is_empty());
    assert!(!session.is_connected());
}

#[test]
fn open_configures_and_lists_root() {
    let engine = StubEngine::default();
    let session = open(&engine);
    assert!(session.is_connected());
    assert_eq!(session.host(), Some("example.org"));
    assert_eq!(session.current_path(), "/");
    assert!(!session.is_secure());

    let remote = engine.remote();
    assert_eq!(remote.exchanges, vec!["ftp://example.org/".to_owned()]);
    assert!(remote.list_only);
    assert_eq!(
        &remote.applied[..8],
        &[
            DirectiveKey::Port,
            DirectiveKey::Credentials,
            DirectiveKey::Timeout,
            DirectiveKey::HeaderEcho,
            DirectiveKey::Upload,
            DirectiveKey::CaptureResponse,
            DirectiveKey::FollowRedirects,
            // the convenience entry point defaults to active mode
            DirectiveKey::ActivePort,
        ]
    );
    assert!(!remote.applied.contains(&DirectiveKey::SecureTransport));
}

#[test]
fn explicit_connect_defaults_to_passive() {
    log_init();
    let engine = StubEngine::default();
    let mut session = Session::new(engine.clone());
    session.connect(&ConnectParams::new("example.org")).unwrap();
    assert!(!engine.remote().applied.contains(&DirectiveKey::ActivePort));
}

#[test]
fn secure_session_uses_ftps_urls() {
    log_init();
    let engine = StubEngine::default();
    let mut session = Session::new(engine.clone());
    session
        .open(&ConnectOptions {
            use_tls: true,
            ..ConnectOptions::new("example.org")
        })
        .unwrap();
    assert!(session.is_secure());
    let remote = engine.remote();
    assert_eq!(remote.exchanges[0], "ftps://example.org/");
    for key in &[
        DirectiveKey::SecureTransport,
        DirectiveKey::VerifyPeer,
        DirectiveKey::VerifyHost,
        DirectiveKey::AuthMode,
    ] {
        assert!(remote.applied.contains(key), "missing {}", key);
    }
}

#[test]
fn allocation_failure() {
    log_init();
    let engine = StubEngine::default();
    engine.remote().refuse_allocation = true;
    let mut session = Session::new(engine.clone());
    match session.open(&ConnectOptions::new("example.org")) {
        Err(FtpError::TransportInitError) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert!(!session.is_connected());
}

#[test]
fn rejected_directive_aborts_connect() {
    log_init();
    let engine = StubEngine::default();
    engine.remote().reject = Some(DirectiveKey::Timeout);
    let mut session = Session::new(engine.clone());
    match session.open(&ConnectOptions::new("example.org")) {
        Err(FtpError::DirectiveError { key, code, .. }) => {
            assert_eq!(key, DirectiveKey::Timeout);
            assert_eq!(code, code::BAD_FUNCTION_ARGUMENT);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!session.is_connected());
    assert!(engine.remote().exchanges.is_empty());
    assert_eq!(engine.remote().releases, 1);
}

#[test]
fn failed_initial_listing_leaves_session_closed() {
    log_init();
    let engine = StubEngine::default();
    engine.remote().fail_exchanges = Some(code::COULDNT_CONNECT);
    let mut session = Session::new(engine.clone());
    match session.open(&ConnectOptions::new("example.org")) {
        Err(FtpError::TransferError { path, code, .. }) => {
            assert_eq!(path, "");
            assert_eq!(code, code::COULDNT_CONNECT);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!session.is_connected());
    assert_eq!(session.host(), None);
}

#[test]
fn operations_need_a_connection() {
    log_init();
    let mut session = Session::new(StubEngine::default());
    assert!(matches!(session.ls(), Err(FtpError::NotConnected)));
    assert!(matches!(session.read("a"), Err(FtpError::NotConnected)));
    assert!(matches!(session.write("a", "b"), Err(FtpError::NotConnected)));
    assert!(matches!(session.rm("a"), Err(FtpError::NotConnected)));
}

#[test]
fn ls_of_empty_directory() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.cd("/pub/");
    assert_eq!(session.ls().unwrap(), Vec::<Entry>::new());
}

#[test]
fn ls_builds_ids_from_current_path() {
    let engine = StubEngine::with_files(&[("pub/a.txt", "a"), ("pub/b.txt", "b"), ("c.txt", "c")]);
    let mut session = open(&engine);
    session.cd("/pub/");
    assert_eq!(
        session.ls().unwrap(),
        vec![
            Entry {
                text: "a.txt".to_owned(),
                id: "/pub/a.txt".to_owned(),
            },
            Entry {
                text: "b.txt".to_owned(),
                id: "/pub/b.txt".to_owned(),
            },
        ]
    );
    assert_eq!(
        engine.remote().exchanges.last().unwrap(),
        "ftp://example.org/pub/"
    );
}

#[test]
fn cd_is_local() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.cd("/does/not/exist/");
    assert_eq!(engine.remote().exchanges.len(), 1);
    match session.read("x.txt") {
        Err(FtpError::TransferError { path, code, .. }) => {
            assert_eq!(path, "does/not/exist/x.txt");
            assert_eq!(code, code::REMOTE_FILE_NOT_FOUND);
        }
        other => panic!("unexpected {:?}", other),
    }
    // still usable after a failed exchange
    session.cd("/");
    assert!(session.ls().unwrap().is_empty());
}

#[test]
fn write_then_read_round_trips() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.cd("/pub/");
    session.write("x.txt", "hello").unwrap();
    assert_eq!(session.read("x.txt").unwrap(), b"hello".to_vec());
    assert_eq!(session.read_to_string("x.txt").unwrap(), "hello");

    let remote = engine.remote();
    assert_eq!(remote.files.get("pub/x.txt").unwrap(), b"hello");
    assert!(!remote.upload);
    assert!(!remote.input_bound);
    assert_eq!(remote.input_size, None);
}

#[test]
fn failed_write_still_clears_upload_directives() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.cd("/pub/");
    engine.remote().fail_exchanges = Some(code::UPLOAD_FAILED);
    match session.write("x.txt", "hello") {
        Err(FtpError::TransferError { path, code, message }) => {
            assert_eq!(path, "pub/x.txt");
            assert_eq!(code, code::UPLOAD_FAILED);
            assert_eq!(message, "injected failure");
        }
        other => panic!("unexpected {:?}", other),
    }
    let remote = engine.remote();
    assert!(!remote.upload);
    assert!(!remote.input_bound);
    assert_eq!(remote.input_size, None);
}

#[test]
fn rejected_directive_during_write_still_clears() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    engine.remote().reject = Some(DirectiveKey::Url);
    match session.write("x.txt", "hello") {
        Err(FtpError::DirectiveError { key, .. }) => assert_eq!(key, DirectiveKey::Url),
        other => panic!("unexpected {:?}", other),
    }
    let remote = engine.remote();
    assert!(!remote.upload);
    assert!(!remote.input_bound);
    assert_eq!(remote.input_size, None);
    assert!(remote.files.is_empty());
}

#[test]
fn rm_sends_dele_and_clears_it() {
    let engine = StubEngine::with_files(&[("pub/x.txt", "hello"), ("pub/y.txt", "")]);
    let mut session = open(&engine);
    session.cd("/pub/");
    session.rm("x.txt").unwrap();
    {
        let remote = engine.remote();
        assert_eq!(remote.quotes, vec!["DELE /pub/x.txt".to_owned()]);
        assert!(remote.pending_quotes.is_empty());
        assert!(!remote.files.contains_key("pub/x.txt"));
        assert_eq!(
            remote.exchanges.last().unwrap(),
            "ftp://example.org/pub/"
        );
    }
    let names: Vec<String> = session.ls().unwrap().into_iter().map(|e| e.text).collect();
    assert_eq!(names, vec!["y.txt".to_owned()]);
}

#[test]
fn failed_rm_still_clears_command() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.cd("/pub/");
    match session.rm("missing.txt") {
        Err(FtpError::TransferError { code, .. }) => assert_eq!(code, code::QUOTE_ERROR),
        other => panic!("unexpected {:?}", other),
    }
    assert!(engine.remote().pending_quotes.is_empty());
}

#[test]
fn close_is_idempotent() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.cd("/pub/");
    session.close();
    session.close();
    assert!(!session.is_connected());
    assert_eq!(session.current_path(), "/");
    assert_eq!(session.host(), None);
    assert!(!session.is_secure());
    assert_eq!(engine.remote().releases, 1);
}

#[test]
fn drop_releases_handle_once() {
    let engine = StubEngine::default();
    {
        let mut session = open(&engine);
        session.close();
        session.open(&ConnectOptions::new("example.org")).unwrap();
    }
    let remote = engine.remote();
    assert_eq!(remote.allocations, 2);
    assert_eq!(remote.releases, 2);
}

#[test]
fn reconnect_releases_previous_handle() {
    let engine = StubEngine::default();
    let mut session = open(&engine);
    session.open(&ConnectOptions::new("example.net")).unwrap();
    assert_eq!(engine.remote().releases, 1);
    assert_eq!(session.host(), Some("example.net"));
}
