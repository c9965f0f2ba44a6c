//! Turns a session's current path and a file name into the locator handed
//! to the engine.
//!
//! No percent-encoding is applied. Callers supply path and file components
//! that are already safe to embed in a URL.

/// Where an operation points: host, current path and transport security.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    host: &'a str,
    current_path: &'a str,
    secure: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(host: &'a str, current_path: &'a str, secure: bool) -> Resolver<'a> {
        Resolver {
            host,
            current_path,
            secure,
        }
    }

    /// The path relative to the server root, never starting with `/`.
    ///
    /// Without a file name the result names the directory itself and ends
    /// with `/` (or is empty for the root).
    pub fn resolve_path(&self, file_name: Option<&str>) -> String {
        let dir = self.current_path.trim_matches('/');
        let file_name = file_name.unwrap_or("");
        if dir.is_empty() {
            return file_name.to_owned();
        }
        format!("{}/{}", dir, file_name)
    }

    /// `{scheme}://{host}/{resolve_path(file_name)}`
    pub fn resolve_url(&self, file_name: Option<&str>) -> String {
        let scheme = if self.secure { "ftps" } else { "ftp" };
        format!(
            "{}://{}/{}",
            scheme,
            self.host,
            self.resolve_path(file_name)
        )
    }

    /// Absolute id of a listing entry found in the current directory.
    pub fn entry_id(&self, name: &str) -> String {
        format!("{}/{}", self.current_path.trim_end_matches('/'), name)
    }
}
