//! Turns logical operations into directive sequences and single exchanges.

use super::directive::Directive;
use super::engine::TransferHandle;
use super::resolver::Resolver;
use super::staging::StagedUpload;
use super::types::{Entry, FtpError, Result};

/// Apply one directive, naming it in the error when the engine refuses.
pub fn apply<H: TransferHandle>(handle: &mut H, directive: Directive) -> Result<()> {
    let key = directive.key();
    debug!("set {}", key);
    handle.set(directive).map_err(|e| FtpError::DirectiveError {
        key,
        code: e.code,
        message: e.message,
    })
}

/// Run one exchange against `file_name`, or list the current directory
/// when no file name is given.
pub fn execute_exchange<H: TransferHandle>(
    handle: &mut H,
    target: &Resolver,
    file_name: Option<&str>,
) -> Result<Vec<u8>> {
    let file_name = file_name.filter(|name| !name.is_empty());
    apply(handle, Directive::ListOnly(file_name.is_none()))?;
    apply(handle, Directive::Url(target.resolve_url(file_name)))?;

    debug!("exchange {}", target.resolve_url(file_name));
    handle.perform().map_err(|e| {
        let path = target.resolve_path(file_name);
        debug!("exchange on '{}' failed: {}", path, e);
        FtpError::TransferError {
            path,
            code: e.code,
            message: e.message,
        }
    })
}

pub fn list<H: TransferHandle>(handle: &mut H, target: &Resolver) -> Result<Vec<Entry>> {
    let payload = execute_exchange(handle, target, None)?;
    Ok(parse_listing(&String::from_utf8_lossy(&payload), target))
}

fn parse_listing(listing: &str, target: &Resolver) -> Vec<Entry> {
    let listing = listing.trim();
    if listing.is_empty() {
        return Vec::new();
    }
    listing
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .map(|line| Entry {
            text: line.to_owned(),
            id: target.entry_id(line),
        })
        .collect()
}

pub fn read<H: TransferHandle>(
    handle: &mut H,
    target: &Resolver,
    file_name: &str,
) -> Result<Vec<u8>> {
    execute_exchange(handle, target, Some(file_name))
}

pub fn write<H: TransferHandle>(
    handle: &mut H,
    target: &Resolver,
    file_name: &str,
    content: &[u8],
) -> Result<()> {
    let staged = StagedUpload::new(content)?;
    let outcome = upload(handle, target, file_name, &staged);

    // Reset even when the upload failed, so the next exchange is not an upload.
    let reset = apply(handle, Directive::Upload(false))
        .and(apply(handle, Directive::InputSource(None)))
        .and(apply(handle, Directive::InputSize(None)));
    drop(staged);

    outcome.and(reset)
}

fn upload<H: TransferHandle>(
    handle: &mut H,
    target: &Resolver,
    file_name: &str,
    staged: &StagedUpload,
) -> Result<()> {
    apply(handle, Directive::Upload(true))?;
    apply(handle, Directive::InputSource(Some(staged.reader()?)))?;
    apply(handle, Directive::InputSize(Some(staged.len())))?;
    execute_exchange(handle, target, Some(file_name)).map(|_| ())
}

pub fn remove<H: TransferHandle>(
    handle: &mut H,
    target: &Resolver,
    file_name: &str,
) -> Result<Vec<u8>> {
    let command = format!(
        "DELE /{}",
        target.resolve_path(Some(file_name)).trim_start_matches('/')
    );
    let outcome = apply(handle, Directive::PreTransferCommands(vec![command]))
        .and_then(|_| execute_exchange(handle, target, None));

    let reset = apply(handle, Directive::PreTransferCommands(Vec::new()));
    let ack = outcome?;
    reset.map(|_| ack)
}
