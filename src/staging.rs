//! Temporary local storage for upload payloads.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use super::types::Result;

/// Bytes written to an anonymous temporary file. The storage is released
/// when the value is dropped.
#[derive(Debug)]
pub struct StagedUpload {
    file: File,
    len: u64,
}

impl StagedUpload {
    pub fn new(content: &[u8]) -> Result<StagedUpload> {
        let mut file = tempfile::tempfile()?;
        file.write_all(content)?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(StagedUpload {
            file,
            len: content.len() as u64,
        })
    }

    /// A readable handle positioned at the start of the staged bytes.
    pub fn reader(&self) -> Result<File> {
        let mut reader = self.file.try_clone()?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(reader)
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
