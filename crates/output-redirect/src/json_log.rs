//! Append-only JSON array files.
//!
//! A log file always holds one compact JSON array terminated by `]\n`. Appending
//! rewrites the last two bytes to `,\n` and writes the new element plus a fresh
//! `]\n`, so the array never has to be read back into memory. The rewrite and
//! the append are separate writes; a crash between them leaves a broken tail.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{RedirectError, Result};
use crate::log_record::LogRecord;

const ARRAY_OPEN: &[u8] = b"[";
const ARRAY_CLOSE: &[u8] = b"]\n";
const ELEMENT_SEPARATOR: &[u8] = b",\n";

/// Creates `path` (and missing parents) as an empty file, truncating any
/// previous content.
pub fn create_empty(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| RedirectError::io(parent, err))?;
        }
    }
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path).map_err(|err| RedirectError::io(path, err))?;
    Ok(())
}

pub fn append_record(path: &Path, record: &LogRecord) -> Result<()> {
    let mut encoded = serde_json::to_vec(record)?;
    encoded.extend_from_slice(ARRAY_CLOSE);

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|err| RedirectError::io(path, err))?;
    let len = file
        .metadata()
        .map_err(|err| RedirectError::io(path, err))?
        .len();

    if len == 0 {
        write_at_end(&mut file, path, ARRAY_OPEN)?;
    } else {
        file.seek(SeekFrom::End(-(ARRAY_CLOSE.len() as i64)))
            .map_err(|err| RedirectError::io(path, err))?;
        file.write_all(ELEMENT_SEPARATOR)
            .map_err(|err| RedirectError::io(path, err))?;
    }
    write_at_end(&mut file, path, &encoded)?;
    file.flush().map_err(|err| RedirectError::io(path, err))
}

fn write_at_end(file: &mut File, path: &Path, bytes: &[u8]) -> Result<()> {
    file.seek(SeekFrom::End(0))
        .map_err(|err| RedirectError::io(path, err))?;
    file.write_all(bytes)
        .map_err(|err| RedirectError::io(path, err))
}

/// Parses a log file. An empty file is an empty log; a broken tail is an error.
pub fn read_records(path: &Path) -> Result<Vec<LogRecord>> {
    let raw = fs::read_to_string(path).map_err(|err| RedirectError::io(path, err))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}
