//! Record-log layout constants and header helpers.
//!
//! ```text
//! [reserved: 1024 zero bytes][block][block]...
//! block = [len_0: u64 LE] ... [len_{arity-1}: u64 LE][payload_0] ... [payload_{arity-1}]
//! ```
//!
//! The reserved region is written once when the log is created and is never
//! read back as record data.

use std::fs::OpenOptions;
use std::io::{Result as IoResult, Write};
use std::path::{Path, PathBuf};

/// Bytes reserved at the start of every record log for future metadata.
pub const RESERVED_SPACE: u64 = 1024;

/// Size of one field-length header entry.
pub const LENGTH_BYTES: u64 = 8;

/// Extension used for the default index path.
pub const INDEX_EXTENSION: &str = "idx";

/// Returns the default index path for a record log: the same path with its
/// extension replaced by [`INDEX_EXTENSION`].
#[must_use]
pub fn default_index_path(log_path: &Path) -> PathBuf {
    log_path.with_extension(INDEX_EXTENSION)
}

/// Writes the zero-filled reserved region to `w`.
pub fn write_reserved_header<W: Write>(w: &mut W) -> IoResult<()> {
    w.write_all(&[0u8; RESERVED_SPACE as usize])
}

/// Creates (or truncates) a record log at `path` holding only the reserved
/// header.
pub fn create_log(path: &Path) -> IoResult<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    write_reserved_header(&mut f)?;
    f.flush()
}
