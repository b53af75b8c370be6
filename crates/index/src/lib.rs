//! # Index - Record Offset Index
//!
//! A small fixed-format side file that maps the logical position of every
//! record in a record log to the byte offset where that record's block
//! starts. Lookups are a single seek + read, so random access into the log
//! is O(1) regardless of how many records it holds.
//!
//! ## Binary Format
//!
//! ```text
//! [count: u64 LE][offset_0: u64 LE][offset_1: u64 LE] ... [offset_{count-1}: u64 LE]
//! ```
//!
//! Entry `i` lives at byte `8 + 8 * i`. Entries are appended, overwritten in
//! place, or removed by swapping in the last entry. They are never inserted
//! or shifted.
//!
//! ## Handles
//!
//! [`IndexFile`] holds only a path. Every operation opens the file, does its
//! I/O and closes it again, so no cursor survives between calls.
//!
//! ## Example
//!
//! ```rust,no_run
//! use index::IndexFile;
//!
//! let idx = IndexFile::new("records.idx");
//! idx.write(&[1024, 1050]).unwrap();
//! idx.append(1100).unwrap();
//! assert_eq!(idx.len().unwrap(), 3);
//! assert_eq!(idx.get(2).unwrap(), 1100);
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Size in bytes of the count header at the start of the file.
pub const HEADER_BYTES: u64 = 8;

/// Size in bytes of a single offset entry.
pub const ENTRY_BYTES: u64 = 8;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A position at or beyond the stored count was requested.
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds {
        /// The requested position.
        index: u64,
        /// The number of entries at the time of the request.
        len: u64,
    },

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Byte position of entry `i`.
#[inline]
fn entry_pos(i: u64) -> u64 {
    HEADER_BYTES + ENTRY_BYTES * i
}

/// An on-disk list of record offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    /// Binds an index to `path`. No I/O happens until an operation is called.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the path of the index file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the whole file with `offsets`.
    ///
    /// The file is created or truncated, then the count and every entry are
    /// written through a single buffered writer.
    pub fn write(&self, offsets: &[u64]) -> Result<(), IndexError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        let mut w = BufWriter::new(file);
        w.write_u64::<LittleEndian>(offsets.len() as u64)?;
        for &offset in offsets {
            w.write_u64::<LittleEndian>(offset)?;
        }
        w.flush()?;
        Ok(())
    }

    /// Returns the stored entry count, or 0 if the file does not exist.
    pub fn len(&self) -> Result<u64, IndexError> {
        if !self.path.is_file() {
            return Ok(0);
        }
        let mut f = File::open(&self.path)?;
        Ok(f.read_u64::<LittleEndian>()?)
    }

    /// Returns `true` if the index holds no entries (or does not exist).
    pub fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }

    /// Returns the offset stored at position `i`.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfBounds`] if `i >= len()`.
    pub fn get(&self, i: u64) -> Result<u64, IndexError> {
        let len = self.len()?;
        if i >= len {
            return Err(IndexError::OutOfBounds { index: i, len });
        }
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(entry_pos(i)))?;
        Ok(f.read_u64::<LittleEndian>()?)
    }

    /// Overwrites the offset stored at position `i`.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfBounds`] if `i >= len()`.
    pub fn set(&self, i: u64, value: u64) -> Result<(), IndexError> {
        let mut f = OpenOptions::new().read(true).write(true).open(self.existing(i)?)?;
        let len = f.read_u64::<LittleEndian>()?;
        if i >= len {
            return Err(IndexError::OutOfBounds { index: i, len });
        }
        f.seek(SeekFrom::Start(entry_pos(i)))?;
        f.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Appends `offset` as the new last entry.
    ///
    /// An index that reports zero entries is recreated from scratch, so a
    /// stale file left behind with a zero count never keeps old entries.
    /// Otherwise the count is bumped first and the offset written after the
    /// current last entry.
    pub fn append(&self, offset: u64) -> Result<(), IndexError> {
        let len = self.len()?;
        if len == 0 {
            return self.write(&[offset]);
        }

        let mut f = OpenOptions::new().write(true).open(&self.path)?;
        f.seek(SeekFrom::Start(0))?;
        f.write_u64::<LittleEndian>(len + 1)?;
        f.seek(SeekFrom::Start(entry_pos(len)))?;
        f.write_u64::<LittleEndian>(offset)?;
        Ok(())
    }

    /// Removes position `i` in O(1) without preserving order.
    ///
    /// The last entry is read, the file shrinks by one entry, and unless `i`
    /// was the last position the saved value is written into slot `i`. The
    /// count is decremented last. Returns the offset that was removed.
    ///
    /// # Errors
    ///
    /// [`IndexError::OutOfBounds`] if `i >= len()`.
    pub fn quick_remove_at(&self, i: u64) -> Result<u64, IndexError> {
        let mut f = OpenOptions::new().read(true).write(true).open(self.existing(i)?)?;
        let len = f.read_u64::<LittleEndian>()?;
        if i >= len {
            return Err(IndexError::OutOfBounds { index: i, len });
        }
        let last = len - 1;

        f.seek(SeekFrom::Start(entry_pos(last)))?;
        let moved = f.read_u64::<LittleEndian>()?;

        let removed = if i < last {
            f.seek(SeekFrom::Start(entry_pos(i)))?;
            f.read_u64::<LittleEndian>()?
        } else {
            moved
        };

        f.set_len(entry_pos(last))?;

        // Swap only when the removed slot is not the tail.
        if i < last {
            f.seek(SeekFrom::Start(entry_pos(i)))?;
            f.write_u64::<LittleEndian>(moved)?;
        }

        f.seek(SeekFrom::Start(0))?;
        f.write_u64::<LittleEndian>(last)?;
        Ok(removed)
    }

    /// Returns a lazy iterator over every offset in position order.
    ///
    /// The entry count is read on the first call to `next`; every step then
    /// reopens the file through [`get`](IndexFile::get). The iterator can be
    /// recreated at any time to restart from position 0.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            index: self,
            pos: 0,
            len: None,
        }
    }

    /// Reads all offsets with a single buffered pass.
    pub fn to_vec(&self) -> Result<Vec<u64>, IndexError> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let stored = file.metadata()?.len().saturating_sub(HEADER_BYTES) / ENTRY_BYTES;
        let mut r = BufReader::new(file);
        let len = r.read_u64::<LittleEndian>()?;
        // The count may be garbage; never reserve more than the file can hold.
        let mut offsets = Vec::with_capacity(usize::try_from(len.min(stored)).unwrap_or(0));
        for _ in 0..len {
            offsets.push(r.read_u64::<LittleEndian>()?);
        }
        Ok(offsets)
    }

    /// Returns the path if the file exists. A missing file has no entries, so
    /// any position `i` is out of bounds.
    fn existing(&self, i: u64) -> Result<&Path, IndexError> {
        if self.path.is_file() {
            Ok(&self.path)
        } else {
            Err(IndexError::OutOfBounds { index: i, len: 0 })
        }
    }
}

impl fmt::Display for IndexFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.len() {
            Ok(n) => write!(f, "Index file with {} items", n),
            Err(e) => write!(f, "Index file at {} ({})", self.path.display(), e),
        }
    }
}

/// Lazy offset iterator returned by [`IndexFile::iter`].
pub struct Iter<'a> {
    index: &'a IndexFile,
    pos: u64,
    /// `None` until the first step reads the count.
    len: Option<u64>,
}

impl Iterator for Iter<'_> {
    type Item = Result<u64, IndexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = match self.len {
            Some(n) => n,
            None => match self.index.len() {
                Ok(n) => {
                    self.len = Some(n);
                    n
                }
                Err(e) => {
                    // Stop after reporting the failure.
                    self.len = Some(0);
                    return Some(Err(e));
                }
            },
        };

        if self.pos >= len {
            return None;
        }
        let item = self.index.get(self.pos);
        self.pos += 1;
        Some(item)
    }
}

impl<'a> IntoIterator for &'a IndexFile {
    type Item = Result<u64, IndexError>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
