//! # Dataset - Indexed Record Dataset
//!
//! Random access, append, unordered removal and compaction over a record
//! log and its offset index.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │            INDEXED RECORD DATASET             │
//! │                                               │
//! │ read.rs  → index.get(i) → seek log → decode   │
//! │                                               │
//! │ write.rs → encode → log append → index append │
//! │            quick_remove_at → index swap only  │
//! │                         |                     │
//! │                         |  (orphaned bytes)   │
//! │                         v                     │
//! │ compaction.rs → defrag() → DatasetBuilder     │
//! │                  (fresh log + index pair)     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module          | Purpose                                              |
//! |-----------------|------------------------------------------------------|
//! | [`lib.rs`]      | struct, constructor, accessors, errors, `Debug`      |
//! | [`read`]        | `get()`, `iter()`, size accounting                   |
//! | [`write`]       | `append()`, `quick_remove_at()`                      |
//! | [`compaction`]  | `defrag()`                                           |
//!
//! ## Handles
//!
//! The dataset caches nothing. Every call opens the files it needs and
//! closes them before returning, so two datasets bound to the same paths see
//! each other's writes. There is no locking: callers that share a dataset
//! between writers must serialize access themselves.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dataset::IndexedRecordDataset;
//! use recordlog::{CodecError, Decoder, Encoder};
//!
//! fn enc(v: &String) -> Result<Vec<u8>, CodecError> {
//!     Ok(v.as_bytes().to_vec())
//! }
//! fn dec(b: Vec<u8>) -> Result<String, CodecError> {
//!     Ok(String::from_utf8(b)?)
//! }
//!
//! let ds = IndexedRecordDataset::new("notes.bin")
//!     .with_encoders(vec![Box::new(enc) as Box<dyn Encoder<String>>])
//!     .with_decoders(vec![Box::new(dec) as Box<dyn Decoder<String>>]);
//! ds.append(&["hello".to_string()]).unwrap();
//! assert_eq!(ds.get(0).unwrap(), vec!["hello".to_string()]);
//! ```
mod compaction;
mod read;
mod write;

use index::{IndexError, IndexFile};
use recordlog::{default_index_path, CodecError, Decoders, Encoders, RecordError};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use read::Iter;
pub use recordlog::BuiltDataset;

/// Which codec list an operation needed but did not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Field encoders, needed by every write path.
    Encoders,
    /// Field decoders, needed by every read path.
    Decoders,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Encoders => f.write_str("encoders"),
            CodecKind::Decoders => f.write_str("decoders"),
        }
    }
}

/// Errors returned by dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A position at or beyond the current length was requested.
    #[error("index {index} out of bounds (len {len})")]
    OutOfBounds {
        /// The requested position.
        index: u64,
        /// The dataset length at the time of the request.
        len: u64,
    },

    /// The operation needs a codec list that was not supplied.
    #[error("missing {0}: the dataset was opened without them")]
    MissingCodec(CodecKind),

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Encoder and decoder counts disagree, or a record has the wrong number
    /// of values.
    #[error("record has {actual} fields, expected {expected}")]
    ArityMismatch {
        /// The dataset arity.
        expected: usize,
        /// The conflicting count.
        actual: usize,
    },

    /// A field encoder failed.
    #[error("failed to encode field {field}: {source}")]
    Encode {
        /// Position of the failing field.
        field: usize,
        /// The encoder's error.
        source: CodecError,
    },

    /// A field decoder failed.
    #[error("failed to decode field {field}: {source}")]
    Decode {
        /// Position of the failing field.
        field: usize,
        /// The decoder's error.
        source: CodecError,
    },

    /// Compaction was pointed at the dataset's own files.
    #[error("refusing to compact onto the source file {}", .0.display())]
    SameFile(PathBuf),
}

impl From<IndexError> for DatasetError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::OutOfBounds { index, len } => DatasetError::OutOfBounds { index, len },
            IndexError::Io(e) => DatasetError::Io(e),
        }
    }
}

impl From<RecordError> for DatasetError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Io(e) => DatasetError::Io(e),
            RecordError::Index(e) => e.into(),
            RecordError::ArityMismatch { expected, actual } => {
                DatasetError::ArityMismatch { expected, actual }
            }
            RecordError::Encode { field, source } => DatasetError::Encode { field, source },
            RecordError::Decode { field, source } => DatasetError::Decode { field, source },
        }
    }
}

/// Result alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// How [`append`](IndexedRecordDataset::append) treats an existing record
/// log when the index reports zero entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendPolicy {
    /// Keep existing log bytes. A fresh header is written only when the log
    /// is missing, or when the index is empty and the log is too short to
    /// hold the reserved header. Stale bytes become orphans that
    /// [`defrag`](IndexedRecordDataset::defrag) reclaims.
    #[default]
    Preserve,
    /// Recreate the log whenever the index reports zero entries, discarding
    /// whatever the file held.
    ResetOnEmptyIndex,
}

/// A record log plus its offset index, accessed by logical position.
///
/// The handle stores paths and codec lists only. The record arity is the
/// length of the decoder list (or of the encoder list for write-only
/// handles) and must match whatever wrote the log; it is never stored on
/// disk.
pub struct IndexedRecordDataset<T> {
    pub(crate) path: PathBuf,
    pub(crate) index: IndexFile,
    pub(crate) encoders: Option<Encoders<T>>,
    pub(crate) decoders: Option<Decoders<T>>,
    pub(crate) append_policy: AppendPolicy,
}

/// Former name of [`IndexedRecordDataset`].
#[deprecated(note = "renamed to IndexedRecordDataset")]
pub type EzRecordDataset<T> = IndexedRecordDataset<T>;

impl<T> fmt::Debug for IndexedRecordDataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedRecordDataset")
            .field("path", &self.path)
            .field("index_path", &self.index.path())
            .field("arity", &self.arity().ok())
            .field("len", &self.len().ok())
            .field("log_size", &self.log_size().ok())
            .field("has_encoders", &self.encoders.is_some())
            .field("has_decoders", &self.decoders.is_some())
            .field("append_policy", &self.append_policy)
            .finish()
    }
}

impl<T> IndexedRecordDataset<T> {
    /// Binds a dataset to the record log at `path`, with the index at the
    /// default `<path>.idx` location and no codecs. No I/O happens here.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let index = IndexFile::new(default_index_path(&path));
        Self {
            path,
            index,
            encoders: None,
            decoders: None,
            append_policy: AppendPolicy::default(),
        }
    }

    /// Uses `path` for the index instead of the default.
    #[must_use]
    pub fn with_index_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index = IndexFile::new(path);
        self
    }

    /// Supplies the field encoders required by write paths.
    #[must_use]
    pub fn with_encoders(mut self, encoders: Encoders<T>) -> Self {
        self.encoders = Some(encoders);
        self
    }

    /// Supplies the field decoders required by read paths.
    #[must_use]
    pub fn with_decoders(mut self, decoders: Decoders<T>) -> Self {
        self.decoders = Some(decoders);
        self
    }

    /// Sets how `append` treats an existing log when the index is empty.
    #[must_use]
    pub fn with_append_policy(mut self, policy: AppendPolicy) -> Self {
        self.append_policy = policy;
        self
    }

    /// Returns the record-log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the index path.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        self.index.path()
    }

    /// Returns the underlying index.
    #[must_use]
    pub fn index(&self) -> &IndexFile {
        &self.index
    }

    /// Returns the configured append policy.
    #[must_use]
    pub fn append_policy(&self) -> AppendPolicy {
        self.append_policy
    }

    /// Returns the record arity.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::MissingCodec`] if neither codec list was supplied.
    /// - [`DatasetError::ArityMismatch`] if both were supplied with
    ///   different lengths.
    pub fn arity(&self) -> Result<usize> {
        match (&self.decoders, &self.encoders) {
            (Some(d), Some(e)) if d.len() != e.len() => Err(DatasetError::ArityMismatch {
                expected: d.len(),
                actual: e.len(),
            }),
            (Some(d), _) => Ok(d.len()),
            (None, Some(e)) => Ok(e.len()),
            (None, None) => Err(DatasetError::MissingCodec(CodecKind::Decoders)),
        }
    }

    /// Returns the number of records (0 if the index does not exist yet).
    pub fn len(&self) -> Result<u64> {
        Ok(self.index.len()?)
    }

    /// Returns `true` if the dataset holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests;
