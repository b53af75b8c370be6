//! # Record Log - Positional Multi-Field Records
//!
//! The append-only data file of an indexed record store, plus the bulk
//! builder that produces a record log together with its [`index::IndexFile`].
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ RESERVED (1024 zero bytes, never read as record data)         │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOCK                                                         │
//! │                                                               │
//! │ len_0 (u64) | len_1 (u64) | ... | len_{arity-1} (u64)         │
//! │ payload_0 | payload_1 | ... | payload_{arity-1}               │
//! ├───────────────────────────────────────────────────────────────┤
//! │ ... more blocks, in write order ...                           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. There is no magic, no arity field and no
//! block delimiter: the index points at the start of each block and the
//! caller supplies the arity through its codec list.
//!
//! ## Example
//!
//! ```rust,no_run
//! use recordlog::{make_dataset, CodecError, Encoder, Encoders};
//!
//! fn text(v: &String) -> Result<Vec<u8>, CodecError> {
//!     Ok(v.as_bytes().to_vec())
//! }
//!
//! let encoders: Encoders<String> = vec![Box::new(text) as Box<dyn Encoder<String>>, Box::new(text)];
//! let records = vec![
//!     vec!["a".to_string(), "b".to_string()],
//!     vec!["c".to_string(), "d".to_string()],
//! ];
//! let built = make_dataset(records, "pairs.bin", encoders, None).unwrap();
//! assert_eq!(built.len, 2);
//! ```

mod builder;
mod codec;
mod format;

use std::io;

use index::IndexError;
use thiserror::Error;

pub use builder::{make_dataset, BuiltDataset, DatasetBuilder};
pub use codec::{
    encode_record, read_block_len, read_raw_record, read_record, CodecError, Decoder, Decoders,
    Encoder, Encoders, Raw,
};
pub use format::{
    create_log, default_index_path, write_reserved_header, INDEX_EXTENSION, LENGTH_BYTES,
    RESERVED_SPACE,
};

/// Errors that can occur while writing or reading record blocks.
#[derive(Debug, Error)]
pub enum RecordError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The index file could not be written or read.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A record carried a different number of values than there are codecs.
    #[error("record has {actual} fields, expected {expected}")]
    ArityMismatch {
        /// Number of codecs (the dataset arity).
        expected: usize,
        /// Number of values supplied.
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
}

#[cfg(test)]
mod tests;
