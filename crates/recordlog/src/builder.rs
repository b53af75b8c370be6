use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use index::IndexFile;

use crate::codec::{encode_record, Encoders};
use crate::format::{default_index_path, write_reserved_header, RESERVED_SPACE};
use crate::RecordError;

/// Paths and record count of a freshly built (log, index) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltDataset {
    /// Path of the record log.
    pub log_path: PathBuf,
    /// Path of the index file.
    pub index_path: PathBuf,
    /// Number of records written.
    pub len: u64,
}

/// Single-pass bulk writer for a record log and its index.
///
/// Records are streamed to the log as they arrive while their offsets are
/// collected in memory. The index is written once, after the last record, so
/// a completed build always leaves the two files consistent with each other.
///
/// # Failure
///
/// If a record fails to encode (or the source iterator reports an error) the
/// build stops. The log is left with trailing bytes that no index refers to
/// and no index is written. Such a log must be discarded.
pub struct DatasetBuilder<T> {
    encoders: Encoders<T>,
    index_path: Option<PathBuf>,
}

impl<T> DatasetBuilder<T> {
    /// Creates a builder writing records with `encoders`. The record arity is
    /// `encoders.len()`.
    pub fn new(encoders: Encoders<T>) -> Self {
        Self {
            encoders,
            index_path: None,
        }
    }

    /// Writes the index to `path` instead of the default `<log>.idx`.
    #[must_use]
    pub fn with_index_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Returns the record arity.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.encoders.len()
    }

    /// Builds a (log, index) pair at `output` from `records`.
    pub fn build<I, P>(&self, records: I, output: P) -> Result<BuiltDataset, RecordError>
    where
        I: IntoIterator<Item = Vec<T>>,
        P: AsRef<Path>,
    {
        self.build_fallible(records.into_iter().map(Ok::<_, RecordError>), output)
    }

    /// Builds a (log, index) pair from a source whose items may fail.
    ///
    /// The first `Err` from `records` aborts the build and is returned as-is.
    pub fn build_fallible<I, P, E>(&self, records: I, output: P) -> Result<BuiltDataset, E>
    where
        I: IntoIterator<Item = Result<Vec<T>, E>>,
        P: AsRef<Path>,
        E: From<RecordError>,
    {
        let log_path = output.as_ref().to_path_buf();
        let index_path = self
            .index_path
            .clone()
            .unwrap_or_else(|| default_index_path(&log_path));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)
            .map_err(RecordError::from)?;
        let mut w = BufWriter::new(file);
        write_reserved_header(&mut w).map_err(RecordError::from)?;

        // Tracked by hand: asking a BufWriter for its position flushes it.
        let mut offset = RESERVED_SPACE;
        let mut offsets: Vec<u64> = Vec::new();
        let mut block: Vec<u8> = Vec::with_capacity(256);

        for record in records {
            let record = record?;
            encode_record(&self.encoders, &record, &mut block)?;
            offsets.push(offset);
            w.write_all(&block).map_err(RecordError::from)?;
            offset += block.len() as u64;
        }

        w.flush().map_err(RecordError::from)?;
        drop(w);

        IndexFile::new(&index_path)
            .write(&offsets)
            .map_err(RecordError::from)?;

        tracing::debug!(
            records = offsets.len(),
            bytes = offset,
            log = %log_path.display(),
            index = %index_path.display(),
            "built record log"
        );

        Ok(BuiltDataset {
            log_path,
            index_path,
            len: offsets.len() as u64,
        })
    }
}

/// Builds a (log, index) pair in one call.
///
/// Shorthand for [`DatasetBuilder::new`] + [`DatasetBuilder::build`]; when
/// `index_path` is `None` the index goes next to the log with an `.idx`
/// extension.
pub fn make_dataset<T, I, P>(
    records: I,
    output: P,
    encoders: Encoders<T>,
    index_path: Option<&Path>,
) -> Result<BuiltDataset, RecordError>
where
    I: IntoIterator<Item = Vec<T>>,
    P: AsRef<Path>,
{
    let mut builder = DatasetBuilder::new(encoders);
    if let Some(p) = index_path {
        builder = builder.with_index_path(p);
    }
    builder.build(records, output)
}
