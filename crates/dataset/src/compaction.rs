//! Compaction: rewrites the live records into a fresh (log, index) pair.
//!
//! Records are streamed in current index order through the bulk builder
//! with identity codecs, so payload bytes are copied without being decoded.
//! The source pair is never modified.

use recordlog::{default_index_path, BuiltDataset, DatasetBuilder, Raw};
use std::fs;
use std::path::Path;

use crate::{DatasetError, IndexedRecordDataset, Result};

impl<T> IndexedRecordDataset<T> {
    /// Writes a compacted copy of the dataset to `output`, with the index at
    /// the default `<output>.idx` location.
    ///
    /// The new log holds only the records the index currently refers to,
    /// back to back after the reserved header, in the same logical order.
    /// Deleting or replacing the original pair is left to the caller.
    ///
    /// Only the arity is needed, so either codec list is enough.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::MissingCodec`] if neither codec list was supplied.
    /// - [`DatasetError::SameFile`] if `output` (or its index) would
    ///   overwrite this dataset's log or index.
    /// - [`DatasetError::Io`] on any file error. A failed compaction leaves
    ///   an unusable partial output.
    pub fn defrag<P: AsRef<Path>>(&self, output: P) -> Result<BuiltDataset> {
        let index_path = default_index_path(output.as_ref());
        self.defrag_with_index(output, index_path)
    }

    /// Like [`defrag`](IndexedRecordDataset::defrag) with an explicit index
    /// path for the output.
    pub fn defrag_with_index<P, Q>(&self, output: P, index_path: Q) -> Result<BuiltDataset>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let output = output.as_ref();
        let index_path = index_path.as_ref();
        let arity = self.arity()?;

        for target in [output, index_path] {
            for source in [self.path.as_path(), self.index.path()] {
                if same_file(target, source) {
                    return Err(DatasetError::SameFile(target.to_path_buf()));
                }
            }
        }

        let before = self.log_size()?;
        let len = self.len()?;
        let records = (0..len).map(|i| self.get_raw(i, arity));

        let built = DatasetBuilder::new(Raw::encoders(arity))
            .with_index_path(index_path)
            .build_fallible(records, output)?;

        let after = fs::metadata(&built.log_path)?.len();
        tracing::debug!(
            records = built.len,
            before,
            after,
            output = %built.log_path.display(),
            "compacted record log"
        );
        Ok(built)
    }
}

/// Returns `true` if `a` and `b` name the same file.
///
/// Paths that do not exist yet are compared as written.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
