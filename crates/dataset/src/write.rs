use recordlog::{create_log, encode_record, RESERVED_SPACE};
use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};

use crate::{AppendPolicy, CodecKind, DatasetError, IndexedRecordDataset, Result};

impl<T> IndexedRecordDataset<T> {
    /// Appends one record and returns its logical position.
    ///
    /// # Steps
    ///
    /// 1. Encode every field (nothing touches disk if this fails).
    /// 2. Create the record log with a fresh reserved header if needed, as
    ///    decided by the [`AppendPolicy`].
    /// 3. Capture the log's end-of-file offset and append it to the index.
    /// 4. Append the block to the log.
    ///
    /// Steps 3 and 4 are not atomic: a crash between them leaves an index
    /// entry pointing at bytes that were never written.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::MissingCodec`] if no encoders were supplied.
    /// - [`DatasetError::ArityMismatch`] if `items` does not have exactly
    ///   `arity` values.
    /// - [`DatasetError::Encode`] if a field encoder fails.
    /// - [`DatasetError::Io`] on any file error.
    pub fn append(&self, items: &[T]) -> Result<u64> {
        let encoders = self
            .encoders
            .as_ref()
            .ok_or(DatasetError::MissingCodec(CodecKind::Encoders))?;
        self.arity()?;

        let mut block = Vec::with_capacity(256);
        encode_record(encoders, items, &mut block)?;

        let len = self.index.len()?;
        self.prepare_log(len)?;

        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        let offset = f.seek(SeekFrom::End(0))?;
        self.index.append(offset)?;
        f.write_all(&block)?;
        f.flush()?;

        tracing::debug!(position = len, offset, bytes = block.len(), "appended record");
        Ok(len)
    }

    /// Removes the record at `i` in O(1) by moving the last record into its
    /// slot. Order is not preserved.
    ///
    /// Only the index changes. The removed record's bytes stay in the log
    /// until [`defrag`](IndexedRecordDataset::defrag) writes a compacted copy.
    ///
    /// # Errors
    ///
    /// [`DatasetError::OutOfBounds`] if `i >= len()`.
    pub fn quick_remove_at(&self, i: u64) -> Result<()> {
        let offset = self.index.quick_remove_at(i)?;
        tracing::debug!(position = i, offset, "removed record");
        Ok(())
    }

    /// Makes sure the log exists with a reserved header before an append.
    fn prepare_log(&self, index_len: u64) -> Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(m) => Some(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let reset = match size {
            None => true,
            Some(_) if index_len > 0 => false,
            Some(s) if s < RESERVED_SPACE => true,
            Some(_) => self.append_policy == AppendPolicy::ResetOnEmptyIndex,
        };
        if !reset {
            return Ok(());
        }

        if let Some(s) = size.filter(|&s| s > RESERVED_SPACE) {
            tracing::warn!(
                path = %self.path.display(),
                discarded_bytes = s - RESERVED_SPACE,
                "index is empty, recreating record log"
            );
        }
        create_log(&self.path)?;
        Ok(())
    }
}
