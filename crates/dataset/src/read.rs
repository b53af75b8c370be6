use recordlog::{read_block_len, read_raw_record, read_record, RESERVED_SPACE};
use std::fs::{self, File};
use std::io::{self, BufReader, Seek, SeekFrom};

use crate::{CodecKind, DatasetError, IndexedRecordDataset, Result};

impl<T> IndexedRecordDataset<T> {
    /// Returns the record at logical position `idx`.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::MissingCodec`] if no decoders were supplied.
    /// - [`DatasetError::OutOfBounds`] if `idx >= len()`.
    /// - [`DatasetError::Decode`] if a field decoder fails.
    /// - [`DatasetError::Io`] on any file error, including a block that ends
    ///   before its declared lengths.
    pub fn get(&self, idx: u64) -> Result<Vec<T>> {
        let decoders = self
            .decoders
            .as_ref()
            .ok_or(DatasetError::MissingCodec(CodecKind::Decoders))?;
        self.arity()?;

        let offset = self.index.get(idx)?;
        let mut r = self.open_at(offset)?;
        Ok(read_record(&mut r, decoders)?)
    }

    /// Returns a lazy iterator over every record in index order.
    ///
    /// The length is read on the first step and every step reopens the log,
    /// so no handle is held between items. Calling `iter` again restarts from
    /// position 0.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            dataset: self,
            pos: 0,
            len: None,
        }
    }

    /// Returns the size of the record log in bytes, or 0 if it does not exist.
    pub fn log_size(&self) -> Result<u64> {
        match fs::metadata(&self.path) {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the number of log bytes occupied by indexed records.
    ///
    /// Only the length header of each block is read.
    pub fn live_bytes(&self) -> Result<u64> {
        let arity = self.arity()?;
        let offsets = self.index.to_vec()?;
        if offsets.is_empty() {
            return Ok(0);
        }

        let mut r = BufReader::new(File::open(&self.path)?);
        let mut total = 0u64;
        for offset in offsets {
            r.seek(SeekFrom::Start(offset))?;
            total += read_block_len(&mut r, arity)?;
        }
        Ok(total)
    }

    /// Returns the number of log bytes no index entry refers to: blocks left
    /// behind by `quick_remove_at`, or stale data kept by `append`.
    pub fn orphaned_bytes(&self) -> Result<u64> {
        let size = self.log_size()?;
        let live = self.live_bytes()?;
        Ok(size.saturating_sub(RESERVED_SPACE).saturating_sub(live))
    }

    /// Reads the raw payloads of the record at `idx` without decoding them.
    pub(crate) fn get_raw(&self, idx: u64, arity: usize) -> Result<Vec<Vec<u8>>> {
        let offset = self.index.get(idx)?;
        let mut r = self.open_at(offset)?;
        Ok(read_raw_record(&mut r, arity)?)
    }

    fn open_at(&self, offset: u64) -> Result<BufReader<File>> {
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::new(f))
    }
}

/// Lazy record iterator returned by [`IndexedRecordDataset::iter`].
pub struct Iter<'a, T> {
    dataset: &'a IndexedRecordDataset<T>,
    pos: u64,
    /// `None` until the first step reads the length.
    len: Option<u64>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = Result<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = match self.len {
            Some(n) => n,
            None => match self.dataset.len() {
                Ok(n) => {
                    self.len = Some(n);
                    n
                }
                Err(e) => {
                    self.len = Some(0);
                    return Some(Err(e));
                }
            },
        };

        if self.pos >= len {
            return None;
        }
        let item = self.dataset.get(self.pos);
        self.pos += 1;
        Some(item)
    }
}

impl<'a, T> IntoIterator for &'a IndexedRecordDataset<T> {
    type Item = Result<Vec<T>>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
