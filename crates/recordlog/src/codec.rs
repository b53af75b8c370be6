//! Per-field codec capabilities and the record block codec.
//!
//! A record is a positional list of `arity` values. Each position has its own
//! [`Encoder`] (for writes) and [`Decoder`] (for reads); the length of the
//! list is the record arity. Arity is never stored on disk, so a reader must
//! be configured with the same number of fields the writer used.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read};

use crate::format::LENGTH_BYTES;
use crate::RecordError;

/// Error type returned by user-supplied field codecs.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Turns one field value into bytes.
pub trait Encoder<T>: Send + Sync {
    /// Encodes `value`.
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;
}

/// Turns the bytes of one field back into a value.
pub trait Decoder<T>: Send + Sync {
    /// Decodes `bytes`.
    fn decode(&self, bytes: Vec<u8>) -> Result<T, CodecError>;
}

impl<T, F> Encoder<T> for F
where
    F: Fn(&T) -> Result<Vec<u8>, CodecError> + Send + Sync,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        self(value)
    }
}

impl<T, F> Decoder<T> for F
where
    F: Fn(Vec<u8>) -> Result<T, CodecError> + Send + Sync,
{
    fn decode(&self, bytes: Vec<u8>) -> Result<T, CodecError> {
        self(bytes)
    }
}

/// Ordered encoder list; its length is the record arity.
pub type Encoders<T> = Vec<Box<dyn Encoder<T>>>;

/// Ordered decoder list; its length is the record arity.
pub type Decoders<T> = Vec<Box<dyn Decoder<T>>>;

/// Identity codec over raw payload bytes.
///
/// Used to move already-encoded fields between logs without decoding them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Encoder<Vec<u8>> for Raw {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }
}

impl Decoder<Vec<u8>> for Raw {
    fn decode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(bytes)
    }
}

impl Raw {
    /// Returns `arity` identity encoders.
    #[must_use]
    pub fn encoders(arity: usize) -> Encoders<Vec<u8>> {
        (0..arity)
            .map(|_| Box::new(Raw) as Box<dyn Encoder<Vec<u8>>>)
            .collect()
    }

    /// Returns `arity` identity decoders.
    #[must_use]
    pub fn decoders(arity: usize) -> Decoders<Vec<u8>> {
        (0..arity)
            .map(|_| Box::new(Raw) as Box<dyn Decoder<Vec<u8>>>)
            .collect()
    }
}

/// Encodes one record block into `buf`, replacing its previous contents.
///
/// Layout: `arity` u64 LE lengths, then the payloads in field order. Nothing
/// is written to `buf` if the value count does not match the encoder count
/// or any encoder fails.
pub fn encode_record<T>(
    encoders: &[Box<dyn Encoder<T>>],
    values: &[T],
    buf: &mut Vec<u8>,
) -> Result<(), RecordError> {
    if values.len() != encoders.len() {
        return Err(RecordError::ArityMismatch {
            expected: encoders.len(),
            actual: values.len(),
        });
    }

    let mut payloads = Vec::with_capacity(encoders.len());
    for (field, (encoder, value)) in encoders.iter().zip(values).enumerate() {
        let bytes = encoder
            .encode(value)
            .map_err(|source| RecordError::Encode { field, source })?;
        payloads.push(bytes);
    }

    buf.clear();
    for p in &payloads {
        buf.write_u64::<LittleEndian>(p.len() as u64)?;
    }
    for p in &payloads {
        buf.extend_from_slice(p);
    }
    Ok(())
}

/// Reads the raw payloads of one record block with `arity` fields.
///
/// A block that ends early surfaces as [`io::ErrorKind::UnexpectedEof`].
pub fn read_raw_record<R: Read>(r: &mut R, arity: usize) -> io::Result<Vec<Vec<u8>>> {
    let lens = read_lengths(r, arity)?;
    let mut fields = Vec::with_capacity(arity);
    for len in lens {
        // `take` bounds the allocation by what is actually on disk.
        let mut payload = Vec::new();
        r.by_ref().take(len).read_to_end(&mut payload)?;
        if payload.len() as u64 != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("record payload truncated: wanted {} bytes, got {}", len, payload.len()),
            ));
        }
        fields.push(payload);
    }
    Ok(fields)
}

/// Reads and decodes one record block using `decoders` positionally.
pub fn read_record<R: Read, T>(
    r: &mut R,
    decoders: &[Box<dyn Decoder<T>>],
) -> Result<Vec<T>, RecordError> {
    let raw = read_raw_record(r, decoders.len())?;
    raw.into_iter()
        .zip(decoders)
        .enumerate()
        .map(|(field, (bytes, decoder))| {
            decoder
                .decode(bytes)
                .map_err(|source| RecordError::Decode { field, source })
        })
        .collect()
}

/// Returns the total on-disk size of the block starting at the reader's
/// position, reading only its length header.
pub fn read_block_len<R: Read>(r: &mut R, arity: usize) -> io::Result<u64> {
    let lens = read_lengths(r, arity)?;
    Ok(lens
        .iter()
        .fold(LENGTH_BYTES * arity as u64, |acc, len| acc.saturating_add(*len)))
}

fn read_lengths<R: Read>(r: &mut R, arity: usize) -> io::Result<Vec<u64>> {
    (0..arity).map(|_| r.read_u64::<LittleEndian>()).collect()
}
