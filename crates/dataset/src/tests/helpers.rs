use crate::IndexedRecordDataset;
use recordlog::{make_dataset, BuiltDataset, CodecError, Decoder, Decoders, Encoder, Encoders};
use std::path::Path;

/// Field value used across the dataset tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i64),
    Text(String),
}

pub fn int(v: i64) -> Field {
    Field::Int(v)
}

pub fn text(v: &str) -> Field {
    Field::Text(v.to_string())
}

fn encode_int(v: &Field) -> Result<Vec<u8>, CodecError> {
    match v {
        Field::Int(n) => Ok(n.to_le_bytes().to_vec()),
        other => Err(format!("expected int, got {:?}", other).into()),
    }
}

fn decode_int(b: Vec<u8>) -> Result<Field, CodecError> {
    let arr: [u8; 8] = b.as_slice().try_into()?;
    Ok(Field::Int(i64::from_le_bytes(arr)))
}

fn encode_text(v: &Field) -> Result<Vec<u8>, CodecError> {
    match v {
        Field::Text(s) => Ok(s.as_bytes().to_vec()),
        other => Err(format!("expected text, got {:?}", other).into()),
    }
}

fn decode_text(b: Vec<u8>) -> Result<Field, CodecError> {
    Ok(Field::Text(String::from_utf8(b)?))
}

/// `[int -> 8-byte LE, string -> UTF-8]`
pub fn encoders() -> Encoders<Field> {
    vec![
        Box::new(encode_int) as Box<dyn Encoder<Field>>,
        Box::new(encode_text),
    ]
}

pub fn decoders() -> Decoders<Field> {
    vec![
        Box::new(decode_int) as Box<dyn Decoder<Field>>,
        Box::new(decode_text),
    ]
}

pub fn row(n: i64, s: &str) -> Vec<Field> {
    vec![int(n), text(s)]
}

/// Builds `records` at `path` and returns the build result.
pub fn build(path: &Path, records: Vec<Vec<Field>>) -> BuiltDataset {
    make_dataset(records, path, encoders(), None).unwrap()
}

/// Opens a read/write dataset over `path` with the default index.
pub fn open(path: &Path) -> IndexedRecordDataset<Field> {
    IndexedRecordDataset::new(path)
        .with_encoders(encoders())
        .with_decoders(decoders())
}

/// Builds the three-record sample used by several tests.
pub fn sample(path: &Path) -> IndexedRecordDataset<Field> {
    build(path, vec![row(1, "a"), row(2, "bb"), row(3, "ccc")]);
    open(path)
}

pub fn read_all(ds: &IndexedRecordDataset<Field>) -> Vec<Vec<Field>> {
    ds.iter().collect::<Result<Vec<_>, _>>().unwrap()
}
