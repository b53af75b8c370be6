use crate::*;
use anyhow::Result;
use index::IndexFile;
use std::fs::{self, File};
use std::io::{Seek, SeekFrom};
use tempfile::tempdir;

// -------------------- Helpers --------------------

fn text(v: &String) -> std::result::Result<Vec<u8>, CodecError> {
    Ok(v.as_bytes().to_vec())
}

fn untext(b: Vec<u8>) -> std::result::Result<String, CodecError> {
    Ok(String::from_utf8(b)?)
}

fn rejects_empty(v: &String) -> std::result::Result<Vec<u8>, CodecError> {
    if v.is_empty() {
        return Err("empty field".into());
    }
    Ok(v.as_bytes().to_vec())
}

fn text_encoders(arity: usize) -> Encoders<String> {
    (0..arity)
        .map(|_| Box::new(text) as Box<dyn Encoder<String>>)
        .collect()
}

fn rec(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|s| s.to_string()).collect()
}

fn read_all(built: &BuiltDataset, arity: usize) -> Result<Vec<Vec<String>>> {
    let decoders: Decoders<String> = (0..arity)
        .map(|_| Box::new(untext) as Box<dyn Decoder<String>>)
        .collect();
    let mut out = Vec::new();
    for offset in IndexFile::new(&built.index_path).iter() {
        let mut f = File::open(&built.log_path)?;
        f.seek(SeekFrom::Start(offset?))?;
        out.push(read_record(&mut f, &decoders)?);
    }
    Ok(out)
}

// -------------------- Build --------------------

#[test]
fn build_writes_log_and_default_index() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("pairs.bin");
    let records = vec![rec(&["a", "1"]), rec(&["bb", "22"]), rec(&["ccc", "333"])];

    let built = DatasetBuilder::new(text_encoders(2)).build(records.clone(), &out)?;

    assert_eq!(built.log_path, out);
    assert_eq!(built.index_path, dir.path().join("pairs.idx"));
    assert_eq!(built.len, 3);
    assert_eq!(read_all(&built, 2)?, records);
    Ok(())
}

#[test]
fn first_record_starts_after_reserved_space() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("a.bin");
    let built = make_dataset(vec![rec(&["x"]), rec(&["yy"])], &out, text_encoders(1), None)?;

    let offsets = IndexFile::new(&built.index_path).to_vec()?;
    assert_eq!(offsets, vec![RESERVED_SPACE, RESERVED_SPACE + 8 + 1]);

    let bytes = fs::read(&out)?;
    assert_eq!(bytes.len() as u64, RESERVED_SPACE + (8 + 1) + (8 + 2));
    assert!(bytes[..RESERVED_SPACE as usize].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn explicit_index_path_is_used() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("a.bin");
    let idx = dir.path().join("elsewhere.offsets");

    let built = make_dataset(vec![rec(&["x"])], &out, text_encoders(1), Some(&idx))?;
    assert_eq!(built.index_path, idx);
    assert!(idx.exists());
    assert!(!dir.path().join("a.idx").exists());
    Ok(())
}

#[test]
fn build_from_lazy_iterator() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("lazy.bin");
    let records = (0..100).map(|i| vec![format!("key{}", i), "v".repeat(i % 7)]);

    let built = DatasetBuilder::new(text_encoders(2)).build(records, &out)?;
    assert_eq!(built.len, 100);

    let all = read_all(&built, 2)?;
    assert_eq!(all[42], vec!["key42".to_string(), "v".repeat(0)]);
    assert_eq!(all[99], vec!["key99".to_string(), "v".repeat(1)]);
    Ok(())
}

#[test]
fn build_with_zero_records() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("empty.bin");
    let built = make_dataset(Vec::<Vec<String>>::new(), &out, text_encoders(1), None)?;

    assert_eq!(built.len, 0);
    assert_eq!(fs::metadata(&out)?.len(), RESERVED_SPACE);
    assert_eq!(IndexFile::new(&built.index_path).len()?, 0);
    Ok(())
}

#[test]
fn rebuild_truncates_previous_log() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("a.bin");
    make_dataset(vec![rec(&["long value here"]); 10], &out, text_encoders(1), None)?;
    let built = make_dataset(vec![rec(&["z"])], &out, text_encoders(1), None)?;

    assert_eq!(fs::metadata(&out)?.len(), RESERVED_SPACE + 8 + 1);
    assert_eq!(read_all(&built, 1)?, vec![rec(&["z"])]);
    Ok(())
}

// -------------------- Failures --------------------

#[test]
fn encoder_failure_leaves_no_index() -> Result<()> {
    let dir = tempdir()?;
    let out = dir.path().join("a.bin");
    let records = vec![rec(&["ok"]), rec(&[""]), rec(&["never"])];

    let err = DatasetBuilder::new(vec![Box::new(rejects_empty) as Box<dyn Encoder<String>>])
        .build(records, &out)
        .unwrap_err();
    assert!(matches!(err, RecordError::Encode { field: 0, .. }));

    // The first record made it to the log but nothing indexes it.
    assert_eq!(fs::metadata(&out)?.len(), RESERVED_SPACE + 8 + 2);
    assert!(!dir.path().join("a.idx").exists());
    Ok(())
}

#[test]
fn arity_mismatch_aborts_build() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("a.bin");
    let err = DatasetBuilder::new(text_encoders(2))
        .build(vec![rec(&["a", "b"]), rec(&["c"])], &out)
        .unwrap_err();
    assert!(matches!(
        err,
        RecordError::ArityMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[test]
fn fallible_source_error_is_returned_unchanged() {
    #[derive(Debug)]
    enum SourceError {
        Upstream(&'static str),
        Record(RecordError),
    }
    impl From<RecordError> for SourceError {
        fn from(e: RecordError) -> Self {
            SourceError::Record(e)
        }
    }

    let dir = tempdir().unwrap();
    let out = dir.path().join("a.bin");
    let source = vec![Ok(rec(&["a"])), Err(SourceError::Upstream("stop")), Ok(rec(&["b"]))];

    let err = DatasetBuilder::new(text_encoders(1))
        .build_fallible(source, &out)
        .unwrap_err();
    match err {
        SourceError::Upstream(msg) => assert_eq!(msg, "stop"),
        SourceError::Record(e) => panic!("unexpected record error: {}", e),
    }
    assert!(!dir.path().join("a.idx").exists());
}

#[test]
fn builder_reports_arity() {
    let b = DatasetBuilder::new(text_encoders(3));
    assert_eq!(b.arity(), 3);
}
