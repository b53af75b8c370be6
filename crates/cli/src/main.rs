//! # CLI - Record Store Shell
//!
//! A line-oriented shell over an indexed record dataset whose fields are
//! UTF-8 strings. Reads commands from stdin and prints results to stdout, so
//! it works interactively and with piped scripts.
//!
//! ## Commands
//!
//! ```text
//! APPEND f1 [f2 ...]  Append a record (the last field takes the rest of the line)
//! GET i               Print the record at position i, fields tab-separated
//! LEN                 Print the number of records
//! REMOVE i            Quick-remove position i (the last record moves into i)
//! SCAN                Print every record with its position
//! IMPORT file         Rebuild the dataset from a file of tab-separated lines
//! DEFRAG out          Write a compacted copy to `out` (+ `out` with .idx)
//! STATS               Print dataset debug info
//! EXIT / QUIT         Leave
//! ```
//!
//! ## Configuration
//!
//! ```text
//! RECORDSTORE_LOG_PATH        record-log path        (default: "data/records.bin")
//! RECORDSTORE_INDEX_PATH      index path             (default: log path with ".idx")
//! RECORDSTORE_ARITY           fields per record      (default: 1)
//! RECORDSTORE_RESET_ON_EMPTY  recreate log on append to an empty index (default: "false")
//! RECORDSTORE_LOG             tracing filter for stderr (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ RECORDSTORE_ARITY=2 cargo run -p cli
//! record store ready (log=data/records.bin, index=data/records.idx, arity=2, len=0)
//! > APPEND alice likes tea
//! OK 0
//! > GET 0
//! alice	likes tea
//! > EXIT
//! bye
//! ```

use anyhow::{Context, Result};
use config::DatasetConfig;
use dataset::{AppendPolicy, IndexedRecordDataset};
use recordlog::{CodecError, DatasetBuilder, Decoder, Decoders, Encoder, Encoders};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn encode_text(v: &String) -> Result<Vec<u8>, CodecError> {
    Ok(v.as_bytes().to_vec())
}

fn decode_text(b: Vec<u8>) -> Result<String, CodecError> {
    Ok(String::from_utf8(b)?)
}

fn text_encoders(arity: usize) -> Encoders<String> {
    (0..arity)
        .map(|_| Box::new(encode_text) as Box<dyn Encoder<String>>)
        .collect()
}

fn text_decoders(arity: usize) -> Decoders<String> {
    (0..arity)
        .map(|_| Box::new(decode_text) as Box<dyn Decoder<String>>)
        .collect()
}

/// Splits `rest` into exactly `arity` fields: the first `arity - 1`
/// whitespace-separated words, then the remainder of the line.
fn split_fields(rest: &str, arity: usize) -> Option<Vec<String>> {
    let mut fields = Vec::with_capacity(arity);
    let mut rest = rest.trim_start();
    for _ in 1..arity {
        let end = rest.find(char::is_whitespace)?;
        fields.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    let last = rest.trim_end();
    if last.is_empty() {
        return None;
    }
    fields.push(last.to_string());
    Some(fields)
}

fn open_dataset(cfg: &DatasetConfig) -> IndexedRecordDataset<String> {
    let policy = if cfg.reset_on_empty_index {
        AppendPolicy::ResetOnEmptyIndex
    } else {
        AppendPolicy::Preserve
    };
    let mut ds = IndexedRecordDataset::new(&cfg.log_path)
        .with_encoders(text_encoders(cfg.arity))
        .with_decoders(text_decoders(cfg.arity))
        .with_append_policy(policy);
    if let Some(idx) = &cfg.index_path {
        ds = ds.with_index_path(idx);
    }
    ds
}

/// Returns `path` with `.import` appended, next to the original.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".import");
    PathBuf::from(name)
}

/// Rebuilds the dataset from a file with one record per line, fields
/// separated by tabs.
///
/// The new pair is built beside the live one and renamed over it only once
/// the build succeeds, so a bad source leaves the current records intact.
fn import(ds: &IndexedRecordDataset<String>, arity: usize, source: &Path) -> Result<u64> {
    let reader = BufReader::new(
        File::open(source).with_context(|| format!("failed to open {}", source.display()))?,
    );
    let records = reader.lines().enumerate().map(|(n, line)| -> Result<Vec<String>> {
        let line = line?;
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();
        if fields.len() != arity {
            anyhow::bail!(
                "line {}: expected {} tab-separated fields, got {}",
                n + 1,
                arity,
                fields.len()
            );
        }
        Ok(fields)
    });

    let log_tmp = staging_path(ds.path());
    let index_tmp = staging_path(ds.index_path());
    let built = match DatasetBuilder::new(text_encoders(arity))
        .with_index_path(&index_tmp)
        .build_fallible(records, &log_tmp)
    {
        Ok(built) => built,
        Err(e) => {
            let _ = fs::remove_file(&log_tmp);
            let _ = fs::remove_file(&index_tmp);
            return Err(e);
        }
    };

    fs::rename(&log_tmp, ds.path())
        .with_context(|| format!("failed to replace {}", ds.path().display()))?;
    fs::rename(&index_tmp, ds.index_path())
        .with_context(|| format!("failed to replace {}", ds.index_path().display()))?;
    tracing::debug!(records = built.len, source = %source.display(), "imported records");
    Ok(built.len)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env("RECORDSTORE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cfg = DatasetConfig::from_env()?;
    if let Some(parent) = cfg.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let ds = open_dataset(&cfg);

    println!(
        "record store ready (log={}, index={}, arity={}, len={})",
        ds.path().display(),
        ds.index_path().display(),
        cfg.arity,
        ds.len()?
    );
    println!("Commands: APPEND f1 [f2 ...] | GET i | LEN | REMOVE i | SCAN");
    println!("          IMPORT file | DEFRAG out | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim_start();
        let (cmd, rest) = match trimmed.find(char::is_whitespace) {
            Some(i) => (&trimmed[..i], &trimmed[i..]),
            None => (trimmed, ""),
        };
        let arg = rest.trim();

        if !cmd.is_empty() {
            match cmd.to_uppercase().as_str() {
                "APPEND" => match split_fields(rest, cfg.arity) {
                    Some(fields) => match ds.append(&fields) {
                        Ok(pos) => println!("OK {}", pos),
                        Err(e) => println!("ERR append failed: {}", e),
                    },
                    None => println!("ERR usage: APPEND takes {} field(s)", cfg.arity),
                },
                "GET" => match arg.parse::<u64>() {
                    Ok(i) => match ds.get(i) {
                        Ok(fields) => println!("{}", fields.join("\t")),
                        Err(e) => println!("ERR get failed: {}", e),
                    },
                    Err(_) => println!("ERR usage: GET i"),
                },
                "LEN" => match ds.len() {
                    Ok(n) => println!("{}", n),
                    Err(e) => println!("ERR len failed: {}", e),
                },
                "REMOVE" => match arg.parse::<u64>() {
                    Ok(i) => match ds.quick_remove_at(i) {
                        Ok(()) => println!("OK"),
                        Err(e) => println!("ERR remove failed: {}", e),
                    },
                    Err(_) => println!("ERR usage: REMOVE i"),
                },
                "SCAN" => {
                    let mut count = 0u64;
                    for (i, rec) in ds.iter().enumerate() {
                        match rec {
                            Ok(fields) => {
                                println!("{}: {}", i, fields.join("\t"));
                                count += 1;
                            }
                            Err(e) => {
                                println!("ERR scan failed at {}: {}", i, e);
                                break;
                            }
                        }
                    }
                    if count == 0 {
                        println!("(empty)");
                    } else {
                        println!("({} records)", count);
                    }
                }
                "IMPORT" => {
                    if arg.is_empty() {
                        println!("ERR usage: IMPORT file");
                    } else {
                        match import(&ds, cfg.arity, Path::new(arg)) {
                            Ok(n) => println!("OK ({} records)", n),
                            Err(e) => println!("ERR import failed: {:#}", e),
                        }
                    }
                }
                "DEFRAG" => {
                    if arg.is_empty() {
                        println!("ERR usage: DEFRAG out");
                    } else {
                        match ds.defrag(arg) {
                            Ok(built) => println!(
                                "OK ({} records, log={}, index={})",
                                built.len,
                                built.log_path.display(),
                                built.index_path.display()
                            ),
                            Err(e) => println!("ERR defrag failed: {}", e),
                        }
                    }
                }
                "STATS" => {
                    println!("{:?}", ds);
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
