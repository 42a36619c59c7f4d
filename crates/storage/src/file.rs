// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed transaction log
//!
//! Every event is appended as one record line and synced before the writer
//! moves on, so the file keeps the full history of every key. Sequence
//! numbers are implicit in line order and must run 1, 2, 3, ... without
//! gaps; replay reports the first break.

use crate::config::{FileConfig, GapPolicy};
use crate::record::Record;
use kv_core::{Backend, Event, LogError, Mutation, QueuedLogger};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Transaction logger persisting to an append-only file
pub type FileTransactionLogger = QueuedLogger<FileBackend>;

/// Append-only file medium
pub struct FileBackend {
    path: PathBuf,
    file: File,
    last_sequence: u64,
    bytes_written: u64,
    /// Last byte on disk is not a newline; the next append starts one
    torn: bool,
    read_only: bool,
}

impl FileBackend {
    /// Open or create the log file
    ///
    /// Existing content is scanned to seed the sequence counter. With
    /// `GapPolicy::Truncate` a broken tail is cut off here; with
    /// `GapPolicy::Abort` it is left for replay to report.
    pub fn open(config: &FileConfig) -> Result<Self, LogError> {
        let path = config.path.clone();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let scan = if path.exists() {
            Scan::run(&path)?
        } else {
            Scan::default()
        };

        let last_sequence = match (&scan.broken, config.gap_policy) {
            (None, _) => scan.chain_end,
            (Some(reason), GapPolicy::Truncate) => {
                let file = OpenOptions::new().write(true).open(&path)?;
                let discarded = file.metadata()?.len().saturating_sub(scan.valid_len);
                file.set_len(scan.valid_len)?;
                file.sync_all()?;
                warn!(
                    path = %path.display(),
                    reason = %reason,
                    discarded_bytes = discarded,
                    last_sequence = scan.chain_end,
                    "truncated transaction log at last intact record"
                );
                scan.chain_end
            }
            (Some(reason), GapPolicy::Abort) => {
                warn!(
                    path = %path.display(),
                    reason = %reason,
                    "transaction log is damaged; replay will fail"
                );
                scan.last_parsed
            }
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;
        let torn = ends_mid_line(&mut file)?;

        info!(path = %path.display(), last_sequence, "file transaction log opened");
        Ok(Self {
            path,
            file,
            last_sequence,
            bytes_written: 0,
            torn,
            read_only: false,
        })
    }

    /// Open an existing log for inspection
    ///
    /// Nothing is created, repaired or truncated. A damaged tail is left
    /// for replay to report, and `append` is refused.
    pub fn open_read_only(path: &Path) -> Result<Self, LogError> {
        let mut file = File::open(path)?;
        let scan = Scan::run(path)?;
        let last_sequence = match &scan.broken {
            None => scan.chain_end,
            Some(_) => scan.last_parsed,
        };
        let torn = ends_mid_line(&mut file)?;

        debug!(path = %path.display(), last_sequence, "file transaction log opened read-only");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            last_sequence,
            bytes_written: 0,
            torn,
            read_only: true,
        })
    }

    /// Sequence of the most recent record (0 for an empty log)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Bytes appended since open
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for FileBackend {
    const NAME: &'static str = "file";
    const REPLAY_BUFFER: usize = 1;
    type Reader = FileReader;

    fn reader(&self) -> Result<FileReader, LogError> {
        FileReader::open(&self.path)
    }

    fn append(&mut self, mutation: &Mutation) -> Result<Option<u64>, LogError> {
        if self.read_only {
            return Err(LogError::backend(Self::NAME, "log was opened read-only"));
        }
        let sequence = self.last_sequence + 1;
        let event = mutation.clone().sequenced(sequence);
        let mut line = String::new();
        if self.torn {
            line.push('\n');
        }
        line.push_str(&Record::new(&event).to_line()?);
        line.push('\n');

        self.file.write_all(line.as_bytes())?;
        // Critical: the event only counts once it is on disk
        self.file.sync_data()?;

        self.last_sequence = sequence;
        self.bytes_written += line.len() as u64;
        self.torn = false;
        Ok(Some(sequence))
    }

    fn release(self) -> Result<(), LogError> {
        if !self.read_only {
            self.file.sync_all()?;
        }
        debug!(path = %self.path.display(), bytes_written = self.bytes_written, "file released");
        Ok(())
    }
}

/// Iterator over the records of a log file
///
/// Yields events while the sequence chain is intact and stops after the
/// first parse error, checksum mismatch or gap.
pub struct FileReader {
    reader: Option<BufReader<File>>,
    line: u64,
    expected: u64,
    position: u64,
    valid_len: u64,
    done: bool,
}

impl FileReader {
    /// Open a log for reading; a missing file reads as empty
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let reader = match File::open(path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            reader,
            line: 0,
            expected: 1,
            position: 0,
            valid_len: 0,
            done: false,
        })
    }

    /// Byte length of the intact prefix read so far
    pub fn valid_len(&self) -> u64 {
        self.valid_len
    }

    fn fail(&mut self, err: LogError) -> Option<Result<Event, LogError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for FileReader {
    type Item = Result<Event, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let reader = self.reader.as_mut()?;

        loop {
            let mut buf = String::new();
            let read = match reader.read_line(&mut buf) {
                Ok(0) => return None,
                Ok(n) => n,
                Err(e) => return self.fail(e.into()),
            };
            self.line += 1;
            self.position += read as u64;

            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }

            let record = match Record::from_line(trimmed) {
                Ok(record) => record,
                Err(e) => {
                    let line = self.line;
                    return self.fail(LogError::Corrupted {
                        line,
                        reason: e.to_string(),
                    });
                }
            };

            if !record.verify() {
                let line = self.line;
                return self.fail(LogError::ChecksumMismatch { line });
            }

            if record.sequence != self.expected {
                let (line, expected) = (self.line, self.expected);
                return self.fail(LogError::SequenceGap {
                    line,
                    expected,
                    found: record.sequence,
                });
            }

            self.expected += 1;
            self.valid_len = self.position;
            return Some(Ok(record.into_event()));
        }
    }
}

/// What opening found in an existing file
#[derive(Debug, Default)]
struct Scan {
    /// Last sequence of the intact 1, 2, 3, ... prefix
    chain_end: u64,
    /// Byte length of that prefix
    valid_len: u64,
    /// Last sequence of any well-formed record, intact prefix or not
    last_parsed: u64,
    /// First problem found, if any
    broken: Option<LogError>,
}

impl Scan {
    fn run(path: &Path) -> Result<Self, LogError> {
        let mut scan = Scan::default();
        let mut reader = FileReader::open(path)?;

        for item in reader.by_ref() {
            match item {
                Ok(event) => scan.chain_end = event.sequence,
                Err(e) => {
                    scan.broken = Some(e);
                    break;
                }
            }
        }
        scan.valid_len = reader.valid_len();
        scan.last_parsed = scan.chain_end;

        if scan.broken.is_some() {
            scan.last_parsed = last_parsed_sequence(path)?.unwrap_or(scan.chain_end);
        }
        Ok(scan)
    }
}

/// Sequence of the last line that parses and verifies, ignoring gaps
fn last_parsed_sequence(path: &Path) -> Result<Option<u64>, LogError> {
    let reader = BufReader::new(File::open(path)?);
    let mut last = None;
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if let Ok(record) = Record::from_line(line.trim()) {
            if record.verify() {
                last = Some(record.sequence);
            }
        }
    }
    Ok(last)
}

/// True if the file is non-empty and its last byte is not a newline
fn ends_mid_line(file: &mut File) -> Result<bool, LogError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
