// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed spool store: the bundled [`LogStore`] implementation.
//!
//! Rows are appended as JSONL to an active segment. When the active segment
//! exceeds the size limit it is compressed to `spool-<seq>.jsonl.zst` and a
//! fresh segment starts. Queries scan rotated segments oldest-first, then
//! the active segment.

use crate::row::LogEntryRow;
use crate::store::{apply_query, LogFilter, LogStore, QueryOptions, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default segment rotation threshold (8 MiB of JSONL).
const DEFAULT_SEGMENT_BYTES: u64 = 8 * 1024 * 1024;

/// zstd level 3 is a good balance of speed and compression
const COMPRESSION_LEVEL: i32 = 3;

const ACTIVE_SEGMENT: &str = "spool.jsonl";

pub struct SpoolStore {
    inner: Arc<Mutex<SpoolInner>>,
}

struct SpoolInner {
    dir: PathBuf,
    active: File,
    active_bytes: u64,
    next_segment_seq: u64,
    max_segment_bytes: u64,
}

impl SpoolStore {
    /// Open or create a spool under `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        Self::open_with_segment_size(dir, DEFAULT_SEGMENT_BYTES)
    }

    pub fn open_with_segment_size(dir: &Path, max_segment_bytes: u64) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let active_path = dir.join(ACTIVE_SEGMENT);
        let active = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active_path)?;
        let active_bytes = active.metadata()?.len();
        let next_segment_seq = rotated_segments(dir)?
            .last()
            .map(|(seq, _)| seq + 1)
            .unwrap_or(0);

        Ok(Self {
            inner: Arc::new(Mutex::new(SpoolInner {
                dir: dir.to_path_buf(),
                active,
                active_bytes,
                next_segment_seq,
                max_segment_bytes,
            })),
        })
    }

    fn clone_inner(&self) -> Arc<Mutex<SpoolInner>> {
        Arc::clone(&self.inner)
    }
}

impl SpoolInner {
    fn append(&mut self, batch: &[LogEntryRow]) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        for row in batch {
            serde_json::to_writer(&mut buf, row)?;
            buf.push(b'\n');
        }
        self.active.write_all(&buf)?;
        self.active.flush()?;
        self.active_bytes += buf.len() as u64;

        if self.active_bytes >= self.max_segment_bytes {
            self.rotate()?;
        }
        Ok(())
    }

    /// Compress the active segment into `spool-<seq>.jsonl.zst` and truncate.
    fn rotate(&mut self) -> Result<(), StoreError> {
        let active_path = self.dir.join(ACTIVE_SEGMENT);
        let rotated_path = self
            .dir
            .join(format!("spool-{:06}.jsonl.zst", self.next_segment_seq));

        let source = File::open(&active_path)?;
        let target = File::create(&rotated_path)?;
        let mut encoder = zstd::stream::write::Encoder::new(target, COMPRESSION_LEVEL)?;
        let mut reader = BufReader::new(source);
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.sync_all()?;

        self.active = File::create(&active_path)?;
        self.active_bytes = 0;
        self.next_segment_seq += 1;
        debug!(path = %rotated_path.display(), "rotated spool segment");
        Ok(())
    }

    /// Iterate all rows, rotated segments oldest-first then the active one.
    fn scan(&self) -> Result<Vec<LogEntryRow>, StoreError> {
        let mut rows = Vec::new();
        for (_, path) in rotated_segments(&self.dir)? {
            let file = File::open(&path)?;
            let decoder = zstd::stream::read::Decoder::new(file)?;
            read_jsonl(BufReader::new(decoder), &path, &mut rows);
        }
        let active_path = self.dir.join(ACTIVE_SEGMENT);
        let file = File::open(&active_path)?;
        read_jsonl(BufReader::new(file), &active_path, &mut rows);
        Ok(rows)
    }
}

/// Parse JSONL rows, skipping corrupt lines with a warning.
fn read_jsonl(reader: impl BufRead, path: &Path, rows: &mut Vec<LogEntryRow>) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogEntryRow>(&line) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping corrupt spool line");
            }
        }
    }
}

/// Rotated segment paths with their sequence numbers, ascending.
fn rotated_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>, StoreError> {
    let mut segments = Vec::new();
    for dent in fs::read_dir(dir)? {
        let dent = dent?;
        let name = dent.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(seq) = name
            .strip_prefix("spool-")
            .and_then(|rest| rest.strip_suffix(".jsonl.zst"))
            .and_then(|seq| seq.parse::<u64>().ok())
        else {
            continue;
        };
        segments.push((seq, dent.path()));
    }
    segments.sort_by_key(|(seq, _)| *seq);
    Ok(segments)
}

#[async_trait]
impl LogStore for SpoolStore {
    async fn insert(&self, batch: Vec<LogEntryRow>) -> Result<(), StoreError> {
        let inner = self.clone_inner();
        tokio::task::spawn_blocking(move || inner.lock().append(&batch))
            .await
            .map_err(|e| StoreError::Internal(e.to_string()))?
    }

    async fn query(
        &self,
        filter: &LogFilter,
        options: &QueryOptions,
    ) -> Result<Vec<LogEntryRow>, StoreError> {
        let inner = self.clone_inner();
        let filter = filter.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || {
            let rows = inner.lock().scan()?;
            Ok(apply_query(rows.into_iter(), &filter, &options))
        })
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, StoreError> {
        let inner = self.clone_inner();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || {
            let rows = inner.lock().scan()?;
            Ok(rows.iter().filter(|r| filter.matches(r)).count() as u64)
        })
        .await
        .map_err(|e| StoreError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
