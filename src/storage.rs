// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Storage file manager: one append-only log file shared by every producer
/// and reader in the process, serialized by a single readers-writer lock.
///
/// # On-disk format
///
/// Entries sit back to back with no file header, footer or index:
///
/// ```text
/// [compressed_size: u32 LE][original_size: u32 LE][payload...]
/// ```
///
/// `compressed_size == 0` marks a payload stored raw; position in the file
/// is insertion order.
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::{debug, warn};

use crate::compress;
use crate::error::RecorderError;

/// Size of the two u32 length fields preceding every payload.
pub const ENTRY_HEADER_LEN: u64 = 8;

/// One length-prefixed, optionally compressed record unit of the log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Compressed payload size; 0 means the payload is stored raw.
    pub compressed_size: u32,
    /// Size of the serialized record before compression.
    pub original_size: u32,
    pub payload: Vec<u8>,
}

impl StoredEntry {
    /// Recover the serialized record, decompressing when needed.
    pub fn into_record(self) -> Result<Vec<u8>, RecorderError> {
        if self.compressed_size > 0 {
            compress::decompress(&self.payload, self.original_size)
        } else {
            Ok(self.payload)
        }
    }
}

/// Result of an append attempt. A capacity skip is an outcome, not an
/// error: the producer path must never fail because the log is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Entry written; total bytes appended including the length fields.
    Written(u64),
    /// Entry skipped because it would push the file over max_file_size.
    SkippedCapacity,
}

/// Handle on the append-only log file.
///
/// The lock is handed in at construction and shared by every `LogStore`
/// cloned from the same context, so appends, scans and truncates across the
/// whole process serialize on it.
#[derive(Clone)]
pub struct LogStore {
    path: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl LogStore {
    pub fn new(path: impl Into<PathBuf>, lock: Arc<RwLock<()>>) -> Self {
        Self { path: path.into(), lock }
    }

    /// Append one payload under the exclusive lock.
    ///
    /// The payload is recorded as compressed when it is shorter than
    /// `original_size`, raw otherwise. With `max_file_size_kb` set (not -1),
    /// an entry that would push the file past the cap is skipped with a log
    /// line; data loss under sustained overload beats unbounded growth or a
    /// stalled query path.
    pub async fn append(
        &self,
        payload: &[u8],
        original_size: u32,
        max_file_size_kb: i64,
    ) -> Result<AppendOutcome, RecorderError> {
        let _guard = self.lock.write().await;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        let current_size = file.metadata().await?.len();
        let entry_size = ENTRY_HEADER_LEN + payload.len() as u64;
        if max_file_size_kb != -1 && current_size + entry_size > max_file_size_kb as u64 * 1024 {
            warn!(
                "max_file_size reached ({} kB), skipping entry of {} bytes",
                max_file_size_kb, entry_size
            );
            return Ok(AppendOutcome::SkippedCapacity);
        }
        let compressed_size = if (payload.len() as u32) < original_size {
            payload.len() as u32
        } else {
            0u32
        };
        file.write_all(&compressed_size.to_le_bytes()).await?;
        file.write_all(&original_size.to_le_bytes()).await?;
        file.write_all(payload).await?;
        file.flush().await?;
        debug!(
            "appended {} payload bytes at offset {}",
            payload.len(),
            current_size
        );
        Ok(AppendOutcome::Written(entry_size))
    }

    /// Compress-then-append, shared by the relay and the direct producer
    /// path.
    pub async fn store_record(
        &self,
        record: &[u8],
        compression: bool,
        max_file_size_kb: i64,
    ) -> Result<AppendOutcome, RecorderError> {
        let original_size = record.len() as u32;
        let compressed = if compression {
            compress::try_compress(record)
        } else {
            None
        };
        match compressed {
            Some(payload) => self.append(&payload, original_size, max_file_size_kb).await,
            None => self.append(record, original_size, max_file_size_kb).await,
        }
    }

    /// Open a full-file scan.
    ///
    /// The shared lock is held by the returned [`LogScan`] until it is
    /// dropped: writers are excluded for the whole read, concurrent scans
    /// may overlap. A missing file yields an empty scan. Each call re-opens
    /// and reads from the beginning; a scan is not restartable mid-stream.
    pub async fn scan(&self) -> Result<LogScan, RecorderError> {
        let guard = self.lock.clone().read_owned().await;
        let reader = match File::open(&self.path).await {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(LogScan {
            _guard: guard,
            reader,
            offset: 0,
        })
    }

    /// Truncate the log file, creating it if absent.
    ///
    /// Unlike append, errors surface hard: reset is an explicit user-invoked
    /// operation and its failure must be visible.
    pub async fn truncate(&self) -> Result<(), RecorderError> {
        let _guard = self.lock.write().await;
        File::create(&self.path).await?;
        Ok(())
    }
}

/// In-progress sequential read of the log, oldest entry first. Holds the
/// shared lock for its whole lifetime.
pub struct LogScan {
    _guard: OwnedRwLockReadGuard<()>,
    reader: Option<BufReader<File>>,
    offset: u64,
}

impl LogScan {
    /// Next entry, or `None` at a clean end of file.
    ///
    /// A partial trailing entry reports `TruncatedEntry`; entries already
    /// returned by earlier calls stay valid.
    pub async fn next_entry(&mut self) -> Result<Option<StoredEntry>, RecorderError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let entry_offset = self.offset;
        let mut first = [0u8; 4];
        // End of file is only clean before the first length field.
        match read_full(reader, &mut first).await? {
            0 => return Ok(None),
            4 => {}
            _ => return Err(RecorderError::TruncatedEntry { offset: entry_offset }),
        }
        let compressed_size = u32::from_le_bytes(first);
        let mut second = [0u8; 4];
        if read_full(reader, &mut second).await? != 4 {
            return Err(RecorderError::TruncatedEntry { offset: entry_offset });
        }
        let original_size = u32::from_le_bytes(second);
        let payload_len = if compressed_size > 0 {
            compressed_size
        } else {
            original_size
        } as usize;
        let mut payload = vec![0u8; payload_len];
        if read_full(reader, &mut payload).await? != payload_len {
            return Err(RecorderError::TruncatedEntry { offset: entry_offset });
        }
        self.offset += ENTRY_HEADER_LEN + payload_len as u64;
        Ok(Some(StoredEntry {
            compressed_size,
            original_size,
            payload,
        }))
    }
}

/// Read until `buf` is full or the file ends; returns the bytes read.
async fn read_full(
    reader: &mut BufReader<File>,
    buf: &mut [u8],
) -> Result<usize, RecorderError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
