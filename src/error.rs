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

// Error taxonomy of the recorder core

use thiserror::Error;

/// Failures surfaced by the codec, compressor and storage manager.
///
/// Capacity skips and malformed datagrams are deliberately absent: both are
/// log-and-drop policies on the hot path, reported as outcomes rather than
/// errors.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Malformed length header, or a field running past the record end.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// Compressed payload could not be restored to its recorded size.
    #[error("decode error: {0}")]
    Decode(String),

    /// Entry header or payload cut short at the end of the log file.
    #[error("truncated entry at offset {offset} in log file")]
    TruncatedEntry { offset: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
