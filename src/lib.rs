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

// Slow-query telemetry recorder
//
// This crate records per-statement telemetry for slow queries:
// - Serializes each query event with a length-prefixed text codec
// - Compresses records whenever compression gains anything
// - Appends them to a single size-capped append-only log file
// - Relays records from producers over a local datagram socket
// - Scans the log back into rows and resets it on demand

pub mod codec;
pub mod compress;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod recorder;
pub mod relay;
pub mod storage;

// Re-export main types
pub use config::{load_config, load_config_with_env, RecorderConfig};
pub use context::RecorderContext;
pub use error::RecorderError;
pub use event::QueryEvent;
pub use recorder::QueryRecorder;
pub use relay::{RelayCommand, RelayHandle, RelayServer, MAX_DATAGRAM_BYTES};
pub use storage::{AppendOutcome, LogScan, LogStore, StoredEntry};
