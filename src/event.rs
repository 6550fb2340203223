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

// Query event data model

use chrono::Local;
use serde::{Deserialize, Serialize};

/// One qualifying statement execution, as captured by the host integration.
///
/// String fields stay caller-owned until handed to the codec, which copies
/// and never mutates them. `plan_text` carries the execution plan as JSON
/// text and is empty when plan capture is disabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEvent {
    /// Execution end datetime, textual ISO-like timestamp
    pub datetime: String,
    /// Duration in milliseconds
    pub duration_ms: f64,
    /// User running the query
    pub username: String,
    /// Application name reported by the client
    pub appname: String,
    /// Database name
    pub dbname: String,
    /// Blocks written for temporary file usage
    pub temp_blocks_written: i64,
    /// Cache hit-ratio, 0-100
    pub hit_ratio: f32,
    /// Tuples returned or affected
    pub tuple_count: u64,
    /// Text of the statement
    pub query_text: String,
    /// Execution plan as JSON text
    pub plan_text: String,
}

/// Textual timestamp for [`QueryEvent::datetime`], formatted the way the
/// host engine renders timestamps with time zone.
pub fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
}
