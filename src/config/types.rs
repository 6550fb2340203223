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

// Configuration types for slowquery-recorder

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecorderConfig {
    #[serde(default)]
    pub tracking: TrackingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            tracking: TrackingSettings::default(),
            storage: StorageSettings::default(),
            collector: CollectorSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// What gets captured and how it is stored
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingSettings {
    /// Minimum statement duration in seconds before an event qualifies;
    /// -1 disables tracking. Evaluated by the host integration, carried
    /// here so every producer reads the same knob.
    #[serde(default = "default_log_min_duration")]
    pub log_min_duration: i64,

    /// Compress serialized records before storing them
    #[serde(default = "default_true")]
    pub compression: bool,

    /// Size cap for the log file in kB; -1 means unlimited
    #[serde(default = "default_max_file_size_kb")]
    pub max_file_size_kb: i64,

    /// Record the execution plan; when off the plan field is stored empty
    #[serde(default = "default_true")]
    pub log_plan: bool,

    /// Instrument plan costs (consumed by the host integration)
    #[serde(default)]
    pub cost_analyze: bool,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            log_min_duration: default_log_min_duration(),
            compression: true,
            max_file_size_kb: default_max_file_size_kb(),
            log_plan: true,
            cost_analyze: false,
        }
    }
}

/// Where the append-only log lives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

/// The collector's local datagram endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorSettings {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Receive wait per loop iteration in seconds; bounds how quickly
    /// reload and terminate signals are observed when the socket is idle
    #[serde(default = "default_recv_timeout")]
    pub recv_timeout_secs: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            recv_timeout_secs: default_recv_timeout(),
        }
    }
}

impl CollectorSettings {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_secs(self.recv_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_log_min_duration() -> i64 {
    -1
}
fn default_true() -> bool {
    true
}
fn default_max_file_size_kb() -> i64 {
    -1
}
fn default_log_path() -> PathBuf {
    PathBuf::from("/var/lib/slowquery-recorder/slow_queries.log")
}
fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/slowquery-recorder/collector.sock")
}
fn default_recv_timeout() -> u64 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
