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

use std::path::PathBuf;

use slowquery_recorder::{load_config, load_config_with_env};
use tempfile::TempDir;

#[test]
fn test_minimal_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recorder.yaml");
    std::fs::write(&path, "tracking:\n  compression: false\n").unwrap();

    let config = load_config(&path).unwrap();
    assert!(!config.tracking.compression);
    assert!(config.tracking.log_plan);
    assert_eq!(config.tracking.max_file_size_kb, -1);
    assert_eq!(config.collector.recv_timeout_secs, 1);
    assert_eq!(config.logging.level, "info");
    assert_eq!(
        config.storage.path,
        PathBuf::from("/var/lib/slowquery-recorder/slow_queries.log")
    );
}

#[test]
fn test_full_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recorder.yaml");
    std::fs::write(
        &path,
        "tracking:\n  log_min_duration: 5\n  compression: true\n  max_file_size_kb: 2048\n  log_plan: false\nstorage:\n  path: /tmp/slow.log\ncollector:\n  socket_path: /tmp/collector.sock\n  recv_timeout_secs: 2\nlogging:\n  level: debug\n  format: text\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.tracking.log_min_duration, 5);
    assert_eq!(config.tracking.max_file_size_kb, 2048);
    assert!(!config.tracking.log_plan);
    assert_eq!(config.storage.path, PathBuf::from("/tmp/slow.log"));
    assert_eq!(config.collector.socket_path, PathBuf::from("/tmp/collector.sock"));
    assert_eq!(config.collector.recv_timeout_secs, 2);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_env_substitution_with_default_applies() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recorder.yaml");
    std::env::remove_var("SQR_TEST_UNSET_SOCKET");
    std::fs::write(
        &path,
        "collector:\n  socket_path: ${SQR_TEST_UNSET_SOCKET:-/tmp/fallback.sock}\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.collector.socket_path, PathBuf::from("/tmp/fallback.sock"));
}

#[test]
fn test_invalid_max_file_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recorder.yaml");
    std::fs::write(&path, "tracking:\n  max_file_size_kb: -5\n").unwrap();

    assert!(load_config(&path).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(load_config("/definitely/not/there.yaml").is_err());
}

#[test]
fn test_env_override_replaces_log_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recorder.yaml");
    std::fs::write(&path, "storage:\n  path: /tmp/from-file.log\n").unwrap();

    std::env::set_var("SLOWQUERY_LOG_FILE", "/tmp/from-env.log");
    let config = load_config_with_env(&path).unwrap();
    std::env::remove_var("SLOWQUERY_LOG_FILE");

    assert_eq!(config.storage.path, PathBuf::from("/tmp/from-env.log"));
}
