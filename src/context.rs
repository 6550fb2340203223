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

// Process-wide shared state: live configuration plus the storage file lock,
// built explicitly at startup and handed to components.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::{load_config_with_env, RecorderConfig};
use crate::storage::LogStore;

/// Owner of everything the producers, the relay and the readers share: the
/// live settings and the readers-writer lock guarding the log file.
///
/// Configuration is read-mostly. Producers snapshot it per call and the
/// relay re-reads it on reconfigure, so different callers may transiently
/// observe different settings during a reload; that is eventual consistency
/// by design, not a race to fix.
pub struct RecorderContext {
    config: RwLock<RecorderConfig>,
    config_path: Option<PathBuf>,
    file_lock: Arc<RwLock<()>>,
}

impl RecorderContext {
    /// Build a context around an already-loaded configuration.
    pub fn new(config: RecorderConfig) -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(config),
            config_path: None,
            file_lock: Arc::new(RwLock::new(())),
        })
    }

    /// Build a context from a configuration file; [`Self::reload`] re-reads
    /// the same file later.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let path = path.into();
        let config = load_config_with_env(&path)?;
        Ok(Arc::new(Self {
            config: RwLock::new(config),
            config_path: Some(path),
            file_lock: Arc::new(RwLock::new(())),
        }))
    }

    /// Snapshot of the live settings. Producers call this at record time,
    /// so a reload is picked up on their next event.
    pub async fn settings(&self) -> RecorderConfig {
        self.config.read().await.clone()
    }

    /// Re-read the configuration file. A context built without one keeps
    /// its current settings.
    pub async fn reload(&self) -> Result<()> {
        let Some(path) = &self.config_path else {
            return Ok(());
        };
        let fresh = load_config_with_env(path)?;
        *self.config.write().await = fresh;
        info!("configuration reloaded from {}", path.display());
        Ok(())
    }

    /// Storage manager bound to the configured log file, sharing this
    /// context's file lock.
    pub async fn log_store(&self) -> LogStore {
        let config = self.config.read().await;
        LogStore::new(config.storage.path.clone(), self.file_lock.clone())
    }
}
