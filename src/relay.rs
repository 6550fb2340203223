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

/// Transport relay: the collector loop draining the local datagram socket
/// into the storage file.
///
/// Producers send one serialized record per datagram, no fragmentation or
/// reassembly. The loop validates each datagram structurally, then stores
/// it with the compression and size-cap settings loaded at startup or at
/// the last reconfigure. Per-record failures never stop the loop; only a
/// terminate command does.
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::UnixDatagram;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::codec;
use crate::context::RecorderContext;
use crate::storage::{AppendOutcome, LogStore};

/// Largest record accepted over the datagram channel; anything bigger
/// takes the direct path.
pub const MAX_DATAGRAM_BYTES: usize = 65_000;

/// Receive buffer, sized above `MAX_DATAGRAM_BYTES` so no accepted record
/// is ever short-read.
const RECV_BUFFER_BYTES: usize = 64 * 1024;

/// Control messages accepted by the running relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Re-read compression and size-cap settings from live configuration.
    Reconfigure,
    /// Drain pending datagrams, then exit.
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Running,
    ReloadingConfig,
    Terminating,
}

/// Settings the relay snapshots at startup and on every reconfigure.
#[derive(Debug, Clone, Copy)]
struct RelaySettings {
    compression: bool,
    max_file_size_kb: i64,
}

/// Handle for signaling the running relay from outside the loop.
#[derive(Clone)]
pub struct RelayHandle {
    control_tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    pub async fn reconfigure(&self) {
        self.control_tx.send(RelayCommand::Reconfigure).await.ok();
    }

    pub async fn terminate(&self) {
        self.control_tx.send(RelayCommand::Terminate).await.ok();
    }
}

/// The collector loop. Bind, then `run()` until terminated.
pub struct RelayServer {
    ctx: Arc<RecorderContext>,
    store: LogStore,
    socket: UnixDatagram,
    control_rx: mpsc::Receiver<RelayCommand>,
}

impl RelayServer {
    /// Bind the collector socket and build the relay with its control
    /// handle. A stale socket file from a previous run is removed first.
    pub async fn bind(ctx: Arc<RecorderContext>) -> Result<(Self, RelayHandle)> {
        let socket_path = ctx.settings().await.collector.socket_path;
        if let Some(parent) = socket_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("could not create {}", parent.display()))?;
            }
        }
        match tokio::fs::remove_file(&socket_path).await {
            Ok(()) => debug!("removed stale socket {}", socket_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("could not remove stale socket {}", socket_path.display())
                })
            }
        }
        let socket = UnixDatagram::bind(&socket_path).with_context(|| {
            format!("could not bind collector socket {}", socket_path.display())
        })?;
        let store = ctx.log_store().await;
        let (control_tx, control_rx) = mpsc::channel(16);
        info!("collector listening on {}", socket_path.display());
        Ok((
            Self {
                ctx,
                store,
                socket,
                control_rx,
            },
            RelayHandle { control_tx },
        ))
    }

    /// Run until a terminate command (or until every handle is dropped).
    ///
    /// The receive wait is bounded by the configured timeout so control
    /// messages are observed within one iteration even when the socket is
    /// idle.
    pub async fn run(self) -> Result<()> {
        let RelayServer {
            ctx,
            store,
            socket,
            mut control_rx,
        } = self;
        let recv_timeout = ctx.settings().await.collector.recv_timeout();
        let mut settings = current_settings(&ctx).await;
        let mut state = RelayState::Running;
        let mut buf = vec![0u8; RECV_BUFFER_BYTES];
        loop {
            match state {
                RelayState::Terminating => break,
                RelayState::ReloadingConfig => {
                    if let Err(e) = ctx.reload().await {
                        warn!("configuration reload failed, keeping previous settings: {:#}", e);
                    }
                    settings = current_settings(&ctx).await;
                    state = RelayState::Running;
                }
                RelayState::Running => {
                    tokio::select! {
                        cmd = control_rx.recv() => match cmd {
                            Some(RelayCommand::Reconfigure) => {
                                info!("reloading collector configuration");
                                state = RelayState::ReloadingConfig;
                            }
                            Some(RelayCommand::Terminate) | None => state = RelayState::Terminating,
                        },
                        received = timeout(recv_timeout, socket.recv(&mut buf)) => match received {
                            Ok(Ok(len)) => relay_record(&store, &buf[..len], settings).await,
                            Ok(Err(e)) => warn!("collector socket receive failed: {}", e),
                            // Idle interval elapsed; loop back so commands
                            // are checked promptly.
                            Err(_) => {}
                        },
                    }
                }
            }
        }
        // Store whatever is still queued on the socket before exiting.
        loop {
            match socket.try_recv(&mut buf) {
                Ok(len) => relay_record(&store, &buf[..len], settings).await,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("collector socket drain failed: {}", e);
                    break;
                }
            }
        }
        info!("collector terminated");
        Ok(())
    }
}

async fn current_settings(ctx: &RecorderContext) -> RelaySettings {
    let config = ctx.settings().await;
    RelaySettings {
        compression: config.tracking.compression,
        max_file_size_kb: config.tracking.max_file_size_kb,
    }
}

async fn relay_record(store: &LogStore, data: &[u8], settings: RelaySettings) {
    if !codec::check_structure(data) {
        warn!("dropping malformed datagram of {} bytes", data.len());
        return;
    }
    match store
        .store_record(data, settings.compression, settings.max_file_size_kb)
        .await
    {
        Ok(AppendOutcome::Written(bytes)) => debug!("stored relayed record, {} bytes on disk", bytes),
        // The store already logged the skip.
        Ok(AppendOutcome::SkippedCapacity) => {}
        Err(e) => warn!("could not store relayed record: {}", e),
    }
}
