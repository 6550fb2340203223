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

// Producer dual path and the query surface over the stored log

use std::os::unix::net::UnixDatagram;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec;
use crate::context::RecorderContext;
use crate::error::RecorderError;
use crate::event::QueryEvent;
use crate::relay::MAX_DATAGRAM_BYTES;
use crate::storage::{AppendOutcome, LogStore};

/// Producer and reader handle over the shared log.
///
/// Records small enough for a datagram go out on the collector channel so
/// the host's query-completion path stays non-blocking; oversized records,
/// or any producer without a usable channel, write through the direct path.
pub struct QueryRecorder {
    ctx: Arc<RecorderContext>,
    store: LogStore,
    channel: Option<UnixDatagram>,
}

impl QueryRecorder {
    /// Direct-path-only recorder; also the reader behind list and reset.
    pub async fn new(ctx: Arc<RecorderContext>) -> Self {
        let store = ctx.log_store().await;
        Self {
            ctx,
            store,
            channel: None,
        }
    }

    /// Recorder that prefers the collector channel, falling back to the
    /// direct path when the socket cannot be reached now or later.
    pub async fn with_relay(ctx: Arc<RecorderContext>) -> Self {
        let store = ctx.log_store().await;
        let socket_path = ctx.settings().await.collector.socket_path;
        let channel = match connect_channel(&socket_path) {
            Ok(socket) => Some(socket),
            Err(e) => {
                debug!(
                    "collector channel {} unavailable ({}), using direct path",
                    socket_path.display(),
                    e
                );
                None
            }
        };
        Self {
            ctx,
            store,
            channel,
        }
    }

    /// Record one query event.
    ///
    /// Telemetry must never fail or stall the host query, so every failure
    /// in here degrades to a log line: a full channel drops the event, an
    /// unreachable channel or oversized record falls back to the direct
    /// path, and a failed direct write is logged and forgotten.
    pub async fn record(&self, event: &QueryEvent) {
        let tracking = self.ctx.settings().await.tracking;
        let record = if tracking.log_plan {
            codec::serialize(event)
        } else {
            // The plan slot stays in the record, zero length.
            let mut stripped = event.clone();
            stripped.plan_text = String::new();
            codec::serialize(&stripped)
        };
        if record.len() <= MAX_DATAGRAM_BYTES {
            if let Some(channel) = &self.channel {
                match channel.send(&record) {
                    Ok(_) => {
                        debug!("sent {} byte record to collector", record.len());
                        return;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        // Channel full: dropping beats stalling the query.
                        warn!("collector channel full, dropping query event");
                        return;
                    }
                    Err(e) => {
                        debug!("collector channel unavailable ({}), using direct path", e)
                    }
                }
            }
        }
        match self
            .store
            .store_record(&record, tracking.compression, tracking.max_file_size_kb)
            .await
        {
            Ok(AppendOutcome::Written(bytes)) => {
                debug!("stored query event, {} bytes on disk", bytes)
            }
            Ok(AppendOutcome::SkippedCapacity) => {}
            Err(e) => warn!("could not store query event: {}", e),
        }
    }

    /// Materialize every stored event, oldest first.
    ///
    /// Any unreadable entry fails the whole call; no partial result set is
    /// returned. An absent log file lists as empty.
    pub async fn scan_all(&self) -> Result<Vec<QueryEvent>, RecorderError> {
        let mut scan = self.store.scan().await?;
        let mut events = Vec::new();
        while let Some(entry) = scan.next_entry().await? {
            let record = entry.into_record()?;
            events.push(codec::parse(&record)?);
        }
        Ok(events)
    }

    /// Drop every stored event. Idempotent; resetting an absent file
    /// creates an empty one.
    pub async fn reset(&self) -> Result<(), RecorderError> {
        self.store.truncate().await
    }
}

fn connect_channel(path: &Path) -> std::io::Result<UnixDatagram> {
    let socket = UnixDatagram::unbound()?;
    socket.connect(path)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}
