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

use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use slowquery_recorder::{
    codec, QueryEvent, QueryRecorder, RecorderConfig, RecorderContext, RelayServer,
};
use tempfile::TempDir;
use tokio::time::sleep;

fn test_config(dir: &TempDir) -> RecorderConfig {
    let mut config = RecorderConfig::default();
    config.storage.path = dir.path().join("slow_queries.log");
    config.collector.socket_path = dir.path().join("collector.sock");
    config
}

fn sample_event() -> QueryEvent {
    QueryEvent {
        datetime: "2025-06-01 12:34:56.789012+00:00".to_string(),
        duration_ms: 1750.5,
        username: "carol".to_string(),
        appname: "reports".to_string(),
        dbname: "warehouse".to_string(),
        temp_blocks_written: 3,
        hit_ratio: 92.25,
        tuple_count: 12,
        query_text: "SELECT count(*) FROM shipments".to_string(),
        plan_text: "{\"Plan\": {\"Node Type\": \"Aggregate\"}}".to_string(),
    }
}

async fn wait_for_rows(recorder: &QueryRecorder, want: usize) -> Vec<QueryEvent> {
    for _ in 0..50 {
        let rows = recorder.scan_all().await.unwrap();
        if rows.len() >= want {
            return rows;
        }
        sleep(Duration::from_millis(100)).await;
    }
    recorder.scan_all().await.unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relay_stores_valid_datagrams() {
    let dir = TempDir::new().unwrap();
    let ctx = RecorderContext::new(test_config(&dir));
    let (relay, handle) = RelayServer::bind(ctx.clone()).await.unwrap();
    let relay_task = tokio::spawn(relay.run());

    let query_event = sample_event();
    let record = codec::serialize(&query_event);
    let client = UnixDatagram::unbound().unwrap();
    client.send_to(&record, dir.path().join("collector.sock")).unwrap();

    let reader = QueryRecorder::new(ctx).await;
    let rows = wait_for_rows(&reader, 1).await;
    assert_eq!(rows, vec![query_event]);

    handle.terminate().await;
    relay_task.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relay_drops_malformed_datagrams() {
    let dir = TempDir::new().unwrap();
    let ctx = RecorderContext::new(test_config(&dir));
    let (relay, handle) = RelayServer::bind(ctx.clone()).await.unwrap();
    let relay_task = tokio::spawn(relay.run());

    let client = UnixDatagram::unbound().unwrap();
    let socket_path = dir.path().join("collector.sock");
    client.send_to(b"definitely not a record", &socket_path).unwrap();
    client
        .send_to(&codec::serialize(&sample_event()), &socket_path)
        .unwrap();

    // Only the well-formed record lands.
    let reader = QueryRecorder::new(ctx).await;
    let rows = wait_for_rows(&reader, 1).await;
    assert_eq!(rows.len(), 1);

    handle.terminate().await;
    relay_task.await.unwrap().unwrap();
    assert_eq!(reader.scan_all().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_terminate_drains_queued_datagrams() {
    let dir = TempDir::new().unwrap();
    let ctx = RecorderContext::new(test_config(&dir));
    let (relay, handle) = RelayServer::bind(ctx.clone()).await.unwrap();

    // Queue a record before the loop even starts, then terminate at once:
    // the drain pass must still store it.
    let client = UnixDatagram::unbound().unwrap();
    client
        .send_to(&codec::serialize(&sample_event()), dir.path().join("collector.sock"))
        .unwrap();

    let relay_task = tokio::spawn(relay.run());
    handle.terminate().await;
    relay_task.await.unwrap().unwrap();

    let reader = QueryRecorder::new(ctx).await;
    assert_eq!(reader.scan_all().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_producer_prefers_channel_and_relay_delivers() {
    let dir = TempDir::new().unwrap();
    let ctx = RecorderContext::new(test_config(&dir));
    let (relay, handle) = RelayServer::bind(ctx.clone()).await.unwrap();
    let relay_task = tokio::spawn(relay.run());

    let producer = QueryRecorder::with_relay(ctx.clone()).await;
    producer.record(&sample_event()).await;

    let reader = QueryRecorder::new(ctx).await;
    let rows = wait_for_rows(&reader, 1).await;
    assert_eq!(rows, vec![sample_event()]);

    handle.terminate().await;
    relay_task.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_oversized_record_takes_direct_path() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.tracking.compression = false;
    let ctx = RecorderContext::new(config);
    let (relay, handle) = RelayServer::bind(ctx.clone()).await.unwrap();
    let relay_task = tokio::spawn(relay.run());

    // Way past the datagram ceiling; must be written directly.
    let mut big = sample_event();
    big.query_text = "v".repeat(70_000);
    let producer = QueryRecorder::with_relay(ctx.clone()).await;
    producer.record(&big).await;

    let reader = QueryRecorder::new(ctx).await;
    let rows = reader.scan_all().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].query_text.len(), 70_000);

    handle.terminate().await;
    relay_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_producer_without_collector_uses_direct_path() {
    let dir = TempDir::new().unwrap();
    let ctx = RecorderContext::new(test_config(&dir));

    // No relay bound; the socket file does not exist.
    let producer = QueryRecorder::with_relay(ctx.clone()).await;
    producer.record(&sample_event()).await;

    let reader = QueryRecorder::new(ctx).await;
    assert_eq!(reader.scan_all().await.unwrap(), vec![sample_event()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconfigure_picks_up_new_size_cap() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("slow_queries.log");
    let socket_path = dir.path().join("collector.sock");
    let config_path = dir.path().join("recorder.yaml");

    let write_config = |max_file_size_kb: i64| {
        std::fs::write(
            &config_path,
            format!(
                "tracking:\n  compression: false\n  max_file_size_kb: {}\nstorage:\n  path: \"{}\"\ncollector:\n  socket_path: \"{}\"\nlogging:\n  level: warn\n",
                max_file_size_kb,
                log_path.display(),
                socket_path.display()
            ),
        )
        .unwrap();
    };

    write_config(-1);
    let ctx = RecorderContext::from_file(&config_path).unwrap();
    let (relay, handle) = RelayServer::bind(ctx.clone()).await.unwrap();
    let relay_task = tokio::spawn(relay.run());

    let client = UnixDatagram::unbound().unwrap();
    let record = codec::serialize(&sample_event());
    client.send_to(&record, &socket_path).unwrap();

    let reader = QueryRecorder::new(ctx.clone()).await;
    assert_eq!(wait_for_rows(&reader, 1).await.len(), 1);

    // Shrink the cap to zero and tell the relay to reload; records sent
    // afterwards are skipped.
    write_config(0);
    handle.reconfigure().await;
    sleep(Duration::from_millis(500)).await;

    client.send_to(&record, &socket_path).unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(reader.scan_all().await.unwrap().len(), 1);

    handle.terminate().await;
    relay_task.await.unwrap().unwrap();
}
