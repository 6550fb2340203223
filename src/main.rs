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

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use slowquery_recorder::config::LoggingConfig;
use slowquery_recorder::event;
use slowquery_recorder::{QueryEvent, QueryRecorder, RecorderConfig, RecorderContext, RelayServer};

/// Slow-query recorder - collector daemon and log operations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collector: receive records on the local socket and append
    /// them to the log file
    Run,
    /// Print every stored record as one JSON object per line
    List,
    /// Truncate the log file
    Reset,
    /// Inject a synthetic record through the full producer path
    Record {
        /// Statement text to record
        #[arg(long)]
        query: String,

        #[arg(long, default_value_t = 0.0)]
        duration_ms: f64,

        #[arg(long, default_value = "postgres")]
        username: String,

        #[arg(long, default_value = "")]
        appname: String,

        #[arg(long, default_value = "postgres")]
        dbname: String,

        /// Execution plan as JSON text
        #[arg(long, default_value = "")]
        plan: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file, or fall back to built-in defaults
    let ctx = match &args.config {
        Some(path) => RecorderContext::from_file(path)?,
        None => RecorderContext::new(RecorderConfig::default()),
    };

    let settings = ctx.settings().await;
    init_tracing(&settings.logging)?;

    info!("Starting slowquery-recorder");
    if let Some(path) = &args.config {
        info!("Loaded configuration from: {:?}", path);
    }
    info!("Storage file: {}", settings.storage.path.display());

    match args.command {
        Command::Run => run_collector(ctx).await,
        Command::List => list_records(ctx).await,
        Command::Reset => reset_log(ctx).await,
        Command::Record {
            query,
            duration_ms,
            username,
            appname,
            dbname,
            plan,
        } => {
            let query_event = QueryEvent {
                datetime: event::current_timestamp(),
                duration_ms,
                username,
                appname,
                dbname,
                temp_blocks_written: 0,
                hit_ratio: 100.0,
                tuple_count: 0,
                query_text: query,
                plan_text: plan,
            };
            inject_record(ctx, query_event).await
        }
    }
}

/// Initialize tracing with the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Run the collector loop until Ctrl+C or SIGTERM; SIGHUP reloads the
/// compression and size-cap settings.
async fn run_collector(ctx: Arc<RecorderContext>) -> Result<()> {
    let socket_path = ctx.settings().await.collector.socket_path;
    let (relay, handle) = RelayServer::bind(ctx.clone()).await?;
    let relay_task = tokio::spawn(relay.run());

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = hangup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                handle.reconfigure().await;
            }
        }
    }

    handle.terminate().await;
    match relay_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("collector error: {:#}", e),
        Err(e) => error!("collector task failed: {}", e),
    }

    // Socket teardown; the next run re-creates it.
    let _ = tokio::fs::remove_file(&socket_path).await;
    info!("slowquery-recorder shut down successfully");
    Ok(())
}

/// Materialize the whole log as JSON lines on stdout
async fn list_records(ctx: Arc<RecorderContext>) -> Result<()> {
    let recorder = QueryRecorder::new(ctx).await;
    let events = recorder.scan_all().await?;
    for query_event in &events {
        println!("{}", serde_json::to_string(query_event)?);
    }
    info!("{} record(s) listed", events.len());
    Ok(())
}

async fn reset_log(ctx: Arc<RecorderContext>) -> Result<()> {
    let recorder = QueryRecorder::new(ctx).await;
    recorder.reset().await?;
    info!("storage file truncated");
    Ok(())
}

async fn inject_record(ctx: Arc<RecorderContext>, query_event: QueryEvent) -> Result<()> {
    let recorder = QueryRecorder::with_relay(ctx).await;
    recorder.record(&query_event).await;
    info!("record submitted");
    Ok(())
}
