//! Command implementations

use crate::report;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surfmon_capture::DirectoryWatcher;
use surfmon_core::{AppConfig, ConfigStore, HistoryStore, Pipeline, RawMessage};
use surfmon_decode::{ExtractOptions, WindsurfDecoder};
use surfmon_export::{JsonFileExporter, WebhookDispatcher};
use surfmon_tui::Dashboard;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// File the monitor logs to, inside the output directory
const MONITOR_LOG_FILE: &str = "surfmon.log";

pub struct DecodeArgs {
    pub input: String,
    pub file: bool,
    pub raw: bool,
    pub output_dir: Option<PathBuf>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

pub struct MonitorArgs {
    pub watch_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub api_endpoint: Option<String>,
    pub api_key: Option<String>,
}

fn load_config(store: &ConfigStore) -> anyhow::Result<AppConfig> {
    store
        .load_or_create()
        .with_context(|| format!("Failed to load configuration from {}", store.path().display()))
}

fn apply_api_override(
    store: &ConfigStore,
    config: &mut AppConfig,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(endpoint) = endpoint {
        store
            .update_api(config, endpoint, api_key)
            .context("Failed to update API configuration")?;
    }
    Ok(())
}

/// Assemble the ingestion pipeline described by the configuration
fn build_pipeline(
    config: &AppConfig,
    output_dir: &Path,
    history: Arc<HistoryStore>,
) -> anyhow::Result<Pipeline> {
    let decoder = WindsurfDecoder::new(ExtractOptions {
        legacy_language_default: config.monitoring.legacy_language_default,
    });
    let mut pipeline = Pipeline::new(Box::new(decoder), history);

    if config.monitoring.save_to_disk {
        pipeline.add_sink(Box::new(JsonFileExporter::new(output_dir)));
    }

    let dispatcher =
        WebhookDispatcher::new(config.api.clone()).context("Failed to set up forwarding")?;
    pipeline.set_dispatcher(Box::new(dispatcher));

    Ok(pipeline)
}

pub async fn decode(store: &ConfigStore, args: DecodeArgs) -> anyhow::Result<()> {
    let mut config = load_config(store)?;
    apply_api_override(
        store,
        &mut config,
        args.api_endpoint.as_deref(),
        args.api_key.as_deref(),
    )?;

    let raw = if args.file {
        let bytes = tokio::fs::read(&args.input)
            .await
            .with_context(|| format!("Failed to read message file {}", args.input))?;
        RawMessage::Bytes(bytes)
    } else if args.raw {
        RawMessage::Text(args.input)
    } else {
        RawMessage::Text(report::strip_bytes_literal(&args.input).to_string())
    };

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.monitoring.output_directory.clone());
    let history = Arc::new(HistoryStore::new(config.monitoring.max_history));
    let pipeline = build_pipeline(&config, &output_dir, history)?;

    let record = pipeline.ingest(raw).await;
    print!("{}", report::render(&record));

    Ok(())
}

pub async fn monitor(
    store: &ConfigStore,
    args: MonitorArgs,
    log_filter: EnvFilter,
) -> anyhow::Result<()> {
    let mut config = load_config(store)?;
    apply_api_override(
        store,
        &mut config,
        args.api_endpoint.as_deref(),
        args.api_key.as_deref(),
    )?;

    let watch_dir = args
        .watch_dir
        .unwrap_or_else(|| config.monitoring.watch_directory.clone());
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.monitoring.output_directory.clone());
    store
        .update_monitoring(&mut config, &watch_dir, &output_dir)
        .context("Failed to save monitoring configuration")?;

    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory {}", output_dir.display())
    })?;

    // Logs go to a file while the dashboard owns the terminal
    let appender = tracing_appender::rolling::never(&output_dir, MONITOR_LOG_FILE);
    let (writer, _log_guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(log_filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let history = Arc::new(HistoryStore::new(config.monitoring.max_history));
    let pipeline = Arc::new(build_pipeline(&config, &output_dir, history.clone())?);

    let watcher = DirectoryWatcher::new(&watch_dir, pipeline)
        .start()
        .with_context(|| format!("Cannot watch {}", watch_dir.display()))?;

    // Both receivers exist before anything can signal
    let (shutdown_tx, dashboard_rx) = broadcast::channel::<()>(4);

    let watcher_task = tokio::spawn(watcher.run(shutdown_tx.subscribe()));

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            let _ = signal_tx.send(());
        }
    });

    info!(
        watch = %watch_dir.display(),
        output = %output_dir.display(),
        forwarding = config.api.enabled,
        "Monitor started"
    );

    let dashboard = Dashboard::new(history, config.api.enabled);
    let result = surfmon_tui::run(dashboard, shutdown_tx.clone(), dashboard_rx).await;

    // Stop the watcher whichever way the dashboard ended, then let it drain
    let _ = shutdown_tx.send(());
    match watcher_task.await {
        Ok(ingested) => info!(ingested, "Monitor stopped"),
        Err(e) => error!(error = %e, "Watcher task failed"),
    }

    if let Err(e) = &result {
        warn!(error = %e, "Dashboard exited with an error");
    }
    result
}

pub fn configure_api(
    store: &ConfigStore,
    endpoint: &str,
    api_key: Option<&str>,
) -> anyhow::Result<()> {
    let mut config = load_config(store)?;
    apply_api_override(store, &mut config, Some(endpoint), api_key)?;

    println!("API configuration updated:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!(
        "  API key:  {}",
        if config.api.api_key.is_empty() {
            "[not set]"
        } else {
            "[set]"
        }
    );

    Ok(())
}
