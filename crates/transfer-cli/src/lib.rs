//! Ring Buffer Transfer Runner
//!
//! Loads a [`TransferConfig`], runs the producer/consumer transfer on the
//! configured runtimes and reports one summary per run.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use transfer::{
    run_async, run_threaded, source, CancelToken, RuntimeKind, TransferConfig, TransferSummary,
};

/// Initialize logging at `level` (falls back to INFO on an unknown name)
pub fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from an optional file plus `TRANSFER_*` variables
pub fn load_config(path: Option<&Path>) -> Result<TransferConfig> {
    TransferConfig::load(path).context("Failed to load transfer configuration")
}

/// Run every transfer the config asks for, stopping at the first failure
pub async fn run(config: &TransferConfig, cancel: &CancelToken) -> Result<Vec<TransferSummary>> {
    let values = source::permutation(config.item_count, config.seed);
    let mut summaries = Vec::new();

    if matches!(config.runtime, RuntimeKind::Threaded | RuntimeKind::Both) {
        let threaded_config = config.clone();
        let threaded_values = values.clone();
        let threaded_cancel = cancel.clone();
        let report = tokio::task::spawn_blocking(move || {
            run_threaded(&threaded_config, &threaded_values, &threaded_cancel)
        })
        .await
        .context("Threaded transfer task failed")?
        .context("Threaded transfer failed")?;
        summaries.push(report.summary());
    }

    if matches!(config.runtime, RuntimeKind::Async | RuntimeKind::Both) {
        let report = run_async(config, values, cancel)
            .await
            .context("Async transfer failed")?;
        summaries.push(report.summary());
    }

    for summary in &summaries {
        info!("report {}", serde_json::to_string(summary)?);
    }
    Ok(summaries)
}
