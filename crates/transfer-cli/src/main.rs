//! Ring Buffer Transfer - Main Entry Point

use std::path::PathBuf;
use tracing::{error, info};
use transfer::CancelToken;
use transfer_cli::{init_logging, load_config, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config(path.as_deref())?;
    init_logging(&config.log_level)?;

    info!("=== Ring Buffer Transfer v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "capacity={}, items={}, runtime={:?}, wait={:?}",
        config.capacity, config.item_count, config.runtime, config.wait
    );

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling transfer");
            ctrl_c.cancel();
        }
    });

    match run(&config, &cancel).await {
        Ok(summaries) => {
            info!("All {} transfer(s) verified", summaries.len());
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
