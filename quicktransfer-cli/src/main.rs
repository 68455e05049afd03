use std::path::PathBuf;

use quicktransfer_core::capabilities::DetectionMode;
use quicktransfer_runtime::config_store::ConfigStore;
use quicktransfer_runtime::history::TransferHistoryStore;
use quicktransfer_runtime::runtime_widget::{host_from_fixture, press_and_record, start_widget};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("QT_CONFIG").unwrap_or_else(|_| "quicktransfer.json".into());
    let fixture = std::env::var_os("QT_HOST_FIXTURE").map(PathBuf::from);
    let history = std::env::var_os("QT_HISTORY").map(TransferHistoryStore::at_path);
    let label = std::env::args().nth(1);

    let store = ConfigStore::at_path(config_path);
    let host = host_from_fixture(fixture.as_deref())?;
    let mut widget = start_widget(&store, host).await?;

    // Give the monitor one fresh read before reporting.
    let detecting = widget
        .capabilities()
        .is_some_and(|c| c.detection_mode() != DetectionMode::Unavailable);
    if let Some(mut snapshot) = widget.watch_snapshot().filter(|_| detecting) {
        widget.refresh();
        if tokio::time::timeout(widget.timings().probe_timeout(), snapshot.changed())
            .await
            .is_err()
        {
            log::warn!("host did not answer the first read");
        }
    }

    println!("status={}", widget.status());
    println!("buttons={}", serde_json::to_string_pretty(&widget.buttons())?);

    if let Some(label) = label {
        let outcome = press_and_record(&widget, &label, history.as_ref()).await?;
        println!("outcome={}", outcome.label());
        println!("status={}", widget.status());
    }

    widget.stop().await;
    Ok(())
}
