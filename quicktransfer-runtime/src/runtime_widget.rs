use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use quicktransfer_core::outcome::TransferOutcome;
use quicktransfer_engine::traits::Host;
use quicktransfer_engine::widget::QuickTransferWidget;
use quicktransfer_platform::HostFixture;

use crate::config_store::ConfigStore;
use crate::history::{TransferHistoryEntry, TransferHistoryStore};

/// Host described by a fixture file, or no host at all.
pub fn host_from_fixture(path: Option<&Path>) -> anyhow::Result<Option<Arc<dyn Host>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let host = HostFixture::load(path)?.into_host();
    Ok(Some(Arc::new(host)))
}

/// Loads config and returns a started widget.
///
/// A broken button list still yields a widget: it renders no buttons and
/// shows the configuration error as its status.
pub async fn start_widget(
    store: &ConfigStore,
    host: Option<Arc<dyn Host>>,
) -> anyhow::Result<QuickTransferWidget> {
    let cfg = store.load_widget_config()?;
    if let Err(e) = &cfg.buttons {
        log::error!("{}: {e}", store.path().display());
    }
    let mut widget = QuickTransferWidget::from_button_configs(host, cfg.buttons, cfg.timings);
    let caps = widget.start().await;
    log::info!(
        "widget started: present={} detection={:?} transfer={:?}",
        caps.present(),
        caps.detection_mode(),
        caps.transfer_mode()
    );
    Ok(widget)
}

/// Presses the button labelled `label` and appends the result to `history`.
pub async fn press_and_record(
    widget: &QuickTransferWidget,
    label: &str,
    history: Option<&TransferHistoryStore>,
) -> anyhow::Result<TransferOutcome> {
    let index = widget
        .button_index(label)
        .with_context(|| format!("no button labelled {label:?}"))?;
    let outcome = widget.press(index).await?;

    if let Some(history) = history {
        let view = &widget.buttons()[index];
        history
            .append(TransferHistoryEntry::from_outcome(
                &view.label,
                &view.destination,
                &outcome,
            ))
            .context("record transfer")?;
    }
    Ok(outcome)
}
