//! Interactive panel command — `pagelens panel`.

use anyhow::Result;
use pagelens::panel::{PanelOptions, run_panel};

pub async fn cmd_panel(host: String, port: u16, target: Option<String>, model: String) -> Result<()> {
    run_panel(PanelOptions {
        host,
        port,
        target,
        model,
    })
    .await
}
