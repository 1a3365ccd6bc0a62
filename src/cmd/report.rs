//! Offline reporting commands — `pagelens summarize|prompt|analyze`.
//!
//! These run against exported artifacts (a HAR file, a JSON-lines console
//! log export) so the pipeline can be scripted without a live browser.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use pagelens::capture::{self, LogEntry};
use pagelens::gemini::GeminiClient;
use pagelens::keystore::Keystore;
use pagelens::{har, prompt};

fn load_inputs(
    har_path: Option<&Path>,
    logs_path: Option<&Path>,
) -> Result<(Vec<LogEntry>, Option<String>)> {
    let logs = match logs_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read log export: {}", path.display()))?;
            capture::parse_log_export(&raw)?
        }
        None => Vec::new(),
    };
    let summary = match har_path {
        Some(path) => {
            let log = har::load_har(path)?;
            Some(har::summarize(&log).render())
        }
        None => None,
    };
    Ok((logs, summary))
}

pub fn cmd_summarize(har_path: &Path) -> Result<()> {
    let log = har::load_har(har_path)?;
    print!("{}", har::summarize(&log).render());
    Ok(())
}

pub fn cmd_prompt(har_path: Option<&Path>, logs_path: Option<&Path>) -> Result<()> {
    let (logs, summary) = load_inputs(har_path, logs_path)?;
    print!("{}", prompt::build_prompt(&logs, summary.as_deref()));
    Ok(())
}

pub async fn cmd_analyze(
    har_path: Option<&Path>,
    logs_path: Option<&Path>,
    model: &str,
) -> Result<()> {
    let keystore = Keystore::open_default()?;
    let Some(api_key) = keystore.load()? else {
        bail!("No API key saved. Run 'pagelens key set <KEY>' first.");
    };

    let (logs, summary) = load_inputs(har_path, logs_path)?;
    let text = prompt::build_prompt(&logs, summary.as_deref());

    let client = GeminiClient::new(model)?;
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Sending prompt to {model}..."));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = client.analyze(&api_key, &text).await;
    spinner.finish_and_clear();

    println!("{}", result?);
    Ok(())
}
