//! Interactive panel controller.
//!
//! Wires the terminal menu to the capture, summarizer, prompt, and AI
//! components. One action runs at a time; every failure is terminal for
//! its action, updates the status line, and returns to the menu with the
//! session state consistent and the action re-triggerable.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use indicatif::ProgressBar;

use crate::cdp::{CdpSession, EvalOutcome};
use crate::gemini::GeminiClient;
use crate::keystore::Keystore;
use crate::prompt::build_prompt;
use crate::session::Session;
use crate::{har, prompt};

/// Expression evaluated in the page after the observer is installed, so
/// the developer sees confirmation in their own console (and the observer
/// captures it as the first entry).
const CAPTURE_CONFIRMATION: &str = "console.log('pagelens: console capture active')";

pub struct PanelOptions {
    pub host: String,
    pub port: u16,
    pub target: Option<String>,
    pub model: String,
}

#[derive(Clone, Copy)]
enum Action {
    SaveKey,
    CollectConsole,
    CollectNetwork,
    GeneratePrompt,
    ShowPrompt,
    SavePrompt,
    SendToAi,
    ClearData,
    Quit,
}

const MENU: &[(&str, Action)] = &[
    ("Save API key", Action::SaveKey),
    ("Collect console logs", Action::CollectConsole),
    ("Collect network data (HAR file)", Action::CollectNetwork),
    ("Generate prompt", Action::GeneratePrompt),
    ("Show prompt", Action::ShowPrompt),
    ("Save prompt to file", Action::SavePrompt),
    ("Send to AI", Action::SendToAi),
    ("Clear collected data", Action::ClearData),
    ("Quit", Action::Quit),
];

/// Run the interactive panel until the user quits.
pub async fn run_panel(opts: PanelOptions) -> Result<()> {
    let keystore = Keystore::open_default()?;
    let mut session = Session::default();
    let mut page: Option<CdpSession> = None;

    let mut status = match keystore.load() {
        Ok(key) => {
            session.api_key = key;
            if session.api_key.is_some() {
                "API key loaded. Ready to collect data.".to_string()
            } else {
                "Save your Gemini API key to enable AI analysis.".to_string()
            }
        }
        Err(err) => format!("Could not load the saved API key: {err:#}"),
    };

    loop {
        println!();
        println!("{}", style(&status).dim());
        let labels: Vec<&str> = MENU.iter().map(|(label, _)| *label).collect();
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("pagelens")
            .items(&labels)
            .default(0)
            .interact()?;

        status = match MENU[choice].1 {
            Action::SaveKey => save_key_action(&keystore, &mut session)?,
            Action::CollectConsole => collect_console_action(&opts, &mut page).await,
            Action::CollectNetwork => collect_network_action(&mut session)?,
            Action::GeneratePrompt => generate_prompt_action(&mut session, page.as_ref()),
            Action::ShowPrompt => show_prompt_action(&session),
            Action::SavePrompt => save_prompt_action(&session)?,
            Action::SendToAi => send_action(&opts, &session).await,
            Action::ClearData => {
                session.clear_collected();
                if let Some(page) = &page {
                    page.clear_logs();
                }
                "Collected data cleared.".to_string()
            }
            Action::Quit => return Ok(()),
        };
    }
}

fn save_key_action(keystore: &Keystore, session: &mut Session) -> Result<String> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Gemini API key (leave empty to clear)")
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(match keystore.clear() {
            Ok(()) => {
                session.api_key = None;
                "API key cleared.".to_string()
            }
            Err(err) => format!("Error clearing API key: {err:#}"),
        })
    } else {
        Ok(match keystore.store(&input) {
            Ok(()) => {
                session.api_key = Some(input.trim().to_string());
                "API key saved locally.".to_string()
            }
            Err(err) => format!("Error saving API key: {err:#}"),
        })
    }
}

async fn collect_console_action(opts: &PanelOptions, page: &mut Option<CdpSession>) -> String {
    if page.is_none() {
        match CdpSession::connect(&opts.host, opts.port, opts.target.as_deref()).await {
            Ok(session) => {
                println!("Attached to {}", style(&session.target.url).cyan());
                *page = Some(session);
            }
            Err(err) => return format!("Error attaching to the page: {err}"),
        }
    }
    let Some(session) = page.as_mut() else {
        return "Error attaching to the page.".to_string();
    };

    // Only the activation that installs the observer logs the confirmation;
    // re-activations would append a duplicate entry per click.
    match session.enable_console_observer().await {
        Ok(true) => {}
        Ok(false) => return "Console capture already active.".to_string(),
        Err(err) => return format!("Error starting console log collection: {err}"),
    }
    match session.evaluate(CAPTURE_CONFIRMATION).await {
        Ok(EvalOutcome::Value(_)) => {
            "Console capture active. Interact with the page, then generate the prompt.".to_string()
        }
        Ok(EvalOutcome::Exception(message)) => {
            format!("Error injecting confirmation into the page: {message}")
        }
        Err(err) => format!("Error starting console log collection: {err}"),
    }
}

fn collect_network_action(session: &mut Session) -> Result<String> {
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Path to exported HAR file")
        .interact_text()?;

    Ok(match har::load_har(&PathBuf::from(path.trim())) {
        Ok(log) => {
            let report = har::summarize(&log);
            let rendered = report.render();
            println!();
            print!("{rendered}");
            session.network_summary = Some(rendered);
            "Network data collected and summarized.".to_string()
        }
        Err(err) => {
            // Fail closed: a failed retrieval never leaves a stale summary.
            session.network_summary = None;
            format!("Error collecting network data: {err:#}")
        }
    })
}

fn generate_prompt_action(session: &mut Session, page: Option<&CdpSession>) -> String {
    if let Some(page) = page {
        session.logs = page.snapshot_logs();
        if !session.logs.is_empty() {
            println!();
            for entry in &session.logs {
                println!("{}", prompt::render_log_line(entry));
            }
        }
    }
    let text = build_prompt(&session.logs, session.network_summary.as_deref());
    println!();
    println!("{}", style("--- Generated prompt ---").bold());
    print!("{text}");
    session.prompt = Some(text);
    "Prompt generated and ready to send.".to_string()
}

fn show_prompt_action(session: &Session) -> String {
    match &session.prompt {
        Some(text) => {
            println!();
            print!("{text}");
            "Prompt shown above.".to_string()
        }
        None => "Generate a prompt first.".to_string(),
    }
}

fn save_prompt_action(session: &Session) -> Result<String> {
    let Some(text) = &session.prompt else {
        return Ok("Generate a prompt first before saving.".to_string());
    };
    let path: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Write prompt to")
        .with_initial_text("pagelens-prompt.txt")
        .interact_text()?;
    Ok(match std::fs::write(path.trim(), text) {
        Ok(()) => format!("Prompt written to {}.", path.trim()),
        Err(err) => format!("Error writing prompt: {err}"),
    })
}

async fn send_action(opts: &PanelOptions, session: &Session) -> String {
    if let Some(reason) = send_blocked_reason(session) {
        return reason.to_string();
    }
    let (Some(api_key), Some(prompt)) = (session.api_key.as_deref(), session.prompt.as_deref())
    else {
        return "Generate a prompt first.".to_string();
    };

    let client = match GeminiClient::new(&opts.model) {
        Ok(client) => client,
        Err(err) => return format!("Error during AI analysis: {err}"),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Sending prompt to {}...", opts.model));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = client.analyze(api_key, prompt).await;
    spinner.finish_and_clear();

    match result {
        Ok(analysis) => {
            println!();
            println!("{}", style("--- AI Analysis ---").bold());
            println!("{analysis}");
            "AI analysis complete.".to_string()
        }
        Err(err @ crate::errors::AiError::Timeout(_)) => {
            println!();
            println!("Error contacting AI:\n{err}");
            "Error: AI request timed out.".to_string()
        }
        Err(err) => {
            println!();
            println!("Error contacting AI:\n{err}");
            "Error during AI analysis.".to_string()
        }
    }
}

/// Why a send would be refused right now, if at all.
fn send_blocked_reason(session: &Session) -> Option<&'static str> {
    let has_key = session
        .api_key
        .as_deref()
        .is_some_and(|key| !key.trim().is_empty());
    if !has_key {
        return Some("API key required. Save your Gemini API key first.");
    }
    if !session.can_send() {
        return Some("Generate a prompt first.");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_blocked_without_key_even_with_prompt() {
        let session = Session {
            prompt: Some("prompt".to_string()),
            ..Default::default()
        };
        assert_eq!(
            send_blocked_reason(&session),
            Some("API key required. Save your Gemini API key first.")
        );
    }

    #[test]
    fn send_blocked_without_prompt() {
        let session = Session {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert_eq!(send_blocked_reason(&session), Some("Generate a prompt first."));
    }

    #[test]
    fn send_allowed_with_both() {
        let session = Session {
            api_key: Some("key".to_string()),
            prompt: Some("prompt".to_string()),
            ..Default::default()
        };
        assert_eq!(send_blocked_reason(&session), None);
    }
}
