//! Deterministic prompt assembly.
//!
//! [`build_prompt`] is a pure function of the collected data: identical
//! inputs always produce a byte-identical prompt, so the output is
//! golden-testable. The prompt is recreated in full on every call, never
//! patched incrementally.

use chrono::SecondsFormat;

use crate::capture::LogEntry;

/// Character budget for the log section. When the joined log text is
/// larger, the section keeps exactly the trailing budget-many characters —
/// the most recent activity is assumed most relevant.
pub const LOG_CHAR_BUDGET: usize = 2500;

pub const NO_LOGS_PLACEHOLDER: &str = "(No significant console logs captured or provided)";
pub const NO_NETWORK_PLACEHOLDER: &str = "(No network summary available or collected)";

/// Instructional preamble describing the analysis task.
pub const PREAMBLE: &str = r#"You are an AI debugging assistant specialized in analyzing web application issues using Chrome DevTools data. Analyze the following Console Logs and Network Summary.

Your goal is to:
1.  Identify potential errors, exceptions, or significant warnings in the logs.
2.  Correlate logs with network errors (e.g., a console error occurring after a 4xx/5xx request).
3.  Summarize the most likely underlying problem(s).
4.  Suggest concrete, actionable next steps for the developer to fix the issue or investigate further. Examples: "Check if the variable 'X' is defined before use in component Y", "Inspect the response body of the failing network request Z", "Add console.log statements in function A to trace the value of B".
5.  If the data is insufficient, state what additional information or debugging steps would be helpful.

"#;

/// Fixed closing request.
pub const ANALYSIS_REQUEST: &str =
    "Please provide your analysis based *only* on the information above, following the goals outlined.\n";

/// Render one log entry the way it appears in the prompt and the log view.
pub fn render_log_line(entry: &LogEntry) -> String {
    format!(
        "[{}] {}: {}",
        entry.kind,
        entry.captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        entry.text
    )
}

/// Assemble the full prompt from collected logs and the network summary.
pub fn build_prompt(logs: &[LogEntry], network: Option<&str>) -> String {
    let mut prompt = String::from(PREAMBLE);

    prompt.push_str("--- CONSOLE LOGS ---\n");
    if logs.is_empty() {
        prompt.push_str(NO_LOGS_PLACEHOLDER);
        prompt.push('\n');
    } else {
        let joined = logs
            .iter()
            .map(render_log_line)
            .collect::<Vec<_>>()
            .join("\n");
        let length = joined.chars().count();
        if length > LOG_CHAR_BUDGET {
            let tail: String = joined.chars().skip(length - LOG_CHAR_BUDGET).collect();
            prompt.push_str(&format!(
                "(Showing last ~{LOG_CHAR_BUDGET} characters of {} logs)\n...\n",
                logs.len()
            ));
            prompt.push_str(&tail);
        } else {
            prompt.push_str(&joined);
        }
    }
    prompt.push_str("\n\n");

    prompt.push_str("--- NETWORK SUMMARY ---\n");
    match network {
        Some(summary) if summary_has_content(summary) => prompt.push_str(summary),
        _ => {
            prompt.push_str(NO_NETWORK_PLACEHOLDER);
            prompt.push('\n');
        }
    }
    prompt.push_str("\n\n");

    prompt.push_str("--- ANALYSIS REQUEST ---\n");
    prompt.push_str(ANALYSIS_REQUEST);

    prompt
}

/// A summary that is empty or a bare header carries no findings and is
/// replaced by the placeholder.
pub fn summary_has_content(summary: &str) -> bool {
    let trimmed = summary.trim();
    !trimmed.is_empty() && trimmed != "Network Summary:"
}
