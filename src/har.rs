//! HAR loading and network summarization.
//!
//! A HAR file is the structured network-activity log DevTools exports for a
//! page session. The summarizer reduces it to two bounded lists — failed
//! requests and slow requests — with an overflow counter when a list is
//! truncated. Loading fails closed: an absent or malformed file is an
//! explicit error, never an empty summary claiming zero issues.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Requests slower than this are noted.
pub const SLOW_THRESHOLD_MS: f64 = 1000.0;
/// Max error lines shown in the summary.
pub const MAX_ERROR_LINES: usize = 10;
/// Max slow-request lines shown in the summary.
pub const MAX_SLOW_LINES: usize = 10;
/// URLs longer than this are truncated for readability.
pub const MAX_URL_CHARS: usize = 100;

/// Top-level HAR document (subset of fields we care about).
#[derive(Debug, Deserialize)]
pub struct Har {
    pub log: HarLog,
}

#[derive(Debug, Deserialize)]
pub struct HarLog {
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HarEntry {
    pub request: HarRequest,
    pub response: HarResponse,
    /// Total elapsed time of the request, in milliseconds.
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, Deserialize)]
pub struct HarRequest {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct HarResponse {
    pub status: i64,
    #[serde(rename = "statusText", default)]
    pub status_text: String,
}

/// Load and parse a HAR file.
///
/// A file without a `log.entries` list is rejected here — the summarizer
/// never runs against data it could not actually retrieve.
pub fn load_har(path: &Path) -> Result<HarLog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read HAR file: {}", path.display()))?;
    let har: Har = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse HAR file (not valid HAR JSON): {}", path.display()))?;
    Ok(har.log)
}

/// Bounded summary of one HAR log.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkReport {
    pub total: usize,
    pub errors: Vec<String>,
    pub slow: Vec<String>,
}

/// Reduce a HAR log to error and slow-request lines.
pub fn summarize(log: &HarLog) -> NetworkReport {
    let mut errors = Vec::new();
    let mut slow = Vec::new();

    for entry in &log.entries {
        if entry.response.status >= 400 {
            errors.push(format!(
                "- {} {} ({} {})",
                entry.request.method,
                truncate_url(&entry.request.url),
                entry.response.status,
                entry.response.status_text
            ));
        }
        if entry.time > SLOW_THRESHOLD_MS {
            slow.push(format!(
                "- {} {} ({:.0}ms)",
                entry.request.method,
                truncate_url(&entry.request.url),
                entry.time
            ));
        }
    }

    NetworkReport {
        total: log.entries.len(),
        errors,
        slow,
    }
}

impl NetworkReport {
    /// Render the summary text shown to the user and embedded in the prompt.
    pub fn render(&self) -> String {
        let mut out = format!("Network Summary (Based on {} requests):\n", self.total);

        if self.errors.is_empty() {
            out.push_str("\nNo significant network errors (>=400) found.\n");
        } else {
            out.push_str(&format!("\nHTTP Errors (>=400) ({}):\n", self.errors.len()));
            out.push_str(&self.errors[..self.errors.len().min(MAX_ERROR_LINES)].join("\n"));
            if self.errors.len() > MAX_ERROR_LINES {
                out.push_str(&format!(
                    "\n(and {} more...)",
                    self.errors.len() - MAX_ERROR_LINES
                ));
            }
            out.push('\n');
        }

        if self.slow.is_empty() {
            out.push_str("\nNo particularly slow requests found.\n");
        } else {
            out.push_str(&format!(
                "\nSlow Requests (> {}ms) ({}):\n",
                SLOW_THRESHOLD_MS as u64,
                self.slow.len()
            ));
            out.push_str(&self.slow[..self.slow.len().min(MAX_SLOW_LINES)].join("\n"));
            if self.slow.len() > MAX_SLOW_LINES {
                out.push_str(&format!(
                    "\n(and {} more...)",
                    self.slow.len() - MAX_SLOW_LINES
                ));
            }
            out.push('\n');
        }

        out
    }
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() <= MAX_URL_CHARS {
        return url.to_string();
    }
    let head: String = url.chars().take(MAX_URL_CHARS - 3).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, url: &str, status: i64, status_text: &str, time: f64) -> HarEntry {
        HarEntry {
            request: HarRequest {
                method: method.to_string(),
                url: url.to_string(),
            },
            response: HarResponse {
                status,
                status_text: status_text.to_string(),
            },
            time,
        }
    }

    #[test]
    fn one_error_and_one_slow_line() {
        let log = HarLog {
            entries: vec![
                entry("GET", "https://api.example/users", 404, "Not Found", 120.0),
                entry("POST", "https://api.example/report", 200, "OK", 1500.0),
                entry("GET", "https://api.example/ok", 200, "OK", 90.0),
            ],
        };
        let report = summarize(&log);
        assert_eq!(report.total, 3);
        assert_eq!(report.errors, vec!["- GET https://api.example/users (404 Not Found)"]);
        assert_eq!(report.slow, vec!["- POST https://api.example/report (1500ms)"]);

        let text = report.render();
        assert!(text.contains("HTTP Errors (>=400) (1):"));
        assert!(text.contains("Slow Requests (> 1000ms) (1):"));
        assert!(!text.contains("more..."));
    }

    #[test]
    fn a_request_can_be_both_failed_and_slow() {
        let log = HarLog {
            entries: vec![entry("GET", "https://api.example/x", 500, "Internal Server Error", 2400.0)],
        };
        let report = summarize(&log);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.slow.len(), 1);
    }

    #[test]
    fn exactly_threshold_time_is_not_slow() {
        let log = HarLog {
            entries: vec![entry("GET", "https://api.example/x", 200, "OK", SLOW_THRESHOLD_MS)],
        };
        assert!(summarize(&log).slow.is_empty());
    }

    #[test]
    fn overflow_notice_iff_more_than_cap() {
        let at_cap = HarLog {
            entries: (0..MAX_ERROR_LINES)
                .map(|i| entry("GET", &format!("https://api.example/{i}"), 404, "Not Found", 1.0))
                .collect(),
        };
        assert!(!summarize(&at_cap).render().contains("more..."));

        let over_cap = HarLog {
            entries: (0..MAX_ERROR_LINES + 3)
                .map(|i| entry("GET", &format!("https://api.example/{i}"), 404, "Not Found", 1.0))
                .collect(),
        };
        let text = summarize(&over_cap).render();
        assert!(text.contains("(and 3 more...)"));
        // Displayed lines stay capped.
        let displayed = text.lines().filter(|l| l.starts_with("- ")).count();
        assert_eq!(displayed, MAX_ERROR_LINES);
    }

    #[test]
    fn long_urls_are_truncated() {
        let long_url = format!("https://api.example/{}", "a".repeat(120));
        let log = HarLog {
            entries: vec![entry("GET", &long_url, 404, "Not Found", 1.0)],
        };
        let line = summarize(&log).errors[0].clone();
        let shown = line
            .strip_prefix("- GET ")
            .and_then(|rest| rest.split(" (").next())
            .unwrap();
        assert_eq!(shown.chars().count(), MAX_URL_CHARS);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn empty_log_renders_both_no_issue_lines() {
        let report = summarize(&HarLog { entries: vec![] });
        let text = report.render();
        assert!(text.contains("Based on 0 requests"));
        assert!(text.contains("No significant network errors"));
        assert!(text.contains("No particularly slow requests"));
    }

    #[test]
    fn missing_entries_list_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.har");
        std::fs::write(&path, r#"{"log": {"version": "1.2"}}"#).unwrap();
        let err = load_har(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse HAR file"));
    }

    #[test]
    fn absent_file_fails_closed() {
        let err = load_har(Path::new("/nonexistent/trace.har")).unwrap_err();
        assert!(err.to_string().contains("Failed to read HAR file"));
    }
}
