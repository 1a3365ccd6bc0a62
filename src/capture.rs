//! Bounded console log capture.
//!
//! Console output from the inspected page arrives as devtools
//! `Runtime.consoleAPICalled` events. Each call's arguments are rendered to
//! a single joined text line and appended to a [`ConsoleBuffer`], which
//! enforces a hard entry cap: once the cap is reached a single `system`
//! marker entry is appended and everything after it is dropped. The page's
//! own console behavior is never touched — the observer is passive.
//!
//! The same `LogEntry` shape round-trips through JSON lines, so prompts can
//! also be built from logs exported out of a previous session.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cdp::RemoteObject;

/// Hard ceiling on buffered entries. Not a sliding window: once reached, a
/// single marker entry is appended and further output is dropped.
pub const MAX_LOG_ENTRIES: usize = 200;

/// Ceiling on a single rendered entry, in characters.
pub const MAX_ENTRY_CHARS: usize = 1000;

/// Text of the synthetic entry appended when the cap is hit.
pub const LIMIT_MARKER: &str = "Log limit reached.";

/// Category of a captured console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Log,
    Warn,
    Error,
    /// Synthetic entries emitted by the capture machinery itself.
    System,
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LogKind::Log => "LOG",
            LogKind::Warn => "WARN",
            LogKind::Error => "ERROR",
            LogKind::System => "SYSTEM",
        };
        write!(f, "{label}")
    }
}

/// One captured console entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

/// Map a devtools console call type to a log kind.
///
/// The protocol reports many call types (`info`, `debug`, `table`, ...);
/// everything that is not a warning or an error is treated as a plain log.
pub fn kind_from_console_type(call_type: &str) -> LogKind {
    match call_type {
        "warning" => LogKind::Warn,
        "error" | "assert" => LogKind::Error,
        _ => LogKind::Log,
    }
}

/// Render the arguments of one console call into a single joined line.
///
/// Per-argument policy:
/// - DOM node → `[DOM Element]`
/// - function → `[Function]`
/// - error-like → its stack trace (the remote `description`), falling back
///   to a generic marker
/// - any other object → structured JSON text, falling back to
///   `[Unserializable Object]` when no serializable value was delivered
/// - everything else → its plain text form
pub fn render_console_args(args: &[RemoteObject]) -> String {
    args.iter()
        .map(render_arg)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_arg(arg: &RemoteObject) -> String {
    if arg.subtype.as_deref() == Some("node") {
        return "[DOM Element]".to_string();
    }
    if arg.kind == "function" {
        return "[Function]".to_string();
    }
    if arg.subtype.as_deref() == Some("error") {
        // `description` carries the stack trace when one exists.
        return arg
            .description
            .clone()
            .unwrap_or_else(|| "[Error]".to_string());
    }
    if arg.kind == "object" {
        if let Some(value) = &arg.value {
            if let Ok(json) = serde_json::to_string(value) {
                return json;
            }
        }
        return arg
            .description
            .clone()
            .unwrap_or_else(|| "[Unserializable Object]".to_string());
    }
    match &arg.value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => arg
            .description
            .clone()
            .unwrap_or_else(|| arg.kind.clone()),
    }
}

/// Bounded, ordered buffer of captured console entries.
#[derive(Debug, Default)]
pub struct ConsoleBuffer {
    entries: Vec<LogEntry>,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry, applying the cap policy: entries accumulate up to
    /// [`MAX_LOG_ENTRIES`]; the cap-reaching call is replaced by exactly one
    /// `system` marker; everything after that is dropped. The buffer length
    /// therefore never exceeds `MAX_LOG_ENTRIES + 1`.
    pub fn push(&mut self, kind: LogKind, text: String, captured_at: DateTime<Utc>) {
        if self.entries.len() < MAX_LOG_ENTRIES {
            self.entries.push(LogEntry {
                kind,
                text: bound_entry_text(&text),
                captured_at,
            });
        } else if self.entries.len() == MAX_LOG_ENTRIES {
            self.entries.push(LogEntry {
                kind: LogKind::System,
                text: LIMIT_MARKER.to_string(),
                captured_at,
            });
        }
        // Past the marker: accepted by the page console, not captured.
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the buffered entries out in capture order.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn bound_entry_text(text: &str) -> String {
    if text.chars().count() <= MAX_ENTRY_CHARS {
        return text.to_string();
    }
    // Ellipsis included in the bound, so a captured entry always satisfies
    // the import-time check in `parse_log_export`.
    let bounded: String = text.chars().take(MAX_ENTRY_CHARS - 3).collect();
    format!("{bounded}...")
}

/// Parse a JSON-lines export of captured console entries.
///
/// Fails closed: a malformed line, an over-long entry, or an export larger
/// than the capture buffer could ever have produced rejects the whole file.
pub fn parse_log_export(raw: &str) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(line)
            .with_context(|| format!("Invalid log entry on line {}", index + 1))?;
        if entry.text.chars().count() > MAX_ENTRY_CHARS {
            bail!(
                "Log entry on line {} exceeds {} characters",
                index + 1,
                MAX_ENTRY_CHARS
            );
        }
        entries.push(entry);
    }
    if entries.len() > MAX_LOG_ENTRIES + 1 {
        bail!(
            "Log export contains {} entries; a capture session holds at most {}",
            entries.len(),
            MAX_LOG_ENTRIES + 1
        );
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn remote(kind: &str, subtype: Option<&str>, value: Option<serde_json::Value>, description: Option<&str>) -> RemoteObject {
        RemoteObject {
            kind: kind.to_string(),
            subtype: subtype.map(str::to_string),
            value,
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn buffer_never_exceeds_cap_plus_marker() {
        let mut buffer = ConsoleBuffer::new();
        for i in 0..500 {
            buffer.push(LogKind::Log, format!("entry {i}"), at(i));
        }
        assert_eq!(buffer.len(), MAX_LOG_ENTRIES + 1);
        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.last().unwrap().kind, LogKind::System);
        assert_eq!(snapshot.last().unwrap().text, LIMIT_MARKER);
        // Exactly one marker.
        let markers = snapshot.iter().filter(|e| e.kind == LogKind::System).count();
        assert_eq!(markers, 1);
        // The entry before the marker is the cap-th real entry.
        assert_eq!(snapshot[MAX_LOG_ENTRIES - 1].text, format!("entry {}", MAX_LOG_ENTRIES - 1));
    }

    #[test]
    fn buffer_under_cap_has_no_marker() {
        let mut buffer = ConsoleBuffer::new();
        for i in 0..5 {
            buffer.push(LogKind::Warn, format!("w{i}"), at(i));
        }
        assert_eq!(buffer.len(), 5);
        assert!(buffer.snapshot().iter().all(|e| e.kind == LogKind::Warn));
    }

    #[test]
    fn oversized_entry_is_bounded_with_ellipsis() {
        let mut buffer = ConsoleBuffer::new();
        buffer.push(LogKind::Log, "x".repeat(MAX_ENTRY_CHARS + 50), at(0));
        let text = &buffer.snapshot()[0].text;
        assert_eq!(text.chars().count(), MAX_ENTRY_CHARS);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn bounded_capture_reimports_cleanly() {
        let mut buffer = ConsoleBuffer::new();
        buffer.push(LogKind::Log, "x".repeat(MAX_ENTRY_CHARS + 50), at(0));
        buffer.push(LogKind::Error, "boom".to_string(), at(1));

        let export: String = buffer
            .snapshot()
            .iter()
            .map(|e| serde_json::to_string(e).unwrap() + "\n")
            .collect();
        let entries = parse_log_export(&export).unwrap();
        assert_eq!(entries, buffer.snapshot());
    }

    #[test]
    fn dom_node_and_function_collapse_to_placeholders() {
        let args = vec![
            remote("object", Some("node"), None, Some("div#app")),
            remote("function", None, None, Some("function f() {}")),
        ];
        assert_eq!(render_console_args(&args), "[DOM Element] [Function]");
    }

    #[test]
    fn error_argument_prefers_stack_trace() {
        let args = vec![remote(
            "object",
            Some("error"),
            None,
            Some("TypeError: boom\n    at main.js:3:1"),
        )];
        assert_eq!(render_console_args(&args), "TypeError: boom\n    at main.js:3:1");
    }

    #[test]
    fn plain_object_serializes_to_json() {
        let args = vec![remote(
            "object",
            None,
            Some(serde_json::json!({"a": 1})),
            None,
        )];
        assert_eq!(render_console_args(&args), "{\"a\":1}");
    }

    #[test]
    fn valueless_object_falls_back_to_placeholder() {
        let args = vec![remote("object", None, None, None)];
        assert_eq!(render_console_args(&args), "[Unserializable Object]");
    }

    #[test]
    fn scalars_join_with_single_space() {
        let args = vec![
            remote("string", None, Some(serde_json::json!("loading")), None),
            remote("number", None, Some(serde_json::json!(42)), None),
            remote("boolean", None, Some(serde_json::json!(true)), None),
            remote("undefined", None, None, None),
        ];
        assert_eq!(render_console_args(&args), "loading 42 true undefined");
    }

    #[test]
    fn console_type_mapping() {
        assert_eq!(kind_from_console_type("log"), LogKind::Log);
        assert_eq!(kind_from_console_type("info"), LogKind::Log);
        assert_eq!(kind_from_console_type("warning"), LogKind::Warn);
        assert_eq!(kind_from_console_type("error"), LogKind::Error);
        assert_eq!(kind_from_console_type("assert"), LogKind::Error);
    }

    #[test]
    fn log_export_roundtrip() {
        let raw = r#"{"kind":"error","text":"boom","capturedAt":"2025-03-01T12:00:00Z"}
{"kind":"log","text":"ok","capturedAt":"2025-03-01T12:00:01Z"}"#;
        let entries = parse_log_export(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, LogKind::Error);
        assert_eq!(entries[1].text, "ok");
    }

    #[test]
    fn log_export_rejects_malformed_line() {
        let raw = "{\"kind\":\"log\"";
        let err = parse_log_export(raw).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn log_export_rejects_overlong_entry() {
        let raw = format!(
            "{{\"kind\":\"log\",\"text\":\"{}\",\"capturedAt\":\"2025-03-01T12:00:00Z\"}}",
            "y".repeat(MAX_ENTRY_CHARS + 1)
        );
        let err = parse_log_export(&raw).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn log_export_rejects_impossible_entry_count() {
        let mut raw = String::new();
        for i in 0..(MAX_LOG_ENTRIES + 2) {
            raw.push_str(&format!(
                "{{\"kind\":\"log\",\"text\":\"e{i}\",\"capturedAt\":\"2025-03-01T12:00:00Z\"}}\n"
            ));
        }
        assert!(parse_log_export(&raw).is_err());
    }
}
