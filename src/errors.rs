//! Typed error hierarchy for pagelens.
//!
//! Two top-level enums cover the two fallible boundaries:
//! - `InspectError` — page inspection failures (target discovery, the
//!   devtools socket, evaluation in the inspected page)
//! - `AiError` — remote generation API failures (transport, HTTP, timeout)
//!
//! Credential storage uses `anyhow` context chains at the call sites, and a
//! semantically non-successful AI completion (safety block, empty candidate)
//! is surfaced as descriptive text rather than an error.

use thiserror::Error;

/// Errors at the inspected-page boundary.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Failed to reach the inspection endpoint: {0}")]
    Discovery(#[source] reqwest::Error),

    #[error("No debuggable page target found at the inspection endpoint")]
    NoTarget,

    #[error("Failed to connect to the page's devtools socket: {0}")]
    Connect(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("Devtools protocol error: {0}")]
    Protocol(String),

    #[error("Evaluation failed in the inspected page: {0}")]
    Eval(String),

    #[error("Devtools call timed out")]
    Timeout,
}

/// Errors from the remote generation API call.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI request timed out after {0} seconds")]
    Timeout(u64),

    /// HTTP-level failure. `detail` already carries the best available
    /// human-readable description (parsed error body, raw text, or status).
    #[error("{detail}")]
    Api { status: u16, detail: String },

    #[error("Failed to send request to the generation API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to parse the generation API response: {0}")]
    Decode(#[source] reqwest::Error),
}
