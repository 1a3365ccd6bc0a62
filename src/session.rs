//! Panel session state.
//!
//! One explicit record owns everything a panel session collects. Nothing
//! here outlives the session except the credential, which the keystore
//! persists separately.

use crate::capture::LogEntry;

#[derive(Debug, Default)]
pub struct Session {
    pub api_key: Option<String>,
    pub logs: Vec<LogEntry>,
    pub network_summary: Option<String>,
    pub prompt: Option<String>,
}

impl Session {
    /// Sending is allowed only with a credential present and a generated,
    /// non-blank prompt.
    pub fn can_send(&self) -> bool {
        let has_key = self
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        let has_prompt = self
            .prompt
            .as_deref()
            .is_some_and(|prompt| !prompt.trim().is_empty());
        has_key && has_prompt
    }

    /// Drop collected data, keeping the credential.
    pub fn clear_collected(&mut self) {
        self.logs.clear();
        self.network_summary = None;
        self.prompt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::LogKind;
    use chrono::{TimeZone, Utc};

    fn session_with(key: Option<&str>, prompt: Option<&str>) -> Session {
        Session {
            api_key: key.map(str::to_string),
            prompt: prompt.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn send_disabled_without_credential_regardless_of_prompt() {
        assert!(!session_with(None, Some("a generated prompt")).can_send());
        assert!(!session_with(None, None).can_send());
    }

    #[test]
    fn send_disabled_without_prompt() {
        assert!(!session_with(Some("key"), None).can_send());
        assert!(!session_with(Some("key"), Some("   ")).can_send());
    }

    #[test]
    fn send_enabled_with_both() {
        assert!(session_with(Some("key"), Some("prompt")).can_send());
    }

    #[test]
    fn blank_credential_counts_as_absent() {
        assert!(!session_with(Some("  "), Some("prompt")).can_send());
    }

    #[test]
    fn clear_keeps_the_credential() {
        let mut session = session_with(Some("key"), Some("prompt"));
        session.network_summary = Some("summary".to_string());
        session.logs.push(LogEntry {
            kind: LogKind::Log,
            text: "x".to_string(),
            captured_at: Utc.timestamp_opt(0, 0).unwrap(),
        });

        session.clear_collected();

        assert!(session.logs.is_empty());
        assert_eq!(session.network_summary, None);
        assert_eq!(session.prompt, None);
        assert_eq!(session.api_key.as_deref(), Some("key"));
    }
}
