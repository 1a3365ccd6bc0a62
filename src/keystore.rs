//! Credential store adapter.
//!
//! Persists exactly one opaque API key string in a TOML file under the
//! user configuration directory. Presence and absence are the only two
//! states anything else reasons about.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Overrides the credential directory (used by tests and CI).
pub const CONFIG_DIR_ENV: &str = "PAGELENS_CONFIG_DIR";

const CREDENTIALS_FILE: &str = "credentials.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

/// Handle on the credentials file.
#[derive(Debug, Clone)]
pub struct Keystore {
    path: PathBuf,
}

impl Keystore {
    /// Open the default store: `$PAGELENS_CONFIG_DIR/credentials.toml`,
    /// falling back to the platform config dir.
    pub fn open_default() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .context("Could not determine the user configuration directory")?
                .join("pagelens"),
        };
        Ok(Self {
            path: dir.join(CREDENTIALS_FILE),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved key. A missing file, a missing field, or a blank key
    /// all mean "absent".
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials file: {}", self.path.display()))?;
        let parsed: CredentialsFile = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse credentials file: {}", self.path.display()))?;
        Ok(parsed.api_key.filter(|key| !key.trim().is_empty()))
    }

    /// Save the key, creating the config directory as needed.
    pub fn store(&self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            bail!("API key cannot be empty");
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let raw = toml::to_string(&CredentialsFile {
            api_key: Some(key.to_string()),
        })
        .context("Failed to serialize credentials")?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Failed to write credentials file: {}", self.path.display()))
    }

    /// Remove the saved key. Clearing an absent key is not an error.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove credentials file: {}", self.path.display())
            })?;
        }
        Ok(())
    }
}
