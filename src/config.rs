use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_CONTENT_CHARS: usize = 16;
pub const DEFAULT_LONG_PRESS_MS: u64 = 450;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const PRIMARY_PARSE_PATH: &str = "/api/parse";
pub const SECONDARY_PARSE_PATH: &str = "/parse";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// BCP-47 language hint used when picking a voice, e.g. `en-GB`.
    pub lang: String,
    pub rate: f32,
    /// Explicit voice name; `None` means pick automatically.
    pub voice: Option<String>,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            lang: "en-GB".to_string(),
            rate: 1.0,
            voice: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// In-process extraction must produce more than this many characters of
    /// normalized text to count as real content.
    pub min_content_chars: usize,
    pub long_press_ms: u64,
    /// Parse endpoints tried in order against the backend base.
    pub backend_paths: Vec<String>,
    pub request_timeout_secs: u64,
    /// Where the persisted backend override lives. `None` keeps it in memory.
    pub settings_path: Option<PathBuf>,
    pub speech: SpeechSettings,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            backend_paths: vec![PRIMARY_PARSE_PATH.to_string(), SECONDARY_PARSE_PATH.to_string()],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            settings_path: None,
            speech: SpeechSettings::default(),
        }
    }
}

impl ReaderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ReaderConfig = serde_json::from_str(&body)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend_paths.iter().all(|path| path.trim().is_empty()) {
            bail!("backend_paths must list at least one parse endpoint");
        }
        Ok(())
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
