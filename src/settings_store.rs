use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub trait SettingsStore: Send + Sync {
    fn load_api_base(&self) -> Option<String>;
    fn save_api_base(&self, base: &str) -> Result<()>;
}

#[derive(Default, Serialize, Deserialize)]
struct ReaderSettingsFile {
    api_base: Option<String>,
}

/// JSON file store, e.g. `~/.config/clickreader/settings.json`.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_file(&self) -> Option<ReaderSettingsFile> {
        let body = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&body).ok()
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load_api_base(&self) -> Option<String> {
        let parsed = self.read_file()?;
        normalize_base(&parsed.api_base?)
    }

    fn save_api_base(&self, base: &str) -> Result<()> {
        let base = normalize_base(base).ok_or_else(|| anyhow!("Backend base cannot be empty"))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let mut settings = self.read_file().unwrap_or_default();
        settings.api_base = Some(base);
        let serialized = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings file {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    api_base: Mutex<Option<String>>,
}

impl MemorySettingsStore {
    pub fn with_api_base(base: &str) -> Self {
        Self {
            api_base: Mutex::new(normalize_base(base)),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_api_base(&self) -> Option<String> {
        self.api_base.lock().ok()?.clone()
    }

    fn save_api_base(&self, base: &str) -> Result<()> {
        let mut guard = self.api_base.lock().map_err(|_| anyhow!("Settings lock poisoned"))?;
        *guard = normalize_base(base);
        Ok(())
    }
}

/// Trims whitespace and a trailing slash; empty means unset.
pub fn normalize_base(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
