//! Works out where remote extraction should be sent.
//!
//! Priority: an `api`/`apiBase` parameter on the page URL (remembered for next
//! time), then the remembered value, then a host heuristic: loopback pages talk to
//! their own origin, anything else has no backend until one is configured.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, warn};

use crate::errors::{ExtractError, ExtractResult};
use crate::settings_store::{normalize_base, SettingsStore};

const OVERRIDE_KEYS: [&str; 2] = ["api", "apiBase"];
const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "0.0.0.0"];

#[derive(Debug, Clone)]
pub struct PageContext {
    url: Url,
}

impl PageContext {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("Invalid page URL {raw}"))?;
        Ok(Self { url })
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn is_loopback_host(&self) -> bool {
        let host = self.host();
        LOOPBACK_HOSTS.iter().any(|candidate| host.eq_ignore_ascii_case(candidate))
    }

    /// `?api=` / `?apiBase=`, then the same keys inside the fragment (`#api=`).
    pub fn api_override(&self) -> Option<String> {
        if let Some(found) = find_override(&self.url) {
            return Some(found);
        }
        let fragment = self.url.fragment()?;
        let as_query = Url::parse(&format!("http://fragment.invalid/?{fragment}")).ok()?;
        find_override(&as_query)
    }
}

fn find_override(url: &Url) -> Option<String> {
    OVERRIDE_KEYS.iter().find_map(|key| {
        url.query_pairs()
            .find(|(name, _)| name == key)
            .and_then(|(_, value)| normalize_base(&value))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Relative requests against the page's own origin.
    SameOrigin,
    Remote(String),
    NotConfigured,
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        !matches!(self, BackendConfig::NotConfigured)
    }

    pub fn base_for(&self, page: &PageContext) -> Option<String> {
        match self {
            BackendConfig::SameOrigin => Some(page.origin()),
            BackendConfig::Remote(base) => Some(base.clone()),
            BackendConfig::NotConfigured => None,
        }
    }
}

pub struct BackendResolver {
    store: Arc<dyn SettingsStore>,
}

impl BackendResolver {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn resolve(&self, page: &PageContext) -> BackendConfig {
        if let Some(base) = page.api_override() {
            if let Err(err) = self.store.save_api_base(&base) {
                warn!(error = %format!("{err:#}"), "could not remember backend override");
            }
            debug!(%base, "backend taken from page URL");
            return BackendConfig::Remote(base);
        }

        if let Some(base) = self.store.load_api_base() {
            debug!(%base, "backend taken from saved settings");
            return BackendConfig::Remote(base);
        }

        if page.is_loopback_host() {
            debug!(host = page.host(), "loopback page, using same origin backend");
            BackendConfig::SameOrigin
        } else {
            debug!(host = page.host(), "no backend configured");
            BackendConfig::NotConfigured
        }
    }
}

/// A secure page must not call a plain-http backend.
pub fn is_insecure_mixed_content(page: &PageContext, base: &str) -> bool {
    page.is_secure() && base.trim_start().to_ascii_lowercase().starts_with("http://")
}

/// Rejects unusable backends before any request is built, returning the base otherwise.
pub fn usable_base(page: &PageContext, config: &BackendConfig) -> ExtractResult<String> {
    let base = config.base_for(page).ok_or(ExtractError::BackendNotConfigured)?;
    if is_insecure_mixed_content(page, &base) {
        return Err(ExtractError::MixedContentBlocked { base });
    }
    Ok(base)
}

pub fn endpoint_candidates(base: &str, paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            if path.starts_with('/') {
                format!("{base}{path}")
            } else {
                format!("{base}/{path}")
            }
        })
        .collect()
}
