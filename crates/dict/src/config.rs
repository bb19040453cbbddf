use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::warn;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_SIZE, DEFAULT_TTL};

pub const SETTINGS_FILE: &str = "crud.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DictSettings {
    pub cache_max_entries: usize,
    pub cache_max_size: usize,
    pub cache_ttl_seconds: u64,
    /// Base url that relative dictionary urls are resolved against.
    pub request_base_url: Option<String>,
}

impl Default for DictSettings {
    fn default() -> Self {
        Self {
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            cache_max_size: DEFAULT_MAX_SIZE,
            cache_ttl_seconds: DEFAULT_TTL.as_secs(),
            request_base_url: None,
        }
    }
}

impl DictSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    dict: DictSettings,
}

pub fn load_settings() -> DictSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Reads `[dict]` from `path` when present, then applies `CRUD_*` and
/// `APP__*` environment overrides (the latter win).
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> DictSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw).unwrap_or_else(|| {
            warn!(path = %path.display(), "ignoring unreadable settings file");
            DictSettings::default()
        }),
        Err(_) => DictSettings::default(),
    };

    for key in ["CRUD_DICT_CACHE_MAX_ENTRIES", "APP__DICT_CACHE_MAX_ENTRIES"] {
        if let Some(v) = env(key).and_then(|v| v.parse().ok()) {
            settings.cache_max_entries = v;
        }
    }
    for key in ["CRUD_DICT_CACHE_MAX_SIZE", "APP__DICT_CACHE_MAX_SIZE"] {
        if let Some(v) = env(key).and_then(|v| v.parse().ok()) {
            settings.cache_max_size = v;
        }
    }
    for key in ["CRUD_DICT_CACHE_TTL_SECONDS", "APP__DICT_CACHE_TTL_SECONDS"] {
        if let Some(v) = env(key).and_then(|v| v.parse().ok()) {
            settings.cache_ttl_seconds = v;
        }
    }
    for key in ["CRUD_DICT_BASE_URL", "APP__DICT_BASE_URL"] {
        if let Some(v) = env(key) {
            settings.request_base_url = Some(v);
        }
    }

    settings
}

fn parse_settings(raw: &str) -> Option<DictSettings> {
    toml::from_str::<SettingsFile>(raw)
        .map(|file| file.dict)
        .ok()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
