//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lotbook_core::models::{SyncSettings, DEFAULT_API_BASE_URL, DEFAULT_SNAPSHOT_FILENAME};
use serde::{Deserialize, Serialize};

pub use lotbook_core::util::{is_http_url, normalize_text_option};

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

/// Where one profile syncs to. The token lives in the keychain, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub gist_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub api_base_url: Option<String>,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("lotbook").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) =
            normalize_profile_name(std::env::var("LOTBOOK_PROFILE").ok().as_deref())
        {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    pub fn gist_id(&self) -> Option<String> {
        normalize_text_option(self.gist_id.clone())
    }

    pub fn filename(&self) -> String {
        normalize_text_option(self.filename.clone())
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_FILENAME.to_string())
    }

    pub fn api_base_url(&self) -> String {
        normalize_text_option(self.api_base_url.clone())
            .map_or_else(|| DEFAULT_API_BASE_URL.to_string(), |url| {
                url.trim_end_matches('/').to_string()
            })
    }

    /// Sync settings for this profile with the given session token.
    pub fn sync_settings(&self, token: Option<String>) -> SyncSettings {
        SyncSettings {
            gist_id: self.gist_id(),
            filename: self.filename(),
            token,
            api_base_url: self.api_base_url(),
            ..SyncSettings::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = normalize_text_option(self.api_base_url.clone()) {
            if !is_http_url(&url) {
                return Err("api_base_url must include http:// or https://".to_string());
            }
        }
        if let Some(filename) = normalize_text_option(self.filename.clone()) {
            if filename.contains('/') {
                return Err("filename must not contain '/'".to_string());
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.gist_id = normalize_text_option(self.gist_id.clone());
        self.filename = normalize_text_option(self.filename.clone());
        self.api_base_url = normalize_text_option(self.api_base_url.clone());
    }
}
