//! Persistent settings with environment overrides.
//!
//! Stored as JSON under the user config directory. Every field has a
//! serde default so older files keep loading as fields are added.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the transcription server
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Selected microphone device name (None = system default)
    #[serde(default)]
    pub input_device: Option<String>,

    /// Spoken language hint for the local engine
    #[serde(default = "default_language")]
    pub language: String,

    /// Model pack used by live mode
    #[serde(default = "default_pack")]
    pub pack: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_pack() -> String {
    crate::engine::pack::DEFAULT_PACK.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            input_device: None,
            language: default_language(),
            pack: default_pack(),
        }
    }
}

impl Settings {
    /// Path of the settings file (`<config_dir>/murmur/settings.json`).
    pub fn path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("murmur").join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults when the file
    /// does not exist yet. Environment overrides are applied on top.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        let mut settings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings at {}", path.display()))?
        } else {
            Self::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Save settings to disk. Writes to a temp file in the same directory
    /// and renames it into place so a crash cannot leave a torn file.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, contents)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to move settings into {}", path.display()))?;

        Ok(())
    }

    /// MURMUR_* environment variables win over the file contents.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("MURMUR_SERVER_URL")
            && !url.is_empty()
        {
            self.server_url = url;
        }
        if let Ok(device) = std::env::var("MURMUR_INPUT_DEVICE")
            && !device.is_empty()
        {
            self.input_device = Some(device);
        }
        if let Ok(language) = std::env::var("MURMUR_LANGUAGE")
            && !language.is_empty()
        {
            self.language = language;
        }
        if let Ok(pack) = std::env::var("MURMUR_PACK")
            && !pack.is_empty()
        {
            self.pack = pack;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, "http://127.0.0.1:5000");
        assert_eq!(settings.language, "en");
        assert_eq!(settings.pack, "small");
        assert!(settings.input_device.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"language": "de"}"#).unwrap();
        assert_eq!(settings.language, "de");
        assert_eq!(settings.server_url, default_server_url());
        assert_eq!(settings.pack, default_pack());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let settings: Settings =
            serde_json::from_str(r#"{"server_url": "http://10.0.0.2:5000", "theme": "dark"}"#)
                .unwrap();
        assert_eq!(settings.server_url, "http://10.0.0.2:5000");
    }

    #[test]
    fn test_roundtrip() {
        let mut settings = Settings::default();
        settings.input_device = Some("pipewire".to_string());
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.input_device.as_deref(), Some("pipewire"));
        assert_eq!(back.server_url, settings.server_url);
    }

    #[test]
    fn test_env_overrides_win() {
        let mut settings = Settings::default();
        // SAFETY: no other test reads these variables.
        unsafe {
            std::env::set_var("MURMUR_LANGUAGE", "nl");
            std::env::set_var("MURMUR_SERVER_URL", "");
        }
        settings.apply_env_overrides();
        // SAFETY: see above.
        unsafe {
            std::env::remove_var("MURMUR_LANGUAGE");
            std::env::remove_var("MURMUR_SERVER_URL");
        }

        assert_eq!(settings.language, "nl");
        // empty values do not clobber the configured one
        assert_eq!(settings.server_url, default_server_url());
    }
}
