//! Persisted key/value settings document. The daemon treats it as read-only
//! beyond writing the defaults on first run; `get_config` just echoes it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub notification_enabled: bool,
    pub notification_sound: String,
    pub start_on_login: bool,
    pub show_in_dock: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notification_enabled: true,
            notification_sound: "default".to_string(),
            start_on_login: false,
            show_in_dock: false,
        }
    }
}

impl Settings {
    /// Loads the settings document, creating it with defaults when missing.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("invalid settings document at {path:?}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.save(path)?;
                info!("wrote default settings to {path:?}");
                Ok(settings)
            }
            Err(e) => Err(e).with_context(|| format!("failed to read settings at {path:?}")),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write settings at {path:?}"))
    }
}

/// Convenience over [Settings::load_or_init] keeping the origin path around.
pub struct SettingsFile {
    pub path: PathBuf,
    pub settings: Settings,
}

impl SettingsFile {
    pub fn load_or_init(path: PathBuf) -> Result<Self> {
        let settings = Settings::load_or_init(&path)?;
        Ok(Self { path, settings })
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let settings = Settings::load_or_init(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        // Round trip through the file it just wrote.
        let reread = Settings::load_or_init(&path).unwrap();
        assert_eq!(reread, settings);
    }

    #[test]
    fn unknown_and_missing_keys_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"notification_enabled": false, "future_knob": 42}"#,
        )
        .unwrap();

        let settings = Settings::load_or_init(&path).unwrap();
        assert!(!settings.notification_enabled);
        assert_eq!(settings.notification_sound, "default");
    }
}
