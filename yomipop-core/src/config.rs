//! Settings
//!
//! User-configurable settings for the hover dictionary. Default values are
//! defined in `config/default.toml`; a user file is merged on top of them.
//! Stages never read a global: they receive a [`ConfigHandle`] and take an
//! immutable snapshot per iteration, so a reapply takes effect on the next
//! trigger without restarting the pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capture::RegionSelection;

/// Default configuration TOML embedded from config/default.toml
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Bounds for `lookup.max_length`.
const MIN_LOOKUP_LENGTH: usize = 5;
const MAX_LOOKUP_LENGTH: usize = 100;

/// Configuration settings for the hover dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub input: InputSettings,
    pub scan: ScanSettings,
    pub lookup: LookupSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    /// Modifier key that arms the hover lookup.
    #[serde(default)]
    pub hotkey: Hotkey,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hotkey {
    #[default]
    Shift,
    Ctrl,
    Alt,
}

/// Capture and OCR settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// `"region"` for a user-selected rectangle, or a screen index.
    pub region: String,
    /// OCR upload quality hint.
    #[serde(default)]
    pub quality: QualityMode,
    /// Continuous scanning without holding the hotkey.
    pub auto: bool,
    /// Minimum seconds between OCR submissions in auto mode.
    pub auto_interval_seconds: f64,
}

impl ScanSettings {
    /// The region the capturer starts with. A screen index maps directly;
    /// `"region"` (or anything unparseable) starts on the primary screen
    /// until the region-selection collaborator calls in with a rectangle.
    pub fn initial_region(&self) -> RegionSelection {
        match self.region.parse::<usize>() {
            Ok(index) => RegionSelection::Screen(index),
            Err(_) => RegionSelection::Screen(0),
        }
    }
}

/// Image quality traded against OCR round-trip latency.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    #[default]
    Fast,
    Balanced,
    Quality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Longest lookup string considered, in characters.
    pub max_length: usize,
    /// Path to the compiled dictionary (defaults to data_dir/yomipop.dict).
    pub dict_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("embedded default.toml must be valid")
    }
}

/// Recursively merge `overlay` TOML values on top of `base`.
fn merge_toml(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key.clone(), value.clone());
                }
            }
        }
        (base, _) => {
            *base = overlay.clone();
        }
    }
}

/// Parse user TOML content merged on top of default.toml.
fn parse_with_defaults(user_content: &str) -> Result<Settings> {
    let mut base: toml::Value = toml::from_str(DEFAULT_CONFIG_TOML)?;
    let user: toml::Value = toml::from_str(user_content)?;
    merge_toml(&mut base, &user);
    let mut settings: Settings = base.try_into()?;
    settings.normalize();
    Ok(settings)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "yomipop", "yomipop")
}

impl Settings {
    /// Clamp values into their valid ranges.
    fn normalize(&mut self) {
        self.lookup.max_length = self
            .lookup
            .max_length
            .clamp(MIN_LOOKUP_LENGTH, MAX_LOOKUP_LENGTH);
        if !self.scan.auto_interval_seconds.is_finite() || self.scan.auto_interval_seconds < 0.0 {
            self.scan.auto_interval_seconds = 0.0;
        }
    }

    /// Get the data directory path
    pub fn data_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Resolved dictionary path: the configured one, or the default
    /// location in the data directory.
    pub fn dict_path(&self) -> Option<PathBuf> {
        match &self.lookup.dict_path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::data_dir().map(|dir| dir.join("yomipop.dict")),
        }
    }

    /// Load settings from the default configuration file.
    /// Falls back to embedded default.toml if the config file does not exist.
    pub fn load() -> Result<Self> {
        let Some(config_file) = Self::config_file() else {
            warn!("Could not determine config directory, using defaults");
            return Ok(Self::default());
        };

        if !config_file.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!("Loading config from {:?}", config_file);
        let content = fs::read_to_string(&config_file)?;
        parse_with_defaults(&content)
    }

    /// Load settings from a specific file, merged on top of defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        parse_with_defaults(&content)
    }

    /// Save settings to the default configuration file
    pub fn save(&self) -> Result<()> {
        let Some(config_file) = Self::config_file() else {
            anyhow::bail!("Could not determine config directory");
        };

        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("Saving config to {:?}", config_file);
        let content = toml::to_string_pretty(self)?;
        fs::write(&config_file, content)?;
        Ok(())
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Shared handle to the active settings.
///
/// Readers take a cheap [`Arc`] snapshot; `reapply` swaps the whole
/// snapshot atomically, so a reader never observes a half-updated config.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<Settings>>>,
}

impl ConfigHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn reapply(&self, settings: Settings) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Arc::new(settings);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.input.hotkey, Hotkey::Shift);
        assert_eq!(settings.scan.quality, QualityMode::Fast);
        assert_eq!(settings.lookup.max_length, 25);
        assert!(!settings.scan.auto);
    }

    #[test]
    fn test_serialize_deserialize() {
        let settings = Settings::default();
        let toml_str = toml::to_string(&settings).unwrap();
        let loaded: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(loaded.lookup.max_length, settings.lookup.max_length);
    }

    #[test]
    fn test_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scan]
quality = "balanced"
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.scan.quality, QualityMode::Balanced);
        // unspecified values come from defaults
        assert_eq!(settings.input.hotkey, Hotkey::Shift);
        assert_eq!(settings.lookup.max_length, 25);
    }

    #[test]
    fn test_max_length_clamped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[lookup]
max_length = 3
"#
        )
        .unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.lookup.max_length, 5);

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[lookup]
max_length = 5000
"#
        )
        .unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.lookup.max_length, 100);
    }

    #[test]
    fn test_negative_interval_clamped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[scan]
auto_interval_seconds = -2.5
"#
        )
        .unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.scan.auto_interval_seconds, 0.0);
    }

    #[test]
    fn test_initial_region() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.scan.initial_region(),
            crate::capture::RegionSelection::Screen(0)
        );
        settings.scan.region = "1".to_string();
        assert_eq!(
            settings.scan.initial_region(),
            crate::capture::RegionSelection::Screen(1)
        );
    }

    #[test]
    fn test_hotkey_parsing() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[input]
hotkey = "alt"
"#
        )
        .unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.input.hotkey, Hotkey::Alt);
    }

    #[test]
    fn test_config_handle_reapply() {
        let handle = ConfigHandle::new(Settings::default());
        assert!(!handle.snapshot().scan.auto);

        let mut updated = Settings::default();
        updated.scan.auto = true;
        handle.reapply(updated);
        assert!(handle.snapshot().scan.auto);
    }
}
