use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::bitrate;
use crate::error::CompressError;
use crate::options::QualityPreset;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Settings file contents. Loaded once at startup and never written back.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_settings: DefaultSettings,
    pub profiles: HashMap<String, Profile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    pub target_size_mb: f64,
    pub quality_preset: QualityPreset,
    pub audio_bitrate: String,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        DefaultSettings {
            target_size_mb: 45.0,
            quality_preset: QualityPreset::Medium,
            audio_bitrate: "128k".to_string(),
        }
    }
}

/// A named bundle of overrides. Fields left out of the file fall through to
/// the defaults, one field at a time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub target_size_mb: Option<f64>,
    pub quality_preset: Option<QualityPreset>,
    pub description: String,
}

/// The effective settings for one invocation after CLI flags, profile, and
/// file defaults are merged.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub target_size_mb: f64,
    pub quality_preset: QualityPreset,
    pub audio_bitrate_bps: u64,
}

impl Config {
    /// Loads the settings file, looking next to the executable when no path
    /// is given. A missing or unparseable file is never fatal: the built-in
    /// defaults keep the tool usable.
    pub fn load(path: Option<&Path>) -> Config {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => {
                    debug!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Ignoring unparseable config file {:?}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                debug!("No config file at {:?} ({}), using defaults", path, e);
                Config::default()
            }
        }
    }

    pub fn resolve_profile(&self, name: &str) -> Result<&Profile, CompressError> {
        self.profiles
            .get(name)
            .ok_or_else(|| CompressError::UnknownProfile(name.to_string()))
    }

    /// Merges settings field by field: explicit CLI flags win, then the named
    /// profile, then the file's defaults.
    pub fn resolve(
        &self,
        profile_name: Option<&str>,
        size_flag: Option<f64>,
        quality_flag: Option<QualityPreset>,
    ) -> Result<ResolvedSettings, CompressError> {
        let profile = match profile_name {
            Some(name) => Some(self.resolve_profile(name)?),
            None => None,
        };
        let target_size_mb = size_flag
            .or(profile.and_then(|p| p.target_size_mb))
            .unwrap_or(self.default_settings.target_size_mb);
        let quality_preset = quality_flag
            .or(profile.and_then(|p| p.quality_preset))
            .unwrap_or(self.default_settings.quality_preset);
        let audio_bitrate_bps = bitrate::parse_bitrate(&self.default_settings.audio_bitrate)
            .unwrap_or_else(|| {
                warn!(
                    "Cannot parse audio_bitrate '{}', using 128k",
                    self.default_settings.audio_bitrate
                );
                128_000
            });
        Ok(ResolvedSettings {
            target_size_mb,
            quality_preset,
            audio_bitrate_bps,
        })
    }
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
