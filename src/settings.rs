// src/settings.rs

use crate::audio_engine::{EngineConfig, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE};
use crate::clock::{DEFAULT_TEMPO_BPM, DEFAULT_TICKS_PER_BEAT};
use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub host_name: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub buffer_size: u32,
    /// Root the sample manifest is resolved against.
    pub assets_dir: PathBuf,
    pub tempo_bpm: f64,
    pub ticks_per_beat: u32,
    pub reverb_seed: Option<u64>,
    pub random_sample_cooldown_ms: u64,
    /// Overrides for the parameter table, by parameter name.
    pub params: BTreeMap<String, f32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            host_name: None,
            output_device: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            assets_dir: PathBuf::from("data"),
            tempo_bpm: DEFAULT_TEMPO_BPM,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            reverb_seed: None,
            random_sample_cooldown_ms: 500,
            params: BTreeMap::new(),
        }
    }
}

impl AppSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate,
            tempo_bpm: self.tempo_bpm,
            ticks_per_beat: self.ticks_per_beat,
            reverb_seed: self.reverb_seed,
        }
    }

    pub fn random_sample_cooldown(&self) -> Duration {
        Duration::from_millis(self.random_sample_cooldown_ms)
    }
}

/// `<exe dir>/AppSettings`, created on first use.
pub fn get_config_dir() -> Option<PathBuf> {
    let exe_path = match env::current_exe() {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "Could not determine application directory");
            return None;
        }
    };
    let dir = exe_path.parent()?.join("AppSettings");
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(path = %dir.display(), error = %e, "Failed to create settings directory");
            return None;
        }
    }
    Some(dir)
}

pub fn default_settings_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME))
}

pub fn save_settings(settings: &AppSettings, path: &Path) -> Result<(), SettingsError> {
    let json_string = serde_json::to_string_pretty(settings)?;
    fs::write(path, json_string)?;
    debug!(path = %path.display(), "Saved settings");
    Ok(())
}

fn read_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    let json_string = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json_string)?)
}

/// Never fails: a missing file gives the defaults, a broken one is logged and
/// also gives the defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    if !path.exists() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return AppSettings::default();
    }
    match read_settings(path) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load settings, using defaults");
            AppSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join(SETTINGS_FILE_NAME));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let mut settings = AppSettings {
            output_device: Some("Speakers".to_string()),
            tempo_bpm: 120.0,
            reverb_seed: Some(9),
            ..AppSettings::default()
        };
        settings.params.insert("master_gain".to_string(), 0.5);
        save_settings(&settings, &path).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "ticks_per_beat": 8, "params": { "delay_time": 0.25 } }"#).unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.ticks_per_beat, 8);
        assert_eq!(settings.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(settings.params.get("delay_time"), Some(&0.25));

        let config = settings.engine_config();
        assert_eq!(config.ticks_per_beat, 8);
        assert_eq!(config.tempo_bpm, DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn test_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_settings(&path), Err(SettingsError::Parse(_))));
        assert_eq!(load_settings(&path), AppSettings::default());
    }
}
