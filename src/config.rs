use crate::app_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tunable thresholds for session analysis. Defaults reproduce the stock
/// behaviour; all durations are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Gaps shorter than this are not pauses at all
    pub min_pause_ms: u64,
    /// Upper bound of a short pause; also the maximum gap inside a burst
    pub pause_threshold_short_ms: u64,
    /// Gaps at or above this are long pauses and do not count as active time
    pub pause_threshold_medium_ms: u64,
    pub burst_min_duration_ms: u64,
    pub burst_min_keystrokes: usize,
    pub average_word_length: f64,
    pub expected_wpm: f64,
    pub peak_window_ms: u64,
    /// Sessions with fewer events get no peak window
    pub peak_min_events: usize,
    pub struggle_window_ms: u64,
    pub struggle_step_ms: u64,
    pub struggle_deletion_ratio: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_pause_ms: 100,
            pause_threshold_short_ms: 2_000,
            pause_threshold_medium_ms: 10_000,
            burst_min_duration_ms: 500,
            burst_min_keystrokes: 5,
            average_word_length: 5.0,
            expected_wpm: 30.0,
            peak_window_ms: 60_000,
            peak_min_events: 10,
            struggle_window_ms: 120_000,
            struggle_step_ms: 30_000,
            struggle_deletion_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub min_playback_speed: f64,
    pub max_playback_speed: f64,
    pub default_playback_speed: f64,
    pub skip_step_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_playback_speed: 0.25,
            max_playback_speed: 4.0,
            default_playback_speed: 1.0,
            skip_step_ms: 1_000,
            tick_interval_ms: 50,
        }
    }
}

impl PlaybackConfig {
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            return self.default_playback_speed;
        }
        // bounds come from user config and may be inverted
        speed.max(self.min_playback_speed).min(self.max_playback_speed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub playback: PlaybackConfig,
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("keyreplay_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(err) => {
                    log::warn!(
                        "ignoring unreadable config at {}: {}",
                        self.path.display(),
                        err
                    );
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
