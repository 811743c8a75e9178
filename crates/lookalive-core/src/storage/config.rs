//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Screen-watch limit and break length (the 20-20-20 timer)
//! - Gaze, blink and proximity classifier tuning
//! - Notification preferences
//! - Overlay defaults
//! - Locations of the usage ledger and calibration file
//!
//! Configuration is stored at `~/.config/lookalive/config.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result, ValidationError};

/// Screen-watch timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Continuous centre-gaze time before a break is due.
    #[serde(default = "default_screen_time_limit")]
    pub screen_time_limit_secs: u64,
    /// How long a break lasts once started.
    #[serde(default = "default_break_duration")]
    pub break_duration_secs: u64,
}

/// Gaze direction thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeConfig {
    #[serde(default = "default_base_threshold")]
    pub base_threshold: f64,
    #[serde(default = "default_threshold_adjustment")]
    pub threshold_adjustment: f64,
    /// Iris deviation from the frame centre (fraction of half-width) above
    /// which the threshold is lowered.
    #[serde(default = "default_off_center_cutoff")]
    pub off_center_cutoff: f64,
}

/// Blink detection and blink-rate health warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkConfig {
    #[serde(default = "default_ear_threshold")]
    pub ear_threshold: f64,
    #[serde(default = "default_min_closed_frames")]
    pub min_closed_frames: u32,
    #[serde(default = "default_min_open_frames")]
    pub min_open_frames: u32,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_rate_warmup")]
    pub rate_warmup_secs: u64,
    #[serde(default = "default_low_rate")]
    pub low_rate_warning: f64,
    #[serde(default = "default_high_rate")]
    pub high_rate_warning: f64,
    #[serde(default = "default_warning_cooldown")]
    pub warning_cooldown_secs: u64,
}

/// Too-close-to-screen detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "default_warmup_samples")]
    pub warmup_samples: usize,
    #[serde(default = "default_too_close_ratio")]
    pub too_close_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationBackend {
    /// Native desktop notification (notify-send / osascript).
    Desktop,
    /// Log only.
    Log,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_backend")]
    pub backend: NotificationBackend,
}

/// Overlay defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub compact: bool,
    #[serde(default = "default_true")]
    pub debug: bool,
}

/// Persisted file locations, relative to the data directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_usage_file")]
    pub usage_file: PathBuf,
    #[serde(default = "default_calibration_file")]
    pub calibration_file: PathBuf,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/lookalive/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub gaze: GazeConfig,
    #[serde(default)]
    pub blink: BlinkConfig,
    #[serde(default)]
    pub proximity: ProximityConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

// Default functions
fn default_screen_time_limit() -> u64 {
    20 * 60
}
fn default_break_duration() -> u64 {
    20
}
fn default_base_threshold() -> f64 {
    0.20
}
fn default_threshold_adjustment() -> f64 {
    0.05
}
fn default_off_center_cutoff() -> f64 {
    0.30
}
fn default_ear_threshold() -> f64 {
    0.15
}
fn default_min_closed_frames() -> u32 {
    3
}
fn default_min_open_frames() -> u32 {
    2
}
fn default_min_interval_ms() -> u64 {
    1000
}
fn default_rate_warmup() -> u64 {
    60
}
fn default_low_rate() -> f64 {
    10.0
}
fn default_high_rate() -> f64 {
    30.0
}
fn default_warning_cooldown() -> u64 {
    30
}
fn default_warmup_samples() -> usize {
    30
}
fn default_too_close_ratio() -> f64 {
    1.3
}
fn default_true() -> bool {
    true
}
fn default_notification_timeout() -> u32 {
    5
}
fn default_backend() -> NotificationBackend {
    NotificationBackend::Desktop
}
fn default_usage_file() -> PathBuf {
    PathBuf::from("session_data.json")
}
fn default_calibration_file() -> PathBuf {
    PathBuf::from("screen_calibration.json")
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            screen_time_limit_secs: default_screen_time_limit(),
            break_duration_secs: default_break_duration(),
        }
    }
}

impl TimerConfig {
    pub fn screen_time_limit(&self) -> Duration {
        Duration::seconds(self.screen_time_limit_secs as i64)
    }

    pub fn break_duration(&self) -> Duration {
        Duration::seconds(self.break_duration_secs as i64)
    }
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            base_threshold: default_base_threshold(),
            threshold_adjustment: default_threshold_adjustment(),
            off_center_cutoff: default_off_center_cutoff(),
        }
    }
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            ear_threshold: default_ear_threshold(),
            min_closed_frames: default_min_closed_frames(),
            min_open_frames: default_min_open_frames(),
            min_interval_ms: default_min_interval_ms(),
            rate_warmup_secs: default_rate_warmup(),
            low_rate_warning: default_low_rate(),
            high_rate_warning: default_high_rate(),
            warning_cooldown_secs: default_warning_cooldown(),
        }
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            warmup_samples: default_warmup_samples(),
            too_close_ratio: default_too_close_ratio(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_notification_timeout(),
            backend: default_backend(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            compact: false,
            debug: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            usage_file: default_usage_file(),
            calibration_file: default_calibration_file(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown().into());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")).into());
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown().into())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("using default configuration: {e}");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The caller persists it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// into the field's type, or the result fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the classifier cannot work with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("gaze.base_threshold", self.gaze.base_threshold, 0.0, 0.5)?;
        check_range("gaze.threshold_adjustment", self.gaze.threshold_adjustment, 0.0, 0.5)?;
        check_range("gaze.off_center_cutoff", self.gaze.off_center_cutoff, 0.0, 1.0)?;
        check_range("blink.ear_threshold", self.blink.ear_threshold, 0.0, 1.0)?;
        check_range("proximity.too_close_ratio", self.proximity.too_close_ratio, 1.0, 10.0)?;
        if self.proximity.warmup_samples == 0 {
            return Err(ValidationError::InvalidValue {
                field: "proximity.warmup_samples".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.timer.screen_time_limit_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "timer.screen_time_limit_secs".into(),
                message: "must be at least 1".into(),
            });
        }
        check_at_most("timer.screen_time_limit_secs", self.timer.screen_time_limit_secs, MAX_SECS)?;
        check_at_most("timer.break_duration_secs", self.timer.break_duration_secs, MAX_SECS)?;
        check_at_most("blink.min_interval_ms", self.blink.min_interval_ms, MAX_SECS * 1000)?;
        check_at_most("blink.rate_warmup_secs", self.blink.rate_warmup_secs, MAX_SECS)?;
        check_at_most("blink.warning_cooldown_secs", self.blink.warning_cooldown_secs, MAX_SECS)?;
        Ok(())
    }
}

/// Upper bound for any configured duration: one day.
const MAX_SECS: u64 = 86_400;

fn check_at_most(field: &str, value: u64, max: u64) -> Result<(), ValidationError> {
    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value as f64,
            min: 0.0,
            max: max as f64,
        });
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field.to_string()));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}
