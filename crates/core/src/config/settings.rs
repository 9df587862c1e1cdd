use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actuation::domain::pin_map::PinMap;
use crate::capture::infrastructure::command_capture::{CaptureBackend, CaptureOptions};
use crate::detection::infrastructure::locator_factory::{LocatorOptions, LocatorStrategy};
use crate::detection::infrastructure::onnx_blazeface_locator::DEFAULT_CONFIDENCE;
use crate::shared::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CAMERA_DEVICE, DEFAULT_CAPTURE_HEIGHT,
    DEFAULT_CAPTURE_TIMEOUT_MS, DEFAULT_CAPTURE_WARMUP_MS, DEFAULT_CAPTURE_WIDTH,
    DEFAULT_GPIO_CHIP, DEFAULT_GPIO_TIMEOUT_MS, DEFAULT_INTERVAL_MS, DEFAULT_STAGE_TIMEOUT_MS,
    FACE_MODEL_NAME,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// What happens to the LEDs when the daemon exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Switch every known output off.
    #[default]
    AllOff,
    /// Leave the last emotion showing.
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub backend: CaptureBackend,
    /// Overrides the backend's utility name.
    pub program: Option<PathBuf>,
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub warmup_ms: u64,
    pub timeout_ms: u64,
    /// Where stills are written; defaults to the user cache directory.
    pub directory: Option<PathBuf>,
    pub retain: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            backend: CaptureBackend::Libcamera,
            program: None,
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            warmup_ms: DEFAULT_CAPTURE_WARMUP_MS,
            timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            directory: None,
            retain: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSettings {
    pub strategy: LocatorStrategy,
    pub confidence: f64,
    pub model_name: String,
    pub model_url: Option<String>,
    pub model_dir: Option<PathBuf>,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            strategy: LocatorStrategy::Auto,
            confidence: DEFAULT_CONFIDENCE,
            model_name: FACE_MODEL_NAME.to_string(),
            model_url: None,
            model_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Fixed seed for a reproducible label sequence.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioSettings {
    pub chip: String,
    /// Overrides the `gpioset` utility name.
    pub program: Option<String>,
    /// Log pin levels instead of driving them.
    pub dry_run: bool,
    pub timeout_ms: u64,
    /// Replaces the default wiring wholesale when present.
    pub pin_map: PinMap,
}

impl Default for GpioSettings {
    fn default() -> Self {
        Self {
            chip: DEFAULT_GPIO_CHIP.to_string(),
            program: None,
            dry_run: false,
            timeout_ms: DEFAULT_GPIO_TIMEOUT_MS,
            pin_map: PinMap::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interval_ms: u64,
    pub stage_timeout_ms: u64,
    pub classify_all_faces: bool,
    pub capture: CaptureSettings,
    pub locator: LocatorSettings,
    pub classifier: ClassifierSettings,
    pub gpio: GpioSettings,
    pub shutdown: ShutdownPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            stage_timeout_ms: DEFAULT_STAGE_TIMEOUT_MS,
            classify_all_faces: true,
            capture: CaptureSettings::default(),
            locator: LocatorSettings::default(),
            classifier: ClassifierSettings::default(),
            gpio: GpioSettings::default(),
            shutdown: ShutdownPolicy::default(),
        }
    }
}

/// Command-line / environment values layered over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interval_ms: Option<u64>,
    pub device: Option<String>,
    pub dry_run: bool,
}

impl Settings {
    /// `<config_dir>/moodlight/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Defaults, then the config file, then `overrides`; validated.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used only if a file is there.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    log::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        settings.apply(overrides);
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(settings)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(ms) = overrides.interval_ms {
            self.interval_ms = ms;
        }
        if let Some(device) = &overrides.device {
            self.capture.device = device.clone();
        }
        if overrides.dry_run {
            self.gpio.dry_run = true;
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid =
            |msg: &str| -> Result<(), SettingsError> { Err(SettingsError::Invalid(msg.to_string())) };
        if self.interval_ms == 0 {
            return invalid("interval_ms must be positive");
        }
        if self.stage_timeout_ms == 0 {
            return invalid("stage_timeout_ms must be positive");
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return invalid("capture width and height must be positive");
        }
        if self.capture.timeout_ms == 0 {
            return invalid("capture.timeout_ms must be positive");
        }
        if !(0.0..=1.0).contains(&self.locator.confidence) {
            return invalid("locator.confidence must be within 0..=1");
        }
        if self.gpio.chip.trim().is_empty() {
            return invalid("gpio.chip must not be empty");
        }
        if self.gpio.timeout_ms == 0 {
            return invalid("gpio.timeout_ms must be positive");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn gpio_timeout(&self) -> Duration {
        Duration::from_millis(self.gpio.timeout_ms)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        let c = &self.capture;
        CaptureOptions {
            backend: c.backend,
            program: c.program.clone(),
            device: c.device.clone(),
            width: c.width,
            height: c.height,
            warmup: Duration::from_millis(c.warmup_ms),
            timeout: Duration::from_millis(c.timeout_ms),
            directory: c.directory.clone().unwrap_or_else(default_capture_dir),
            retain: c.retain,
        }
    }

    pub fn locator_options(&self) -> LocatorOptions {
        let l = &self.locator;
        LocatorOptions {
            strategy: l.strategy,
            confidence: l.confidence,
            model_name: l.model_name.clone(),
            model_url: l.model_url.clone(),
            model_dir: l.model_dir.clone(),
        }
    }
}

/// `$XDG_CACHE_HOME/moodlight/captures`, or the temp dir when there is no
/// cache directory.
fn default_capture_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join("captures")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::domain::pin_map::OutputTarget;
    use crate::shared::emotion::Emotion;
    use rstest::rstest;

    fn write_config(json: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, json).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults_are_valid() {
        let s = Settings::default();
        s.validate().unwrap();
        assert_eq!(s.interval(), Duration::from_secs(10));
        assert_eq!(s.stage_timeout(), Duration::from_secs(3));
        assert!(s.classify_all_faces);
        assert_eq!(s.shutdown, ShutdownPolicy::AllOff);
        assert_eq!(s.gpio.pin_map, PinMap::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let (_dir, path) = write_config(
            r#"{ "interval_ms": 2500, "capture": { "backend": "fswebcam", "device": "/dev/video2" } }"#,
        );
        let s = Settings::load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(s.interval_ms, 2500);
        assert_eq!(s.capture.backend, CaptureBackend::Fswebcam);
        assert_eq!(s.capture.device, "/dev/video2");
        assert_eq!(s.capture.width, DEFAULT_CAPTURE_WIDTH);
        assert_eq!(s.locator, LocatorSettings::default());
    }

    #[test]
    fn test_pin_map_from_file() {
        let (_dir, path) = write_config(
            r#"{ "gpio": { "pin_map": { "Happy": 5, "Neutral": null }, "dry_run": true },
                 "shutdown": "leave" }"#,
        );
        let s = Settings::load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(s.gpio.pin_map.target(Emotion::Happy), OutputTarget::Pin(5));
        assert_eq!(s.gpio.pin_map.target(Emotion::Neutral), OutputTarget::Off);
        assert_eq!(s.gpio.pin_map.target(Emotion::Sad), OutputTarget::NotMapped);
        assert!(s.gpio.dry_run);
        assert_eq!(s.shutdown, ShutdownPolicy::Leave);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let (_dir, path) = write_config(r#"{ "interval_ms": 2500 }"#);
        let overrides = Overrides {
            interval_ms: Some(500),
            device: Some("/dev/video1".into()),
            dry_run: true,
        };
        let s = Settings::load(Some(&path), &overrides).unwrap();
        assert_eq!(s.interval_ms, 500);
        assert_eq!(s.capture.device, "/dev/video1");
        assert!(s.gpio.dry_run);
    }

    #[test]
    fn test_missing_explicit_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.json")), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let (_dir, path) = write_config("{ interval_ms: ");
        let err = Settings::load(Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[test]
    fn test_unknown_emotion_key_is_parse_error() {
        let (_dir, path) = write_config(r#"{ "gpio": { "pin_map": { "Bored": 4 } } }"#);
        let err = Settings::load(Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { .. }));
    }

    #[rstest]
    #[case(r#"{ "interval_ms": 0 }"#)]
    #[case(r#"{ "stage_timeout_ms": 0 }"#)]
    #[case(r#"{ "capture": { "width": 0 } }"#)]
    #[case(r#"{ "capture": { "timeout_ms": 0 } }"#)]
    #[case(r#"{ "locator": { "confidence": 1.5 } }"#)]
    #[case(r#"{ "gpio": { "chip": " " } }"#)]
    fn test_invalid_values_are_rejected(#[case] json: &str) {
        let (_dir, path) = write_config(json);
        let err = Settings::load(Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[test]
    fn test_zero_interval_override_is_rejected() {
        let (_dir, path) = write_config("{}");
        let overrides = Overrides {
            interval_ms: Some(0),
            ..Overrides::default()
        };
        assert!(matches!(
            Settings::load(Some(&path), &overrides),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_empty_pin_map_is_allowed() {
        let (_dir, path) = write_config(r#"{ "gpio": { "pin_map": {} } }"#);
        let s = Settings::load(Some(&path), &Overrides::default()).unwrap();
        assert!(s.gpio.pin_map.outputs().is_empty());
    }

    #[test]
    fn test_option_conversions() {
        let mut s = Settings::default();
        s.capture.directory = Some(PathBuf::from("/tmp/caps"));
        s.capture.warmup_ms = 250;
        s.locator.strategy = LocatorStrategy::Contour;

        let capture = s.capture_options();
        assert_eq!(capture.directory, PathBuf::from("/tmp/caps"));
        assert_eq!(capture.warmup, Duration::from_millis(250));
        assert_eq!(capture.timeout, Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS));

        let locator = s.locator_options();
        assert_eq!(locator.strategy, LocatorStrategy::Contour);
        assert_eq!(locator.model_name, FACE_MODEL_NAME);
    }

    #[test]
    fn test_default_capture_dir_is_app_scoped() {
        let dir = Settings::default().capture_options().directory;
        assert!(dir.ends_with("moodlight/captures"));
    }
}
