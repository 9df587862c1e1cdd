/// Polling period between detection cycles.
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// Upper bound for a single locate or classify call.
pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 3_000;

pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

/// Sensor warm-up passed to `libcamera-still --timeout`.
pub const DEFAULT_CAPTURE_WARMUP_MS: u64 = 1_000;

/// Wall-clock limit for the capture utility, warm-up included.
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

pub const DEFAULT_GPIO_CHIP: &str = "0";
pub const DEFAULT_GPIO_TIMEOUT_MS: u64 = 1_000;

pub const FACE_MODEL_NAME: &str = "blazeface.onnx";

/// Application directory name under the platform config/cache dirs.
pub const APP_DIR_NAME: &str = "moodlight";

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_ENV_VAR: &str = "MOODLIGHT_CONFIG";
