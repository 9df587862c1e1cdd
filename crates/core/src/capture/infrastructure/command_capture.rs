use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::capture::domain::capture_service::{CaptureError, CaptureService};
use crate::capture::infrastructure::image_decoder::decode_file;
use crate::shared::command::run_with_deadline;
use crate::shared::frame::Frame;

/// Which still-capture utility drives the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// Pi camera module via `libcamera-still`.
    Libcamera,
    /// USB webcam on a V4L2 device via `fswebcam`.
    Fswebcam,
}

impl CaptureBackend {
    pub fn default_program(self) -> &'static str {
        match self {
            CaptureBackend::Libcamera => "libcamera-still",
            CaptureBackend::Fswebcam => "fswebcam",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub backend: CaptureBackend,
    /// Overrides the backend's utility name (e.g. `rpicam-still`).
    pub program: Option<PathBuf>,
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub warmup: Duration,
    pub timeout: Duration,
    pub directory: PathBuf,
    /// Keep each capture on disk instead of deleting it after decoding.
    pub retain: bool,
}

/// Captures stills by shelling out to a camera utility, then decodes the
/// written file.
pub struct CommandCapture {
    options: CaptureOptions,
}

impl CommandCapture {
    pub fn new(options: CaptureOptions) -> Self {
        Self { options }
    }

    fn program(&self) -> PathBuf {
        self.options
            .program
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.options.backend.default_program()))
    }

    fn build_command(&self, output: &Path) -> Command {
        let opts = &self.options;
        let mut cmd = Command::new(self.program());
        match opts.backend {
            CaptureBackend::Libcamera => {
                cmd.arg("-o")
                    .arg(output)
                    .arg("--nopreview")
                    .arg("--timeout")
                    .arg(opts.warmup.as_millis().to_string())
                    .arg("--width")
                    .arg(opts.width.to_string())
                    .arg("--height")
                    .arg(opts.height.to_string());
            }
            CaptureBackend::Fswebcam => {
                cmd.arg("-d")
                    .arg(&opts.device)
                    .arg("-r")
                    .arg(format!("{}x{}", opts.width, opts.height))
                    .arg("--no-banner")
                    .arg("--jpeg")
                    .arg("100")
                    .arg(output);
            }
        }
        cmd
    }

    fn next_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.options
            .directory
            .join(format!("capture_{millis}.jpg"))
    }
}

impl CaptureService for CommandCapture {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        fs::create_dir_all(&self.options.directory)?;
        let path = self.next_path();
        let mut cmd = self.build_command(&path);

        let output = match run_with_deadline(&mut cmd, self.options.timeout) {
            Ok(output) => output,
            Err(e) => {
                // A killed utility may have written part of the image.
                let _ = fs::remove_file(&path);
                return Err(e.into());
            }
        };
        if !output.success() {
            let _ = fs::remove_file(&path);
            return Err(classify_failure(&output.status.to_string(), &output.stderr));
        }

        let frame = decode_file(&path);
        if self.options.retain {
            log::debug!("Retained capture {}", path.display());
        } else if let Err(e) = fs::remove_file(&path) {
            log::warn!("Could not remove capture {}: {e}", path.display());
        }
        frame
    }
}

fn classify_failure(status: &str, stderr: &str) -> CaptureError {
    let detail = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string();
    if stderr.to_ascii_lowercase().contains("busy") {
        CaptureError::DeviceBusy(detail)
    } else {
        CaptureError::Failed {
            status: status.to_string(),
            stderr: detail,
        }
    }
}
