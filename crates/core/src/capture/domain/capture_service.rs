use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::shared::command::CommandError;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera device busy: {0}")]
    DeviceBusy(String),
    #[error("camera capture timed out after {0:?}")]
    Timeout(Duration),
    #[error("camera utility could not run: {0}")]
    Launch(#[source] CommandError),
    #[error("camera utility exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("failed to decode captured image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("capture file error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CommandError> for CaptureError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Timeout { timeout, .. } => CaptureError::Timeout(timeout),
            other => CaptureError::Launch(other),
        }
    }
}

/// Domain interface for acquiring one image from a camera.
///
/// Implementations must return within a bounded time; a device that does
/// not answer is reported as [`CaptureError::Timeout`].
pub trait CaptureService: Send {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}
