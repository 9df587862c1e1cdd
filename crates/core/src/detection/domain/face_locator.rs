use std::time::Duration;

use thiserror::Error;

use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("face detection backend failed: {0}")]
    Backend(String),
    #[error("face detection did not finish within {0:?}")]
    Timeout(Duration),
    #[error("face detection is still busy with an earlier frame")]
    Busy,
    #[error("face detection worker stopped")]
    Disconnected,
}

/// Domain interface for finding faces in a grayscale frame.
///
/// Implementations may be stateful (e.g. an inference session), hence
/// `&mut self`. The returned boxes are ordered; the first is the primary face.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, LocateError>;
}
