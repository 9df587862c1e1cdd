use std::time::Duration;

use thiserror::Error;

use crate::shared::emotion::Emotion;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("emotion backend failed: {0}")]
    Backend(String),
    #[error("emotion classification did not finish within {0:?}")]
    Timeout(Duration),
    #[error("emotion classifier is still busy with an earlier face")]
    Busy,
    #[error("emotion classifier worker stopped")]
    Disconnected,
}

/// Domain interface for labelling one face.
///
/// `face` is the grayscale crop of a single located face.
pub trait EmotionClassifier: Send {
    fn classify(&mut self, face: &Frame) -> Result<Emotion, ClassifyError>;
}
