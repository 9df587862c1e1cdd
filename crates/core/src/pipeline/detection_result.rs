use std::fmt;

use crate::shared::emotion::Emotion;
use crate::shared::face_box::FaceBox;

/// One classified face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub face: FaceBox,
    pub emotion: Emotion,
}

/// Ordered faces of one cycle. The first entry drives the outputs; the
/// rest are informational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn primary(&self) -> Option<&Detection> {
        self.detections.first()
    }

    /// Emotion to display: the primary face's, or Neutral with no faces.
    pub fn emotion(&self) -> Emotion {
        self.primary().map_or(Emotion::Neutral, |d| d.emotion)
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detections.is_empty() {
            return f.write_str("no faces");
        }
        let parts: Vec<String> = self
            .detections
            .iter()
            .map(|d| format!("{} {}", d.emotion, d.face))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_neutral() {
        let result = DetectionResult::default();
        assert!(result.primary().is_none());
        assert_eq!(result.emotion(), Emotion::Neutral);
        assert_eq!(result.to_string(), "no faces");
    }

    #[test]
    fn test_primary_is_first() {
        let result = DetectionResult::new(vec![
            Detection {
                face: FaceBox::new(10, 10, 50, 50),
                emotion: Emotion::Sad,
            },
            Detection {
                face: FaceBox::new(100, 10, 60, 60),
                emotion: Emotion::Happy,
            },
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.emotion(), Emotion::Sad);
        assert_eq!(
            result.to_string(),
            "Sad (10, 10) 50x50; Happy (100, 10) 60x60"
        );
    }
}
