use std::time::Duration;

use crate::detection::domain::emotion_classifier::{ClassifyError, EmotionClassifier};
use crate::detection::infrastructure::stage_worker::StageWorker;
use crate::shared::emotion::Emotion;
use crate::shared::frame::Frame;

/// Decorator that bounds how long a wrapped classifier may take per face.
pub struct DeadlineEmotionClassifier {
    worker: StageWorker<Frame, Result<Emotion, ClassifyError>>,
}

impl DeadlineEmotionClassifier {
    pub fn new(mut inner: Box<dyn EmotionClassifier>, timeout: Duration) -> Self {
        Self {
            worker: StageWorker::spawn(timeout, move |face: Frame| inner.classify(&face)),
        }
    }
}

impl EmotionClassifier for DeadlineEmotionClassifier {
    fn classify(&mut self, face: &Frame) -> Result<Emotion, ClassifyError> {
        self.worker.call(face.clone())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct SlowClassifier(Duration);

    impl EmotionClassifier for SlowClassifier {
        fn classify(&mut self, _face: &Frame) -> Result<Emotion, ClassifyError> {
            thread::sleep(self.0);
            Ok(Emotion::Happy)
        }
    }

    fn face() -> Frame {
        Frame::new(vec![0u8; 16], 4, 4, 1)
    }

    #[test]
    fn test_returns_inner_label() {
        let mut classifier = DeadlineEmotionClassifier::new(
            Box::new(SlowClassifier(Duration::ZERO)),
            Duration::from_secs(1),
        );
        assert_eq!(classifier.classify(&face()).unwrap(), Emotion::Happy);
    }

    #[test]
    fn test_hung_classifier_times_out() {
        let mut classifier = DeadlineEmotionClassifier::new(
            Box::new(SlowClassifier(Duration::from_millis(500))),
            Duration::from_millis(50),
        );
        assert!(matches!(
            classifier.classify(&face()),
            Err(ClassifyError::Timeout(_))
        ));
    }
}
