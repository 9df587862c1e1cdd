use std::time::Duration;

use crate::detection::domain::face_locator::{FaceLocator, LocateError};
use crate::detection::infrastructure::stage_worker::StageWorker;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

type LocateResult = Result<Vec<FaceBox>, LocateError>;

/// Decorator that bounds how long a wrapped locator may take per frame.
///
/// The inner locator lives on a worker thread. A frame that is not answered
/// within `timeout` yields [`LocateError::Timeout`], and later frames get
/// [`LocateError::Busy`] until the worker catches up.
pub struct DeadlineFaceLocator {
    worker: StageWorker<Frame, LocateResult>,
}

impl DeadlineFaceLocator {
    pub fn new(mut inner: Box<dyn FaceLocator>, timeout: Duration) -> Self {
        Self {
            worker: StageWorker::spawn(timeout, move |frame: Frame| inner.locate(&frame)),
        }
    }
}

impl FaceLocator for DeadlineFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, LocateError> {
        self.worker.call(frame.clone())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct SlowLocator {
        delay: Duration,
        faces: Vec<FaceBox>,
    }

    impl FaceLocator for SlowLocator {
        fn locate(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, LocateError> {
            thread::sleep(self.delay);
            Ok(self.faces.clone())
        }
    }

    struct FailingLocator;

    impl FaceLocator for FailingLocator {
        fn locate(&mut self, _frame: &Frame) -> Result<Vec<FaceBox>, LocateError> {
            Err(LocateError::Backend("session lost".into()))
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 16], 4, 4, 1)
    }

    #[test]
    fn test_passes_through_fast_results() {
        let inner = SlowLocator {
            delay: Duration::ZERO,
            faces: vec![FaceBox::new(10, 10, 50, 50)],
        };
        let mut locator = DeadlineFaceLocator::new(Box::new(inner), Duration::from_secs(1));
        assert_eq!(locator.locate(&frame()).unwrap(), vec![FaceBox::new(10, 10, 50, 50)]);
    }

    #[test]
    fn test_passes_through_backend_errors() {
        let mut locator = DeadlineFaceLocator::new(Box::new(FailingLocator), Duration::from_secs(1));
        assert!(matches!(
            locator.locate(&frame()),
            Err(LocateError::Backend(_))
        ));
    }

    #[test]
    fn test_hung_locator_times_out() {
        let inner = SlowLocator {
            delay: Duration::from_millis(500),
            faces: vec![],
        };
        let mut locator = DeadlineFaceLocator::new(Box::new(inner), Duration::from_millis(50));

        assert!(matches!(
            locator.locate(&frame()),
            Err(LocateError::Timeout(_))
        ));
        assert!(matches!(locator.locate(&frame()), Err(LocateError::Busy)));
    }
}
