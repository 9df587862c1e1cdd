use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::actuation::domain::actuator_driver::{Actuation, ActuatorDriver};
use crate::capture::domain::capture_service::CaptureService;
use crate::detection::domain::emotion_classifier::EmotionClassifier;
use crate::detection::domain::face_locator::FaceLocator;
use crate::pipeline::cycle_logger::{CycleLogger, NullCycleLogger};
use crate::pipeline::detection_result::{Detection, DetectionResult};
use crate::pipeline::tick_schedule::TickSchedule;
use crate::shared::constants::DEFAULT_INTERVAL_MS;
use crate::shared::emotion::Emotion;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// An image was analysed and the outputs reflect the result.
    Completed,
    /// No image this cycle; the outputs were reset to Neutral.
    CaptureFailed,
    /// Writing the outputs failed; their state is unknown until the next
    /// successful cycle.
    HardwareFailed,
}

impl CycleOutcome {
    pub fn label(self) -> &'static str {
        match self {
            CycleOutcome::Completed => "completed",
            CycleOutcome::CaptureFailed => "capture_failed",
            CycleOutcome::HardwareFailed => "hardware_failed",
        }
    }
}

/// Everything one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub detections: DetectionResult,
    /// Emotion handed to the actuator.
    pub emotion: Emotion,
    /// `None` when the actuator write failed.
    pub actuation: Option<Actuation>,
}

/// Capture → locate → classify → actuate, on a fixed interval.
///
/// No stage failure ends the loop; each one degrades the cycle to Neutral.
/// Only the shutdown channel stops [`DetectionLoop::run`], either by a
/// message or by every sender being dropped.
pub struct DetectionLoop {
    capture: Box<dyn CaptureService>,
    locator: Box<dyn FaceLocator>,
    classifier: Box<dyn EmotionClassifier>,
    actuator: ActuatorDriver,
    shutdown: Receiver<()>,
    interval: Duration,
    classify_all_faces: bool,
    logger: Box<dyn CycleLogger>,
}

impl DetectionLoop {
    pub fn new(
        capture: Box<dyn CaptureService>,
        locator: Box<dyn FaceLocator>,
        classifier: Box<dyn EmotionClassifier>,
        actuator: ActuatorDriver,
        shutdown: Receiver<()>,
    ) -> Self {
        Self {
            capture,
            locator,
            classifier,
            actuator,
            shutdown,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            classify_all_faces: true,
            logger: Box::new(NullCycleLogger),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether faces after the primary one are classified too (for logging).
    pub fn with_classify_all_faces(mut self, enabled: bool) -> Self {
        self.classify_all_faces = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn CycleLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn actuator(&self) -> &ActuatorDriver {
        &self.actuator
    }

    /// Gives the actuator back, e.g. to switch everything off on exit.
    pub fn into_actuator(self) -> ActuatorDriver {
        self.actuator
    }

    /// Runs cycles until shutdown; returns how many ran.
    ///
    /// A shutdown arriving mid-cycle lets that cycle finish first.
    pub fn run(&mut self) -> usize {
        log::info!(
            "Detection loop started (interval {} ms, outputs {:?})",
            self.interval.as_millis(),
            self.actuator.pin_map().outputs()
        );
        let mut schedule = TickSchedule::starting_at(self.interval, Instant::now());
        let mut cycles = 0;

        loop {
            if self.shutdown_requested(Duration::ZERO) {
                break;
            }
            self.run_cycle();
            cycles += 1;

            let wait = schedule.wait_from(Instant::now());
            if wait.is_zero() {
                log::warn!(
                    "Cycle overran the {} ms interval, starting the next one now",
                    self.interval.as_millis()
                );
            }
            if self.shutdown_requested(wait) {
                break;
            }
        }

        log::info!("Detection loop stopped after {cycles} cycle(s)");
        self.logger.summary();
        cycles
    }

    /// Waits up to `wait` for a shutdown message.
    fn shutdown_requested(&self, wait: Duration) -> bool {
        match self.shutdown.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    /// One capture → locate → classify → actuate pass. Never fails.
    pub fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let captured = self.capture.capture();
        self.logger.timing("capture", elapsed_ms(started));

        let (capture_failed, detections) = match captured {
            Ok(frame) => (false, self.analyse(&frame)),
            Err(e) => {
                log::warn!("Capture failed: {e}");
                (true, DetectionResult::default())
            }
        };

        let emotion = detections.emotion();
        let started = Instant::now();
        let actuation = match self.actuator.set(emotion) {
            Ok(actuation) => Some(actuation),
            Err(e) => {
                log::warn!("Could not show {emotion}: {e}");
                None
            }
        };
        self.logger.timing("actuate", elapsed_ms(started));

        let outcome = if capture_failed {
            CycleOutcome::CaptureFailed
        } else if actuation.is_none() {
            CycleOutcome::HardwareFailed
        } else {
            CycleOutcome::Completed
        };
        self.logger.cycle(outcome.label());

        CycleReport {
            outcome,
            detections,
            emotion,
            actuation,
        }
    }

    fn analyse(&mut self, frame: &Frame) -> DetectionResult {
        let gray = frame.to_grayscale();

        let started = Instant::now();
        let faces = match self.locator.locate(&gray) {
            Ok(faces) => faces,
            Err(e) => {
                log::warn!("Face detection failed: {e}");
                Vec::new()
            }
        };
        self.logger.timing("locate", elapsed_ms(started));
        self.logger.metric("faces", faces.len() as f64);

        let Some((primary, others)) = faces.split_first() else {
            log::info!("No faces detected");
            return DetectionResult::default();
        };

        let started = Instant::now();
        let mut detections = vec![Detection {
            face: *primary,
            emotion: self.classify(&gray, primary).unwrap_or(Emotion::Neutral),
        }];
        if self.classify_all_faces {
            for face in others {
                if let Some(emotion) = self.classify(&gray, face) {
                    detections.push(Detection {
                        face: *face,
                        emotion,
                    });
                }
            }
        }
        self.logger.timing("classify", elapsed_ms(started));

        let result = DetectionResult::new(detections);
        log::info!("{} face(s): {result}", faces.len());
        result
    }

    fn classify(&mut self, gray: &Frame, face: &FaceBox) -> Option<Emotion> {
        let Some(crop) = gray.crop(face) else {
            log::warn!("Face {face} lies outside the {}x{} frame", gray.width(), gray.height());
            return None;
        };
        match self.classifier.classify(&crop) {
            Ok(emotion) => Some(emotion),
            Err(e) => {
                log::warn!("Emotion classification failed for {face}: {e}");
                None
            }
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
