use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detection::domain::emotion_classifier::{ClassifyError, EmotionClassifier};
use crate::shared::emotion::Emotion;
use crate::shared::frame::Frame;

/// Placeholder strategy: picks one of the seven labels uniformly at random,
/// ignoring the pixels. Stands in until a trained model is wired in.
pub struct RandomEmotionClassifier {
    rng: StdRng,
}

impl RandomEmotionClassifier {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence of labels for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomEmotionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionClassifier for RandomEmotionClassifier {
    fn classify(&mut self, _face: &Frame) -> Result<Emotion, ClassifyError> {
        let index = self.rng.gen_range(0..Emotion::ALL.len());
        Ok(Emotion::ALL[index])
    }
}
