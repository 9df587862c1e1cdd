use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shared::emotion::Emotion;

/// Where an emotion should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// Light this GPIO line.
    Pin(u32),
    /// Explicitly mapped to "nothing lit" (Neutral by default).
    Off,
    /// The emotion has no entry in the map at all.
    NotMapped,
}

/// Emotion → GPIO line assignment.
///
/// Serialises as a JSON object keyed by emotion name, with `null` meaning
/// "no output". Several emotions may share a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinMap {
    entries: BTreeMap<Emotion, Option<u32>>,
}

impl PinMap {
    pub fn new(entries: impl IntoIterator<Item = (Emotion, Option<u32>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn target(&self, emotion: Emotion) -> OutputTarget {
        match self.entries.get(&emotion) {
            Some(Some(pin)) => OutputTarget::Pin(*pin),
            Some(None) => OutputTarget::Off,
            None => OutputTarget::NotMapped,
        }
    }

    /// Every distinct line the map can drive, ascending.
    pub fn outputs(&self) -> Vec<u32> {
        let mut pins: Vec<u32> = self.entries.values().flatten().copied().collect();
        pins.sort_unstable();
        pins.dedup();
        pins
    }
}

impl Default for PinMap {
    /// Breadboard wiring: red, green, yellow, blue and white LEDs, with Fear
    /// and Surprise sharing the yellow one.
    fn default() -> Self {
        Self::new([
            (Emotion::Angry, Some(17)),
            (Emotion::Disgust, Some(22)),
            (Emotion::Fear, Some(18)),
            (Emotion::Happy, Some(23)),
            (Emotion::Sad, Some(27)),
            (Emotion::Surprise, Some(18)),
            (Emotion::Neutral, None),
        ])
    }
}
