use crate::actuation::domain::pin_map::{OutputTarget, PinMap};
use crate::actuation::domain::pin_writer::{HardwareError, PinLevel, PinWriter};
use crate::shared::emotion::Emotion;

/// What the driver believes the outputs look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    /// Nothing written yet, or the last write failed part-way.
    Unknown,
    AllOff,
    Active(u32),
}

/// Result of a successful [`ActuatorDriver::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    Activated(u32),
    /// The emotion maps to no output; everything is dark.
    Off,
    /// The emotion has no pin map entry; everything is dark.
    NotMapped,
}

/// Owned handle to the LED outputs.
///
/// Every change goes through reset-before-set: all known outputs are driven
/// low before at most one is driven high, so two outputs are never lit at
/// the same time.
pub struct ActuatorDriver {
    pin_map: PinMap,
    outputs: Vec<u32>,
    writer: Box<dyn PinWriter>,
    state: ActuatorState,
}

impl ActuatorDriver {
    pub fn new(pin_map: PinMap, writer: Box<dyn PinWriter>) -> Self {
        let outputs = pin_map.outputs();
        Self {
            pin_map,
            outputs,
            writer,
            state: ActuatorState::Unknown,
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn pin_map(&self) -> &PinMap {
        &self.pin_map
    }

    /// Shows `emotion` on the outputs.
    ///
    /// If any output cannot be switched off, nothing is switched on and the
    /// first failure is returned.
    pub fn set(&mut self, emotion: Emotion) -> Result<Actuation, HardwareError> {
        self.all_off()?;

        match self.pin_map.target(emotion) {
            OutputTarget::Pin(pin) => {
                if let Err(e) = self.writer.write(pin, PinLevel::High) {
                    self.state = ActuatorState::Unknown;
                    return Err(e);
                }
                self.state = ActuatorState::Active(pin);
                log::info!("{emotion} -> GPIO {pin} on");
                Ok(Actuation::Activated(pin))
            }
            OutputTarget::Off => {
                log::info!("{emotion} -> all outputs off");
                Ok(Actuation::Off)
            }
            OutputTarget::NotMapped => {
                log::debug!("{emotion} has no output mapping, all outputs off");
                Ok(Actuation::NotMapped)
            }
        }
    }

    /// Drives every known output low.
    ///
    /// All outputs are attempted even when one fails; the first failure is
    /// reported afterwards.
    pub fn all_off(&mut self) -> Result<(), HardwareError> {
        let mut first_error = None;
        for &pin in &self.outputs {
            if let Err(e) = self.writer.write(pin, PinLevel::Low) {
                log::warn!("{e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => {
                self.state = ActuatorState::Unknown;
                Err(e)
            }
            None => {
                self.state = ActuatorState::AllOff;
                Ok(())
            }
        }
    }
}
