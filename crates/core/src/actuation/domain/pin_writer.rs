use std::fmt;

use thiserror::Error;

use crate::shared::command::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl PinLevel {
    pub fn as_bit(self) -> u8 {
        match self {
            PinLevel::Low => 0,
            PinLevel::High => 1,
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => f.write_str("low"),
            PinLevel::High => f.write_str("high"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("could not drive GPIO {pin} {level}: {source}")]
    Command {
        pin: u32,
        level: PinLevel,
        #[source]
        source: CommandError,
    },
    #[error("GPIO {pin} {level} rejected: {detail}")]
    Rejected {
        pin: u32,
        level: PinLevel,
        detail: String,
    },
}

/// Sets a single GPIO line. Implementations own the hardware access path.
pub trait PinWriter: Send {
    fn write(&mut self, pin: u32, level: PinLevel) -> Result<(), HardwareError>;
}
