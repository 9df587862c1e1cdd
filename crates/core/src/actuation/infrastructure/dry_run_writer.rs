use crate::actuation::domain::pin_writer::{HardwareError, PinLevel, PinWriter};

/// Logs pin changes instead of touching hardware. For development hosts
/// without GPIO.
pub struct DryRunWriter;

impl PinWriter for DryRunWriter {
    fn write(&mut self, pin: u32, level: PinLevel) -> Result<(), HardwareError> {
        log::debug!("[dry-run] GPIO {pin} {level}");
        Ok(())
    }
}
