use std::process::Command;
use std::time::Duration;

use crate::actuation::domain::pin_writer::{HardwareError, PinLevel, PinWriter};
use crate::shared::command::run_with_deadline;

/// Drives GPIO lines with libgpiod's `gpioset <chip> <line>=<value>`.
pub struct GpiosetWriter {
    program: String,
    chip: String,
    timeout: Duration,
}

impl GpiosetWriter {
    pub fn new(chip: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: "gpioset".to_string(),
            chip: chip.into(),
            timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn build_command(&self, pin: u32, level: PinLevel) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.chip)
            .arg(format!("{pin}={}", level.as_bit()));
        cmd
    }
}

impl PinWriter for GpiosetWriter {
    fn write(&mut self, pin: u32, level: PinLevel) -> Result<(), HardwareError> {
        let mut cmd = self.build_command(pin, level);
        let output = run_with_deadline(&mut cmd, self.timeout)
            .map_err(|source| HardwareError::Command { pin, level, source })?;
        if !output.success() {
            return Err(HardwareError::Rejected {
                pin,
                level,
                detail: format!("{} {}", output.status, output.stderr.trim()),
            });
        }
        log::trace!("GPIO {pin} {level}");
        Ok(())
    }
}
