//! Pin-level bus abstraction
//!
//! [`ChipBus`] is the hardware seam of the driver: everything above it works
//! in terms of register bytes, everything below it is the host's GPIO layer.
//! Pin direction, drive strength and pull resistors are the implementor's
//! business; the driver only asks for a pin to become an output.
//!
//! [`RecordingBus`] is an in-memory implementation that decodes the bytes
//! the chip would latch. It backs the crate's tests and the demo binary.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::PinMap;
use crate::sn76489::RegisterFile;

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Failures reported by a [`ChipBus`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Pin cannot be configured as a digital output
    #[error("pin {pin} cannot be driven as an output")]
    UnsupportedPin {
        /// Offending pin
        pin: u8,
    },

    /// Setting a pin level failed
    #[error("failed to set pin {pin}: {reason}")]
    PinLevel {
        /// Offending pin
        pin: u8,
        /// Driver-provided reason
        reason: String,
    },

    /// Master clock source could not be started or stopped
    #[error("clock source: {0}")]
    Clock(String),
}

/// Digital I/O needed to drive the chip
///
/// Implementations are expected to be reliable; any error is treated as a
/// hardware fault and aborts the operation in progress without retry.
pub trait ChipBus {
    /// Prepare a pin as a push-pull output
    fn configure_output(&mut self, pin: u8) -> Result<(), BusError>;

    /// Drive a pin to a level
    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), BusError>;

    /// Busy-wait for at least `micros` microseconds
    fn delay_us(&mut self, micros: u32);

    /// Return a pin to its reset state
    fn release_pin(&mut self, _pin: u8) -> Result<(), BusError> {
        Ok(())
    }

    /// Start the master clock output at `hz`
    ///
    /// Default is a no-op for boards with a free-running oscillator.
    fn start_clock(&mut self, _hz: u32) -> Result<(), BusError> {
        Ok(())
    }

    /// Stop the master clock output
    fn stop_clock(&mut self) -> Result<(), BusError> {
        Ok(())
    }
}

/// In-memory bus that records what the chip would see
///
/// A byte is captured on every /WE rising edge while /CE is low, sampled
/// from D0 (bit 7) to D7 (bit 0), and applied to a [`RegisterFile`].
#[derive(Debug, Clone)]
pub struct RecordingBus {
    pins: PinMap,
    levels: BTreeMap<u8, Level>,
    outputs: BTreeSet<u8>,
    refused: BTreeSet<u8>,
    latched: Vec<u8>,
    pulse_widths: Vec<u32>,
    pulse_us: u32,
    registers: RegisterFile,
    clock_hz: Option<u32>,
    level_writes: usize,
    fail_after: Option<usize>,
}

impl RecordingBus {
    /// Bus wired according to `pins`
    pub fn new(pins: PinMap) -> Self {
        RecordingBus {
            pins,
            levels: BTreeMap::new(),
            outputs: BTreeSet::new(),
            refused: BTreeSet::new(),
            latched: Vec::new(),
            pulse_widths: Vec::new(),
            pulse_us: 0,
            registers: RegisterFile::new(),
            clock_hz: None,
            level_writes: 0,
            fail_after: None,
        }
    }

    /// Refuse to configure `pin` as an output
    pub fn refuse_pin(mut self, pin: u8) -> Self {
        self.refused.insert(pin);
        self
    }

    /// Fail every level change after `count` more successful ones
    pub fn fail_after(&mut self, count: usize) {
        self.fail_after = Some(self.level_writes + count);
    }

    /// Stop injecting failures
    pub fn clear_failure(&mut self) {
        self.fail_after = None;
    }

    /// Bytes latched so far
    pub fn latched(&self) -> &[u8] {
        &self.latched
    }

    /// Forget latched bytes and pulse widths (register state is kept)
    pub fn clear_latched(&mut self) {
        self.latched.clear();
        self.pulse_widths.clear();
    }

    /// Width in µs of every completed /WE low pulse
    pub fn pulse_widths(&self) -> &[u32] {
        &self.pulse_widths
    }

    /// Register state implied by the latched bytes
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Current level of a pin (`None` if never driven)
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.levels.get(&pin).copied()
    }

    /// Pins currently configured as outputs
    pub fn outputs(&self) -> impl Iterator<Item = u8> + '_ {
        self.outputs.iter().copied()
    }

    /// Running master clock, if started
    pub fn clock_hz(&self) -> Option<u32> {
        self.clock_hz
    }

    /// True when /WE and /CE are high and all data lines are low
    pub fn is_idle(&self) -> bool {
        self.level(self.pins.write_enable) == Some(Level::High)
            && self.level(self.pins.chip_enable) == Some(Level::High)
            && self
                .pins
                .data
                .iter()
                .all(|&pin| self.level(pin) == Some(Level::Low))
    }

    fn sample_data(&self) -> u8 {
        self.pins.data.iter().fold(0u8, |byte, &pin| {
            (byte << 1) | u8::from(self.level(pin) == Some(Level::High))
        })
    }
}

impl ChipBus for RecordingBus {
    fn configure_output(&mut self, pin: u8) -> Result<(), BusError> {
        if self.refused.contains(&pin) {
            return Err(BusError::UnsupportedPin { pin });
        }
        self.outputs.insert(pin);
        Ok(())
    }

    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), BusError> {
        if !self.outputs.contains(&pin) {
            return Err(BusError::PinLevel {
                pin,
                reason: "pin not configured as output".to_string(),
            });
        }
        if self.fail_after.is_some_and(|limit| self.level_writes >= limit) {
            return Err(BusError::PinLevel {
                pin,
                reason: "injected failure".to_string(),
            });
        }
        self.level_writes += 1;

        let previous = self.levels.insert(pin, level);
        if pin == self.pins.write_enable {
            match (previous, level) {
                (Some(Level::High), Level::Low) => self.pulse_us = 0,
                (Some(Level::Low), Level::High) => {
                    if self.level(self.pins.chip_enable) == Some(Level::Low) {
                        let byte = self.sample_data();
                        log::trace!("bus latched {byte:#010b}");
                        self.latched.push(byte);
                        self.registers.apply(byte);
                        self.pulse_widths.push(self.pulse_us);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn delay_us(&mut self, micros: u32) {
        if self.level(self.pins.write_enable) == Some(Level::Low) {
            self.pulse_us = self.pulse_us.saturating_add(micros);
        }
    }

    fn release_pin(&mut self, pin: u8) -> Result<(), BusError> {
        self.outputs.remove(&pin);
        self.levels.remove(&pin);
        Ok(())
    }

    fn start_clock(&mut self, hz: u32) -> Result<(), BusError> {
        self.clock_hz = Some(hz);
        Ok(())
    }

    fn stop_clock(&mut self) -> Result<(), BusError> {
        self.clock_hz = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured_bus() -> RecordingBus {
        let pins = PinMap::sequential(0);
        let mut bus = RecordingBus::new(pins.clone());
        for pin in pins.all() {
            bus.configure_output(pin).unwrap();
        }
        bus
    }

    #[test]
    fn test_latch_on_rising_write_enable() {
        let mut bus = configured_bus();
        let pins = PinMap::sequential(0);
        bus.set_level(pins.write_enable, Level::High).unwrap();
        bus.set_level(pins.chip_enable, Level::Low).unwrap();
        // 1001 0000: D0 and D3 high
        for (i, &pin) in pins.data.iter().enumerate() {
            bus.set_level(pin, Level::from(i == 0 || i == 3)).unwrap();
        }
        bus.set_level(pins.write_enable, Level::Low).unwrap();
        bus.delay_us(8);
        assert!(bus.latched().is_empty());
        bus.set_level(pins.write_enable, Level::High).unwrap();
        assert_eq!(bus.latched(), &[0b1001_0000]);
        assert_eq!(bus.pulse_widths(), &[8]);
    }

    #[test]
    fn test_no_latch_while_deselected() {
        let mut bus = configured_bus();
        let pins = PinMap::sequential(0);
        bus.set_level(pins.chip_enable, Level::High).unwrap();
        bus.set_level(pins.write_enable, Level::High).unwrap();
        bus.set_level(pins.write_enable, Level::Low).unwrap();
        bus.set_level(pins.write_enable, Level::High).unwrap();
        assert!(bus.latched().is_empty());
    }

    #[test]
    fn test_injected_failure() {
        let mut bus = configured_bus();
        bus.fail_after(1);
        assert!(bus.set_level(0, Level::High).is_ok());
        assert!(matches!(
            bus.set_level(0, Level::Low),
            Err(BusError::PinLevel { pin: 0, .. })
        ));
        bus.clear_failure();
        assert!(bus.set_level(0, Level::Low).is_ok());
    }

    #[test]
    fn test_unconfigured_and_refused_pins() {
        let mut bus = RecordingBus::new(PinMap::sequential(0)).refuse_pin(3);
        assert!(bus.set_level(0, Level::High).is_err());
        assert_eq!(
            bus.configure_output(3),
            Err(BusError::UnsupportedPin { pin: 3 })
        );
    }
}
