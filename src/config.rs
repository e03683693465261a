//! Chip configuration
//!
//! Master clock frequency and pin identities. Pins are opaque numbers to the
//! driver; the only requirement is that all ten lines are distinct and the
//! [`ChipBus`](crate::ChipBus) can drive them as outputs.

use serde::{Deserialize, Serialize};

use crate::sn76489::constants::{DEFAULT_MASTER_CLOCK, MAX_MASTER_CLOCK};
use crate::{Result, Sn76489Error};

/// Number of parallel data lines (D0-D7)
pub const DATA_PIN_COUNT: usize = 8;

/// Pin assignment for the chip's control and data lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap {
    /// Active-low write enable (/WE)
    pub write_enable: u8,
    /// Active-low chip enable (/CE)
    pub chip_enable: u8,
    /// Data lines D0..D7. D0 is the chip's most significant bit.
    pub data: [u8; DATA_PIN_COUNT],
}

impl PinMap {
    /// Ten consecutive pins: /WE, /CE, then D0..D7
    pub fn sequential(first: u8) -> Self {
        let mut data = [0u8; DATA_PIN_COUNT];
        for (i, pin) in data.iter_mut().enumerate() {
            *pin = first.wrapping_add(2 + i as u8);
        }
        PinMap {
            write_enable: first,
            chip_enable: first.wrapping_add(1),
            data,
        }
    }

    /// All pins, control lines first
    pub fn all(&self) -> impl Iterator<Item = u8> + '_ {
        [self.write_enable, self.chip_enable]
            .into_iter()
            .chain(self.data.iter().copied())
    }

    fn find_duplicate(&self) -> Option<u8> {
        let pins: Vec<u8> = self.all().collect();
        pins.iter()
            .enumerate()
            .find(|(i, pin)| pins[i + 1..].contains(pin))
            .map(|(_, &pin)| pin)
    }
}

/// Chip configuration consumed from the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipConfig {
    /// Master clock frequency fed to the chip, in Hz
    #[serde(default = "default_master_clock")]
    pub master_clock_hz: u32,
    /// Control and data pin identities
    pub pins: PinMap,
}

fn default_master_clock() -> u32 {
    DEFAULT_MASTER_CLOCK
}

impl ChipConfig {
    /// Configuration with the default 4 MHz master clock
    pub fn new(pins: PinMap) -> Self {
        ChipConfig {
            master_clock_hz: DEFAULT_MASTER_CLOCK,
            pins,
        }
    }

    /// Override the master clock frequency
    pub fn with_master_clock(mut self, hz: u32) -> Self {
        self.master_clock_hz = hz;
        self
    }

    /// Check clock range and pin uniqueness
    pub fn validate(&self) -> Result<()> {
        if self.master_clock_hz == 0 || self.master_clock_hz > MAX_MASTER_CLOCK {
            return Err(Sn76489Error::ConfigError(format!(
                "master clock {} Hz outside 1..={} Hz",
                self.master_clock_hz, MAX_MASTER_CLOCK
            )));
        }
        if let Some(pin) = self.pins.find_duplicate() {
            return Err(Sn76489Error::ConfigError(format!(
                "pin {pin} assigned to more than one line"
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ChipConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
