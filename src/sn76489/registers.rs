//! SN76489 Register Definitions
//!
//! The chip has eight write-only registers addressed by a 3-bit code: a
//! tone divisor and an attenuation register for each of the three tone
//! generators, plus noise control and noise attenuation.
//!
//! Writes are one or two bytes:
//! - Latch byte: `1 r2 r1 r0 d3 d2 d1 d0` selects a register and carries
//!   its low nibble.
//! - Data byte: `0 x d9 d8 d7 d6 d5 d4` carries the high six divisor bits
//!   of the most recently latched register.

use std::fmt;

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use super::constants::{ATTENUATION_SILENCE, MAX_DIVISOR};

bitflags! {
    /// Control bits of the register-select nibble
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SelectBits: u8 {
        /// Marks a latch byte (D0 high)
        const LATCH = 0b1000;
        /// Selects the attenuation register of the channel
        const ATTENUATION = 0b0001;
    }
}

/// Tone oscillator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
pub enum Oscillator {
    /// Tone generator 1
    Tone1 = 0,
    /// Tone generator 2
    Tone2 = 1,
    /// Tone generator 3
    Tone3 = 2,
}

impl Oscillator {
    /// All oscillators in register order
    pub const ALL: [Oscillator; 3] = [Oscillator::Tone1, Oscillator::Tone2, Oscillator::Tone3];

    /// Oscillator for a voice index (0-2)
    pub fn from_index(index: usize) -> Option<Self> {
        Oscillator::from_usize(index)
    }

    /// Voice index (0-2)
    pub fn index(self) -> usize {
        self as usize
    }

    /// 3-bit register code of the tone divisor register
    pub fn register_code(self) -> u8 {
        (self as u8) << 1
    }
}

impl fmt::Display for Oscillator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tone {}", self.index() + 1)
    }
}

/// Addressable sound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// One of the tone generators
    Tone(Oscillator),
    /// The noise generator
    Noise,
}

impl Channel {
    const NOISE_CODE: u8 = 0b110;

    /// 3-bit register code (frequency / control register of the channel)
    pub fn register_code(self) -> u8 {
        match self {
            Channel::Tone(osc) => osc.register_code(),
            Channel::Noise => Self::NOISE_CODE,
        }
    }

    /// Index into attenuation tables (tones 0-2, noise 3)
    pub fn index(self) -> usize {
        match self {
            Channel::Tone(osc) => osc.index(),
            Channel::Noise => 3,
        }
    }
}

/// Noise feedback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize, Deserialize)]
pub enum NoiseType {
    /// Periodic (buzz) noise
    Periodic = 0,
    /// White noise
    White = 1,
}

/// Noise shift rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Serialize, Deserialize)]
pub enum NoiseShift {
    /// Master clock / 512
    Div512 = 0,
    /// Master clock / 1024
    Div1024 = 1,
    /// Master clock / 2048
    Div2048 = 2,
    /// Follow tone generator 3
    Tone3 = 3,
}

/// Register-select nibble for a channel
pub fn select_nibble(channel: Channel, attenuation: bool) -> u8 {
    let mut bits = SelectBits::LATCH;
    bits.set(SelectBits::ATTENUATION, attenuation);
    bits.bits() | channel.register_code()
}

/// Noise control nibble: `0 FB NF1 NF0`
pub fn noise_control_nibble(noise_type: NoiseType, shift: NoiseShift) -> u8 {
    ((noise_type as u8) << 2) | shift as u8
}

/// Latch byte carrying the low four divisor bits
pub fn frequency_low_byte(channel: Channel, divisor: u16) -> u8 {
    (select_nibble(channel, false) << 4) | (divisor & 0x0F) as u8
}

/// Data byte carrying the high six divisor bits
pub fn frequency_high_byte(divisor: u16) -> u8 {
    ((divisor & MAX_DIVISOR) >> 4) as u8 & 0x3F
}

/// Latch byte writing an attenuation level
pub fn attenuation_byte(channel: Channel, level: u8) -> u8 {
    (select_nibble(channel, true) << 4) | (level & ATTENUATION_SILENCE)
}

/// Latch byte writing the noise control register
pub fn noise_control_byte(noise_type: NoiseType, shift: NoiseShift) -> u8 {
    (select_nibble(Channel::Noise, false) << 4) | noise_control_nibble(noise_type, shift)
}

/// Shadow of the chip's register state
///
/// Applies latched bytes the way the chip does, including data bytes that
/// follow a latch byte. Registers power up silent with zero divisors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterFile {
    /// Tone divisors (10 bits)
    pub tone: [u16; 3],
    /// Attenuation per channel (tones 0-2, noise 3)
    pub attenuation: [u8; 4],
    /// Noise control nibble
    pub noise_control: u8,
    latched: u8,
}

impl RegisterFile {
    /// All channels silent, zero divisors
    pub fn new() -> Self {
        RegisterFile {
            tone: [0; 3],
            attenuation: [ATTENUATION_SILENCE; 4],
            noise_control: 0,
            latched: 0,
        }
    }

    /// Apply one byte as sampled from the data bus
    pub fn apply(&mut self, byte: u8) {
        if byte & 0x80 != 0 {
            self.latched = (byte >> 4) & 0b111;
            self.write_latched(byte & 0x0F, false);
        } else {
            self.write_latched(byte & 0x3F, true);
        }
    }

    fn write_latched(&mut self, payload: u8, data_byte: bool) {
        let reg = self.latched;
        let channel = (reg >> 1) as usize;
        if reg & SelectBits::ATTENUATION.bits() != 0 {
            self.attenuation[channel] = payload & ATTENUATION_SILENCE;
        } else if channel == 3 {
            self.noise_control = payload & 0b111;
        } else if data_byte {
            self.tone[channel] = (self.tone[channel] & 0x0F) | ((payload as u16) << 4);
        } else {
            self.tone[channel] = (self.tone[channel] & !0x0F) | payload as u16;
        }
    }

    /// Attenuation of a channel
    pub fn attenuation_of(&self, channel: Channel) -> u8 {
        self.attenuation[channel.index()]
    }

    /// Noise type currently selected
    pub fn noise_type(&self) -> NoiseType {
        NoiseType::from_u8((self.noise_control >> 2) & 1).unwrap_or(NoiseType::Periodic)
    }

    /// Noise shift rate currently selected
    pub fn noise_shift(&self) -> NoiseShift {
        NoiseShift::from_u8(self.noise_control & 0b11).unwrap_or(NoiseShift::Div512)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (divisor, att)) in self.tone.iter().zip(self.attenuation).enumerate() {
            write!(f, "T{}={:4}/{:2}  ", i + 1, divisor, att)?;
        }
        write!(
            f,
            "N={:?}/{:?}/{:2}",
            self.noise_type(),
            self.noise_shift(),
            self.attenuation[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_codes() {
        assert_eq!(Channel::Tone(Oscillator::Tone1).register_code(), 0b000);
        assert_eq!(Channel::Tone(Oscillator::Tone2).register_code(), 0b010);
        assert_eq!(Channel::Tone(Oscillator::Tone3).register_code(), 0b100);
        assert_eq!(Channel::Noise.register_code(), 0b110);
    }

    #[test]
    fn test_oscillator_index_conversion() {
        assert_eq!(Oscillator::from_index(0), Some(Oscillator::Tone1));
        assert_eq!(Oscillator::from_index(2), Some(Oscillator::Tone3));
        assert_eq!(Oscillator::from_index(3), None);
    }

    #[test]
    fn test_latch_byte_layout() {
        // 1 000 1110: tone 1, low nibble of 0x3FE
        assert_eq!(
            frequency_low_byte(Channel::Tone(Oscillator::Tone1), 0x3FE),
            0b1000_1110
        );
        // 0 0 111111: high six bits
        assert_eq!(frequency_high_byte(0x3FE), 0b0011_1111);
        // 1 011 0101: tone 2 attenuation 5
        assert_eq!(
            attenuation_byte(Channel::Tone(Oscillator::Tone2), 5),
            0b1011_0101
        );
        // 1 111 1111: noise attenuation silent
        assert_eq!(attenuation_byte(Channel::Noise, 15), 0xFF);
        // 1 110 0 1 10: white noise, /2048
        assert_eq!(
            noise_control_byte(NoiseType::White, NoiseShift::Div2048),
            0b1110_0110
        );
    }

    #[test]
    fn test_register_file_tracks_two_byte_tone_write() {
        let mut regs = RegisterFile::new();
        let channel = Channel::Tone(Oscillator::Tone3);
        regs.apply(frequency_low_byte(channel, 284));
        regs.apply(frequency_high_byte(284));
        assert_eq!(regs.tone, [0, 0, 284]);
    }

    #[test]
    fn test_register_file_attenuation_and_noise() {
        let mut regs = RegisterFile::new();
        assert_eq!(regs.attenuation, [15; 4]);

        regs.apply(attenuation_byte(Channel::Tone(Oscillator::Tone2), 3));
        assert_eq!(regs.attenuation_of(Channel::Tone(Oscillator::Tone2)), 3);

        regs.apply(noise_control_byte(NoiseType::White, NoiseShift::Tone3));
        assert_eq!(regs.noise_type(), NoiseType::White);
        assert_eq!(regs.noise_shift(), NoiseShift::Tone3);
    }

    #[test]
    fn test_data_byte_updates_last_latched_tone_only() {
        let mut regs = RegisterFile::new();
        regs.apply(frequency_low_byte(Channel::Tone(Oscillator::Tone1), 0x00F));
        regs.apply(frequency_low_byte(Channel::Tone(Oscillator::Tone2), 0x001));
        regs.apply(frequency_high_byte(0x3F0));
        assert_eq!(regs.tone[0], 0x00F);
        assert_eq!(regs.tone[1], 0x3F1);
    }
}
