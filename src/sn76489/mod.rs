//! SN76489 PSG Register Protocol
//!
//! Encodes musical parameters into the chip's latch/data byte format and
//! clocks them onto the parallel bus.
//!
//! Implementation:
//! - `constants` - attenuation levels, bus timing, frequency quantizer
//! - `registers` - register codes, byte layout, shadow register file
//! - `chip` - the bus transaction protocol and public chip operations

pub mod chip;
pub mod constants;
pub mod registers;

// Re-export public API
pub use chip::Sn76489;
pub use constants::{FrequencyQuantizer, ATTENUATION_FULL_VOLUME, ATTENUATION_SILENCE};
pub use registers::{Channel, NoiseShift, NoiseType, Oscillator, RegisterFile};
