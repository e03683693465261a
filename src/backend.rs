//! Register writer capability
//!
//! The note player never owns the chip protocol; it borrows something that
//! can write tone and attenuation registers. [`Sn76489`](crate::Sn76489)
//! is the hardware implementation, tests substitute recorders.

use crate::sn76489::{FrequencyQuantizer, Oscillator, ATTENUATION_SILENCE};
use crate::Result;

/// Tone register writes used by the note player
///
/// # Example
///
/// ```
/// use sn76489::{ChipConfig, Oscillator, PinMap, RecordingBus, RegisterWriter, Sn76489};
///
/// fn beep<W: RegisterWriter>(writer: &mut W) -> sn76489::Result<()> {
///     writer.set_tone(Oscillator::Tone1, 880.0)?;
///     writer.set_tone_attenuation(Oscillator::Tone1, 2)
/// }
///
/// let config = ChipConfig::new(PinMap::sequential(0));
/// let mut chip = Sn76489::new(&config, RecordingBus::new(config.pins.clone())).unwrap();
/// beep(&mut chip).unwrap();
/// assert_eq!(chip.bus().registers().attenuation[0], 2);
/// ```
pub trait RegisterWriter {
    /// Quantizer matching the chip's master clock
    fn quantizer(&self) -> FrequencyQuantizer;

    /// Write a raw 10-bit divisor (low nibble, then high six bits)
    ///
    /// Bypasses the quantizer's clamp.
    fn write_tone_divisor(&mut self, oscillator: Oscillator, divisor: u16) -> Result<()>;

    /// Write an attenuation level (0 = loudest, 15 = silent)
    fn set_tone_attenuation(&mut self, oscillator: Oscillator, level: u8) -> Result<()>;

    /// Quantize and write a frequency in Hz
    fn set_tone(&mut self, oscillator: Oscillator, frequency: f32) -> Result<()> {
        let divisor = self.quantizer().quantize(frequency);
        self.write_tone_divisor(oscillator, divisor)
    }

    /// Silence a tone oscillator
    fn mute_tone(&mut self, oscillator: Oscillator) -> Result<()> {
        self.set_tone_attenuation(oscillator, ATTENUATION_SILENCE)
    }
}
