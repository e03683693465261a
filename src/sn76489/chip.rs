//! SN76489 register write protocol
//!
//! Each register write is a scoped bus transaction:
//!
//! 1. /CE low
//! 2. register-select nibble and payload driven onto D0-D7
//! 3. latch: /WE low for at least [`write_time_us`] (32 chip cycles), /WE high
//! 4. data lines back to 0, /CE high
//!
//! A failing pin write aborts the transaction; the bus is then put back to
//! idle on a best-effort basis before the error is returned.

use super::constants::{write_time_us, FrequencyQuantizer, ATTENUATION_SILENCE, MAX_DIVISOR};
use super::registers::{
    noise_control_nibble, select_nibble, Channel, NoiseShift, NoiseType, Oscillator,
};
use crate::backend::RegisterWriter;
use crate::bus::{ChipBus, Level};
use crate::config::{ChipConfig, PinMap};
use crate::{BusError, Result, Sn76489Error};

// Data line layout (D0 = MSB)
const SELECT_PIN: usize = 0; // D0-D3: latch marker + register code
const LOW_PAYLOAD_PIN: usize = 4; // D4-D7: low nibble payload
const HIGH_PAYLOAD_PIN: usize = 2; // D2-D7: high six divisor bits
const NOISE_CONTROL_PIN: usize = 5; // D5-D7: FB, NF1, NF0

/// SN76489 driven over a parallel bus
pub struct Sn76489<B: ChipBus> {
    bus: B,
    pins: PinMap,
    quantizer: FrequencyQuantizer,
    write_time_us: u32,
    running: bool,
}

impl<B: ChipBus> Sn76489<B> {
    /// Validate `config`, configure every pin as output and idle the bus
    pub fn new(config: &ChipConfig, mut bus: B) -> Result<Self> {
        config.validate()?;

        for pin in config.pins.all() {
            bus.configure_output(pin).map_err(|err| match err {
                BusError::UnsupportedPin { pin } => {
                    Sn76489Error::ConfigError(format!("pin {pin} cannot be driven as output"))
                }
                other => Sn76489Error::Bus(other),
            })?;
        }

        let mut chip = Sn76489 {
            bus,
            pins: config.pins.clone(),
            quantizer: FrequencyQuantizer::new(config.master_clock_hz),
            write_time_us: write_time_us(config.master_clock_hz),
            running: false,
        };
        chip.idle_bus()?;

        log::debug!(
            "SN76489 bus ready: clock {} Hz, write pulse {} us",
            config.master_clock_hz,
            chip.write_time_us
        );
        Ok(chip)
    }

    /// Start the master clock and silence every channel
    pub fn begin(&mut self) -> Result<()> {
        self.bus.start_clock(self.quantizer.master_clock_hz())?;
        self.running = true;
        self.mute_all()?;
        log::info!("SN76489 started");
        Ok(())
    }

    /// Silence every channel and stop the master clock
    pub fn end(&mut self) -> Result<()> {
        if self.running {
            self.mute_all()?;
        }
        self.bus.stop_clock()?;
        self.running = false;
        log::info!("SN76489 stopped");
        Ok(())
    }

    /// True between [`begin`](Self::begin) and [`end`](Self::end)
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Release every pin and hand the bus back
    pub fn into_bus(mut self) -> Result<B> {
        for pin in self.pins.all() {
            self.bus.release_pin(pin)?;
        }
        Ok(self.bus)
    }

    /// Underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying bus, mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Frequency quantizer for this chip's master clock
    pub fn quantizer(&self) -> FrequencyQuantizer {
        self.quantizer
    }

    /// /WE low time of every latch pulse, in µs
    pub fn write_time_us(&self) -> u32 {
        self.write_time_us
    }

    /// Set a tone oscillator's frequency in Hz
    pub fn set_tone(&mut self, oscillator: Oscillator, frequency: f32) -> Result<()> {
        let divisor = self.quantizer.quantize(frequency);
        self.write_tone_divisor(oscillator, divisor)
    }

    /// Write a raw divisor, low nibble then high six bits
    pub fn write_tone_divisor(&mut self, oscillator: Oscillator, divisor: u16) -> Result<()> {
        let divisor = divisor & MAX_DIVISOR;
        self.transaction(|chip| {
            chip.write_tone_register(oscillator)?;
            chip.write_frequency_low(divisor)
        })?;
        self.transaction(|chip| chip.write_frequency_high(divisor))
    }

    /// Update only the low four divisor bits of a tone
    pub fn adjust_tone_fine(&mut self, oscillator: Oscillator, frequency: f32) -> Result<()> {
        let divisor = self.quantizer.quantize(frequency);
        self.transaction(|chip| {
            chip.write_tone_register(oscillator)?;
            chip.write_frequency_low(divisor)
        })
    }

    /// Update only the high six divisor bits of the last latched tone
    pub fn adjust_last_tone(&mut self, frequency: f32) -> Result<()> {
        let divisor = self.quantizer.quantize(frequency);
        self.transaction(|chip| chip.write_frequency_high(divisor))
    }

    /// Set a tone's attenuation (0 = loudest, 15 = silent; higher clamps)
    pub fn set_tone_attenuation(&mut self, oscillator: Oscillator, level: u8) -> Result<()> {
        self.write_channel_attenuation(Channel::Tone(oscillator), level)
    }

    /// Silence a tone
    pub fn mute_tone(&mut self, oscillator: Oscillator) -> Result<()> {
        self.set_tone_attenuation(oscillator, ATTENUATION_SILENCE)
    }

    /// Select noise feedback type and shift rate
    pub fn set_noise(&mut self, noise_type: NoiseType, shift: NoiseShift) -> Result<()> {
        log::debug!("noise control: {noise_type:?} {shift:?}");
        self.transaction(|chip| {
            chip.write_noise_register()?;
            chip.write_noise_control(noise_type, shift)
        })
    }

    /// Set the noise channel's attenuation
    pub fn set_noise_attenuation(&mut self, level: u8) -> Result<()> {
        self.write_channel_attenuation(Channel::Noise, level)
    }

    /// Silence the noise channel
    pub fn mute_noise(&mut self) -> Result<()> {
        self.set_noise_attenuation(ATTENUATION_SILENCE)
    }

    /// Silence all tones and noise
    pub fn mute_all(&mut self) -> Result<()> {
        for osc in Oscillator::ALL {
            self.mute_tone(osc)?;
        }
        self.mute_noise()
    }

    fn write_channel_attenuation(&mut self, channel: Channel, level: u8) -> Result<()> {
        let level = level.min(ATTENUATION_SILENCE);
        self.transaction(|chip| {
            chip.write_register_select(channel, true)?;
            chip.write_attenuation(level)
        })
    }

    /// Run `fill` between chip select and latch, idling the bus on failure
    fn transaction<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let result = self.run_transaction(fill);
        if result.is_err() {
            self.release_bus();
        }
        result
    }

    fn run_transaction<F>(&mut self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.set_pin(self.pins.chip_enable, Level::Low)?;
        fill(self)?;
        self.latch()
    }

    /// Pulse /WE for the write time, then zero the data lines
    fn latch(&mut self) -> Result<()> {
        let we = self.pins.write_enable;
        self.set_pin(we, Level::High)?;
        self.set_pin(we, Level::Low)?;
        self.bus.delay_us(self.write_time_us);
        self.set_pin(we, Level::High)?;
        self.zero_data()?;
        self.set_pin(self.pins.chip_enable, Level::High)
    }

    fn write_tone_register(&mut self, oscillator: Oscillator) -> Result<()> {
        self.write_register_select(Channel::Tone(oscillator), false)
    }

    fn write_noise_register(&mut self) -> Result<()> {
        self.write_register_select(Channel::Noise, false)
    }

    fn write_register_select(&mut self, channel: Channel, attenuation: bool) -> Result<()> {
        let nibble = select_nibble(channel, attenuation);
        self.drive_bits(SELECT_PIN, 4, nibble as u16)
    }

    fn write_frequency_low(&mut self, divisor: u16) -> Result<()> {
        self.drive_bits(LOW_PAYLOAD_PIN, 4, divisor & 0x0F)
    }

    fn write_frequency_high(&mut self, divisor: u16) -> Result<()> {
        // D0 low marks a data byte
        self.drive_bits(SELECT_PIN, 1, 0)?;
        self.drive_bits(HIGH_PAYLOAD_PIN, 6, (divisor >> 4) & 0x3F)
    }

    fn write_attenuation(&mut self, level: u8) -> Result<()> {
        self.drive_bits(LOW_PAYLOAD_PIN, 4, level as u16)
    }

    fn write_noise_control(&mut self, noise_type: NoiseType, shift: NoiseShift) -> Result<()> {
        let nibble = noise_control_nibble(noise_type, shift);
        self.drive_bits(NOISE_CONTROL_PIN, 3, nibble as u16)
    }

    /// Drive `width` bits of `value` onto data lines starting at `first`
    ///
    /// The value's most significant bit lands on `first`.
    fn drive_bits(&mut self, first: usize, width: usize, value: u16) -> Result<()> {
        for i in 0..width {
            let pin = self.pins.data[first + width - 1 - i];
            self.set_pin(pin, Level::from((value >> i) & 1 != 0))?;
        }
        Ok(())
    }

    fn zero_data(&mut self) -> Result<()> {
        for i in 0..self.pins.data.len() {
            self.set_pin(self.pins.data[i], Level::Low)?;
        }
        Ok(())
    }

    fn idle_bus(&mut self) -> Result<()> {
        self.set_pin(self.pins.write_enable, Level::High)?;
        self.set_pin(self.pins.chip_enable, Level::High)?;
        self.zero_data()
    }

    fn release_bus(&mut self) {
        if let Err(err) = self.idle_bus() {
            log::warn!("could not return bus to idle: {err}");
        }
    }

    fn set_pin(&mut self, pin: u8, level: Level) -> Result<()> {
        self.bus.set_level(pin, level)?;
        Ok(())
    }
}

impl<B: ChipBus> RegisterWriter for Sn76489<B> {
    fn quantizer(&self) -> FrequencyQuantizer {
        self.quantizer
    }

    fn write_tone_divisor(&mut self, oscillator: Oscillator, divisor: u16) -> Result<()> {
        Sn76489::write_tone_divisor(self, oscillator, divisor)
    }

    fn set_tone_attenuation(&mut self, oscillator: Oscillator, level: u8) -> Result<()> {
        Sn76489::set_tone_attenuation(self, oscillator, level)
    }

    fn set_tone(&mut self, oscillator: Oscillator, frequency: f32) -> Result<()> {
        Sn76489::set_tone(self, oscillator, frequency)
    }
}
