//! SN76489 Hardware Constants
//!
//! Attenuation levels, bus timing and the frequency quantizer.

/// Attenuation register value for silence
pub const ATTENUATION_SILENCE: u8 = 0b1111;

/// Attenuation register value for full volume
pub const ATTENUATION_FULL_VOLUME: u8 = 0b0000;

/// Largest tone divisor the 10-bit register can hold
pub const MAX_DIVISOR: u16 = 0b11_1111_1111;

/// Smallest useful tone divisor
pub const MIN_DIVISOR: u16 = 1;

/// Default master clock (4 MHz)
pub const DEFAULT_MASTER_CLOCK: u32 = 4_000_000;

/// Highest master clock the chip accepts
pub const MAX_MASTER_CLOCK: u32 = 4_000_000;

/// Chip cycles the data bus must be held stable while /WE is low
pub const WRITE_TIME_CYCLES: u32 = 32;

/// The tone generator divides the master clock by 32 before the divisor
const CLOCK_PRESCALER: f64 = 32.0;

/// Minimum /WE low time in microseconds for a given master clock
///
/// Rounded up and never below 1 µs.
pub fn write_time_us(master_clock_hz: u32) -> u32 {
    let cycles_us = WRITE_TIME_CYCLES as u64 * 1_000_000;
    let clock = master_clock_hz.max(1) as u64;
    (cycles_us.div_ceil(clock) as u32).max(1)
}

/// Maps tone frequencies to 10-bit divisor register values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyQuantizer {
    master_clock_hz: u32,
}

impl FrequencyQuantizer {
    /// Quantizer for the given master clock
    pub fn new(master_clock_hz: u32) -> Self {
        FrequencyQuantizer {
            master_clock_hz: master_clock_hz.max(1),
        }
    }

    /// Master clock in Hz
    pub fn master_clock_hz(&self) -> u32 {
        self.master_clock_hz
    }

    /// Lowest representable frequency (divisor 1023)
    pub fn min_freq(&self) -> f32 {
        (self.master_clock_hz as f64 / (CLOCK_PRESCALER * MAX_DIVISOR as f64)) as f32
    }

    /// Highest representable frequency (divisor 1)
    pub fn max_freq(&self) -> f32 {
        (self.master_clock_hz as f64 / (CLOCK_PRESCALER * MIN_DIVISOR as f64)) as f32
    }

    /// Divisor for a frequency in Hz
    ///
    /// Out-of-range input is clamped; zero, negative and NaN frequencies map
    /// to the maximum divisor.
    pub fn quantize(&self, frequency: f32) -> u16 {
        let min = self.min_freq();
        let max = self.max_freq();
        let clamped = if !(frequency > min) {
            min
        } else if frequency > max {
            max
        } else {
            frequency
        };
        let divisor = (self.master_clock_hz as f64 / (CLOCK_PRESCALER * clamped as f64)).round();
        (divisor as u16).clamp(MIN_DIVISOR, MAX_DIVISOR) & MAX_DIVISOR
    }

    /// Frequency produced by a divisor, in Hz
    pub fn frequency_of(&self, divisor: u16) -> f32 {
        let divisor = (divisor & MAX_DIVISOR).max(MIN_DIVISOR);
        (self.master_clock_hz as f64 / (CLOCK_PRESCALER * divisor as f64)) as f32
    }
}

impl Default for FrequencyQuantizer {
    fn default() -> Self {
        Self::new(DEFAULT_MASTER_CLOCK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_range_bounds() {
        let q = FrequencyQuantizer::default();
        assert_eq!(q.quantize(q.min_freq()), 1023);
        assert_eq!(q.quantize(q.max_freq()), 1);
        assert_relative_eq!(q.min_freq(), 122.189, epsilon = 0.01);
        assert_relative_eq!(q.max_freq(), 125_000.0, epsilon = 0.5);
    }

    #[test]
    fn test_out_of_range_clamps() {
        let q = FrequencyQuantizer::default();
        assert_eq!(q.quantize(1.0), 1023);
        assert_eq!(q.quantize(0.0), 1023);
        assert_eq!(q.quantize(-440.0), 1023);
        assert_eq!(q.quantize(f32::NAN), 1023);
        assert_eq!(q.quantize(1_000_000.0), 1);
        assert_eq!(q.quantize(f32::INFINITY), 1);
    }

    #[test]
    fn test_a4() {
        // 4 MHz / (32 * 440) = 284.09
        assert_eq!(FrequencyQuantizer::default().quantize(440.0), 284);
        // 3.579545 MHz / (32 * 440) = 254.23
        assert_eq!(FrequencyQuantizer::new(3_579_545).quantize(440.0), 254);
    }

    #[test]
    fn test_monotonic_non_increasing() {
        let q = FrequencyQuantizer::default();
        let mut last = u16::MAX;
        let mut f = 50.0f32;
        while f < 200_000.0 {
            let d = q.quantize(f);
            assert!(d <= last, "divisor rose from {last} to {d} at {f} Hz");
            last = d;
            f *= 1.01;
        }
    }

    #[test]
    fn test_frequency_of_inverts_quantize() {
        let q = FrequencyQuantizer::default();
        for divisor in [1u16, 2, 284, 500, 1023] {
            assert_eq!(q.quantize(q.frequency_of(divisor)), divisor);
        }
    }

    #[test]
    fn test_write_time() {
        assert_eq!(write_time_us(4_000_000), 8);
        // 32 cycles at 3.579545 MHz = 8.94 µs, rounded up
        assert_eq!(write_time_us(3_579_545), 9);
        assert_eq!(write_time_us(u32::MAX), 1);
    }
}
