//! Vibrato and tremolo
//!
//! Vibrato offsets the note frequency by a square wave whose amplitude
//! ramps in after a delay. Tremolo toggles divisor bits on a square wave,
//! an audible flutter that leaves the attenuation register alone.

use super::{TremoloConfig, VibratoConfig};
use crate::sn76489::constants::MAX_DIVISOR;

/// Vibrato amplitude ramp factor in `[0, 1]`
///
/// 0 up to and including `delay`, linear over `rise`, 1 afterwards.
pub fn vibrato_ramp(config: &VibratoConfig, elapsed: u32) -> f32 {
    let full_at = config.delay.saturating_add(config.rise);
    if elapsed > full_at {
        1.0
    } else if elapsed > config.delay {
        (elapsed - config.delay) as f32 / config.rise as f32
    } else {
        0.0
    }
}

/// True during the second half of a square-wave period
fn upper_half(elapsed: u32, period: u32) -> bool {
    elapsed % period > period / 2
}

/// Frequency offset in Hz at `elapsed` ms after note-on
pub fn vibrato_offset(config: &VibratoConfig, elapsed: u32) -> f32 {
    if config.period == 0 {
        return 0.0;
    }
    let sign = if upper_half(elapsed, config.period) {
        1.0
    } else {
        -1.0
    };
    vibrato_ramp(config, elapsed) * config.amplitude * sign
}

/// Note frequency with vibrato applied
pub fn vibrato_frequency(base_frequency: f32, config: &VibratoConfig, elapsed: u32) -> f32 {
    base_frequency + vibrato_offset(config, elapsed)
}

/// Divisor with the tremolo mask set or cleared
pub fn tremolo_divisor(config: &TremoloConfig, elapsed: u32, divisor: u16) -> u16 {
    if config.period == 0 {
        return divisor & MAX_DIVISOR;
    }
    let mask = config.bit_mask & MAX_DIVISOR;
    let divisor = if upper_half(elapsed, config.period) {
        divisor | mask
    } else {
        divisor & !mask
    };
    divisor & MAX_DIVISOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vibrato(delay: u32, amplitude: f32, rise: u32, period: u32) -> VibratoConfig {
        VibratoConfig {
            delay,
            amplitude,
            rise,
            period,
        }
    }

    #[test]
    fn test_no_offset_until_delay() {
        let cfg = vibrato(100, 8.0, 200, 40);
        for t in [0, 50, 99, 100] {
            assert_relative_eq!(vibrato_offset(&cfg, t), 0.0);
        }
    }

    #[test]
    fn test_ramp_is_linear() {
        let cfg = vibrato(100, 8.0, 200, 40);
        assert_relative_eq!(vibrato_ramp(&cfg, 150), 0.25);
        assert_relative_eq!(vibrato_ramp(&cfg, 200), 0.5);
        assert_relative_eq!(vibrato_ramp(&cfg, 300), 1.0);
        assert_relative_eq!(vibrato_ramp(&cfg, 5_000), 1.0);
    }

    #[test]
    fn test_full_amplitude_alternates() {
        let cfg = vibrato(0, 8.0, 0, 40);
        // elapsed % 40 > 20 → +amplitude
        assert_relative_eq!(vibrato_offset(&cfg, 1), -8.0);
        assert_relative_eq!(vibrato_offset(&cfg, 20), -8.0);
        assert_relative_eq!(vibrato_offset(&cfg, 21), 8.0);
        assert_relative_eq!(vibrato_offset(&cfg, 39), 8.0);
        assert_relative_eq!(vibrato_offset(&cfg, 40), -8.0);
        assert_relative_eq!(vibrato_offset(&cfg, 61), 8.0);
    }

    #[test]
    fn test_zero_period_disables_vibrato() {
        let cfg = vibrato(0, 8.0, 0, 0);
        assert_relative_eq!(vibrato_frequency(440.0, &cfg, 1234), 440.0);
    }

    #[test]
    fn test_tremolo_sets_then_clears_mask() {
        let cfg = TremoloConfig {
            period: 10,
            bit_mask: 0b11,
        };
        assert_eq!(tremolo_divisor(&cfg, 2, 0b1_0000_0001), 0b1_0000_0000);
        assert_eq!(tremolo_divisor(&cfg, 6, 0b1_0000_0001), 0b1_0000_0011);
        assert_eq!(tremolo_divisor(&cfg, 15, 0b1_0000_0000), 0b1_0000_0000);
        assert_eq!(tremolo_divisor(&cfg, 16, 0b1_0000_0000), 0b1_0000_0011);
    }

    #[test]
    fn test_tremolo_stays_in_ten_bits() {
        let cfg = TremoloConfig {
            period: 2,
            bit_mask: 0xFFFF,
        };
        assert_eq!(tremolo_divisor(&cfg, 1, 0), 0);
        assert_eq!(tremolo_divisor(&cfg, 0, 0x3FF), 0);
        let cfg = TremoloConfig {
            period: 4,
            bit_mask: 0xFFFF,
        };
        assert_eq!(tremolo_divisor(&cfg, 3, 0), 0x3FF);
    }

    #[test]
    fn test_zero_mask_leaves_divisor() {
        let cfg = TremoloConfig::default();
        for t in 0..300 {
            assert_eq!(tremolo_divisor(&cfg, t, 284), 284);
        }
    }
}
