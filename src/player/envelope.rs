//! ADSR attenuation envelope
//!
//! Attenuation is inverse volume: attack ramps 15 → 0, decay ramps
//! 0 → sustain, release ramps sustain → 15. Phases are evaluated in
//! attack, decay, sustain, release precedence; the first with time left wins.

use super::voice::EnvelopeCounters;
use super::EnvelopeConfig;
use crate::sn76489::ATTENUATION_SILENCE;

/// Result of one envelope evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeOutput {
    /// Attenuation to write this tick
    pub attenuation: u8,
    /// The note is over; the voice must go idle
    pub finished: bool,
}

/// Attenuation for the current counters
///
/// `finished` is set when release reaches silence, or when no phase has
/// time left.
pub fn evaluate(config: &EnvelopeConfig, counters: &EnvelopeCounters) -> EnvelopeOutput {
    let silence = ATTENUATION_SILENCE as u64;
    let sustain = config.sustain.min(ATTENUATION_SILENCE) as u64;

    let attenuation = if counters.attack_left > 0 {
        let total = config.attack.max(counters.attack_left) as u64;
        silence * counters.attack_left as u64 / total
    } else if counters.decay_left > 0 {
        let total = config.decay.max(counters.decay_left) as u64;
        sustain * (total - counters.decay_left as u64) / total
    } else if counters.sustain_left > 0 {
        sustain
    } else if counters.release_left > 0 {
        let total = config.release.max(counters.release_left) as u64;
        let level = sustain + (silence - sustain) * (total - counters.release_left as u64) / total;
        return EnvelopeOutput {
            attenuation: level as u8,
            finished: level >= silence,
        };
    } else {
        return EnvelopeOutput {
            attenuation: ATTENUATION_SILENCE,
            finished: true,
        };
    };

    EnvelopeOutput {
        attenuation: attenuation as u8,
        finished: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::NoteConfig;

    fn env(attack: u32, decay: u32, sustain: u8, release: u32) -> EnvelopeConfig {
        EnvelopeConfig {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Attenuation samples at 1 ms steps until the envelope finishes
    fn run(config: EnvelopeConfig, duration: u32) -> Vec<(EnvelopeOutput, EnvelopeCounters)> {
        let note = NoteConfig {
            envelope: config,
            ..NoteConfig::default()
        };
        let mut counters = EnvelopeCounters::for_note(duration, &note);
        let mut out = Vec::new();
        loop {
            let sample = evaluate(&config, &counters);
            out.push((sample, counters));
            if sample.finished {
                return out;
            }
            counters.consume(1);
        }
    }

    #[test]
    fn test_attack_starts_silent_and_rises() {
        let samples = run(env(10, 10, 6, 10), 100);
        assert_eq!(samples[0].0.attenuation, 15);
        let attack: Vec<u8> = samples
            .iter()
            .filter(|(_, c)| c.attack_left > 0)
            .map(|(s, _)| s.attenuation)
            .collect();
        assert_eq!(attack.len(), 10);
        assert!(attack.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_decay_ramps_to_sustain() {
        let samples = run(env(10, 10, 6, 10), 100);
        let decay: Vec<u8> = samples
            .iter()
            .filter(|(_, c)| c.attack_left == 0 && c.decay_left > 0)
            .map(|(s, _)| s.attenuation)
            .collect();
        assert_eq!(decay[0], 0);
        assert!(decay.windows(2).all(|w| w[1] >= w[0]));
        assert!(decay.iter().all(|&a| a <= 6));
    }

    #[test]
    fn test_sustain_constant() {
        let samples = run(env(10, 10, 6, 10), 100);
        assert!(samples
            .iter()
            .filter(|(_, c)| c.phase() == crate::player::EnvelopePhase::Sustain)
            .all(|(s, _)| s.attenuation == 6));
    }

    #[test]
    fn test_release_ramps_to_silence() {
        let samples = run(env(10, 10, 6, 10), 100);
        let release: Vec<u8> = samples
            .iter()
            .filter(|(_, c)| c.phase() == crate::player::EnvelopePhase::Release)
            .map(|(s, _)| s.attenuation)
            .collect();
        assert_eq!(release.len(), 10);
        assert_eq!(release[0], 6);
        assert!(release.windows(2).all(|w| w[1] >= w[0]));
        assert!(release.iter().all(|&a| a < 15));

        let (last, counters) = samples.last().copied().unwrap();
        assert!(last.finished);
        assert_eq!(last.attenuation, 15);
        assert_eq!(counters.total(), 0);
        // 10 + 10 + 80 + 10 ms after note-on
        assert_eq!(samples.len(), 111);
    }

    #[test]
    fn test_silent_sustain_finishes_at_release_start() {
        let config = env(0, 0, 15, 10);
        let counters = EnvelopeCounters {
            release_left: 10,
            ..EnvelopeCounters::default()
        };
        let out = evaluate(&config, &counters);
        assert_eq!(out.attenuation, 15);
        assert!(out.finished);
    }

    #[test]
    fn test_sustain_above_silence_clamped() {
        let config = env(0, 0, 255, 0);
        let counters = EnvelopeCounters {
            sustain_left: 5,
            ..EnvelopeCounters::default()
        };
        assert_eq!(evaluate(&config, &counters).attenuation, 15);
    }

    #[test]
    fn test_exhausted_counters_finish() {
        let out = evaluate(&env(10, 10, 4, 10), &EnvelopeCounters::default());
        assert_eq!(
            out,
            EnvelopeOutput {
                attenuation: 15,
                finished: true
            }
        );
    }
}
