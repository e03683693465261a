//! Voice state
//!
//! A voice is the player's view of one tone oscillator: the note it is
//! playing, its ADSR countdown counters and how long the note has sounded.

use super::NoteConfig;
use crate::sn76489::Oscillator;

/// Envelope phase of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopePhase {
    /// Not sounding
    Idle,
    /// Ramping from silence to full volume
    Attack,
    /// Ramping from full volume to the sustain level
    Decay,
    /// Holding the sustain level
    Sustain,
    /// Ramping from the sustain level to silence
    Release,
}

/// Remaining time (ms) in each ADSR phase
///
/// Counters are consumed strictly in order; the first non-zero counter is
/// the active phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvelopeCounters {
    /// Attack time left
    pub attack_left: u32,
    /// Decay time left
    pub decay_left: u32,
    /// Sustain time left
    pub sustain_left: u32,
    /// Release time left
    pub release_left: u32,
}

impl EnvelopeCounters {
    /// Split a note duration across attack, decay and sustain
    ///
    /// Attack takes what it needs first, then decay from what is left; the
    /// rest is sustain. Release is never shortened by the note duration.
    pub fn for_note(duration: u32, config: &NoteConfig) -> Self {
        let env = &config.envelope;
        let attack_left = env.attack.min(duration);
        let remaining = duration - attack_left;
        let decay_left = env.decay.min(remaining);
        EnvelopeCounters {
            attack_left,
            decay_left,
            sustain_left: remaining - decay_left,
            release_left: env.release,
        }
    }

    /// Consume `elapsed` ms across the phases in order
    ///
    /// Returns the part of `elapsed` left over once every counter is zero.
    pub fn consume(&mut self, elapsed: u32) -> u32 {
        let mut to_consume = elapsed;
        for counter in [
            &mut self.attack_left,
            &mut self.decay_left,
            &mut self.sustain_left,
            &mut self.release_left,
        ] {
            let taken = (*counter).min(to_consume);
            *counter -= taken;
            to_consume -= taken;
        }
        to_consume
    }

    /// Sum of all counters
    pub fn total(&self) -> u64 {
        self.attack_left as u64
            + self.decay_left as u64
            + self.sustain_left as u64
            + self.release_left as u64
    }

    /// Active phase according to the counters alone
    pub fn phase(&self) -> EnvelopePhase {
        if self.attack_left > 0 {
            EnvelopePhase::Attack
        } else if self.decay_left > 0 {
            EnvelopePhase::Decay
        } else if self.sustain_left > 0 {
            EnvelopePhase::Sustain
        } else if self.release_left > 0 {
            EnvelopePhase::Release
        } else {
            EnvelopePhase::Idle
        }
    }
}

/// One tone voice
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// Oscillator this voice drives
    pub oscillator: Oscillator,
    /// Note configuration
    pub config: NoteConfig,
    /// ADSR countdown
    pub counters: EnvelopeCounters,
    /// Note frequency before vibrato, in Hz
    pub base_frequency: f32,
    /// Time since note-on, in ms
    pub elapsed: u32,
    /// Sounding (attack through release)
    pub playing: bool,
}

impl Voice {
    /// Idle voice bound to `oscillator`
    pub fn new(oscillator: Oscillator) -> Self {
        Voice {
            oscillator,
            config: NoteConfig::default(),
            counters: EnvelopeCounters::default(),
            base_frequency: 0.0,
            elapsed: 0,
            playing: false,
        }
    }

    /// (Re)start the voice with a new note
    pub fn start(&mut self, frequency: f32, duration: u32, config: &NoteConfig) {
        self.config = *config;
        self.counters = EnvelopeCounters::for_note(duration, config);
        self.base_frequency = frequency;
        self.elapsed = 0;
        self.playing = true;
    }

    /// Advance the note by `elapsed` ms
    ///
    /// Returns true when the voice ran out of envelope time with time left
    /// over; it is then idle.
    pub fn advance(&mut self, elapsed: u32) -> bool {
        if !self.playing {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(elapsed);
        if self.counters.consume(elapsed) > 0 {
            self.playing = false;
            return true;
        }
        false
    }

    /// Envelope phase, `Idle` whenever the voice is not playing
    pub fn phase(&self) -> EnvelopePhase {
        if self.playing {
            self.counters.phase()
        } else {
            EnvelopePhase::Idle
        }
    }

    /// Return to idle without touching the chip
    pub fn reset(&mut self) {
        *self = Voice::new(self.oscillator);
    }
}

/// Noise channel state (attenuation only, never ticked)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoiseVoice {
    /// Noise attenuation is below silence
    pub playing: bool,
}
