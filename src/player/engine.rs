//! Voice engine
//!
//! Owns the three tone voices and the noise voice. [`VoiceEngine::tick`]
//! is the per-tick update: advance every voice's time, then for each
//! playing voice write vibrato frequency, tremolo divisor and envelope
//! attenuation through a [`RegisterWriter`].
//!
//! The engine holds no reference to the chip; the writer is lent to it for
//! the duration of a tick, and each voice's writes complete before the next
//! voice starts.

use serde::{Deserialize, Serialize};

use super::envelope;
use super::modulation::{tremolo_divisor, vibrato_frequency};
use super::voice::{NoiseVoice, Voice};
use super::NoteConfig;
use crate::backend::RegisterWriter;
use crate::sn76489::Oscillator;
use crate::Result;

/// Number of tone voices
pub const VOICE_COUNT: usize = 3;

/// Which voices a tick updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceScan {
    /// Update every playing voice, skipping idle ones
    #[default]
    All,
    /// Stop at the first idle voice, in oscillator order
    ///
    /// Playing voices behind an idle one still age but receive no register
    /// writes. Kept for compatibility with players that relied on it.
    StopAtFirstIdle,
}

/// Three tone voices plus the noise channel
#[derive(Debug, Clone)]
pub struct VoiceEngine {
    voices: [Voice; VOICE_COUNT],
    noise: NoiseVoice,
    scan: VoiceScan,
}

impl Default for VoiceEngine {
    fn default() -> Self {
        Self::new(VoiceScan::default())
    }
}

impl VoiceEngine {
    /// All voices idle
    pub fn new(scan: VoiceScan) -> Self {
        VoiceEngine {
            voices: Oscillator::ALL.map(Voice::new),
            noise: NoiseVoice::default(),
            scan,
        }
    }

    /// Scan policy in use
    pub fn scan(&self) -> VoiceScan {
        self.scan
    }

    /// Voice bound to `oscillator`
    pub fn voice(&self, oscillator: Oscillator) -> &Voice {
        &self.voices[oscillator.index()]
    }

    /// All tone voices in oscillator order
    pub fn voices(&self) -> &[Voice; VOICE_COUNT] {
        &self.voices
    }

    /// Noise channel state
    pub fn noise(&self) -> &NoiseVoice {
        &self.noise
    }

    pub(crate) fn noise_mut(&mut self) -> &mut NoiseVoice {
        &mut self.noise
    }

    /// True if any tone voice is sounding
    pub fn is_playing(&self) -> bool {
        self.voices.iter().any(|v| v.playing)
    }

    /// Idle every voice
    pub fn reset(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.reset();
        }
        self.noise = NoiseVoice::default();
    }

    /// Start a note
    ///
    /// `requested` in `0..3` targets that voice even if it is sounding.
    /// Otherwise the first idle voice is used; if there is none the note
    /// is dropped and `None` returned.
    pub fn play_note(
        &mut self,
        frequency: f32,
        duration: u32,
        config: &NoteConfig,
        requested: Option<usize>,
    ) -> Option<Oscillator> {
        let index = match requested.filter(|&i| i < VOICE_COUNT) {
            Some(index) => index,
            None => match self.voices.iter().position(|v| !v.playing) {
                Some(index) => index,
                None => {
                    log::debug!("no free voice, dropping {frequency} Hz note");
                    return None;
                }
            },
        };

        let voice = &mut self.voices[index];
        voice.start(frequency, duration, config);
        log::debug!(
            "{}: note {} Hz for {} ms ({:?})",
            voice.oscillator,
            frequency,
            duration,
            voice.counters
        );
        Some(voice.oscillator)
    }

    /// Advance time by `elapsed` ms and write every voice's registers
    pub fn tick<W: RegisterWriter>(&mut self, elapsed: u32, writer: &mut W) -> Result<()> {
        for voice in self.voices.iter_mut() {
            if voice.advance(elapsed) {
                log::debug!("{}: out of envelope time", voice.oscillator);
                writer.mute_tone(voice.oscillator)?;
            }
        }

        let scan = self.scan;
        for voice in self.voices.iter_mut() {
            if !voice.playing {
                match scan {
                    VoiceScan::All => continue,
                    VoiceScan::StopAtFirstIdle => break,
                }
            }
            Self::update_voice(voice, writer)?;
        }
        Ok(())
    }

    fn update_voice<W: RegisterWriter>(voice: &mut Voice, writer: &mut W) -> Result<()> {
        let osc = voice.oscillator;

        let frequency = vibrato_frequency(voice.base_frequency, &voice.config.vibrato, voice.elapsed);
        writer.set_tone(osc, frequency)?;

        let divisor = writer.quantizer().quantize(frequency);
        let divisor = tremolo_divisor(&voice.config.tremolo, voice.elapsed, divisor);
        writer.write_tone_divisor(osc, divisor)?;

        let out = envelope::evaluate(&voice.config.envelope, &voice.counters);
        if out.finished {
            voice.playing = false;
            log::debug!("{osc}: released after {} ms", voice.elapsed);
        }
        writer.set_tone_attenuation(osc, out.attenuation)
    }
}
