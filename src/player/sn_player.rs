//! SN76489 note player
//!
//! Binds a [`VoiceEngine`] to an [`Sn76489`] chip and converts the caller's
//! microsecond timestamps into whole-millisecond engine steps.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::engine::VoiceEngine;
use super::voice::Voice;
use super::{NoteConfig, PlayerConfig, TICK_PERIOD_US};
use crate::bus::ChipBus;
use crate::sn76489::{NoiseShift, NoiseType, Oscillator, Sn76489, ATTENUATION_SILENCE};
use crate::Result;

/// Tick-driven player over one SN76489
pub struct SnPlayer<B: ChipBus> {
    chip: Sn76489<B>,
    engine: VoiceEngine,
    last_tick_us: u64,
    started: bool,
}

impl<B: ChipBus> SnPlayer<B> {
    /// Configure the bus; the chip stays stopped until [`begin`](Self::begin)
    pub fn new(config: &PlayerConfig, bus: B) -> Result<Self> {
        let chip = Sn76489::new(&config.chip, bus)?;
        Ok(SnPlayer {
            chip,
            engine: VoiceEngine::new(config.voice_scan),
            last_tick_us: 0,
            started: false,
        })
    }

    /// Start the chip, silence it and take `now_us` as the tick reference
    pub fn begin(&mut self, now_us: u64) -> Result<()> {
        self.engine.reset();
        self.chip.begin()?;
        self.last_tick_us = now_us;
        self.started = true;
        log::info!("player started at {now_us} us");
        Ok(())
    }

    /// Silence everything and stop the chip
    pub fn end(&mut self) -> Result<()> {
        self.started = false;
        self.engine.reset();
        self.chip.end()?;
        log::info!("player stopped");
        Ok(())
    }

    /// True between [`begin`](Self::begin) and [`end`](Self::end)
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start a note on a free voice, or on `voice` if given and in range
    ///
    /// Returns the oscillator used, or `None` if every voice is busy. The
    /// chip is first written on the next tick.
    pub fn play_note(
        &mut self,
        frequency: f32,
        duration_ms: u32,
        config: &NoteConfig,
        voice: Option<usize>,
    ) -> Option<Oscillator> {
        self.engine.play_note(frequency, duration_ms, config, voice)
    }

    /// Periodic update, `now_us` from a monotonic clock
    ///
    /// Whole milliseconds since the previous tick are handed to the engine;
    /// the sub-millisecond remainder carries into the next tick.
    pub fn tick(&mut self, now_us: u64) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        if now_us < self.last_tick_us {
            log::warn!(
                "tick clock went backwards ({} < {} us), resetting reference",
                now_us,
                self.last_tick_us
            );
            self.last_tick_us = now_us;
            return Ok(());
        }

        let elapsed_ms = (now_us - self.last_tick_us) / TICK_PERIOD_US;
        self.last_tick_us += elapsed_ms * TICK_PERIOD_US;
        log::trace!("tick at {now_us} us: {elapsed_ms} ms");

        let elapsed = u32::try_from(elapsed_ms).unwrap_or(u32::MAX);
        self.engine.tick(elapsed, &mut self.chip)
    }

    /// Configure the noise generator
    pub fn set_noise(&mut self, noise_type: NoiseType, shift: NoiseShift) -> Result<()> {
        self.chip.set_noise(noise_type, shift)
    }

    /// Set noise attenuation; anything below silence marks the noise playing
    pub fn set_noise_attenuation(&mut self, level: u8) -> Result<()> {
        self.chip.set_noise_attenuation(level)?;
        let playing = level < ATTENUATION_SILENCE;
        if self.engine.noise().playing != playing {
            log::debug!("noise {}", if playing { "on" } else { "off" });
        }
        self.engine.noise_mut().playing = playing;
        Ok(())
    }

    /// Silence the noise channel
    pub fn mute_noise(&mut self) -> Result<()> {
        self.set_noise_attenuation(ATTENUATION_SILENCE)
    }

    /// True while noise attenuation is below silence
    pub fn is_noise_playing(&self) -> bool {
        self.engine.noise().playing
    }

    /// Voice bound to `oscillator`
    pub fn voice(&self, oscillator: Oscillator) -> &Voice {
        self.engine.voice(oscillator)
    }

    /// Voice engine
    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }

    /// Underlying chip
    pub fn chip(&self) -> &Sn76489<B> {
        &self.chip
    }

    /// Underlying chip, for direct register writes
    pub fn chip_mut(&mut self) -> &mut Sn76489<B> {
        &mut self.chip
    }
}

/// Player shared between the note-on caller and the tick source
///
/// `play_note` and `tick` are serialized by one mutex, so a note is never
/// half-started while a tick reads it.
pub struct SharedPlayer<B: ChipBus> {
    inner: Arc<Mutex<SnPlayer<B>>>,
}

impl<B: ChipBus> Clone for SharedPlayer<B> {
    fn clone(&self) -> Self {
        SharedPlayer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ChipBus> SharedPlayer<B> {
    /// Wrap a player
    pub fn new(player: SnPlayer<B>) -> Self {
        SharedPlayer {
            inner: Arc::new(Mutex::new(player)),
        }
    }

    /// See [`SnPlayer::play_note`]
    pub fn play_note(
        &self,
        frequency: f32,
        duration_ms: u32,
        config: &NoteConfig,
        voice: Option<usize>,
    ) -> Option<Oscillator> {
        self.inner.lock().play_note(frequency, duration_ms, config, voice)
    }

    /// See [`SnPlayer::tick`]
    pub fn tick(&self, now_us: u64) -> Result<()> {
        self.inner.lock().tick(now_us)
    }

    /// Exclusive access to the player
    pub fn lock(&self) -> MutexGuard<'_, SnPlayer<B>> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::RecordingBus;
    use crate::config::PinMap;
    use crate::player::EnvelopeConfig;

    fn player() -> SnPlayer<RecordingBus> {
        let config = PlayerConfig::new(PinMap::sequential(0));
        let bus = RecordingBus::new(config.chip.pins.clone());
        SnPlayer::new(&config, bus).unwrap()
    }

    fn short_note() -> NoteConfig {
        NoteConfig {
            envelope: EnvelopeConfig {
                attack: 2,
                decay: 2,
                sustain: 4,
                release: 2,
            },
            ..NoteConfig::default()
        }
    }

    #[test]
    fn test_tick_before_begin_is_ignored() {
        let mut p = player();
        p.play_note(440.0, 10, &short_note(), None);
        p.tick(5_000).unwrap();
        assert!(p.chip().bus().latched().is_empty());
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 0);
    }

    #[test]
    fn test_begin_silences_chip() {
        let mut p = player();
        p.begin(0).unwrap();
        assert_eq!(p.chip().bus().latched(), &[0x9F, 0xBF, 0xDF, 0xFF]);
        assert!(p.is_started());
    }

    #[test]
    fn test_sub_millisecond_remainder_carries() {
        let mut p = player();
        p.begin(0).unwrap();
        p.play_note(440.0, 100, &short_note(), None);

        p.tick(1_500).unwrap();
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 1);
        p.tick(2_400).unwrap();
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 2);
        p.tick(2_900).unwrap();
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 2);
        p.tick(3_000).unwrap();
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 3);
    }

    #[test]
    fn test_zero_elapsed_tick_still_writes() {
        let mut p = player();
        p.begin(0).unwrap();
        p.play_note(440.0, 100, &short_note(), None);
        p.chip_mut().bus_mut().clear_latched();
        p.tick(400).unwrap();
        assert!(!p.chip().bus().latched().is_empty());
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 0);
    }

    #[test]
    fn test_backwards_clock_resets_reference() {
        let mut p = player();
        p.begin(10_000).unwrap();
        p.play_note(440.0, 100, &short_note(), None);
        p.tick(5_000).unwrap();
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 0);
        p.tick(7_000).unwrap();
        assert_eq!(p.voice(Oscillator::Tone1).elapsed, 2);
    }

    #[test]
    fn test_noise_playing_tracks_attenuation() {
        let mut p = player();
        p.begin(0).unwrap();
        p.set_noise(NoiseType::White, NoiseShift::Div1024).unwrap();
        p.set_noise_attenuation(3).unwrap();
        assert!(p.is_noise_playing());
        assert_eq!(p.chip().bus().registers().attenuation[3], 3);

        p.mute_noise().unwrap();
        assert!(!p.is_noise_playing());
        assert_eq!(p.chip().bus().registers().attenuation[3], 15);
    }

    #[test]
    fn test_end_idles_voices() {
        let mut p = player();
        p.begin(0).unwrap();
        p.play_note(440.0, 100, &short_note(), None);
        p.tick(3_000).unwrap();
        p.end().unwrap();
        assert!(!p.engine().is_playing());
        assert!(!p.chip().is_running());
        assert_eq!(p.chip().bus().registers().attenuation, [15; 4]);
    }

    #[test]
    fn test_shared_player_across_threads() {
        let mut p = player();
        p.begin(0).unwrap();
        let shared = SharedPlayer::new(p);

        let ticker = shared.clone();
        let handle = std::thread::spawn(move || {
            for ms in 1..=50u64 {
                ticker.tick(ms * 1_000).unwrap();
            }
        });
        shared.play_note(440.0, 10, &short_note(), Some(1));
        handle.join().unwrap();

        let guard = shared.lock();
        let v = guard.voice(Oscillator::Tone2);
        assert_eq!(v.oscillator, Oscillator::Tone2);
        assert!(v.elapsed <= 50);
    }
}
