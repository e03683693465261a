//! SN76489 PSG driver and note player
//!
//! Drives a Texas Instruments SN76489 Programmable Sound Generator (three
//! square-wave tone oscillators plus one noise channel) over its 8-bit
//! parallel data bus, and layers a tick-driven polyphonic note player on top
//! that synthesizes ADSR envelopes, vibrato and a divisor-bit tremolo.
//!
//! # Features
//! - Bit-exact register write protocol (latch byte + data byte) with a timed
//!   write-enable pulse
//! - Frequency quantizer mapping Hz to the chip's 10-bit tone divisor
//! - Three-voice note player with first-free voice allocation
//! - ADSR attenuation envelopes, square-wave vibrato and tremolo
//! - In-memory [`RecordingBus`] for host-side testing and dry runs
//!
//! # Crate feature flags
//! - `player` (default): tick-driven note player (`player`)
//!
//! # Hardware seam
//! The [`ChipBus`] trait is the only thing an embedding has to provide: pin
//! levels, a microsecond delay and (optionally) the master clock source.
//! The periodic timer that calls [`SnPlayer::tick`] is owned by the embedding.
//!
//! # Quick start
//! ## Register protocol only
//! ```no_run
//! use sn76489::{ChipConfig, Oscillator, PinMap, RecordingBus, Sn76489};
//! let config = ChipConfig::new(PinMap::sequential(2));
//! let bus = RecordingBus::new(config.pins.clone());
//! let mut chip = Sn76489::new(&config, bus).unwrap();
//! chip.begin().unwrap();
//! chip.set_tone(Oscillator::Tone1, 440.0).unwrap();
//! chip.set_tone_attenuation(Oscillator::Tone1, 0).unwrap();
//! ```
//!
//! ## Note player
//! ```no_run
//! # #[cfg(feature = "player")]
//! # {
//! use sn76489::{NoteConfig, PinMap, PlayerConfig, RecordingBus, SnPlayer};
//! let config = PlayerConfig::new(PinMap::sequential(2));
//! let bus = RecordingBus::new(config.chip.pins.clone());
//! let mut player = SnPlayer::new(&config, bus).unwrap();
//! player.begin(0).unwrap();
//! player.play_note(440.0, 500, &NoteConfig::default(), None);
//! for ms in 1..=600u64 {
//!     player.tick(ms * 1000).unwrap();
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend; // Register writer capability
pub mod bus; // Pin-level bus seam
pub mod config; // Pin map and clock configuration
pub mod sn76489; // SN76489 register protocol (core)

#[cfg(feature = "player")]
pub mod player; // Tick-driven note player

pub use bus::BusError;

/// Error types for SN76489 driver operations
///
/// Configuration errors surface at construction; bus errors abort the
/// operation in progress. Neither is retried.
#[derive(thiserror::Error, Debug)]
pub enum Sn76489Error {
    /// Invalid configuration (pin map, master clock, output capability)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Pin-level I/O or clock source failure
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Configuration document could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, Sn76489Error>;

// Public API exports
pub use backend::RegisterWriter;
pub use bus::{ChipBus, Level, RecordingBus};
pub use config::{ChipConfig, PinMap};
pub use sn76489::{
    Channel, FrequencyQuantizer, NoiseShift, NoiseType, Oscillator, RegisterFile, Sn76489,
    ATTENUATION_FULL_VOLUME, ATTENUATION_SILENCE,
};

#[cfg(feature = "player")]
pub use player::{
    EnvelopeConfig, EnvelopePhase, NoteConfig, PlayerConfig, SharedPlayer, SnPlayer,
    TremoloConfig, VibratoConfig, VoiceEngine, VoiceScan,
};
