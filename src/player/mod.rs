//! Tick-driven note player
//!
//! Three tone voices, each bound to one oscillator, driven by a periodic
//! tick (nominally every [`TICK_PERIOD_US`]). Every tick advances each
//! voice's ADSR counters by the elapsed milliseconds, then for each playing
//! voice writes the vibrato frequency, the tremolo-masked divisor and the
//! envelope attenuation.
//!
//! All durations are in milliseconds.

pub mod engine;
pub mod envelope;
pub mod modulation;
pub mod sn_player;
pub mod voice;

use serde::{Deserialize, Serialize};

use crate::config::{ChipConfig, PinMap};
use crate::Result;

pub use engine::{VoiceEngine, VoiceScan, VOICE_COUNT};
pub use sn_player::{SharedPlayer, SnPlayer};
pub use voice::{EnvelopeCounters, EnvelopePhase, NoiseVoice, Voice};

/// Expected period of the external tick source, in µs
pub const TICK_PERIOD_US: u64 = 1_000;

/// ADSR envelope of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Attack duration (ms): silence to full volume
    pub attack: u32,
    /// Decay duration (ms): full volume to sustain level
    pub decay: u32,
    /// Sustain attenuation (0 = loudest, 15 = silent)
    pub sustain: u8,
    /// Release duration (ms): sustain level to silence
    pub release: u32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            attack: 10,
            decay: 10,
            sustain: 4,
            release: 10,
        }
    }
}

/// Square-wave vibrato of a note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VibratoConfig {
    /// Time (ms) before vibrato starts
    pub delay: u32,
    /// Peak frequency offset in Hz
    pub amplitude: f32,
    /// Time (ms) for the offset to ramp from 0 to `amplitude`
    pub rise: u32,
    /// Vibrato period (ms); 0 disables vibrato
    pub period: u32,
}

impl Default for VibratoConfig {
    fn default() -> Self {
        VibratoConfig {
            delay: 100,
            amplitude: 0.0,
            rise: 500,
            period: 150,
        }
    }
}

/// Divisor-bit tremolo of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TremoloConfig {
    /// Tremolo period (ms); 0 disables tremolo
    pub period: u32,
    /// Divisor bits set during the second half-period, cleared otherwise
    pub bit_mask: u16,
}

impl Default for TremoloConfig {
    fn default() -> Self {
        TremoloConfig {
            period: 150,
            bit_mask: 0,
        }
    }
}

/// Everything about a note except its pitch and length
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteConfig {
    /// Attenuation envelope
    pub envelope: EnvelopeConfig,
    /// Frequency vibrato
    pub vibrato: VibratoConfig,
    /// Divisor tremolo
    pub tremolo: TremoloConfig,
}

impl NoteConfig {
    /// Parse a note configuration from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Chip configuration plus player options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Clock and pin configuration
    #[serde(flatten)]
    pub chip: ChipConfig,
    /// Which voices a tick updates
    #[serde(default)]
    pub voice_scan: VoiceScan,
}

impl PlayerConfig {
    /// Default 4 MHz clock, all voices scanned
    pub fn new(pins: PinMap) -> Self {
        PlayerConfig {
            chip: ChipConfig::new(pins),
            voice_scan: VoiceScan::default(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.chip.validate()?;
        Ok(config)
    }
}
