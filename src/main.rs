#[cfg(not(feature = "player"))]
fn main() {
    eprintln!(
        "sn76489-demo requires the \"player\" feature. Rebuild with `--features player` to run it."
    );
}

#[cfg(feature = "player")]
mod demo {
    use std::env;
    use std::fs;

    use anyhow::{Context, Result};
    use sn76489::{
        EnvelopeConfig, NoiseShift, NoiseType, NoteConfig, PinMap, PlayerConfig, RecordingBus,
        SnPlayer, TremoloConfig, VibratoConfig,
    };

    /// Simulated milliseconds between register-file snapshots
    const SNAPSHOT_EVERY_MS: u64 = 50;
    /// Upper bound on simulated time
    const MAX_RUN_MS: u64 = 10_000;

    const CHORD: [(f32, u32); 3] = [(261.63, 400), (329.63, 500), (392.0, 600)];

    fn load_config() -> Result<PlayerConfig> {
        match env::args().nth(1) {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config '{path}'"))?;
                PlayerConfig::from_json(&json).with_context(|| format!("invalid config '{path}'"))
            }
            None => Ok(PlayerConfig::new(PinMap::sequential(2))),
        }
    }

    fn note_config() -> NoteConfig {
        NoteConfig {
            envelope: EnvelopeConfig {
                attack: 20,
                decay: 40,
                sustain: 5,
                release: 80,
            },
            vibrato: VibratoConfig {
                delay: 100,
                amplitude: 3.0,
                rise: 200,
                period: 40,
            },
            tremolo: TremoloConfig {
                period: 60,
                bit_mask: 0b1,
            },
        }
    }

    pub fn run() -> Result<()> {
        let config = load_config()?;
        println!(
            "SN76489 demo: clock {} Hz, /WE pin {}, /CE pin {}, data pins {:?}",
            config.chip.master_clock_hz,
            config.chip.pins.write_enable,
            config.chip.pins.chip_enable,
            config.chip.pins.data
        );

        let bus = RecordingBus::new(config.chip.pins.clone());
        let mut player = SnPlayer::new(&config, bus)?;
        player.begin(0)?;

        let note = note_config();
        for (frequency, duration) in CHORD {
            match player.play_note(frequency, duration, &note, None) {
                Some(osc) => println!("{osc}: {frequency:.2} Hz for {duration} ms"),
                None => println!("no free voice for {frequency:.2} Hz"),
            }
        }
        player.set_noise(NoiseType::White, NoiseShift::Div2048)?;
        player.set_noise_attenuation(12)?;

        let mut now_ms = 0u64;
        while player.engine().is_playing() && now_ms < MAX_RUN_MS {
            now_ms += 1;
            player.tick(now_ms * 1_000)?;
            if now_ms % SNAPSHOT_EVERY_MS == 0 {
                println!("{now_ms:>5} ms  {}", player.chip().bus().registers());
            }
        }

        player.mute_noise()?;
        player.end()?;

        let bus = player.chip().bus();
        println!("{now_ms:>5} ms  {}", bus.registers());
        println!("\nAll voices idle after {now_ms} ms");
        println!("Bytes latched:     {}", bus.latched().len());
        Ok(())
    }
}

#[cfg(feature = "player")]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    demo::run()
}
