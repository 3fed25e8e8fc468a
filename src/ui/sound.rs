/// Sound engine: procedural effects for turn events via rodio.
///
/// Every effect is rendered once into an in-memory WAV buffer at startup
/// and played fire-and-forget on a detached Sink.
///
/// Without the "sound" feature the stub SoundEngine does nothing.

use crate::domain::item::ItemType;
use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::warn;

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_step: Arc<Vec<u8>>,
        sfx_push: Arc<Vec<u8>>,
        sfx_teleport: Arc<Vec<u8>>,
        sfx_bump: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_step: Arc::new(encode_wav(&gen_step())),
                sfx_push: Arc::new(encode_wav(&gen_push())),
                sfx_teleport: Arc::new(encode_wav(&gen_teleport())),
                sfx_bump: Arc::new(encode_wav(&gen_bump())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        pub fn play_step(&self) { self.play(&self.sfx_step); }
        pub fn play_push(&self) { self.play(&self.sfx_push); }
        pub fn play_teleport(&self) { self.play(&self.sfx_teleport); }
        pub fn play_bump(&self) { self.play(&self.sfx_bump); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Sine sweep from `f0` to `f1` Hz with a linear fade out.
    fn sweep(f0: f32, f1: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                phase += (f0 + (f1 - f0) * t) * TAU / SAMPLE_RATE as f32;
                phase.sin() * (1.0 - t) * volume
            })
            .collect()
    }

    /// Step: very short soft tick.
    pub(super) fn gen_step() -> Vec<f32> {
        sweep(520.0, 480.0, 0.03, 0.15)
    }

    /// Push: low scrape, tone mixed with LCG noise.
    pub(super) fn gen_push() -> Vec<f32> {
        let mut rng: u32 = 2024;
        sweep(160.0, 110.0, 0.09, 0.5)
            .into_iter()
            .map(|s| {
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                s * 0.6 + noise * s.abs() * 0.4
            })
            .collect()
    }

    /// Teleport: rising sweep followed by a falling echo.
    pub(super) fn gen_teleport() -> Vec<f32> {
        let mut samples = sweep(300.0, 1400.0, 0.12, 0.25);
        samples.extend(sweep(1400.0, 900.0, 0.08, 0.15));
        samples
    }

    /// Bump: dull low thud.
    pub(super) fn gen_bump() -> Vec<f32> {
        sweep(90.0, 60.0, 0.06, 0.35)
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit mono PCM
    // ════════════════════════════════════════════════════════════

    pub(super) fn encode_wav(samples: &[f32]) -> Vec<u8> {
        const CHANNELS: u16 = 1;
        const BITS: u16 = 16;
        let block_align = CHANNELS * BITS / 8;
        let byte_rate = SAMPLE_RATE * block_align as u32;
        let data_size = samples.len() as u32 * block_align as u32;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&CHANNELS.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&BITS.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_step(&self) {}
    pub fn play_push(&self) {}
    pub fn play_teleport(&self) {}
    pub fn play_bump(&self) {}
}

/// Play at most one effect per turn, the most notable one.
pub fn play_turn(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    if events.iter().any(|e| matches!(e, GameEvent::Teleported { .. })) {
        sfx.play_teleport();
    } else if events.iter().any(|e| matches!(e, GameEvent::Bumped | GameEvent::Aborted { .. })) {
        sfx.play_bump();
    } else if events.iter().any(|e| matches!(e, GameEvent::Stepped { item: ItemType::Block, .. })) {
        sfx.play_push();
    } else if !events.is_empty() {
        sfx.play_step();
    }
}
