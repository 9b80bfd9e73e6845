use std::path::Path;

use crate::audio::graph::MixBus;
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// A bus placed on the output timeline.
#[derive(Clone, Debug)]
pub(crate) struct ScheduledBus {
    pub(crate) bus: MixBus,
    /// Output time (seconds) the bus starts at.
    pub(crate) start_sec: f64,
}

/// Mix scheduled buses into `total_frames` of interleaved output PCM.
pub(crate) fn mix_buses(
    buses: &[ScheduledBus],
    sample_rate: u32,
    channels: u16,
    total_frames: u64,
) -> Vec<f32> {
    let mut out = vec![0.0f32; total_frames as usize * usize::from(channels)];
    for sb in buses {
        mix_bus(&mut out, sample_rate, channels, sb);
    }
    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

fn mix_bus(out: &mut [f32], sample_rate: u32, channels: u16, sb: &ScheduledBus) {
    let bus = &sb.bus;
    if bus.gain <= 0.0 {
        return;
    }
    let src = bus.buffer.samples();
    let src_channels = usize::from(bus.buffer.channels());
    let src_frames = bus.buffer.frames();
    if src_frames == 0 {
        return;
    }
    let src_rate = f64::from(bus.buffer.sample_rate());
    let out_channels = usize::from(channels);
    let total_frames = out.len() / out_channels;

    let start = (sb.start_sec.max(0.0) * f64::from(sample_rate)).round() as usize;
    for dst_frame in start..total_frames {
        let rel_sec = (dst_frame - start) as f64 / f64::from(sample_rate);
        let mut src_pos = rel_sec * src_rate;
        if bus.looped {
            src_pos = src_pos.rem_euclid(src_frames as f64);
        }
        if !src_pos.is_finite() || src_pos < 0.0 {
            break;
        }
        let f0 = src_pos.floor() as usize;
        if f0 >= src_frames {
            break;
        }
        let f1 = if bus.looped {
            (f0 + 1) % src_frames
        } else {
            (f0 + 1).min(src_frames - 1)
        };
        let frac = (src_pos - f0 as f64) as f32;

        let sample = |frame: usize, ch: usize| src[frame * src_channels + ch.min(src_channels - 1)];
        let dst = dst_frame * out_channels;
        for ch in 0..out_channels {
            let v0 = sample(f0, ch);
            let v1 = sample(f1, ch);
            out[dst + ch] += (v0 + (v1 - v0) * frac) * bus.gain;
        }
    }
}

/// Write interleaved `f32` PCM samples to raw little-endian `.f32le` file.
pub(crate) fn write_mix_to_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> ReelResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        ReelError::capture(format!(
            "failed to write mixed audio file '{}': {e}",
            out_path.display()
        ))
    })
}

/// Convert a frame count to the nearest sample index at `sample_rate`.
pub(crate) fn frame_to_sample(frames: u64, fps: Fps, sample_rate: u32) -> u64 {
    let num = u128::from(frames) * u128::from(sample_rate) * u128::from(fps.den);
    let den = u128::from(fps.num);
    ((num + (den / 2)) / den) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
