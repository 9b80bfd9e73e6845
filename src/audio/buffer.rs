use std::path::Path;
use std::sync::Arc;

use crate::assets::media::{
    AudioPcm, MIX_SAMPLE_RATE, decode_audio_bytes_f32_stereo, decode_audio_f32_stereo,
};
use crate::foundation::error::{ReelError, ReelResult};

/// Decoded, immutable interleaved PCM.
///
/// Cloning shares the samples, so one decoded background track can feed any number of playback
/// and export sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Arc<[f32]>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, channels: u16, interleaved: Vec<f32>) -> ReelResult<Self> {
        if sample_rate == 0 {
            return Err(ReelError::validation("pcm sample_rate must be non-zero"));
        }
        if channels == 0 {
            return Err(ReelError::validation("pcm channels must be non-zero"));
        }
        if !interleaved.len().is_multiple_of(usize::from(channels)) {
            return Err(ReelError::validation(
                "pcm sample count is not a multiple of the channel count",
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
            samples: interleaved.into(),
        })
    }

    /// Decode an audio file through ffmpeg at the mix sample rate.
    pub fn decode_file(path: &Path) -> ReelResult<Self> {
        Self::try_from(decode_audio_f32_stereo(path, MIX_SAMPLE_RATE)?)
    }

    /// Decode an in-memory encoded audio payload at the mix sample rate.
    pub fn decode_bytes(bytes: &[u8]) -> ReelResult<Self> {
        Self::try_from(decode_audio_bytes_f32_stereo(bytes, MIX_SAMPLE_RATE)?)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl TryFrom<AudioPcm> for PcmBuffer {
    type Error = ReelError;

    fn try_from(pcm: AudioPcm) -> ReelResult<Self> {
        Self::new(pcm.sample_rate, pcm.channels, pcm.interleaved_f32)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/buffer.rs"]
mod tests;
