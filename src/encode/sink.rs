use std::path::PathBuf;

use anyhow::Context as _;

use crate::encode::format::ContainerFormat;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::ReelResult;
use crate::render::surface::FrameRGBA;

/// Configuration provided to a [`FrameSink`] at the start of a recording.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    pub format: ContainerFormat,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Pre-mixed audio track, if any.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input for sinks that mux audio.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Recorder contract.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, with no
/// gaps, between one `begin` and either `end` or `abort`.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Finalize the recording and return the encoded container bytes.
    fn end(&mut self) -> ReelResult<Vec<u8>>;
    /// Tear down without producing output. Safe to call in any state.
    fn abort(&mut self);
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    keep_pixels: bool,
    indices: Vec<FrameIndex>,
    frames: Vec<FrameRGBA>,
    audio: Vec<f32>,
    finished: bool,
    aborted: bool,
}

impl InMemorySink {
    /// Sink that keeps every frame's pixels.
    pub fn new() -> Self {
        Self {
            keep_pixels: true,
            ..Self::default()
        }
    }

    /// Sink that only records frame indices.
    pub fn indices_only() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    pub fn indices(&self) -> &[FrameIndex] {
        &self.indices
    }

    /// Captured frames; empty for [`InMemorySink::indices_only`].
    pub fn frames(&self) -> &[FrameRGBA] {
        &self.frames
    }

    /// Interleaved samples read from the audio input at `begin`.
    pub fn audio(&self) -> &[f32] {
        &self.audio
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.audio = match cfg.audio.as_ref() {
            Some(a) => {
                let bytes = std::fs::read(&a.path)
                    .with_context(|| format!("read audio input '{}'", a.path.display()))?;
                bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect()
            }
            None => Vec::new(),
        };
        self.cfg = Some(cfg);
        self.indices.clear();
        self.frames.clear();
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        self.indices.push(idx);
        if self.keep_pixels {
            self.frames.push(frame.clone());
        }
        Ok(())
    }

    fn end(&mut self) -> ReelResult<Vec<u8>> {
        self.finished = true;
        Ok(Vec::new())
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.frames.clear();
    }
}
