//! Engine configuration.
//!
//! Loaded from a JSON file (all fields optional) and then overridden by `REELCAST_*` environment
//! variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assets::visual::ClipCacheSettings;
use crate::audio::graph::MixGains;
use crate::effects::transitions::TransitionKind;
use crate::encode::format::ContainerFormat;
use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{ReelError, ReelResult};

/// Default target video bitrate in bits per second.
pub const DEFAULT_VIDEO_BITRATE: u32 = 6_000_000;
/// Default export frame rate.
pub const DEFAULT_FPS: u32 = 30;
/// Default length of the per-scene transition window.
pub const DEFAULT_TRANSITION_SECS: f64 = 0.7;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Narration bus gain, 0..1.
    pub narration_gain: f32,
    /// Background bus gain, 0..1.
    pub background_gain: f32,
    /// Remote background track, fetched once when the studio loads.
    pub background_url: Option<String>,
    /// Local background track; takes precedence over `background_url`.
    pub background_path: Option<PathBuf>,
    pub fps: u32,
    pub video_bitrate: u32,
    pub transition_secs: f64,
    /// Fixed delay between emitted export frames. Zero yields to the runtime instead.
    pub frame_pacing_ms: u64,
    pub transition: TransitionKind,
    pub resolution: Resolution,
    pub format: ContainerFormat,
    /// Draw the departing scene underneath the incoming one during the transition window.
    pub underlay_departing: bool,
    /// Straight-alpha RGBA8 the surface is cleared to before every frame.
    pub clear_rgba: [u8; 4],
    /// Decoded frames kept per video clip.
    pub video_cache_capacity: usize,
    /// Consecutive clip frames decoded per ffmpeg run.
    pub video_prefetch_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            narration_gain: 1.0,
            background_gain: 0.15,
            background_url: None,
            background_path: None,
            fps: DEFAULT_FPS,
            video_bitrate: DEFAULT_VIDEO_BITRATE,
            transition_secs: DEFAULT_TRANSITION_SECS,
            frame_pacing_ms: 0,
            transition: TransitionKind::Fade,
            resolution: Resolution::Portrait720,
            format: ContainerFormat::Mp4,
            underlay_departing: false,
            clear_rgba: [0, 0, 0, 255],
            video_cache_capacity: ClipCacheSettings::default().cache_capacity,
            video_prefetch_frames: ClipCacheSettings::default().prefetch_frames,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| ReelError::validation(format!("config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `REELCAST_*` environment overrides.
    pub fn with_env_overrides(self) -> ReelResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ReelResult<Self> {
        if let Some(url) = lookup("REELCAST_BACKGROUND_URL") {
            self.background_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(v) = lookup("REELCAST_NARRATION_GAIN") {
            self.narration_gain = parse_gain("REELCAST_NARRATION_GAIN", &v)?;
        }
        if let Some(v) = lookup("REELCAST_BACKGROUND_GAIN") {
            self.background_gain = parse_gain("REELCAST_BACKGROUND_GAIN", &v)?;
        }
        if let Some(v) = lookup("REELCAST_VIDEO_CACHE_CAPACITY") {
            self.video_cache_capacity = parse_count("REELCAST_VIDEO_CACHE_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("REELCAST_VIDEO_PREFETCH_FRAMES") {
            self.video_prefetch_frames = parse_count("REELCAST_VIDEO_PREFETCH_FRAMES", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ReelResult<()> {
        for (name, g) in [
            ("narration_gain", self.narration_gain),
            ("background_gain", self.background_gain),
        ] {
            if !g.is_finite() || g < 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be > 0"));
        }
        if self.video_bitrate == 0 {
            return Err(ReelError::validation("video_bitrate must be > 0"));
        }
        if self.video_cache_capacity == 0 || self.video_prefetch_frames == 0 {
            return Err(ReelError::validation(
                "video_cache_capacity and video_prefetch_frames must be > 0",
            ));
        }
        if !self.transition_secs.is_finite() || self.transition_secs < 0.0 {
            return Err(ReelError::validation(
                "transition_secs must be finite and >= 0",
            ));
        }
        Ok(())
    }

    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::whole(self.fps)
    }

    pub fn gains(&self) -> MixGains {
        MixGains::new(self.narration_gain, self.background_gain)
    }

    pub fn frame_pacing(&self) -> Duration {
        Duration::from_millis(self.frame_pacing_ms)
    }

    pub fn clip_cache(&self) -> ClipCacheSettings {
        ClipCacheSettings {
            cache_capacity: self.video_cache_capacity,
            prefetch_frames: self.video_prefetch_frames,
        }
    }
}

fn parse_gain(key: &str, raw: &str) -> ReelResult<f32> {
    raw.trim()
        .parse::<f32>()
        .map_err(|e| ReelError::validation(format!("{key}='{raw}': {e}")))
}

fn parse_count<T: std::str::FromStr>(key: &str, raw: &str) -> ReelResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ReelError::validation(format!("{key}='{raw}': {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/config/config.rs"]
mod tests;
