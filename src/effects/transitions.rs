//! Scene-entry transitions.
//!
//! A transition turns the incoming scene's local progress into a [`CompositeOp`]. Progress runs
//! from 0 to 1 across the transition window at the start of each scene and stays at 1 afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::foundation::core::Fps;
use crate::foundation::error::ReelError;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Alpha ramps from 0 to 1.
    #[default]
    Fade,
    /// Enters from the right edge.
    Slide,
    /// Scales from 0.8 to 1 about the canvas center while fading in.
    Zoom,
}

impl TransitionKind {
    pub const ALL: [Self; 3] = [Self::Fade, Self::Slide, Self::Zoom];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Slide => "slide",
            Self::Zoom => "zoom",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionKind {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fade" | "crossfade" => Ok(Self::Fade),
            "slide" => Ok(Self::Slide),
            "zoom" => Ok(Self::Zoom),
            "" => Err(ReelError::validation("transition kind must be non-empty")),
            other => Err(ReelError::validation(format!(
                "unknown transition kind '{other}'"
            ))),
        }
    }
}

/// Length of the transition window in frames: `min(fps * secs, frames_per_scene / 2)`.
pub fn transition_frames(fps: Fps, transition_secs: f64, frames_per_scene: u64) -> f64 {
    let wanted = fps.as_f64() * transition_secs.max(0.0);
    wanted.min(frames_per_scene as f64 / 2.0)
}

/// Local progress of a frame `frame_in_scene` frames into its scene, clamped to `[0, 1]`.
///
/// A zero-length window means the scene is presented in full from its first frame.
pub fn transition_progress(frame_in_scene: u64, transition_frames: f64) -> f64 {
    if transition_frames.is_nan() || transition_frames <= 0.0 {
        return 1.0;
    }
    (frame_in_scene as f64 / transition_frames).clamp(0.0, 1.0)
}

/// How an asset is drawn for one frame, on top of its cover-fit placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositeOp {
    pub opacity: f32,
    /// Horizontal offset in surface pixels.
    pub translate_x: f64,
    /// Uniform scale about the surface center.
    pub scale: f64,
}

impl CompositeOp {
    pub const PRESENTED: Self = Self {
        opacity: 1.0,
        translate_x: 0.0,
        scale: 1.0,
    };
}

pub fn composite_op(kind: TransitionKind, progress: f64, surface_width: u32) -> CompositeOp {
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    match kind {
        TransitionKind::Fade => CompositeOp {
            opacity: p as f32,
            ..CompositeOp::PRESENTED
        },
        TransitionKind::Slide => CompositeOp {
            translate_x: (1.0 - p) * f64::from(surface_width),
            ..CompositeOp::PRESENTED
        },
        TransitionKind::Zoom => CompositeOp {
            opacity: p as f32,
            translate_x: 0.0,
            scale: 0.8 + 0.2 * p,
        },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
