use crate::foundation::error::{ReelError, ReelResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Absolute 0-based output frame index of an export job.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate, e.g. `Fps::whole(30)`.
    pub fn whole(num: u32) -> ReelResult<Self> {
        Self::new(num, 1)
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert frame count to seconds.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        (frames as f64) * self.frame_duration_secs()
    }

    /// Convert seconds to frame count using ceiling semantics.
    ///
    /// Products that land within `1e-9` of an integer are treated as that integer, so
    /// `30 fps * (10 / 3) s` is 100 frames rather than 101.
    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        ceil_tolerant(secs * self.as_f64())
    }
}

pub(crate) fn ceil_tolerant(v: f64) -> u64 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    let nearest = v.round();
    if (v - nearest).abs() < 1e-9 {
        nearest as u64
    } else {
        v.ceil() as u64
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    pub fn center(self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// Portrait output resolutions offered for short-form export.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
pub enum Resolution {
    /// 720x1280.
    #[default]
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    Portrait720,
    /// 1080x1920.
    #[serde(rename = "1080p")]
    #[value(name = "1080p")]
    Portrait1080,
}

impl Resolution {
    pub fn canvas(self) -> Canvas {
        match self {
            Self::Portrait720 => Canvas {
                width: 720,
                height: 1280,
            },
            Self::Portrait1080 => Canvas {
                width: 1080,
                height: 1920,
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
