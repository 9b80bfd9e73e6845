use std::collections::HashSet;
use std::fmt;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult};

/// Output container with its fixed codec pair.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// H.264 + AAC in MP4. Preferred for compatibility.
    #[default]
    Mp4,
    /// VP9 + Opus in WebM.
    #[value(name = "webm")]
    WebM,
}

impl ContainerFormat {
    /// Preference order used when the requested format is unavailable.
    pub const PREFERENCE: [Self; 2] = [Self::Mp4, Self::WebM];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
        }
    }

    /// `ffmpeg` muxer name.
    pub fn muxer(self) -> &'static str {
        self.extension()
    }

    pub fn video_encoder(self) -> &'static str {
        match self {
            Self::Mp4 => "libx264",
            Self::WebM => "libvpx-vp9",
        }
    }

    pub fn audio_encoder(self) -> &'static str {
        match self {
            Self::Mp4 => "aac",
            Self::WebM => "libopus",
        }
    }

    pub fn alternative(self) -> Self {
        match self {
            Self::Mp4 => Self::WebM,
            Self::WebM => Self::Mp4,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Answers whether the runtime can record a container format.
pub trait CapabilityProbe: Send + Sync {
    fn supports(&self, format: ContainerFormat) -> bool;
}

impl<F> CapabilityProbe for F
where
    F: Fn(ContainerFormat) -> bool + Send + Sync,
{
    fn supports(&self, format: ContainerFormat) -> bool {
        self(format)
    }
}

/// Encoders and muxers reported by the system `ffmpeg`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FfmpegCapabilities {
    encoders: HashSet<String>,
    muxers: HashSet<String>,
}

impl FfmpegCapabilities {
    /// Run `ffmpeg -encoders` and `ffmpeg -muxers`.
    pub fn probe() -> ReelResult<Self> {
        let encoders = run_listing("-encoders")?;
        let muxers = run_listing("-muxers")?;
        Ok(Self::parse(&encoders, &muxers))
    }

    /// Parse the listings. Entries follow the `------` / `--` separator line; the name is the
    /// second column and may hold comma-separated aliases.
    pub fn parse(encoders_listing: &str, muxers_listing: &str) -> Self {
        Self {
            encoders: parse_listing(encoders_listing),
            muxers: parse_listing(muxers_listing),
        }
    }

    /// First missing component for `format`, if any.
    pub fn missing(&self, format: ContainerFormat) -> Option<String> {
        if !self.muxers.contains(format.muxer()) {
            return Some(format!("muxer '{}'", format.muxer()));
        }
        for enc in [format.video_encoder(), format.audio_encoder()] {
            if !self.encoders.contains(enc) {
                return Some(format!("encoder '{enc}'"));
            }
        }
        None
    }
}

impl CapabilityProbe for FfmpegCapabilities {
    fn supports(&self, format: ContainerFormat) -> bool {
        self.missing(format).is_none()
    }
}

fn run_listing(flag: &str) -> ReelResult<String> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", flag])
        .output()
        .map_err(|e| ReelError::capture(format!("failed to run ffmpeg {flag}: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::capture(format!(
            "ffmpeg {flag} exited with status {}",
            out.status
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

fn parse_listing(text: &str) -> HashSet<String> {
    text.lines()
        .skip_while(|l| !l.trim_start().starts_with("--"))
        .skip(1)
        .filter_map(|l| l.split_whitespace().nth(1))
        .flat_map(|names| names.split(','))
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Formats the runtime supports, in preference order. Used to gate format choices.
pub fn available_formats(probe: &dyn CapabilityProbe) -> Vec<ContainerFormat> {
    ContainerFormat::PREFERENCE
        .into_iter()
        .filter(|f| probe.supports(*f))
        .collect()
}

pub fn ensure_supported(probe: &dyn CapabilityProbe, format: ContainerFormat) -> ReelResult<()> {
    if probe.supports(format) {
        Ok(())
    } else {
        Err(ReelError::format_unavailable(format!(
            "{format} is not supported by this runtime"
        )))
    }
}

/// Resolve the format to record with, falling back to the alternative container when the
/// requested one is unavailable.
pub fn select_format(
    requested: ContainerFormat,
    probe: &dyn CapabilityProbe,
) -> ReelResult<ContainerFormat> {
    let Err(first) = ensure_supported(probe, requested) else {
        return Ok(requested);
    };
    let fallback = requested.alternative();
    match ensure_supported(probe, fallback) {
        Ok(()) => {
            tracing::warn!(%requested, %fallback, "{first}; falling back");
            Ok(fallback)
        }
        Err(second) => Err(ReelError::capture(format!(
            "no recordable container: {first}; {second}"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/format.rs"]
mod tests;
