//! Reelcast composes narrated short vertical videos.
//!
//! Given one visual asset per scene (still image or video clip) and a decoded narration track,
//! it provides:
//!
//! - a live preview ([`PlaybackController`]) that mixes narration over a looping background
//!   track and switches scenes on a wall-clock schedule
//! - a frame-accurate export ([`CaptureSession`]) that renders every frame with a fade, slide or
//!   zoom entry transition and records it with the mixed audio into MP4 or WebM
//!
//! [`Studio`] ties both together around one [`Storyboard`].
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod audio;
pub mod config;
pub mod effects;
pub mod encode;
pub mod render;
pub mod session;
pub mod storyboard;
pub mod timeline;

pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Point, Rect, Resolution, Vec2};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assets::decode::PreparedFrame;
pub use crate::assets::visual::{ClipCacheSettings, VideoDecoder, VisualAsset, VisualSource};
pub use crate::audio::buffer::PcmBuffer;
pub use crate::audio::graph::{
    AudioDestination, AudioMixGraph, BusVoice, MixGains, MixHandle, MixState,
};
pub use crate::audio::silent::SilentDestination;
pub use crate::config::EngineConfig;
pub use crate::effects::transitions::{CompositeOp, TransitionKind};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::format::{CapabilityProbe, ContainerFormat, FfmpegCapabilities};
pub use crate::encode::sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
pub use crate::render::surface::{FrameRGBA, Surface};
pub use crate::render::transition::TransitionRenderer;
pub use crate::session::capture::{CaptureSession, ExportArtifact, ExportSettings};
pub use crate::session::lock::{CancelFlag, ExportLock};
pub use crate::session::playback::{PlaybackController, PlaybackState, PlaybackStatus};
pub use crate::session::presenter::{ScenePresenter, TracingPresenter};
pub use crate::session::studio::Studio;
pub use crate::storyboard::{SceneVisual, Storyboard};
pub use crate::timeline::scene::{SceneTimeline, SceneWindow, TimelinePosition};
pub use crate::timeline::sync::{ActiveScene, FramePlacement, FrameSync, SceneSync, WallClockSync};

#[cfg(feature = "speaker")]
pub use crate::audio::speaker::SpeakerDestination;
