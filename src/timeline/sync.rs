//! Scene synchronization strategies.
//!
//! Live playback and export advance scenes differently. [`WallClockSync`] schedules a switch every
//! `scene_duration` of elapsed wall-clock time and may drift from the audio. [`FrameSync`]
//! derives the scene analytically from the output frame number and is exact. Both answer the same
//! [`SceneSync::resolve`] query so they can be checked with identical assertions.

use std::time::Duration;

use crate::foundation::core::{Fps, FrameIndex, ceil_tolerant};
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::scene::SceneTimeline;

/// Scene selected for a timeline position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActiveScene {
    pub index: usize,
    /// Scene that is still visible underneath while `index` transitions in.
    pub departing: Option<usize>,
    /// Progress through the active scene, `[0, 1]`.
    pub fraction: f64,
}

pub trait SceneSync {
    fn scene_count(&self) -> usize;

    /// Resolve `position_secs` from the session start to the active scene.
    ///
    /// Positions at or past the end resolve to the last scene with fraction 1.
    fn resolve(&self, position_secs: f64) -> ActiveScene;
}

/// Event-driven advancement used by live playback.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WallClockSync {
    timeline: SceneTimeline,
}

impl WallClockSync {
    pub fn new(timeline: SceneTimeline) -> Self {
        Self { timeline }
    }

    pub fn timeline(&self) -> &SceneTimeline {
        &self.timeline
    }

    /// Offset from the session start at which scene `index` becomes active.
    ///
    /// `None` for the first scene and for indices past the end.
    pub fn switch_at(&self, index: usize) -> Option<Duration> {
        if index == 0 || index >= self.timeline.scene_count() {
            return None;
        }
        Some(Duration::from_secs_f64(self.timeline.window_for(index).start))
    }
}

impl SceneSync for WallClockSync {
    fn scene_count(&self) -> usize {
        self.timeline.scene_count()
    }

    fn resolve(&self, position_secs: f64) -> ActiveScene {
        let pos = self.timeline.resolve(position_secs);
        ActiveScene {
            index: pos.active,
            departing: None,
            fraction: pos.fraction,
        }
    }
}

/// Where one output frame lands on the storyboard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePlacement {
    pub scene: usize,
    pub frame_in_scene: u64,
    /// Transition progress of the incoming scene, `[0, 1]`.
    pub progress: f64,
    pub departing: Option<usize>,
}

/// Per-frame advancement used by export.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSync {
    fps: Fps,
    scene_count: usize,
    frames_per_scene: u64,
    total_frames: u64,
    transition_frames: f64,
}

impl FrameSync {
    pub fn new(timeline: &SceneTimeline, fps: Fps, transition_secs: f64) -> ReelResult<Self> {
        if !transition_secs.is_finite() || transition_secs < 0.0 {
            return Err(ReelError::validation(
                "transition_secs must be finite and >= 0",
            ));
        }
        let frames_per_scene = ceil_tolerant(fps.as_f64() * timeline.scene_duration()).max(1);
        let total_frames = fps.secs_to_frames_ceil(timeline.total_secs()).max(1);
        let transition_frames =
            crate::effects::transitions::transition_frames(fps, transition_secs, frames_per_scene);
        Ok(Self {
            fps,
            scene_count: timeline.scene_count(),
            frames_per_scene,
            total_frames,
            transition_frames,
        })
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn frames_per_scene(&self) -> u64 {
        self.frames_per_scene
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn transition_frames(&self) -> f64 {
        self.transition_frames
    }

    pub fn scene_of(&self, frame: FrameIndex) -> usize {
        let idx = frame.0 / self.frames_per_scene;
        usize::try_from(idx)
            .unwrap_or(usize::MAX)
            .min(self.scene_count - 1)
    }

    pub fn place(&self, frame: FrameIndex) -> FramePlacement {
        let scene = self.scene_of(frame);
        let frame_in_scene = frame.0 - scene as u64 * self.frames_per_scene;
        let progress = crate::effects::transitions::transition_progress(
            frame_in_scene,
            self.transition_frames,
        );
        let departing = (scene > 0 && progress < 1.0).then(|| scene - 1);
        FramePlacement {
            scene,
            frame_in_scene,
            progress,
            departing,
        }
    }

    /// Seek time inside a clip for a frame `frame_in_scene` frames into its scene.
    pub fn clip_time(&self, frame_in_scene: u64) -> f64 {
        self.fps.frames_to_secs(frame_in_scene)
    }
}

impl SceneSync for FrameSync {
    fn scene_count(&self) -> usize {
        self.scene_count
    }

    fn resolve(&self, position_secs: f64) -> ActiveScene {
        let end = self.fps.frames_to_secs(self.total_frames);
        if position_secs.is_nan() {
            return self.resolve(0.0);
        }
        if position_secs >= end {
            return ActiveScene {
                index: self.scene_count - 1,
                departing: None,
                fraction: 1.0,
            };
        }
        let frame = (position_secs.max(0.0) * self.fps.as_f64()).floor() as u64;
        let placement = self.place(FrameIndex(frame.min(self.total_frames - 1)));
        ActiveScene {
            index: placement.scene,
            departing: placement.departing,
            fraction: (placement.frame_in_scene as f64 / self.frames_per_scene as f64).min(1.0),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/sync.rs"]
mod tests;
