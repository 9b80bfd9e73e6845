use crate::foundation::error::{ReelError, ReelResult};

/// Half-open time window `[start, end)` of one scene, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneWindow {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl SceneWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// A timeline position mapped onto the storyboard.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelinePosition {
    pub active: usize,
    /// Progress through the active scene, `[0, 1]`.
    pub fraction: f64,
}

/// Even split of the narration across the scenes.
///
/// The asset generator provides no per-scene timing, so every scene lasts
/// `total_secs / scene_count`. Windows are contiguous and cover `[0, total_secs)` exactly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTimeline {
    total_secs: f64,
    scene_count: usize,
}

impl SceneTimeline {
    pub fn new(total_secs: f64, scene_count: usize) -> ReelResult<Self> {
        if scene_count == 0 {
            return Err(ReelError::validation("scene count must be >= 1"));
        }
        if !total_secs.is_finite() || total_secs <= 0.0 {
            return Err(ReelError::validation(
                "narration duration must be finite and > 0",
            ));
        }
        Ok(Self {
            total_secs,
            scene_count,
        })
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn scene_count(&self) -> usize {
        self.scene_count
    }

    pub fn scene_duration(&self) -> f64 {
        self.total_secs / self.scene_count as f64
    }

    fn boundary(&self, i: usize) -> f64 {
        if i >= self.scene_count {
            self.total_secs
        } else {
            i as f64 * self.total_secs / self.scene_count as f64
        }
    }

    /// Window of scene `index`, clamped to the last scene.
    pub fn window_for(&self, index: usize) -> SceneWindow {
        let index = index.min(self.scene_count - 1);
        SceneWindow {
            index,
            start: self.boundary(index),
            end: self.boundary(index + 1),
        }
    }

    pub fn windows(&self) -> impl Iterator<Item = SceneWindow> + '_ {
        (0..self.scene_count).map(|i| self.window_for(i))
    }

    /// Map `position` (seconds) to the active scene.
    ///
    /// Positions are clamped into `[0, total]`; `total` itself resolves to the last scene at
    /// fraction 1.
    pub fn resolve(&self, position: f64) -> TimelinePosition {
        let t = if position.is_finite() {
            position.clamp(0.0, self.total_secs)
        } else {
            0.0
        };
        let mut active = ((t / self.scene_duration()).floor() as usize).min(self.scene_count - 1);
        // Float division can land one scene early right on a boundary.
        if active + 1 < self.scene_count && t >= self.boundary(active + 1) {
            active += 1;
        }
        let w = self.window_for(active);
        let fraction = if w.duration() > 0.0 {
            ((t - w.start) / w.duration()).clamp(0.0, 1.0)
        } else {
            1.0
        };
        TimelinePosition { active, fraction }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/scene.rs"]
mod tests;
