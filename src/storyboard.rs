//! Storyboard manifest produced by the upstream asset generator.
//!
//! ```json
//! {
//!   "narration": "narration.mp3",
//!   "scenes": [{ "image": "scene-0.png" }, { "video": "scene-1.mp4" }]
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory. The manifest carries no per-scene
//! timing; scene windows are derived from the narration length.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assets::visual::VisualSource;
use crate::audio::buffer::PcmBuffer;
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneVisual {
    Image(PathBuf),
    Video(PathBuf),
    /// Encoded image already in memory.
    #[serde(skip)]
    Encoded(Arc<Vec<u8>>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Storyboard {
    pub narration: PathBuf,
    pub scenes: Vec<SceneVisual>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Storyboard {
    pub fn new(narration: impl Into<PathBuf>, scenes: Vec<SceneVisual>) -> Self {
        Self {
            narration: narration.into(),
            scenes,
            title: None,
            base_dir: PathBuf::new(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read storyboard '{}'", path.display()))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&text, base_dir)
    }

    pub fn from_json(text: &str, base_dir: impl Into<PathBuf>) -> ReelResult<Self> {
        let mut board: Self = serde_json::from_str(text)
            .map_err(|e| ReelError::validation(format!("storyboard: {e}")))?;
        board.base_dir = base_dir.into();
        board.validate()?;
        Ok(board)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.scenes.is_empty() {
            return Err(ReelError::validation("storyboard has no scenes"));
        }
        Ok(())
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Fresh visual sources for one export.
    pub fn visual_sources(&self) -> Vec<VisualSource> {
        self.scenes
            .iter()
            .map(|scene| match scene {
                SceneVisual::Image(p) => VisualSource::ImagePath(self.resolve(p)),
                SceneVisual::Video(p) => VisualSource::VideoPath(self.resolve(p)),
                SceneVisual::Encoded(bytes) => VisualSource::ImageBytes(bytes.clone()),
            })
            .collect()
    }

    /// Decode the narration track (requires `ffmpeg`).
    pub fn load_narration(&self) -> ReelResult<PcmBuffer> {
        let path = self.resolve(&self.narration);
        PcmBuffer::decode_file(&path)
            .map_err(|e| ReelError::asset_load(format!("narration '{}': {e}", path.display())))
    }
}

#[cfg(test)]
#[path = "../tests/unit/storyboard.rs"]
mod tests;
