use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::decode::PreparedFrame;
use crate::assets::media::{VideoSourceInfo, decode_video_frames_rgba8};
use crate::foundation::error::{ReelError, ReelResult};

/// Seekable source of video frames.
///
/// During export a clip never drives its own clock; the capture loop asks for the frame at an
/// explicit time instead.
pub trait VideoDecoder: Send {
    /// Natural frame size in pixels.
    fn dimensions(&self) -> (u32, u32);
    /// Clip length in seconds. Non-positive means unknown; seeks then pin to time zero.
    fn duration_secs(&self) -> f64;
    /// Decode the frame shown at `time_sec`.
    fn frame_at(&mut self, time_sec: f64) -> ReelResult<PreparedFrame>;
}

/// Frame cache and read-ahead for ffmpeg-backed clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipCacheSettings {
    /// Decoded frames kept per clip.
    pub cache_capacity: usize,
    /// Consecutive source frames decoded per ffmpeg run.
    pub prefetch_frames: u32,
}

impl Default for ClipCacheSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            prefetch_frames: 12,
        }
    }
}

/// Assumed source rate when ffprobe reports none.
const FALLBACK_SOURCE_FPS: f64 = 30.0;
/// How many source frames a seek may back off when the stream ends before its reported duration.
const MAX_TAIL_BACKOFF: u32 = 8;

/// Decodes a run of consecutive frames: `(seek_sec, count) -> straight RGBA8 frames`.
pub(crate) type BatchFetch = Box<dyn FnMut(f64, u32) -> ReelResult<Vec<Vec<u8>>> + Send>;

/// `ffmpeg`-backed clip decoder.
///
/// Requests are snapped to source frame indices. A miss decodes a window of
/// [`ClipCacheSettings::prefetch_frames`] frames starting at the requested one, so an export
/// walking forward through the clip runs ffmpeg once per window instead of once per frame.
/// Seeks past the last decodable frame show the last frame, as a looping player does.
pub struct FfmpegVideoDecoder {
    info: Arc<VideoSourceInfo>,
    settings: ClipCacheSettings,
    fetch: BatchFetch,
    frames: HashMap<u64, PreparedFrame>,
    lru: VecDeque<u64>,
    last_index: u64,
    batches: u64,
}

impl FfmpegVideoDecoder {
    pub fn new(info: VideoSourceInfo, settings: ClipCacheSettings) -> Self {
        let info = Arc::new(info);
        let src = info.clone();
        let fetch: BatchFetch =
            Box::new(move |at, count| decode_video_frames_rgba8(&src, at, count));
        Self::with_fetch(info, settings, fetch)
    }

    pub(crate) fn with_fetch(
        info: Arc<VideoSourceInfo>,
        settings: ClipCacheSettings,
        fetch: BatchFetch,
    ) -> Self {
        let fps = effective_fps(&info);
        let last_index = if info.duration_sec > 0.0 {
            ((info.duration_sec * fps - 1e-6).ceil() as u64).saturating_sub(1)
        } else {
            u64::MAX
        };
        Self {
            info,
            settings: ClipCacheSettings {
                cache_capacity: settings.cache_capacity.max(1),
                prefetch_frames: settings.prefetch_frames.max(1),
            },
            fetch,
            frames: HashMap::new(),
            lru: VecDeque::new(),
            last_index,
            batches: 0,
        }
    }

    /// ffmpeg runs issued so far.
    pub fn batches_decoded(&self) -> u64 {
        self.batches
    }

    fn index_for_time(&self, time_sec: f64) -> u64 {
        let idx = (time_sec.max(0.0) * effective_fps(&self.info) + 1e-6).floor() as u64;
        idx.min(self.last_index)
    }

    /// Seek half a frame early so the frame at `index` is the first one ffmpeg emits.
    fn seek_time(&self, index: u64) -> f64 {
        ((index as f64 - 0.5) / effective_fps(&self.info)).max(0.0)
    }

    fn decode_window(&mut self, mut index: u64) -> ReelResult<u64> {
        for _ in 0..=MAX_TAIL_BACKOFF {
            let seek = self.seek_time(index);
            let count = self.settings.prefetch_frames;
            let batch = (self.fetch)(seek, count)?;
            self.batches += 1;
            if batch.is_empty() {
                if index == 0 {
                    break;
                }
                index -= 1;
                self.last_index = index;
                continue;
            }
            if batch.len() < self.settings.prefetch_frames as usize {
                self.last_index = self.last_index.min(index + batch.len() as u64 - 1);
            }
            let (w, h) = (self.info.width, self.info.height);
            for (offset, rgba) in batch.into_iter().enumerate() {
                let frame = PreparedFrame::from_straight_rgba8(w, h, rgba)?;
                self.insert_frame(index + offset as u64, frame);
            }
            return Ok(index);
        }
        Err(ReelError::asset_load(format!(
            "no decodable frame in '{}'",
            self.info.source_path.display()
        )))
    }

    fn insert_frame(&mut self, index: u64, frame: PreparedFrame) {
        self.frames.insert(index, frame);
        self.touch(index);
        let capacity = self
            .settings
            .cache_capacity
            .max(self.settings.prefetch_frames as usize);
        while self.lru.len() > capacity {
            if let Some(old) = self.lru.pop_front() {
                self.frames.remove(&old);
            }
        }
    }

    fn touch(&mut self, index: u64) {
        if let Some(pos) = self.lru.iter().position(|x| *x == index) {
            self.lru.remove(pos);
        }
        self.lru.push_back(index);
    }
}

fn effective_fps(info: &VideoSourceInfo) -> f64 {
    match info.source_fps() {
        fps if fps.is_finite() && fps > 0.0 => fps,
        _ => FALLBACK_SOURCE_FPS,
    }
}

impl VideoDecoder for FfmpegVideoDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn duration_secs(&self) -> f64 {
        self.info.duration_sec
    }

    fn frame_at(&mut self, time_sec: f64) -> ReelResult<PreparedFrame> {
        let mut index = self.index_for_time(time_sec);
        if !self.frames.contains_key(&index) {
            index = self.decode_window(index)?;
        }
        self.touch(index);
        self.frames
            .get(&index)
            .cloned()
            .ok_or_else(|| ReelError::asset_load(format!("frame {index} evicted before use")))
    }
}

/// Where a scene's visual comes from, before preloading.
pub enum VisualSource {
    /// Encoded image file (png, jpeg, webp...).
    ImagePath(PathBuf),
    /// Encoded image payload held in memory.
    ImageBytes(Arc<Vec<u8>>),
    /// Video clip probed and sampled through ffmpeg.
    VideoPath(PathBuf),
    /// Any other seekable clip.
    Video(Box<dyn VideoDecoder>),
}

impl std::fmt::Debug for VisualSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImagePath(p) => f.debug_tuple("ImagePath").field(p).finish(),
            Self::ImageBytes(b) => write!(f, "ImageBytes({} bytes)", b.len()),
            Self::VideoPath(p) => f.debug_tuple("VideoPath").field(p).finish(),
            Self::Video(d) => write!(f, "Video({:?})", d.dimensions()),
        }
    }
}

/// A fully prepared scene visual: a still image or a seekable clip.
pub enum VisualAsset {
    Image(PreparedFrame),
    VideoClip(Box<dyn VideoDecoder>),
}

impl std::fmt::Debug for VisualAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image(frame) => write!(f, "Image({}x{})", frame.width, frame.height),
            Self::VideoClip(d) => write!(f, "VideoClip({:?})", d.dimensions()),
        }
    }
}

impl VisualAsset {
    pub fn natural_dimensions(&self) -> (u32, u32) {
        match self {
            Self::Image(frame) => (frame.width, frame.height),
            Self::VideoClip(decoder) => decoder.dimensions(),
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::VideoClip(_))
    }

    /// Produce the pixels to draw for `time_within_asset` seconds into the scene.
    ///
    /// Images have no time axis and ignore the argument. Clips loop: the seek target is
    /// `time_within_asset mod duration`.
    pub fn prepare_frame(&mut self, time_within_asset: f64) -> ReelResult<PreparedFrame> {
        match self {
            Self::Image(frame) => Ok(frame.clone()),
            Self::VideoClip(decoder) => {
                let t = loop_time(time_within_asset, decoder.duration_secs());
                decoder.frame_at(t)
            }
        }
    }
}

/// Wrap `t` into `[0, duration)`; unknown durations pin to zero.
pub fn loop_time(t: f64, duration: f64) -> f64 {
    if !t.is_finite() || !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    t.max(0.0).rem_euclid(duration)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/visual.rs"]
mod tests;
