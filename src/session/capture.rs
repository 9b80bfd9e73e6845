//! Frame-accurate export.
//!
//! A [`CaptureSession`] owns the raster surface, the recorder and the capture-side audio mix for
//! one export job. Frames are emitted in strictly increasing order; the scene and transition
//! progress of every frame are computed from the frame number alone.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, Local};

use crate::assets::media::MIX_SAMPLE_RATE;
use crate::assets::preload::preload_visuals_async;
use crate::assets::visual::{ClipCacheSettings, VisualAsset, VisualSource};
use crate::audio::buffer::PcmBuffer;
use crate::audio::capture::CaptureDestination;
use crate::audio::graph::{AudioMixGraph, MixGains};
use crate::audio::mix::{frame_to_sample, write_mix_to_f32le_file};
use crate::config::EngineConfig;
use crate::effects::transitions::TransitionKind;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::format::{CapabilityProbe, ContainerFormat, select_format};
use crate::encode::sink::{AudioInputConfig, FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::surface::Surface;
use crate::render::transition::TransitionRenderer;
use crate::session::lock::CancelFlag;
use crate::timeline::scene::SceneTimeline;
use crate::timeline::sync::{FrameSync, SceneSync};

const MIX_CHANNELS: u16 = 2;

/// Fixed parameters of one export job.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSettings {
    pub canvas: Canvas,
    pub fps: Fps,
    /// Requested container; may fall back to the alternative at start.
    pub format: ContainerFormat,
    pub transition: TransitionKind,
    pub transition_secs: f64,
    pub video_bitrate: u32,
    pub gains: MixGains,
    /// Delay between frames; zero yields to the runtime instead.
    pub frame_pacing: Duration,
    pub underlay_departing: bool,
    pub clear_rgba: [u8; 4],
    pub clip_cache: ClipCacheSettings,
}

impl ExportSettings {
    pub fn from_config(cfg: &EngineConfig) -> ReelResult<Self> {
        cfg.validate()?;
        Ok(Self {
            canvas: cfg.resolution.canvas(),
            fps: cfg.fps()?,
            format: cfg.format,
            transition: cfg.transition,
            transition_secs: cfg.transition_secs,
            video_bitrate: cfg.video_bitrate,
            gains: cfg.gains(),
            frame_pacing: cfg.frame_pacing(),
            underlay_departing: cfg.underlay_departing,
            clear_rgba: cfg.clear_rgba,
            clip_cache: cfg.clip_cache(),
        })
    }
}

/// The finished recording, ready to be handed off for download.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub format: ContainerFormat,
    /// Timestamped name with the container extension, e.g. `short-20250101-120000.mp4`.
    pub file_name: String,
    pub frames: u64,
}

impl ExportArtifact {
    /// Write the recording into `dir` under [`ExportArtifact::file_name`].
    pub fn save_to_dir(&self, dir: &Path) -> ReelResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(path)
    }
}

pub fn artifact_file_name(at: DateTime<Local>, format: ContainerFormat) -> String {
    format!("short-{}.{}", at.format("%Y%m%d-%H%M%S"), format.extension())
}

/// One export job.
#[derive(Debug)]
pub struct CaptureSession {
    settings: ExportSettings,
    cancel: CancelFlag,
}

impl CaptureSession {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            cancel: CancelFlag::new(),
        }
    }

    /// Use an externally owned cancel flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Export through the system `ffmpeg`.
    pub async fn export(
        &self,
        visuals: Vec<VisualSource>,
        narration: &PcmBuffer,
        background: Option<&PcmBuffer>,
        probe: &dyn CapabilityProbe,
        progress: impl FnMut(u8) + Send,
    ) -> ReelResult<ExportArtifact> {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts {
            bg_rgba: self.settings.clear_rgba,
        });
        self.export_into(&mut sink, visuals, narration, background, probe, progress)
            .await
    }

    /// Export into any recorder.
    ///
    /// `progress` receives the completed-scene percentage each time a scene boundary is crossed
    /// and 100 when the last frame is emitted. Any failure aborts the recorder; no partial
    /// output is returned.
    #[tracing::instrument(skip_all, fields(scenes = visuals.len(), format = %self.settings.format))]
    pub async fn export_into(
        &self,
        sink: &mut dyn FrameSink,
        visuals: Vec<VisualSource>,
        narration: &PcmBuffer,
        background: Option<&PcmBuffer>,
        probe: &dyn CapabilityProbe,
        mut progress: impl FnMut(u8) + Send,
    ) -> ReelResult<ExportArtifact> {
        let s = &self.settings;
        let format = select_format(s.format, probe)?;
        let timeline = SceneTimeline::new(narration.duration_secs(), visuals.len())?;
        let sync = FrameSync::new(&timeline, s.fps, s.transition_secs)?;
        tracing::info!(
            total_frames = sync.total_frames(),
            frames_per_scene = sync.frames_per_scene(),
            %format,
            "export starting"
        );

        let mut assets = preload_visuals_async(visuals, s.clip_cache).await?;

        let mut destination = CaptureDestination::new(MIX_SAMPLE_RATE, MIX_CHANNELS);
        let mix = AudioMixGraph::start(Some(narration), background, s.gains, &mut destination)?
            .ok_or_else(|| ReelError::capture("capture mix did not start"))?;

        let outcome = async {
            let audio_dir = tempfile::Builder::new()
                .prefix("reelcast-mix-")
                .tempdir()
                .context("create mix directory")?;
            let audio_path = audio_dir.path().join("mix.f32le");
            let sample_frames = frame_to_sample(sync.total_frames(), s.fps, MIX_SAMPLE_RATE);
            let (capture, path) = (destination.clone(), audio_path.clone());
            tokio::task::spawn_blocking(move || {
                write_mix_to_f32le_file(&capture.render(sample_frames), &path)
            })
            .await
            .map_err(|e| ReelError::capture(format!("mix render task failed: {e}")))??;

            let mut surface = Surface::new(s.canvas)?;
            sink.begin(SinkConfig {
                width: s.canvas.width,
                height: s.canvas.height,
                fps: s.fps,
                format,
                video_bitrate: s.video_bitrate,
                audio: Some(AudioInputConfig {
                    path: audio_path,
                    sample_rate: MIX_SAMPLE_RATE,
                    channels: MIX_CHANNELS,
                }),
            })?;
            self.emit_frames(sink, &mut surface, &mut assets, &sync, &mut progress)
                .await?;
            let bytes = run_blocking(|| sink.end())?;
            drop(audio_dir);
            Ok::<_, ReelError>(bytes)
        }
        .await;

        mix.stop();
        match outcome {
            Ok(bytes) => {
                progress(100);
                tracing::info!(bytes = bytes.len(), "export finished");
                Ok(ExportArtifact {
                    bytes,
                    format,
                    file_name: artifact_file_name(Local::now(), format),
                    frames: sync.total_frames(),
                })
            }
            Err(e) => {
                sink.abort();
                tracing::warn!("export failed: {e}");
                Err(e)
            }
        }
    }

    async fn emit_frames(
        &self,
        sink: &mut dyn FrameSink,
        surface: &mut Surface,
        assets: &mut [VisualAsset],
        sync: &FrameSync,
        progress: &mut (impl FnMut(u8) + Send),
    ) -> ReelResult<()> {
        let s = &self.settings;
        let renderer = TransitionRenderer::new(s.transition);
        let scene_count = sync.scene_count();
        let mut scene = 0usize;

        for f in 0..sync.total_frames() {
            if self.cancel.is_cancelled() {
                tracing::info!(frame = f, "export cancelled");
                return Err(ReelError::Cancelled);
            }

            let placement = sync.place(FrameIndex(f));
            if placement.scene != scene {
                scene = placement.scene;
                tracing::debug!(scene, frame = f, "scene boundary");
                progress((scene * 100 / scene_count) as u8);
            }

            run_blocking(|| {
                surface.clear(s.clear_rgba);
                if s.underlay_departing
                    && let Some(prev) = placement.departing
                {
                    let into_prev = f - prev as u64 * sync.frames_per_scene();
                    renderer.render_presented(
                        surface,
                        &mut assets[prev],
                        sync.clip_time(into_prev),
                    )?;
                }
                renderer.render(
                    surface,
                    &mut assets[placement.scene],
                    sync.clip_time(placement.frame_in_scene),
                    placement.progress,
                )?;
                sink.push_frame(FrameIndex(f), surface.frame())
            })?;

            if s.frame_pacing.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(s.frame_pacing).await;
            }
        }
        Ok(())
    }
}

/// Run decode, raster and pipe work off the async scheduler when the runtime can spare the
/// worker; a current-thread runtime has no other worker, so the work runs inline there.
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(tokio::runtime::RuntimeFlavor::MultiThread) => tokio::task::block_in_place(work),
        _ => work(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/capture.rs"]
mod tests;
