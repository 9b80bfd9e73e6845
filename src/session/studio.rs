use crate::audio::background::load_background;
use crate::audio::buffer::PcmBuffer;
use crate::audio::graph::{AudioDestination, MixGains};
use crate::config::EngineConfig;
use crate::effects::transitions::TransitionKind;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::format::{CapabilityProbe, ContainerFormat, available_formats};
use crate::encode::sink::FrameSink;
use crate::foundation::core::Resolution;
use crate::foundation::error::{ReelError, ReelResult};
use crate::session::capture::{CaptureSession, ExportArtifact, ExportSettings};
use crate::session::lock::{CancelFlag, ExportLock};
use crate::session::playback::PlaybackController;
use crate::session::presenter::ScenePresenter;
use crate::storyboard::Storyboard;

struct Loaded {
    storyboard: Storyboard,
    narration: PcmBuffer,
}

/// Everything the UI drives: one storyboard, its preview and its exports.
///
/// The background track is loaded once and shared read-only by every preview and export. A
/// failed background load is not an error; sessions then mix narration only.
pub struct Studio<D: AudioDestination> {
    config: EngineConfig,
    background: Option<PcmBuffer>,
    loaded: Option<Loaded>,
    playback: PlaybackController<D>,
    export_lock: ExportLock,
    cancel: CancelFlag,
    probe: Box<dyn CapabilityProbe>,
}

impl<D: AudioDestination> Studio<D> {
    /// Build a studio and fetch the background track named by `config`.
    pub async fn open(
        config: EngineConfig,
        destination: D,
        presenter: Box<dyn ScenePresenter>,
        probe: Box<dyn CapabilityProbe>,
    ) -> ReelResult<Self> {
        config.validate()?;
        let background = load_background(&config).await;
        Ok(Self::with_background(
            config,
            background,
            destination,
            presenter,
            probe,
        ))
    }

    /// Build a studio around an already decoded background track.
    pub fn with_background(
        config: EngineConfig,
        background: Option<PcmBuffer>,
        destination: D,
        presenter: Box<dyn ScenePresenter>,
        probe: Box<dyn CapabilityProbe>,
    ) -> Self {
        let export_lock = ExportLock::new();
        let mut playback = PlaybackController::new(destination, presenter, export_lock.clone());
        playback.set_background(background.clone());
        playback.set_gains(config.gains());
        Self {
            config,
            background,
            loaded: None,
            playback,
            export_lock,
            cancel: CancelFlag::new(),
            probe,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn background(&self) -> Option<&PcmBuffer> {
        self.background.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn playback(&self) -> &PlaybackController<D> {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController<D> {
        &mut self.playback
    }

    pub fn export_lock(&self) -> ExportLock {
        self.export_lock.clone()
    }

    /// Flag that cancels the running export between frames.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_exporting(&self) -> bool {
        self.export_lock.is_exporting()
    }

    /// Formats the runtime can record; unsupported ones should be disabled in the UI.
    pub fn available_formats(&self) -> Vec<ContainerFormat> {
        available_formats(self.probe.as_ref())
    }

    pub fn set_transition(&mut self, kind: TransitionKind) {
        self.config.transition = kind;
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.config.resolution = resolution;
    }

    pub fn set_format(&mut self, format: ContainerFormat) {
        self.config.format = format;
    }

    /// Set both bus gains (clamped to 0..1). Applies from the next preview or export.
    pub fn set_gains(&mut self, narration: f32, background: f32) {
        let gains = MixGains::new(narration, background);
        self.config.narration_gain = gains.narration;
        self.config.background_gain = gains.background;
        self.playback.set_gains(gains);
    }

    /// Take a storyboard with its decoded narration. Stops any preview.
    pub fn load(&mut self, storyboard: Storyboard, narration: PcmBuffer) -> ReelResult<()> {
        storyboard.validate()?;
        if narration.is_empty() {
            return Err(ReelError::asset_load("narration track is empty"));
        }
        self.playback
            .set_program(Some(narration.clone()), storyboard.scene_count());
        tracing::info!(
            scenes = storyboard.scene_count(),
            narration_secs = narration.duration_secs(),
            "storyboard loaded"
        );
        self.loaded = Some(Loaded {
            storyboard,
            narration,
        });
        Ok(())
    }

    /// Decode the storyboard's narration off the async thread, then [`Studio::load`] it.
    pub async fn load_storyboard(&mut self, storyboard: Storyboard) -> ReelResult<()> {
        let board = storyboard.clone();
        let narration = tokio::task::spawn_blocking(move || board.load_narration())
            .await
            .map_err(|e| ReelError::asset_load(format!("narration decode task failed: {e}")))??;
        self.load(storyboard, narration)
    }

    pub fn play(&mut self) -> ReelResult<()> {
        self.playback.play()
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn stop(&mut self) {
        self.playback.stop();
    }

    /// Export through the system `ffmpeg`.
    pub async fn export(&mut self, progress: impl FnMut(u8) + Send) -> ReelResult<ExportArtifact> {
        let mut sink = FfmpegSink::new(FfmpegSinkOpts {
            bg_rgba: self.config.clear_rgba,
        });
        self.export_into(&mut sink, progress).await
    }

    /// Export into `sink`. A running preview is stopped first.
    pub async fn export_into(
        &mut self,
        sink: &mut dyn FrameSink,
        progress: impl FnMut(u8) + Send,
    ) -> ReelResult<ExportArtifact> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or_else(|| ReelError::validation("no storyboard loaded"))?;
        self.playback.stop();
        let _guard = self.export_lock.try_acquire()?;
        self.cancel.reset();

        let session = CaptureSession::new(ExportSettings::from_config(&self.config)?)
            .with_cancel_flag(self.cancel.clone());
        session
            .export_into(
                sink,
                loaded.storyboard.visual_sources(),
                &loaded.narration,
                self.background.as_ref(),
                self.probe.as_ref(),
                progress,
            )
            .await
    }

    /// Drop the storyboard and return to a blank state. The background track is kept.
    pub fn reset(&mut self) {
        self.playback.set_program(None, 0);
        self.loaded = None;
        tracing::info!("studio reset");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/studio.rs"]
mod tests;
