//! Live preview.
//!
//! `Idle -> Playing -> (narration ended | stop) -> Idle`, with `Paused` keeping the scene that
//! was on screen. Scene switches are scheduled on wall-clock time from the instant both audio
//! buses started; they are not re-measured against the audio position, so long previews may
//! drift from the narration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::audio::buffer::PcmBuffer;
use crate::audio::graph::{AudioDestination, AudioMixGraph, MixGains, MixHandle, MixState};
use crate::foundation::error::{ReelError, ReelResult};
use crate::session::lock::ExportLock;
use crate::session::presenter::ScenePresenter;
use crate::timeline::scene::SceneTimeline;
use crate::timeline::sync::WallClockSync;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    /// Scene on screen. Reset to 0 by `stop` and by the narration ending.
    pub scene: usize,
}

impl PlaybackStatus {
    const IDLE: Self = Self {
        state: PlaybackState::Idle,
        scene: 0,
    };
}

struct Shared {
    /// Id of the session allowed to move the scene index; 0 when none is.
    session: u64,
    presenter: Box<dyn ScenePresenter>,
}

struct ActiveSession {
    mix: MixHandle,
    driver: JoinHandle<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives live playback against an audio destination.
pub struct PlaybackController<D: AudioDestination> {
    destination: D,
    gains: MixGains,
    narration: Option<PcmBuffer>,
    background: Option<PcmBuffer>,
    scene_count: usize,
    export_lock: ExportLock,
    shared: Arc<Mutex<Shared>>,
    status: Arc<watch::Sender<PlaybackStatus>>,
    active: Option<ActiveSession>,
    next_session: u64,
}

impl<D: AudioDestination> PlaybackController<D> {
    pub fn new(destination: D, presenter: Box<dyn ScenePresenter>, export_lock: ExportLock) -> Self {
        let (status, _) = watch::channel(PlaybackStatus::IDLE);
        Self {
            destination,
            gains: MixGains::default(),
            narration: None,
            background: None,
            scene_count: 0,
            export_lock,
            shared: Arc::new(Mutex::new(Shared {
                session: 0,
                presenter,
            })),
            status: Arc::new(status),
            active: None,
            next_session: 1,
        }
    }

    /// Replace what plays. Stops any running session.
    pub fn set_program(&mut self, narration: Option<PcmBuffer>, scene_count: usize) {
        self.stop();
        self.narration = narration;
        self.scene_count = scene_count;
    }

    /// Set the shared background track; applies from the next `play`.
    pub fn set_background(&mut self, background: Option<PcmBuffer>) {
        self.background = background;
    }

    /// Set bus gains; applies from the next `play`.
    pub fn set_gains(&mut self, gains: MixGains) {
        self.gains = gains;
    }

    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    pub fn is_playing(&self) -> bool {
        self.status().state == PlaybackState::Playing
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.subscribe()
    }

    /// Start a session from scene 0. A no-op while already playing.
    ///
    /// Rejected while an export is running and when no narration is loaded. Must be called
    /// inside a tokio runtime.
    pub fn play(&mut self) -> ReelResult<()> {
        if self.export_lock.is_exporting() {
            return Err(ReelError::playback("an export is running"));
        }
        if self.is_playing() {
            return Ok(());
        }
        let narration = self
            .narration
            .clone()
            .ok_or_else(|| ReelError::playback("no narration loaded"))?;
        let rt = tokio::runtime::Handle::try_current()
            .map_err(|_| ReelError::playback("playback requires a tokio runtime"))?;
        let sync = WallClockSync::new(SceneTimeline::new(
            narration.duration_secs(),
            self.scene_count,
        )?);

        self.halt(PlaybackState::Idle);

        let mix = match AudioMixGraph::start(
            Some(&narration),
            self.background.as_ref(),
            self.gains,
            &mut self.destination,
        ) {
            Ok(Some(mix)) => mix,
            Ok(None) => return Err(ReelError::playback("mix did not start")),
            Err(e) => {
                tracing::warn!("playback could not start: {e}");
                return Err(ReelError::playback(e.to_string()));
            }
        };
        let started = Instant::now();

        let id = self.next_session;
        self.next_session += 1;
        {
            let mut shared = lock(&self.shared);
            shared.session = id;
            shared.presenter.activate(0);
            self.status.send_replace(PlaybackStatus {
                state: PlaybackState::Playing,
                scene: 0,
            });
        }

        let driver = rt.spawn(drive(
            self.shared.clone(),
            self.status.clone(),
            id,
            sync,
            mix.clone(),
            started,
        ));
        self.active = Some(ActiveSession { mix, driver });
        tracing::info!(
            scenes = self.scene_count,
            narration_secs = sync.timeline().total_secs(),
            "playback started"
        );
        Ok(())
    }

    /// Stop audio and freeze on the current scene. Idempotent.
    pub fn pause(&mut self) {
        self.halt(PlaybackState::Paused);
    }

    /// Stop audio and return to scene 0. Idempotent.
    pub fn stop(&mut self) {
        self.halt(PlaybackState::Idle);
    }

    /// The media shown for `index` finished on its own.
    ///
    /// Moves to the next scene if `index` is still the active one; stale or out-of-order
    /// notifications are ignored, so the scene index never decreases.
    pub fn notify_scene_ended(&self, index: usize) {
        if self.active.is_none() || index + 1 >= self.scene_count {
            return;
        }
        let id = lock(&self.shared).session;
        advance(&self.shared, &self.status, id, index, index + 1);
    }

    fn halt(&mut self, target: PlaybackState) {
        if let Some(active) = self.active.take() {
            active.driver.abort();
            active.mix.stop();
        }
        let mut shared = lock(&self.shared);
        shared.session = 0;
        let current = self.status();
        if current.state == PlaybackState::Playing {
            shared.presenter.deactivate(current.scene);
            tracing::info!(scene = current.scene, ?target, "playback halted");
        }
        let next = match target {
            PlaybackState::Paused if current.state != PlaybackState::Idle => PlaybackStatus {
                state: PlaybackState::Paused,
                scene: current.scene,
            },
            _ => PlaybackStatus::IDLE,
        };
        self.status.send_if_modified(|s| {
            if *s == next {
                false
            } else {
                *s = next;
                true
            }
        });
    }
}

impl<D: AudioDestination> Drop for PlaybackController<D> {
    fn drop(&mut self) {
        self.halt(PlaybackState::Idle);
    }
}

async fn drive(
    shared: Arc<Mutex<Shared>>,
    status: Arc<watch::Sender<PlaybackStatus>>,
    id: u64,
    sync: WallClockSync,
    mix: MixHandle,
    started: Instant,
) {
    loop {
        let current = status.borrow().scene;
        let switch = sync.switch_at(current + 1).map(|offset| started + offset);
        tokio::select! {
            end = mix.narration_ended() => {
                if end == MixState::NarrationEnded {
                    mix.stop();
                    finish(&shared, &status, id);
                }
                return;
            }
            _ = wait_until(switch) => {
                advance(&shared, &status, id, current, current + 1);
            }
        }
    }
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Move from `from` to `to` if session `id` is live and `from` is still on screen.
fn advance(
    shared: &Mutex<Shared>,
    status: &watch::Sender<PlaybackStatus>,
    id: u64,
    from: usize,
    to: usize,
) {
    let mut shared = lock(shared);
    let current = *status.borrow();
    if shared.session != id || current.state != PlaybackState::Playing || current.scene != from {
        return;
    }
    shared.presenter.deactivate(from);
    shared.presenter.activate(to);
    status.send_modify(|s| s.scene = to);
    tracing::debug!(scene = to, "scene advanced");
}

fn finish(shared: &Mutex<Shared>, status: &watch::Sender<PlaybackStatus>, id: u64) {
    let mut shared = lock(shared);
    if shared.session != id {
        return;
    }
    shared.session = 0;
    let current = *status.borrow();
    shared.presenter.deactivate(current.scene);
    status.send_replace(PlaybackStatus::IDLE);
    tracing::info!("narration ended; playback reset");
}

#[cfg(test)]
#[path = "../../tests/unit/session/playback.rs"]
mod tests;
