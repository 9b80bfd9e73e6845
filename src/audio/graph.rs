//! Two-bus gain-mixed audio graph.
//!
//! A session always has a narration bus (one-shot) and, when the background track decoded, a
//! looping background bus. Both terminate at one [`AudioDestination`] and are started at the
//! same destination time, which is the only audio/visual sync anchor of a session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::audio::buffer::PcmBuffer;
use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusKind {
    Narration,
    Background,
}

/// Per-bus gains, each a normalized 0..1 scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixGains {
    pub narration: f32,
    pub background: f32,
}

impl MixGains {
    /// Build gains, clamping both into `[0, 1]`. Non-finite values become 0.
    pub fn new(narration: f32, background: f32) -> Self {
        fn norm(g: f32) -> f32 {
            if g.is_finite() { g.clamp(0.0, 1.0) } else { 0.0 }
        }
        Self {
            narration: norm(narration),
            background: norm(background),
        }
    }
}

impl Default for MixGains {
    fn default() -> Self {
        Self::new(1.0, 0.15)
    }
}

/// One gain-controlled path from a source buffer to the destination.
#[derive(Clone, Debug)]
pub struct MixBus {
    pub kind: BusKind,
    pub buffer: PcmBuffer,
    pub gain: f32,
    pub looped: bool,
}

/// How a destination consumes time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestinationClock {
    /// Audible output that advances with wall-clock time.
    Realtime,
    /// Rendered ahead of time; sample zero lines up with the first output frame.
    Offline,
}

/// A connected source on a destination.
pub trait BusVoice: Send {
    /// Begin producing sound at destination time `at` (seconds).
    fn start(&mut self, at: f64) -> ReelResult<()>;
    /// Silence the voice. Stopping twice may return an error; callers ignore it.
    fn stop(&mut self) -> ReelResult<()>;
}

/// Terminal node of a mix: the speaker for live playback or a capture sink for export.
pub trait AudioDestination {
    fn clock(&self) -> DestinationClock;
    /// Current destination time in seconds.
    fn current_time(&self) -> f64;
    /// Attach a bus. The returned voice is silent until started.
    fn connect(&mut self, bus: MixBus) -> ReelResult<Box<dyn BusVoice>>;
}

/// Lifecycle of one mix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixState {
    Running,
    /// The narration source completed by itself.
    NarrationEnded,
    /// `stop()` was called before the narration completed.
    Stopped,
}

struct MixInner {
    voices: Mutex<Vec<(BusKind, Box<dyn BusVoice>)>>,
    state: watch::Sender<MixState>,
    started_at: f64,
    narration_secs: f64,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running mix. Clones refer to the same mix.
#[derive(Clone)]
pub struct MixHandle {
    inner: Arc<MixInner>,
}

impl std::fmt::Debug for MixHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixHandle")
            .field("state", &self.state())
            .field("started_at", &self.inner.started_at)
            .field("narration_secs", &self.inner.narration_secs)
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MixHandle {
    pub fn state(&self) -> MixState {
        *self.inner.state.borrow()
    }

    /// Destination time both buses were started at.
    pub fn started_at(&self) -> f64 {
        self.inner.started_at
    }

    pub fn narration_secs(&self) -> f64 {
        self.inner.narration_secs
    }

    /// Stop every bus. Safe to call any number of times.
    ///
    /// A mix whose narration already ended keeps the `NarrationEnded` state; its looping
    /// background bus is still silenced.
    pub fn stop(&self) {
        self.inner.state.send_if_modified(|s| {
            if *s == MixState::Running {
                *s = MixState::Stopped;
                true
            } else {
                false
            }
        });
        if let Some(watcher) = lock(&self.inner.watcher).take() {
            watcher.abort();
        }
        for (kind, voice) in lock(&self.inner.voices).iter_mut() {
            if let Err(e) = voice.stop() {
                tracing::debug!(?kind, "ignoring voice stop error: {e}");
            }
        }
    }

    /// Resolve once the mix leaves `Running`, with the state it ended in.
    pub async fn narration_ended(&self) -> MixState {
        let mut rx = self.inner.state.subscribe();
        match rx.wait_for(|s| *s != MixState::Running).await {
            Ok(state) => *state,
            Err(_) => MixState::Stopped,
        }
    }
}

/// Builder for two-bus mixes.
pub struct AudioMixGraph;

impl AudioMixGraph {
    /// Connect and start the narration bus and, if present, the looping background bus.
    ///
    /// Returns `Ok(None)` when there is no narration: nothing plays. Both voices are started with
    /// the same destination time. On realtime destinations a natural-end notification is armed
    /// for the narration length; this requires a tokio runtime and is skipped with a warning
    /// otherwise.
    pub fn start(
        narration: Option<&PcmBuffer>,
        background: Option<&PcmBuffer>,
        gains: MixGains,
        destination: &mut dyn AudioDestination,
    ) -> ReelResult<Option<MixHandle>> {
        let Some(narration) = narration else {
            tracing::debug!("no narration buffer; mix not started");
            return Ok(None);
        };

        let mut buses = vec![MixBus {
            kind: BusKind::Narration,
            buffer: narration.clone(),
            gain: gains.narration,
            looped: false,
        }];
        match background {
            Some(bg) if !bg.is_empty() => buses.push(MixBus {
                kind: BusKind::Background,
                buffer: bg.clone(),
                gain: gains.background,
                looped: true,
            }),
            _ => tracing::debug!("no background buffer; narration-only mix"),
        }

        let mut voices = Vec::with_capacity(buses.len());
        for bus in buses {
            let kind = bus.kind;
            voices.push((kind, destination.connect(bus)?));
        }

        let at = destination.current_time();
        for i in 0..voices.len() {
            if let Err(e) = voices[i].1.start(at) {
                for (_, v) in voices.iter_mut().take(i) {
                    let _ = v.stop();
                }
                return Err(ReelError::mix_graph(format!(
                    "failed to start {:?} bus: {e}",
                    voices[i].0
                )));
            }
        }

        let (state, _) = watch::channel(MixState::Running);
        let inner = Arc::new(MixInner {
            voices: Mutex::new(voices),
            state,
            started_at: at,
            narration_secs: narration.duration_secs(),
            watcher: Mutex::new(None),
        });

        if destination.clock() == DestinationClock::Realtime {
            match tokio::runtime::Handle::try_current() {
                Ok(rt) => {
                    let weak = Arc::downgrade(&inner);
                    let secs = inner.narration_secs;
                    *lock(&inner.watcher) = Some(rt.spawn(watch_narration_end(weak, secs)));
                }
                Err(_) => tracing::warn!("no tokio runtime; narration end will not be reported"),
            }
        }

        tracing::debug!(at, narration_secs = inner.narration_secs, "mix started");
        Ok(Some(MixHandle { inner }))
    }
}

async fn watch_narration_end(inner: Weak<MixInner>, secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let fired = inner.state.send_if_modified(|s| {
        if *s == MixState::Running {
            *s = MixState::NarrationEnded;
            true
        } else {
            false
        }
    });
    if fired {
        tracing::debug!("narration ended");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/graph.rs"]
mod tests;
