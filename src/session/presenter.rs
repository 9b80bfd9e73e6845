/// Receives scene switches during live playback.
///
/// Implementations own whatever shows a scene (a window, a media element, a log line). The
/// controller deactivates the previous scene before activating the next one.
pub trait ScenePresenter: Send {
    fn activate(&mut self, index: usize);
    fn deactivate(&mut self, index: usize);
}

/// Headless presenter that logs every switch.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingPresenter;

impl ScenePresenter for TracingPresenter {
    fn activate(&mut self, index: usize) {
        tracing::info!(scene = index, "scene shown");
    }

    fn deactivate(&mut self, index: usize) {
        tracing::debug!(scene = index, "scene paused");
    }
}
