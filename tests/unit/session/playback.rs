use std::time::Duration;

use super::*;
use crate::audio::silent::SilentDestination;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shown {
    On(usize),
    Off(usize),
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Shown>>>);

impl Recorder {
    fn events(&self) -> Vec<Shown> {
        self.0.lock().unwrap().clone()
    }
}

impl ScenePresenter for Recorder {
    fn activate(&mut self, index: usize) {
        self.0.lock().unwrap().push(Shown::On(index));
    }

    fn deactivate(&mut self, index: usize) {
        self.0.lock().unwrap().push(Shown::Off(index));
    }
}

fn narration(secs: usize) -> PcmBuffer {
    PcmBuffer::new(48_000, 2, vec![0.1; secs * 48_000 * 2]).unwrap()
}

fn controller(scenes: usize, secs: usize) -> (PlaybackController<SilentDestination>, Recorder) {
    let rec = Recorder::default();
    let mut ctrl = PlaybackController::new(
        SilentDestination::new(),
        Box::new(rec.clone()),
        ExportLock::new(),
    );
    ctrl.set_program(Some(narration(secs)), scenes);
    (ctrl, rec)
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn play_without_narration_is_rejected() {
    let mut ctrl = PlaybackController::new(
        SilentDestination::new(),
        Box::new(Recorder::default()),
        ExportLock::new(),
    );
    assert!(matches!(ctrl.play(), Err(ReelError::Playback(_))));
    assert_eq!(ctrl.status(), PlaybackStatus::IDLE);
}

#[tokio::test(start_paused = true)]
async fn play_during_export_is_rejected() {
    let lock = ExportLock::new();
    let mut ctrl = PlaybackController::new(
        SilentDestination::new(),
        Box::new(Recorder::default()),
        lock.clone(),
    );
    ctrl.set_program(Some(narration(4)), 2);
    let guard = lock.try_acquire().unwrap();
    assert!(matches!(ctrl.play(), Err(ReelError::Playback(_))));
    assert!(!ctrl.is_playing());
    drop(guard);
    ctrl.play().unwrap();
    assert!(ctrl.is_playing());
}

#[tokio::test(start_paused = true)]
async fn scenes_advance_on_schedule_and_reset_when_narration_ends() {
    let (mut ctrl, rec) = controller(5, 10);
    let mut rx = ctrl.subscribe();
    ctrl.play().unwrap();
    assert_eq!(
        ctrl.status(),
        PlaybackStatus {
            state: PlaybackState::Playing,
            scene: 0
        }
    );

    sleep_ms(2_100).await;
    assert_eq!(ctrl.status().scene, 1);
    sleep_ms(6_000).await;
    assert_eq!(ctrl.status().scene, 4);

    rx.wait_for(|s| s.state == PlaybackState::Idle).await.unwrap();
    assert_eq!(ctrl.status(), PlaybackStatus::IDLE);
    assert_eq!(
        rec.events(),
        vec![
            Shown::On(0),
            Shown::Off(0),
            Shown::On(1),
            Shown::Off(1),
            Shown::On(2),
            Shown::Off(2),
            Shown::On(3),
            Shown::Off(3),
            Shown::On(4),
            Shown::Off(4),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn scene_index_never_decreases_while_playing() {
    let (mut ctrl, _rec) = controller(4, 8);
    let mut rx = ctrl.subscribe();
    ctrl.play().unwrap();
    let mut last = 0usize;
    loop {
        if rx.changed().await.is_err() {
            break;
        }
        let s = *rx.borrow_and_update();
        if s.state != PlaybackState::Playing {
            break;
        }
        assert!(s.scene >= last);
        last = s.scene;
    }
    assert_eq!(last, 3);
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_the_scene_and_stop_resets_it() {
    let (mut ctrl, rec) = controller(5, 10);
    ctrl.play().unwrap();
    sleep_ms(4_500).await;
    ctrl.pause();
    assert_eq!(
        ctrl.status(),
        PlaybackStatus {
            state: PlaybackState::Paused,
            scene: 2
        }
    );
    assert_eq!(rec.events().last(), Some(&Shown::Off(2)));

    // Nothing moves once paused, including the narration end.
    sleep_ms(10_000).await;
    assert_eq!(ctrl.status().scene, 2);
    assert_eq!(ctrl.status().state, PlaybackState::Paused);

    ctrl.pause();
    ctrl.stop();
    ctrl.stop();
    assert_eq!(ctrl.status(), PlaybackStatus::IDLE);
    assert_eq!(rec.events().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn pause_when_idle_stays_idle() {
    let (mut ctrl, rec) = controller(2, 4);
    ctrl.pause();
    assert_eq!(ctrl.status(), PlaybackStatus::IDLE);
    assert!(rec.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn media_end_notification_advances_early() {
    let (mut ctrl, _rec) = controller(5, 10);
    ctrl.play().unwrap();
    ctrl.notify_scene_ended(0);
    assert_eq!(ctrl.status().scene, 1);
    // Stale notification.
    ctrl.notify_scene_ended(0);
    assert_eq!(ctrl.status().scene, 1);

    // The wall-clock schedule still owns scene 2's start.
    sleep_ms(2_100).await;
    assert_eq!(ctrl.status().scene, 1);
    sleep_ms(2_000).await;
    assert_eq!(ctrl.status().scene, 2);

    ctrl.notify_scene_ended(2);
    ctrl.notify_scene_ended(3);
    assert_eq!(ctrl.status().scene, 4);
    // The last scene has nowhere to go.
    ctrl.notify_scene_ended(4);
    assert_eq!(ctrl.status().scene, 4);
}

#[tokio::test(start_paused = true)]
async fn play_again_restarts_from_the_first_scene() {
    let (mut ctrl, _rec) = controller(3, 6);
    ctrl.play().unwrap();
    ctrl.play().unwrap();
    sleep_ms(2_500).await;
    assert_eq!(ctrl.status().scene, 1);
    ctrl.pause();
    ctrl.play().unwrap();
    assert_eq!(
        ctrl.status(),
        PlaybackStatus {
            state: PlaybackState::Playing,
            scene: 0
        }
    );
    sleep_ms(2_500).await;
    assert_eq!(ctrl.status().scene, 1);
}

#[tokio::test(start_paused = true)]
async fn notifications_after_stop_are_ignored() {
    let (mut ctrl, rec) = controller(3, 6);
    ctrl.play().unwrap();
    ctrl.stop();
    ctrl.notify_scene_ended(0);
    assert_eq!(ctrl.status(), PlaybackStatus::IDLE);
    assert_eq!(rec.events(), vec![Shown::On(0), Shown::Off(0)]);
}
