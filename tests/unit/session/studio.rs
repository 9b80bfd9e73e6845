use std::sync::Arc;

use super::*;
use crate::audio::silent::SilentDestination;
use crate::encode::sink::InMemorySink;
use crate::session::playback::PlaybackState;
use crate::session::presenter::TracingPresenter;
use crate::storyboard::SceneVisual;

fn png() -> SceneVisual {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 200, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    SceneVisual::Encoded(Arc::new(out.into_inner()))
}

/// 0.2 s of narration: six frames at 30 fps.
fn short_narration() -> PcmBuffer {
    PcmBuffer::new(48_000, 2, vec![0.2; 9_600 * 2]).unwrap()
}

fn studio(background: Option<PcmBuffer>) -> Studio<SilentDestination> {
    let mut studio = Studio::with_background(
        EngineConfig::default(),
        background,
        SilentDestination::new(),
        Box::new(TracingPresenter),
        Box::new(|_: ContainerFormat| true),
    );
    studio
        .load(Storyboard::new("n.wav", vec![png(), png()]), short_narration())
        .unwrap();
    studio
}

#[tokio::test(start_paused = true)]
async fn export_stops_a_running_preview_first() {
    let mut studio = studio(None);
    studio.play().unwrap();
    assert!(studio.playback().is_playing());

    let mut sink = InMemorySink::indices_only();
    let artifact = studio.export_into(&mut sink, |_| {}).await.unwrap();
    assert_eq!(artifact.frames, 6);
    assert_eq!(studio.playback().status().state, PlaybackState::Idle);
    assert!(!studio.is_exporting());
}

#[tokio::test(start_paused = true)]
async fn preview_is_rejected_while_exporting() {
    let mut studio = studio(None);
    let guard = studio.export_lock().try_acquire().unwrap();
    assert!(studio.is_exporting());
    assert!(matches!(studio.play(), Err(ReelError::Playback(_))));

    let mut sink = InMemorySink::indices_only();
    assert!(matches!(
        studio.export_into(&mut sink, |_| {}).await,
        Err(ReelError::Capture(_))
    ));
    drop(guard);
    studio.play().unwrap();
}

#[tokio::test]
async fn export_without_a_storyboard_is_rejected() {
    let mut studio = studio(None);
    studio.reset();
    assert!(!studio.is_loaded());
    let mut sink = InMemorySink::indices_only();
    assert!(matches!(
        studio.export_into(&mut sink, |_| {}).await,
        Err(ReelError::Validation(_))
    ));
    assert!(matches!(studio.play(), Err(ReelError::Playback(_))));
}

#[tokio::test(start_paused = true)]
async fn reset_keeps_the_background_track() {
    let bg = PcmBuffer::new(48_000, 2, vec![0.1; 960]).unwrap();
    let mut studio = studio(Some(bg.clone()));
    studio.play().unwrap();
    studio.reset();
    assert_eq!(studio.playback().status().state, PlaybackState::Idle);
    assert_eq!(studio.background(), Some(&bg));
}

#[tokio::test]
async fn gains_are_clamped_and_reach_the_export_mix() {
    let bg = PcmBuffer::new(48_000, 2, vec![1.0; 960]).unwrap();
    let mut studio = studio(Some(bg));
    studio.set_gains(2.0, -1.0);
    assert_eq!(studio.config().narration_gain, 1.0);
    assert_eq!(studio.config().background_gain, 0.0);

    let mut sink = InMemorySink::indices_only();
    studio.export_into(&mut sink, |_| {}).await.unwrap();
    assert!(sink.audio().iter().all(|s| (s - 0.2).abs() < 1e-6));
}

#[tokio::test]
async fn settings_changes_apply_to_the_next_export() {
    let mut studio = studio(None);
    studio.set_format(ContainerFormat::WebM);
    studio.set_transition(TransitionKind::Slide);
    studio.set_resolution(Resolution::Portrait720);
    let mut sink = InMemorySink::indices_only();
    let artifact = studio.export_into(&mut sink, |_| {}).await.unwrap();
    assert_eq!(artifact.format, ContainerFormat::WebM);
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (720, 1280));
    assert_eq!(studio.available_formats(), ContainerFormat::PREFERENCE.to_vec());
}

#[test]
fn loading_an_empty_narration_fails() {
    let mut studio = Studio::with_background(
        EngineConfig::default(),
        None,
        SilentDestination::new(),
        Box::new(TracingPresenter),
        Box::new(|_: ContainerFormat| true),
    );
    let empty = PcmBuffer::new(48_000, 2, Vec::new()).unwrap();
    assert!(matches!(
        studio.load(Storyboard::new("n.wav", vec![png()]), empty),
        Err(ReelError::AssetLoad(_))
    ));
}
