use std::sync::{Arc, Mutex};

use super::*;
use crate::assets::decode::PreparedFrame;
use crate::assets::visual::VideoDecoder;
use crate::encode::sink::InMemorySink;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

fn png(rgba: [u8; 4]) -> VisualSource {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    VisualSource::ImageBytes(Arc::new(out.into_inner()))
}

fn narration(secs: usize, level: f32) -> PcmBuffer {
    PcmBuffer::new(MIX_SAMPLE_RATE, 2, vec![level; secs * MIX_SAMPLE_RATE as usize * 2]).unwrap()
}

fn settings(transition: TransitionKind) -> ExportSettings {
    ExportSettings {
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        fps: Fps::whole(30).unwrap(),
        format: ContainerFormat::Mp4,
        transition,
        transition_secs: 0.7,
        video_bitrate: 1_000_000,
        gains: MixGains::default(),
        frame_pacing: Duration::ZERO,
        underlay_departing: false,
        clear_rgba: BLACK,
        clip_cache: ClipCacheSettings::default(),
    }
}

fn any_format(_: ContainerFormat) -> bool {
    true
}

fn center(sink: &InMemorySink, frame: usize) -> [u8; 4] {
    let data = &sink.frames()[frame].data;
    let idx = (2 * 4 + 2) * 4;
    [data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]
}

#[tokio::test]
async fn two_scene_export_emits_every_frame_in_order() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::indices_only();
    let mut seen = Vec::new();
    let artifact = session
        .export_into(
            &mut sink,
            vec![png(RED), png(BLUE)],
            &narration(10, 0.25),
            None,
            &any_format,
            |p| seen.push(p),
        )
        .await
        .unwrap();

    assert_eq!(artifact.frames, 300);
    assert_eq!(artifact.format, ContainerFormat::Mp4);
    assert!(artifact.file_name.starts_with("short-"));
    assert!(artifact.file_name.ends_with(".mp4"));
    let expected: Vec<FrameIndex> = (0..300).map(FrameIndex).collect();
    assert_eq!(sink.indices(), expected.as_slice());
    assert!(sink.finished());
    assert!(!sink.aborted());
    assert_eq!(seen, vec![50, 100]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn export_on_a_multi_thread_runtime_matches_current_thread_output() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::new();
    let artifact = session
        .export_into(
            &mut sink,
            vec![png(RED), png(BLUE)],
            &narration(2, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(artifact.frames, 60);
    assert!(sink.finished());
    assert_eq!(sink.frames().len(), 60);
    assert_eq!(center(&sink, 29), RED);
    assert_eq!(center(&sink, 59), BLUE);
    assert_eq!(sink.audio().len(), 2 * MIX_SAMPLE_RATE as usize * 2);
    assert!(sink.audio().iter().all(|s| (s - 0.25).abs() < 1e-6));
}

#[tokio::test]
async fn fade_reaches_full_presentation_before_the_boundary() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::new();
    session
        .export_into(
            &mut sink,
            vec![png(RED), png(BLUE)],
            &narration(10, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(center(&sink, 0), BLACK);
    assert_eq!(center(&sink, 149), RED);
    // Frame 150 starts scene 1 at progress 0: nothing but the clear color.
    assert_eq!(center(&sink, 150), BLACK);
    assert_eq!(center(&sink, 171), BLUE);
    assert_eq!(center(&sink, 299), BLUE);
}

#[tokio::test]
async fn departing_scene_underlays_the_transition_when_enabled() {
    let mut s = settings(TransitionKind::Fade);
    s.underlay_departing = true;
    let session = CaptureSession::new(s);
    let mut sink = InMemorySink::new();
    session
        .export_into(
            &mut sink,
            vec![png(RED), png(BLUE)],
            &narration(10, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(center(&sink, 150), RED);
    let mid = center(&sink, 160);
    assert!(mid[0] > 0 && mid[2] > 0, "{mid:?}");
}

#[tokio::test]
async fn narration_only_mix_when_background_is_absent() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::indices_only();
    session
        .export_into(
            &mut sink,
            vec![png(RED)],
            &narration(2, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap();

    assert_eq!(sink.audio().len(), 2 * MIX_SAMPLE_RATE as usize * 2);
    assert!(sink.audio().iter().all(|s| (s - 0.25).abs() < 1e-6));
    let audio = sink.config().unwrap().audio.unwrap();
    assert_eq!((audio.sample_rate, audio.channels), (MIX_SAMPLE_RATE, 2));
}

#[tokio::test]
async fn background_is_mixed_under_narration_at_its_gain() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::indices_only();
    let background = PcmBuffer::new(MIX_SAMPLE_RATE, 2, vec![0.5; 4800]).unwrap();
    session
        .export_into(
            &mut sink,
            vec![png(RED)],
            &narration(1, 0.25),
            Some(&background),
            &any_format,
            |_| {},
        )
        .await
        .unwrap();

    assert!(sink.audio().iter().all(|s| (s - 0.325).abs() < 1e-5));
}

#[tokio::test]
async fn unsupported_format_falls_back() {
    let session = CaptureSession::new(settings(TransitionKind::Slide));
    let mut sink = InMemorySink::indices_only();
    let webm_only = |f: ContainerFormat| f == ContainerFormat::WebM;
    let artifact = session
        .export_into(
            &mut sink,
            vec![png(RED)],
            &narration(1, 0.25),
            None,
            &webm_only,
            |_| {},
        )
        .await
        .unwrap();
    assert_eq!(artifact.format, ContainerFormat::WebM);
    assert!(artifact.file_name.ends_with(".webm"));
    assert_eq!(sink.config().unwrap().format, ContainerFormat::WebM);
}

#[tokio::test]
async fn broken_asset_aborts_before_recording() {
    let session = CaptureSession::new(settings(TransitionKind::Zoom));
    let mut sink = InMemorySink::indices_only();
    let err = session
        .export_into(
            &mut sink,
            vec![
                png(RED),
                VisualSource::ImageBytes(Arc::new(b"not an image".to_vec())),
            ],
            &narration(2, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::AssetLoad(ref m) if m.contains("scene 1")));
    assert!(sink.config().is_none());
    assert!(sink.indices().is_empty());
}

#[tokio::test]
async fn empty_storyboard_is_rejected() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::indices_only();
    let err = session
        .export_into(
            &mut sink,
            Vec::new(),
            &narration(1, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[tokio::test]
async fn cancellation_discards_the_recording() {
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    session.cancel_flag().cancel();
    let mut sink = InMemorySink::new();
    let err = session
        .export_into(
            &mut sink,
            vec![png(RED)],
            &narration(1, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReelError::Cancelled));
    assert!(sink.aborted());
    assert!(!sink.finished());
    assert!(sink.frames().is_empty());
}

struct RecordingClip {
    seeks: Arc<Mutex<Vec<f64>>>,
}

impl VideoDecoder for RecordingClip {
    fn dimensions(&self) -> (u32, u32) {
        (2, 2)
    }

    fn duration_secs(&self) -> f64 {
        1.0
    }

    fn frame_at(&mut self, time_sec: f64) -> ReelResult<PreparedFrame> {
        self.seeks.lock().unwrap().push(time_sec);
        PreparedFrame::from_straight_rgba8(2, 2, GREEN.repeat(4))
    }
}

const GREEN: [u8; 4] = [0, 255, 0, 255];

#[tokio::test]
async fn clips_are_seeked_to_scene_time_modulo_duration() {
    let seeks = Arc::new(Mutex::new(Vec::new()));
    let clip = RecordingClip {
        seeks: seeks.clone(),
    };
    let session = CaptureSession::new(settings(TransitionKind::Fade));
    let mut sink = InMemorySink::indices_only();
    session
        .export_into(
            &mut sink,
            vec![VisualSource::Video(Box::new(clip))],
            &narration(2, 0.25),
            None,
            &any_format,
            |_| {},
        )
        .await
        .unwrap();

    let seeks = seeks.lock().unwrap();
    // One preload probe at 0, then one seek per frame.
    assert_eq!(seeks.len(), 1 + 60);
    assert_eq!(seeks[0], 0.0);
    assert!((seeks[1 + 15] - 0.5).abs() < 1e-9);
    assert!((seeks[1 + 45] - 0.5).abs() < 1e-9);
    assert!(seeks.iter().all(|t| (0.0..1.0).contains(t)));
}

#[test]
fn artifact_names_are_timestamped() {
    let at = chrono::TimeZone::with_ymd_and_hms(&Local, 2025, 3, 4, 5, 6, 7).unwrap();
    assert_eq!(
        artifact_file_name(at, ContainerFormat::WebM),
        "short-20250304-050607.webm"
    );
}

#[test]
fn artifact_is_saved_under_its_name() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = ExportArtifact {
        bytes: vec![1, 2, 3],
        format: ContainerFormat::Mp4,
        file_name: "short-x.mp4".to_string(),
        frames: 3,
    };
    let path = artifact.save_to_dir(&dir.path().join("nested")).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
}

#[test]
fn settings_follow_the_config() {
    let cfg = EngineConfig {
        resolution: crate::foundation::core::Resolution::Portrait1080,
        transition: TransitionKind::Zoom,
        ..EngineConfig::default()
    };
    let s = ExportSettings::from_config(&cfg).unwrap();
    assert_eq!((s.canvas.width, s.canvas.height), (1080, 1920));
    assert_eq!(s.transition, TransitionKind::Zoom);
    assert_eq!(s.fps, Fps::whole(30).unwrap());
    assert_eq!(s.gains, MixGains::new(1.0, 0.15));
    assert_eq!(s.clip_cache, ClipCacheSettings::default());

    let cfg = EngineConfig {
        video_cache_capacity: 5,
        video_prefetch_frames: 3,
        ..EngineConfig::default()
    };
    let s = ExportSettings::from_config(&cfg).unwrap();
    assert_eq!(
        s.clip_cache,
        ClipCacheSettings {
            cache_capacity: 5,
            prefetch_frames: 3,
        }
    );
}
