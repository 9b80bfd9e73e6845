use super::*;

struct Ramp;

impl VideoDecoder for Ramp {
    fn dimensions(&self) -> (u32, u32) {
        (2, 2)
    }

    fn duration_secs(&self) -> f64 {
        2.0
    }

    fn frame_at(&mut self, time_sec: f64) -> ReelResult<PreparedFrame> {
        let v = (time_sec * 100.0) as u8;
        PreparedFrame::from_straight_rgba8(2, 2, [v, v, v, 255].repeat(4))
    }
}

#[test]
fn loop_time_wraps_and_pins() {
    assert_eq!(loop_time(0.5, 2.0), 0.5);
    assert!((loop_time(5.25, 2.0) - 1.25).abs() < 1e-12);
    assert_eq!(loop_time(3.0, 0.0), 0.0);
    assert_eq!(loop_time(f64::NAN, 2.0), 0.0);
}

#[test]
fn clip_seeks_modulo_duration() {
    let mut asset = VisualAsset::VideoClip(Box::new(Ramp));
    assert!(asset.is_video());
    let frame = asset.prepare_frame(2.5).unwrap();
    assert_eq!(frame.rgba8_premul[0], 50);
}

#[test]
fn image_ignores_time() {
    let frame = PreparedFrame::from_straight_rgba8(1, 1, vec![9, 8, 7, 255]).unwrap();
    let mut asset = VisualAsset::Image(frame.clone());
    assert_eq!(asset.natural_dimensions(), (1, 1));
    assert_eq!(asset.prepare_frame(123.0).unwrap(), frame);
}

mod ffmpeg_decoder {
    use std::sync::Mutex;

    use super::*;

    /// Fake 24 fps clip of `frames` frames; each frame's red channel is its index.
    fn clip(
        frames: u64,
        reported_secs: f64,
        settings: ClipCacheSettings,
    ) -> (FfmpegVideoDecoder, Arc<Mutex<Vec<f64>>>) {
        let info = Arc::new(VideoSourceInfo {
            source_path: PathBuf::from("clip.mp4"),
            width: 1,
            height: 1,
            fps_num: 24,
            fps_den: 1,
            duration_sec: reported_secs,
        });
        let seeks = Arc::new(Mutex::new(Vec::new()));
        let log = seeks.clone();
        let fetch: BatchFetch = Box::new(move |at: f64, count: u32| {
            log.lock().unwrap().push(at);
            // First frame with pts >= at.
            let first = (at * 24.0).ceil() as u64;
            Ok((first..frames)
                .take(count as usize)
                .map(|i| vec![i as u8, 0, 0, 255])
                .collect())
        });
        (
            FfmpegVideoDecoder::with_fetch(info, settings, fetch),
            seeks,
        )
    }

    fn red(frame: &PreparedFrame) -> u8 {
        frame.rgba8_premul[0]
    }

    #[test]
    fn sequential_export_frames_share_one_decode_window() {
        let (mut dec, seeks) = clip(120, 5.0, ClipCacheSettings::default());
        // 30 fps output walking through the first 12 source frames (0.5 s).
        for f in 0..15u32 {
            let t = f64::from(f) / 30.0;
            let frame = dec.frame_at(t).unwrap();
            assert_eq!(red(&frame), (t * 24.0 + 1e-6).floor() as u8);
        }
        assert_eq!(dec.batches_decoded(), 1);
        assert_eq!(seeks.lock().unwrap().len(), 1);

        dec.frame_at(0.5).unwrap();
        assert_eq!(dec.batches_decoded(), 2);
    }

    #[test]
    fn seek_in_the_final_frame_interval_shows_the_last_frame() {
        let (mut dec, _) = clip(120, 5.0, ClipCacheSettings::default());
        // 149 / 30 s on a 5 s clip lands after the last frame's timestamp (119 / 24 s).
        let t = loop_time(149.0 / 30.0, dec.duration_secs());
        let frame = dec.frame_at(t).unwrap();
        assert_eq!(red(&frame), 119);
    }

    #[test]
    fn stream_shorter_than_reported_duration_backs_off_to_its_end() {
        // Reports 5 s but only 117 frames decode.
        let (mut dec, _) = clip(117, 5.0, ClipCacheSettings::default());
        let frame = dec.frame_at(4.99).unwrap();
        assert_eq!(red(&frame), 116);
        // The tail is now known; a later seek there reuses the cache.
        let batches = dec.batches_decoded();
        assert_eq!(red(&dec.frame_at(4.9).unwrap()), 116);
        assert_eq!(dec.batches_decoded(), batches);
    }

    #[test]
    fn empty_stream_is_an_asset_error() {
        let (mut dec, _) = clip(0, 1.0, ClipCacheSettings::default());
        assert!(matches!(dec.frame_at(0.0), Err(ReelError::AssetLoad(_))));
    }

    #[test]
    fn cache_never_evicts_the_frame_being_returned() {
        let settings = ClipCacheSettings {
            cache_capacity: 1,
            prefetch_frames: 4,
        };
        let (mut dec, _) = clip(120, 5.0, settings);
        assert_eq!(red(&dec.frame_at(0.0).unwrap()), 0);
        assert_eq!(red(&dec.frame_at(3.0 / 24.0).unwrap()), 3);
        assert_eq!(dec.batches_decoded(), 1);
    }
}
