use super::*;
use crate::audio::buffer::PcmBuffer;
use crate::audio::graph::{AudioMixGraph, MixGains, MixState};

#[test]
fn renders_narration_over_looping_background() {
    let mut dest = CaptureDestination::new(10, 2);
    let narration = PcmBuffer::new(10, 2, vec![0.5; 2 * 5]).unwrap();
    let bg = PcmBuffer::new(10, 1, vec![1.0; 3]).unwrap();
    let handle = AudioMixGraph::start(
        Some(&narration),
        Some(&bg),
        MixGains::new(1.0, 0.1),
        &mut dest,
    )
    .unwrap()
    .unwrap();
    assert_eq!(dest.live_buses(), 2);

    let pcm = dest.render(10);
    assert_eq!(pcm.len(), 20);
    assert!((pcm[0] - 0.6).abs() < 1e-6);
    assert!((pcm[19] - 0.1).abs() < 1e-6);

    handle.stop();
    assert_eq!(handle.state(), MixState::Stopped);
    assert_eq!(dest.live_buses(), 0);
}

#[test]
fn narration_only_when_background_missing() {
    let mut dest = CaptureDestination::new(10, 1);
    let narration = PcmBuffer::new(10, 1, vec![0.5; 2]).unwrap();
    AudioMixGraph::start(Some(&narration), None, MixGains::default(), &mut dest)
        .unwrap()
        .unwrap();
    assert_eq!(dest.render(4), vec![0.5, 0.5, 0.0, 0.0]);
}
