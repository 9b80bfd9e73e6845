use super::*;

#[test]
fn kind_parses_names_and_aliases() {
    assert_eq!("fade".parse::<TransitionKind>().unwrap(), TransitionKind::Fade);
    assert_eq!(" Crossfade ".parse::<TransitionKind>().unwrap(), TransitionKind::Fade);
    assert_eq!("SLIDE".parse::<TransitionKind>().unwrap(), TransitionKind::Slide);
    assert_eq!("zoom".parse::<TransitionKind>().unwrap(), TransitionKind::Zoom);
    assert!("wipe".parse::<TransitionKind>().is_err());
    assert!("".parse::<TransitionKind>().is_err());
}

#[test]
fn kind_serde_uses_lowercase_names() {
    for kind in TransitionKind::ALL {
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, format!("\"{kind}\""));
        assert_eq!(serde_json::from_str::<TransitionKind>(&json).unwrap(), kind);
    }
}

#[test]
fn window_is_min_of_seconds_and_half_scene() {
    let fps = Fps::whole(30).unwrap();
    assert!((transition_frames(fps, 0.7, 150) - 21.0).abs() < 1e-9);
    assert_eq!(transition_frames(fps, 0.7, 10), 5.0);
    assert_eq!(transition_frames(fps, 0.7, 1), 0.5);
}

#[test]
fn progress_is_clamped_without_overshoot() {
    let tf = 21.0;
    assert_eq!(transition_progress(0, tf), 0.0);
    for f in 0..200u64 {
        let p = transition_progress(f, tf);
        assert!((0.0..=1.0).contains(&p));
        if f as f64 >= tf {
            assert_eq!(p, 1.0);
        }
    }
    assert_eq!(transition_progress(0, 0.0), 1.0);
    assert_eq!(transition_progress(3, f64::NAN), 1.0);
}

#[test]
fn fade_only_changes_opacity() {
    let op = composite_op(TransitionKind::Fade, 0.25, 720);
    assert_eq!(op.opacity, 0.25);
    assert_eq!(op.translate_x, 0.0);
    assert_eq!(op.scale, 1.0);
}

#[test]
fn slide_enters_from_the_right_edge() {
    assert_eq!(composite_op(TransitionKind::Slide, 0.0, 720).translate_x, 720.0);
    assert_eq!(composite_op(TransitionKind::Slide, 0.5, 720).translate_x, 360.0);
    let done = composite_op(TransitionKind::Slide, 1.0, 720);
    assert_eq!(done, CompositeOp::PRESENTED);
}

#[test]
fn zoom_scales_and_fades() {
    let start = composite_op(TransitionKind::Zoom, 0.0, 720);
    assert_eq!(start.opacity, 0.0);
    assert!((start.scale - 0.8).abs() < 1e-12);
    let mid = composite_op(TransitionKind::Zoom, 0.5, 720);
    assert!((mid.scale - 0.9).abs() < 1e-12);
    assert_eq!(composite_op(TransitionKind::Zoom, 1.0, 720), CompositeOp::PRESENTED);
}

#[test]
fn out_of_range_progress_is_clamped() {
    for kind in TransitionKind::ALL {
        assert_eq!(composite_op(kind, 7.0, 720), CompositeOp::PRESENTED);
        assert_eq!(composite_op(kind, -1.0, 720), composite_op(kind, 0.0, 720));
        assert_eq!(composite_op(kind, f64::NAN, 720), composite_op(kind, 0.0, 720));
    }
}
