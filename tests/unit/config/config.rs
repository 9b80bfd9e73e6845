use super::*;
use std::collections::HashMap;

#[test]
fn defaults_match_short_form_export() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.fps, 30);
    assert_eq!(cfg.narration_gain, 1.0);
    assert_eq!(cfg.background_gain, 0.15);
    assert_eq!(cfg.transition_secs, 0.7);
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_fills_defaults() {
    let cfg: EngineConfig =
        serde_json::from_str(r#"{ "background_gain": 0.12, "format": "webm" }"#).unwrap();
    assert_eq!(cfg.background_gain, 0.12);
    assert_eq!(cfg.format, ContainerFormat::WebM);
    assert_eq!(cfg.fps, 30);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<EngineConfig>(r#"{ "volume": 1 }"#).is_err());
}

#[test]
fn env_overrides_apply_and_validate() {
    let env: HashMap<&str, &str> = [
        ("REELCAST_BACKGROUND_GAIN", "0.3"),
        ("REELCAST_BACKGROUND_URL", "https://example.invalid/bg.mp3"),
    ]
    .into_iter()
    .collect();
    let cfg = EngineConfig::default()
        .with_overrides(|k| env.get(k).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(cfg.background_gain, 0.3);
    assert_eq!(
        cfg.background_url.as_deref(),
        Some("https://example.invalid/bg.mp3")
    );

    let err = EngineConfig::default()
        .with_overrides(|k| (k == "REELCAST_NARRATION_GAIN").then(|| "loud".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("REELCAST_NARRATION_GAIN"));
}

#[test]
fn negative_gain_is_invalid() {
    let cfg = EngineConfig {
        background_gain: -0.1,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn clip_cache_overrides_reach_the_decoder_settings() {
    let env: HashMap<&str, &str> = [
        ("REELCAST_VIDEO_CACHE_CAPACITY", "8"),
        ("REELCAST_VIDEO_PREFETCH_FRAMES", "4"),
    ]
    .into_iter()
    .collect();
    let cfg = EngineConfig::default()
        .with_overrides(|k| env.get(k).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(
        cfg.clip_cache(),
        ClipCacheSettings {
            cache_capacity: 8,
            prefetch_frames: 4,
        }
    );
    assert_eq!(EngineConfig::default().clip_cache(), ClipCacheSettings::default());

    let err = EngineConfig::default()
        .with_overrides(|k| (k == "REELCAST_VIDEO_PREFETCH_FRAMES").then(|| "0".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("video_prefetch_frames"));
}
