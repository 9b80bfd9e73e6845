use super::*;

#[test]
fn path_takes_precedence_over_url() {
    let cfg = EngineConfig {
        background_url: Some("https://example.invalid/a.mp3".into()),
        background_path: Some("/tmp/b.mp3".into()),
        ..EngineConfig::default()
    };
    assert_eq!(
        BackgroundSource::from_config(&cfg),
        Some(BackgroundSource::Path("/tmp/b.mp3".into()))
    );
    assert_eq!(BackgroundSource::from_config(&EngineConfig::default()), None);
}

#[tokio::test]
async fn missing_file_degrades_to_none() {
    let cfg = EngineConfig {
        background_path: Some("/nonexistent/reelcast/bg.mp3".into()),
        ..EngineConfig::default()
    };
    assert!(load_background(&cfg).await.is_none());
}

#[tokio::test]
async fn unreachable_url_degrades_to_none() {
    // Port 9 (discard) on loopback refuses connections on test machines.
    let cfg = EngineConfig {
        background_url: Some("http://127.0.0.1:9/bg.mp3".into()),
        ..EngineConfig::default()
    };
    assert!(load_background(&cfg).await.is_none());
}
