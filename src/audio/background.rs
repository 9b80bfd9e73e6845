use std::path::PathBuf;

use crate::audio::buffer::PcmBuffer;
use crate::config::EngineConfig;
use crate::foundation::error::{ReelError, ReelResult};

/// Where the looping background track is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackgroundSource {
    Url(String),
    Path(PathBuf),
}

impl BackgroundSource {
    /// A local path wins over a URL; neither means narration-only output.
    pub fn from_config(cfg: &EngineConfig) -> Option<Self> {
        if let Some(p) = &cfg.background_path {
            return Some(Self::Path(p.clone()));
        }
        cfg.background_url.clone().map(Self::Url)
    }
}

/// Load and decode the background track once.
///
/// Failure is never fatal: it is logged and `None` is returned, and every later playback or
/// export mixes narration only.
pub async fn load_background(cfg: &EngineConfig) -> Option<PcmBuffer> {
    let source = BackgroundSource::from_config(cfg)?;
    match fetch_background(&source).await {
        Ok(pcm) => {
            tracing::info!(
                secs = pcm.duration_secs(),
                ?source,
                "background track loaded"
            );
            Some(pcm)
        }
        Err(e) => {
            tracing::warn!(?source, "background track unavailable, continuing without it: {e}");
            None
        }
    }
}

pub async fn fetch_background(source: &BackgroundSource) -> ReelResult<PcmBuffer> {
    let pcm = match source {
        BackgroundSource::Url(url) => {
            let bytes = fetch_bytes(url).await?;
            tokio::task::spawn_blocking(move || PcmBuffer::decode_bytes(&bytes))
                .await
                .map_err(|e| ReelError::asset_load(format!("background decode task failed: {e}")))??
        }
        BackgroundSource::Path(path) => {
            if !path.is_file() {
                return Err(ReelError::asset_load(format!(
                    "background file '{}' does not exist",
                    path.display()
                )));
            }
            let path = path.clone();
            tokio::task::spawn_blocking(move || PcmBuffer::decode_file(&path))
                .await
                .map_err(|e| ReelError::asset_load(format!("background decode task failed: {e}")))??
        }
    };
    if pcm.is_empty() {
        return Err(ReelError::asset_load("background track decoded to no samples"));
    }
    Ok(pcm)
}

async fn fetch_bytes(url: &str) -> ReelResult<Vec<u8>> {
    let resp = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| ReelError::asset_load(format!("GET {url}: {e}")))?;
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| ReelError::asset_load(format!("GET {url}: body: {e}")))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/background.rs"]
mod tests;
