use crate::assets::decode::decode_image;
use crate::assets::media::probe_video;
use crate::assets::visual::{
    ClipCacheSettings, FfmpegVideoDecoder, VideoDecoder, VisualAsset, VisualSource,
};
use crate::foundation::error::{ReelError, ReelResult};

/// Decode every scene visual before any frame is emitted.
///
/// Images are decoded to pixels; clips are probed and their first frame decoded so a later seek
/// never lands on an unready source. The first failure aborts the whole batch.
#[tracing::instrument(skip(sources), fields(count = sources.len()))]
pub fn preload_visuals(
    sources: Vec<VisualSource>,
    clips: ClipCacheSettings,
) -> ReelResult<Vec<VisualAsset>> {
    let mut out = Vec::with_capacity(sources.len());
    for (index, source) in sources.into_iter().enumerate() {
        let asset = preload_one(source, clips)
            .map_err(|e| ReelError::asset_load(format!("scene {index}: {e}")))?;
        let (w, h) = asset.natural_dimensions();
        tracing::debug!(index, w, h, video = asset.is_video(), "scene visual ready");
        out.push(asset);
    }
    Ok(out)
}

/// [`preload_visuals`] on the blocking pool so decoding does not stall the runtime.
pub async fn preload_visuals_async(
    sources: Vec<VisualSource>,
    clips: ClipCacheSettings,
) -> ReelResult<Vec<VisualAsset>> {
    tokio::task::spawn_blocking(move || preload_visuals(sources, clips))
        .await
        .map_err(|e| ReelError::asset_load(format!("preload task failed: {e}")))?
}

fn preload_one(source: VisualSource, clips: ClipCacheSettings) -> ReelResult<VisualAsset> {
    match source {
        VisualSource::ImagePath(path) => {
            let bytes = std::fs::read(&path).map_err(|e| {
                ReelError::asset_load(format!("failed to read '{}': {e}", path.display()))
            })?;
            Ok(VisualAsset::Image(decode_image(&bytes)?))
        }
        VisualSource::ImageBytes(bytes) => Ok(VisualAsset::Image(decode_image(&bytes)?)),
        VisualSource::VideoPath(path) => {
            let info = probe_video(&path)?;
            ready_clip(Box::new(FfmpegVideoDecoder::new(info, clips)))
        }
        VisualSource::Video(decoder) => ready_clip(decoder),
    }
}

fn ready_clip(mut decoder: Box<dyn VideoDecoder>) -> ReelResult<VisualAsset> {
    let (w, h) = decoder.dimensions();
    if w == 0 || h == 0 {
        return Err(ReelError::asset_load("video clip reports zero dimensions"));
    }
    let first = decoder.frame_at(0.0)?;
    if (first.width, first.height) != (w, h) {
        return Err(ReelError::asset_load(format!(
            "first frame is {}x{}, clip reports {w}x{h}",
            first.width, first.height
        )));
    }
    Ok(VisualAsset::VideoClip(decoder))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/preload.rs"]
mod tests;
