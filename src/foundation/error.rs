/// Result alias used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Errors raised by the composition, playback and export engine.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// A visual or audio asset could not be fetched or decoded.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// Starting or stopping an audio source failed.
    #[error("mix graph error: {0}")]
    MixGraph(String),

    /// Surface, stream or recorder setup failed.
    #[error("capture error: {0}")]
    Capture(String),

    /// The requested container/codec is not supported by the runtime.
    #[error("export format unavailable: {0}")]
    ExportFormatUnavailable(String),

    /// Live playback could not be started.
    #[error("playback error: {0}")]
    Playback(String),

    /// The export job was cancelled between frames.
    #[error("export cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    pub fn mix_graph(msg: impl Into<String>) -> Self {
        Self::MixGraph(msg.into())
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    pub fn format_unavailable(msg: impl Into<String>) -> Self {
        Self::ExportFormatUnavailable(msg.into())
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Message shown to the user when an export job fails.
    ///
    /// Every failure collapses to one generic sentence; the detailed error goes to the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Cancelled => "Export cancelled.",
            _ => "Video export failed. Please try again.",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
