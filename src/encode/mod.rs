//! Recording sinks.
//!
//! Sinks consume rendered frames in increasing frame order plus one pre-mixed PCM track, and
//! finalize into the encoded bytes of one container file.

/// `ffmpeg`-based recorder.
pub mod ffmpeg;
/// Container formats and runtime capability probing.
pub mod format;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
