//! Audio: decoded PCM buffers, the two-bus mix graph and its destinations.

pub mod background;
pub mod buffer;
pub mod capture;
pub mod graph;
pub mod mix;
pub mod silent;
/// Default output device through `rodio`.
#[cfg(feature = "speaker")]
pub mod speaker;
