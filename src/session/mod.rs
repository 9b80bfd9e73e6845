//! Sessions: one export job ([`capture`]), live preview ([`playback`]) and the [`studio`]
//! facade that keeps them mutually exclusive.

pub mod capture;
pub mod lock;
pub mod playback;
pub mod presenter;
pub mod studio;
