pub mod surface;
pub mod transition;
