pub mod scene;
pub mod sync;
