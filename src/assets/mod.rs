pub mod decode;
pub mod media;
pub mod preload;
pub mod visual;
