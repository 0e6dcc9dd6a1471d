pub mod geometry;
pub mod time;

#[cfg(feature = "physics")]
pub(crate) mod physics;
#[cfg(feature = "physics")]
pub(crate) mod scene;
