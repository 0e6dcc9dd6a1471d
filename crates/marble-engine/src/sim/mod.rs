pub mod executor;
pub mod preview;
pub mod world;

#[cfg(not(target_arch = "wasm32"))]
pub mod runtime;
