pub mod interpolate;
pub mod scheduler;
