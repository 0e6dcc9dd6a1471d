pub mod api;
pub mod audio;
pub mod bridge;
pub mod components;
pub mod core;
pub mod playback;
pub mod renderer;
#[cfg(feature = "physics")]
pub mod sim;

// Re-export key types at crate root for convenience
pub use api::config::{EngineConfig, PhysicsConfig, PlaybackConfig, PreviewConfig, WorldBounds};
pub use api::types::{BodyId, Epoch, Pose};
pub use audio::notes::{NoteBridge, NoteSettings, NoteSink, NoteTrigger, Silent};
pub use bridge::port::{ExecutorPort, QueuePort};
pub use bridge::protocol::{Frame, FrameBody, PreviewHorizon, ProtocolError, Request, Response};
pub use components::body::{Body, BodyDef, BodyKind, BodyShape, BuildError};
pub use components::note::{NoteName, Setting};
pub use crate::core::time::FramePacer;
pub use playback::scheduler::{PlaybackEvent, PlaybackState, Scheduler, StopReason};
pub use renderer::camera::Camera2D;
pub use renderer::instance::{PoseBuffer, PoseInstance};

#[cfg(feature = "physics")]
pub use bridge::port::LoopbackPort;
#[cfg(feature = "physics")]
pub use sim::executor::Executor;
#[cfg(feature = "physics")]
pub use sim::world::{Simulation, StepReport};

#[cfg(all(feature = "physics", not(target_arch = "wasm32")))]
pub use sim::runtime::ExecutorThread;
