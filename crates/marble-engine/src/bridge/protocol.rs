/// JSON message protocol between the playback scheduler and the executor.
/// Must stay in sync with TypeScript `protocol.ts`.
///
/// Every message is an object tagged by `action` (kebab-case):
/// ```text
/// request:  { action, bodies? }
/// response: { action, epoch, bodies? | frames? | message? }
/// ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::types::{BodyId, Epoch, Pose};
use crate::components::body::BodyDef;

/// Scheduler → executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Request {
    /// Rebuild the world and schedule a preview if previews are enabled.
    Initialize { bodies: Vec<BodyDef> },
    /// Rebuild the world and suppress previews until re-enabled.
    DisablePreview { bodies: Vec<BodyDef> },
    /// Rebuild the world and allow previews again.
    EnablePreview { bodies: Vec<BodyDef> },
    /// Recompute the preview of the current definitions without a rebuild.
    RequestPreviewRefresh,
    /// Advance the world by one batch of ticks.
    Update,
    /// Any action this build does not know. Ignored.
    #[serde(other)]
    Unknown,
}

impl Request {
    /// Whether handling this request rebuilds the world (and bumps the epoch).
    pub fn rebuilds(&self) -> bool {
        matches!(
            self,
            Request::Initialize { .. } | Request::DisablePreview { .. } | Request::EnablePreview { .. }
        )
    }
}

/// Executor → scheduler. Each variant carries the world epoch it was produced in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Response {
    /// Canonical center-origin definitions after a rebuild.
    Initialize { epoch: Epoch, bodies: Vec<BodyDef> },
    /// A completed preview horizon.
    Preview { epoch: Epoch, frames: Vec<Frame> },
    /// A preview computation started; drop the displayed horizon.
    ClearPreview { epoch: Epoch },
    /// One batch of live frames.
    Update { epoch: Epoch, frames: Vec<Frame> },
    /// A rebuild was rejected; the previous world is untouched.
    Error { epoch: Epoch, message: String },
}

impl Response {
    pub fn epoch(&self) -> Epoch {
        match self {
            Response::Initialize { epoch, .. }
            | Response::Preview { epoch, .. }
            | Response::ClearPreview { epoch }
            | Response::Update { epoch, .. }
            | Response::Error { epoch, .. } => *epoch,
        }
    }
}

/// Pose of one body inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameBody {
    pub id: BodyId,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

impl FrameBody {
    pub fn new(id: BodyId, pose: Pose) -> Self {
        Self {
            id,
            x: pose.x,
            y: pose.y,
            rotation: pose.rotation,
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.rotation)
    }
}

/// Snapshot of body poses at one tick boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Strictly increasing within one epoch.
    pub id: u64,
    pub bodies: Vec<FrameBody>,
    /// The world settled at this frame; nothing follows it.
    #[serde(default)]
    pub terminal: bool,
    /// Note bodies struck during this tick.
    #[serde(default)]
    pub notes: Vec<BodyId>,
    #[serde(default)]
    pub note_triggered: bool,
    #[serde(default)]
    pub note_consumed: bool,
}

impl Frame {
    pub fn pose(&self, id: BodyId) -> Option<Pose> {
        self.bodies.iter().find(|b| b.id == id).map(FrameBody::pose)
    }

    pub fn has_unconsumed_note(&self) -> bool {
        self.note_triggered && !self.note_consumed
    }
}

/// A finished ghost trajectory, tagged with the world epoch it was computed against.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PreviewHorizon {
    pub epoch: Epoch,
    pub frames: Vec<Frame>,
}

/// Malformed traffic at a JSON boundary.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode_request(json: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(json)?)
}

/// Whether a raw request names a rebuild action, even if the rest of it
/// does not decode. The executor still counts such a request as a rebuild.
pub fn names_rebuild(json: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(json)
        .ok()
        .and_then(|value| {
            value
                .get("action")?
                .as_str()
                .map(|action| matches!(action, "initialize" | "disable-preview" | "enable-preview"))
        })
        .unwrap_or(false)
}

pub fn decode_response(json: &str) -> Result<Response, ProtocolError> {
    Ok(serde_json::from_str(json)?)
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}
