use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable identity of a body.
///
/// This is the only value shared between the render surface and the
/// executor. It is assigned by the render side and stays unique for the
/// body's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// World rebuild counter. Every response derived from world state carries
/// the epoch it was produced in, so replies that predate a rebuild can be
/// recognized and dropped.
pub type Epoch = u64;

/// Position (center origin) and rotation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, rotation: f32) -> Self {
        Self { x, y, rotation }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}
