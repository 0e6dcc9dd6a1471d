use bytemuck::{Pod, Zeroable};

use crate::api::types::{BodyId, Pose};

/// Per-body pose read by the render surface straight out of WASM memory.
/// Must match the TypeScript reader: 4 × 4 bytes = 16 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PoseInstance {
    /// Body id.
    pub id: u32,
    /// X of the body center in world space.
    pub x: f32,
    /// Y of the body center in world space.
    pub y: f32,
    /// Rotation in radians.
    pub rotation: f32,
}

impl PoseInstance {
    pub const WORDS: usize = 4;
    pub const STRIDE_BYTES: usize = Self::WORDS * 4;

    pub fn new(id: BodyId, pose: Pose) -> Self {
        Self {
            id: id.0,
            x: pose.x,
            y: pose.y,
            rotation: pose.rotation,
        }
    }

    pub fn body(&self) -> BodyId {
        BodyId(self.id)
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.rotation)
    }
}

/// Interpolated poses of every rendered body.
///
/// `version` increments only when the contents change, so the render
/// surface can skip redraws.
#[derive(Debug, Default)]
pub struct PoseBuffer {
    instances: Vec<PoseInstance>,
    version: u64,
}

impl PoseBuffer {
    pub fn new() -> Self {
        Self {
            instances: Vec::with_capacity(64),
            version: 0,
        }
    }

    /// Replace the contents. Returns `true` if anything changed.
    pub fn publish(&mut self, poses: impl IntoIterator<Item = PoseInstance>) -> bool {
        let next: Vec<PoseInstance> = poses.into_iter().collect();
        if next == self.instances {
            return false;
        }
        self.instances = next;
        self.version += 1;
        true
    }

    pub fn clear(&mut self) {
        if !self.instances.is_empty() {
            self.instances.clear();
            self.version += 1;
        }
    }

    pub fn get(&self, id: BodyId) -> Option<Pose> {
        self.instances
            .iter()
            .find(|p| p.id == id.0)
            .map(PoseInstance::pose)
    }

    pub fn instances(&self) -> &[PoseInstance] {
        &self.instances
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Raw pointer to instance data for reads from JS.
    pub fn as_ptr(&self) -> *const u8 {
        self.instances.as_ptr() as *const u8
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
