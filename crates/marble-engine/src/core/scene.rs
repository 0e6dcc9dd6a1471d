use std::collections::HashMap;

use glam::Vec2;
use rapier2d::prelude::ColliderHandle;

use crate::api::types::{BodyId, Pose};
use crate::components::body::BodyKind;
use crate::core::physics::PhysicsBody;

/// A body living in the simulation world, keyed by its public id.
#[derive(Debug, Clone, Copy)]
pub struct SimBody {
    pub id: BodyId,
    pub kind: BodyKind,
    pub is_static: bool,
    pub handles: PhysicsBody,
    /// Half extents for rectangles, `None` for marbles.
    pub half_extents: Option<Vec2>,
    /// Last synced pose, with rotation unwrapped across ticks.
    pub pose: Pose,
}

impl SimBody {
    pub fn is_dynamic(&self) -> bool {
        !self.is_static
    }
}

/// Flat storage of simulation bodies plus the reverse collider lookup.
/// Designed for small body counts (tens, not thousands).
pub struct BodyRegistry {
    bodies: Vec<SimBody>,
    by_collider: HashMap<ColliderHandle, BodyId>,
}

impl BodyRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(capacity),
            by_collider: HashMap::with_capacity(capacity),
        }
    }

    /// Add a body. Insertion order is the order frames report bodies in.
    pub fn spawn(&mut self, body: SimBody) {
        self.by_collider.insert(body.handles.collider_handle, body.id);
        self.bodies.push(body);
    }

    /// Remove a body by id, clearing both lookup directions.
    pub fn despawn(&mut self, id: BodyId) -> Option<SimBody> {
        let idx = self.bodies.iter().position(|b| b.id == id)?;
        let body = self.bodies.remove(idx);
        self.by_collider.remove(&body.handles.collider_handle);
        Some(body)
    }

    pub fn get(&self, id: BodyId) -> Option<&SimBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    /// Resolve a collider handle back to the owning body.
    pub fn resolve(&self, collider: ColliderHandle) -> Option<&SimBody> {
        let id = *self.by_collider.get(&collider)?;
        self.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimBody> {
        self.bodies.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SimBody> {
        self.bodies.iter_mut()
    }

    pub fn dynamic_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_dynamic()).count()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
