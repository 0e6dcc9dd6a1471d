use std::collections::HashSet;

use glam::Vec2;
use log::debug;
use rapier2d::prelude::ColliderHandle;

use crate::api::config::PhysicsConfig;
use crate::api::types::{BodyId, Pose};
use crate::bridge::protocol::FrameBody;
use crate::components::body::{Body, BodyKind, BodyShape};
use crate::core::geometry::{rect_contact_normal, unwrap_angle};
use crate::core::physics::{BodyDesc, ColliderDesc, ColliderMaterial, ContactEvent, PhysicsWorld};
use crate::core::scene::{BodyRegistry, SimBody};

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Note bodies struck for the first time in their contact episode.
    pub notes: Vec<BodyId>,
    /// Dynamic bodies that left the world bounds and were removed.
    pub removed: Vec<BodyId>,
    /// The world has settled.
    pub quiescent: bool,
}

/// One authoritative rigid-body world built from a track.
///
/// The world is rebuilt wholesale from definitions; there is no incremental
/// editing. Rapier handles stay inside this type.
pub struct Simulation {
    config: PhysicsConfig,
    physics: PhysicsWorld,
    registry: BodyRegistry,
    boundary: HashSet<ColliderHandle>,
    /// Open (striker, note) contact episodes.
    episodes: HashSet<(BodyId, BodyId)>,
    resting_ticks: u32,
    events: Vec<ContactEvent>,
}

impl Simulation {
    /// Build a world from validated bodies.
    pub fn build(config: &PhysicsConfig, bodies: &[Body]) -> Self {
        let mut physics = PhysicsWorld::new(config.gravity);
        physics.set_dt(config.tick_duration);

        let mut registry = BodyRegistry::with_capacity(bodies.len());
        for body in bodies {
            let handles = physics.create_body(&body_desc(body), material(body.kind()));
            registry.spawn(SimBody {
                id: body.id,
                kind: body.kind(),
                is_static: body.is_static,
                handles,
                half_extents: body.shape.half_extents(),
                pose: Pose::new(body.center.x, body.center.y, body.rotation),
            });
        }

        let boundary = boundary_slabs(config)
            .into_iter()
            .map(|desc| physics.create_body(&desc, ColliderMaterial::TRACK).collider_handle)
            .collect();

        Self {
            config: config.clone(),
            physics,
            registry,
            boundary,
            episodes: HashSet::new(),
            resting_ticks: 0,
            events: Vec::new(),
        }
    }

    /// Advance one tick.
    pub fn step(&mut self) -> StepReport {
        let mut report = StepReport::default();
        let mut events = std::mem::take(&mut self.events);
        events.clear();
        self.physics.step_into(&mut events);

        for event in &events {
            if let Some(id) = self.escaped_body(event) {
                if !report.removed.contains(&id) {
                    report.removed.push(id);
                }
                continue;
            }
            let Some((striker, note)) = self.note_contact(event) else {
                continue;
            };
            if !event.started {
                self.episodes.remove(&(striker.id, note.id));
            } else if self.episodes.insert((striker.id, note.id)) {
                if !report.notes.contains(&note.id) {
                    report.notes.push(note.id);
                }
                self.bounce(&striker, &note);
            }
        }
        self.events = events;

        for &id in &report.removed {
            debug!("body {id} left the world bounds");
            self.remove(id);
        }

        self.sync_poses();
        report.quiescent = self.settle();
        report
    }

    /// Remove a body. Returns `false` if it was already gone.
    pub fn remove(&mut self, id: BodyId) -> bool {
        let Some(body) = self.registry.despawn(id) else {
            return false;
        };
        self.physics.remove_body(&body.handles);
        self.episodes.retain(|&(striker, note)| striker != id && note != id);
        true
    }

    /// Poses of every body, in build order.
    pub fn snapshot(&self) -> Vec<FrameBody> {
        self.registry
            .iter()
            .map(|b| FrameBody::new(b.id, b.pose))
            .collect()
    }

    /// Poses of the bodies that move.
    pub fn snapshot_dynamic(&self) -> Vec<FrameBody> {
        self.registry
            .iter()
            .filter(|b| b.is_dynamic())
            .map(|b| FrameBody::new(b.id, b.pose))
            .collect()
    }

    pub fn pose(&self, id: BodyId) -> Option<Pose> {
        self.registry.get(id).map(|b| b.pose)
    }

    pub fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.registry.get(id).map(|b| self.physics.velocity(&b.handles))
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.registry.get(id).is_some()
    }

    pub fn dynamic_count(&self) -> usize {
        self.registry.dynamic_count()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    // -- private helpers --

    /// A dynamic body touching a boundary slab.
    fn escaped_body(&self, event: &ContactEvent) -> Option<BodyId> {
        if !event.started {
            return None;
        }
        let other = if self.boundary.contains(&event.collider_a) {
            event.collider_b
        } else if self.boundary.contains(&event.collider_b) {
            event.collider_a
        } else {
            return None;
        };
        self.registry
            .resolve(other)
            .filter(|b| b.is_dynamic())
            .map(|b| b.id)
    }

    /// A dynamic body against a note block, as (striker, note).
    fn note_contact(&self, event: &ContactEvent) -> Option<(SimBody, SimBody)> {
        let a = *self.registry.resolve(event.collider_a)?;
        let b = *self.registry.resolve(event.collider_b)?;
        if b.kind == BodyKind::NoteBlock && a.is_dynamic() {
            Some((a, b))
        } else if a.kind == BodyKind::NoteBlock && b.is_dynamic() {
            Some((b, a))
        } else {
            None
        }
    }

    fn bounce(&mut self, striker: &SimBody, note: &SimBody) {
        let (note_center, note_rotation) = self.physics.body_position(&note.handles);
        let (striker_center, _) = self.physics.body_position(&striker.handles);
        let half_extents = note.half_extents.unwrap_or(Vec2::ZERO);
        let normal = rect_contact_normal(note_center, half_extents, note_rotation, striker_center);
        let velocity = self.physics.velocity(&striker.handles);
        self.physics
            .set_velocity(&striker.handles, velocity + normal * self.config.bounce_speed);
    }

    fn sync_poses(&mut self) {
        let physics = &self.physics;
        for body in self.registry.iter_mut().filter(|b| b.is_dynamic()) {
            let (position, raw) = physics.body_position(&body.handles);
            body.pose = Pose::new(position.x, position.y, unwrap_angle(body.pose.rotation, raw));
        }
    }

    fn settle(&mut self) -> bool {
        let mut dynamic = self.registry.iter().filter(|b| b.is_dynamic()).peekable();
        if dynamic.peek().is_none() {
            return true;
        }
        let resting = dynamic.all(|b| {
            self.physics.is_resting(
                &b.handles,
                self.config.rest_speed,
                self.config.rest_angular_speed,
            )
        });
        self.resting_ticks = if resting { self.resting_ticks + 1 } else { 0 };
        self.resting_ticks >= self.config.settle_ticks
    }
}

fn body_desc(body: &Body) -> BodyDesc {
    let collider = match body.shape {
        BodyShape::Marble { radius } => ColliderDesc::Ball { radius },
        BodyShape::TrackBlock { half_extents } | BodyShape::NoteBlock { half_extents } => {
            ColliderDesc::Cuboid {
                half_width: half_extents.x,
                half_height: half_extents.y,
            }
        }
    };
    let desc = if body.is_static {
        BodyDesc::fixed(collider)
    } else {
        BodyDesc::dynamic(collider).with_ccd(true)
    };
    let desc = desc.with_position(body.center).with_rotation(body.rotation);
    match body.kind() {
        BodyKind::Marble => desc.with_linear_damping(0.01),
        BodyKind::TrackBlock | BodyKind::NoteBlock => desc,
    }
}

fn material(kind: BodyKind) -> ColliderMaterial {
    match kind {
        BodyKind::Marble => ColliderMaterial::MARBLE,
        BodyKind::TrackBlock => ColliderMaterial::TRACK,
        BodyKind::NoteBlock => ColliderMaterial::NOTE,
    }
}

/// Four sensor slabs framing the world bounds.
fn boundary_slabs(config: &PhysicsConfig) -> [BodyDesc; 4] {
    let bounds = &config.bounds;
    let t = config.boundary_thickness;
    let center = bounds.center();
    let half = bounds.size() * 0.5;

    let slab = |position: Vec2, half_width: f32, half_height: f32| {
        BodyDesc::fixed(ColliderDesc::Cuboid { half_width, half_height })
            .with_position(position)
            .with_sensor(true)
    };

    [
        slab(Vec2::new(center.x, bounds.min.y - t * 0.5), half.x + t, t * 0.5),
        slab(Vec2::new(center.x, bounds.max.y + t * 0.5), half.x + t, t * 0.5),
        slab(Vec2::new(bounds.min.x - t * 0.5, center.y), t * 0.5, half.y + t),
        slab(Vec2::new(bounds.max.x + t * 0.5, center.y), t * 0.5, half.y + t),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::WorldBounds;
    use crate::components::body::BodyDef;

    fn build(defs: &[BodyDef], config: &PhysicsConfig) -> Simulation {
        Simulation::build(config, &Body::from_defs(defs).unwrap())
    }

    #[test]
    fn empty_world_is_quiescent_immediately() {
        let mut sim = build(&[], &PhysicsConfig::default());
        let report = sim.step();
        assert!(report.quiescent);
        assert!(report.notes.is_empty());
        assert!(sim.is_empty());
    }

    #[test]
    fn static_only_world_is_quiescent() {
        let defs = [BodyDef::track_block(BodyId(1), 0.0, 0.0, 100.0, 10.0)];
        let mut sim = build(&defs, &PhysicsConfig::default());
        assert!(sim.step().quiescent);
        assert_eq!(sim.snapshot().len(), 1);
        assert!(sim.snapshot_dynamic().is_empty());
    }

    #[test]
    fn body_leaving_bounds_is_removed() {
        let config = PhysicsConfig {
            bounds: WorldBounds::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)),
            ..PhysicsConfig::default()
        };
        let defs = [BodyDef::marble(BodyId(1), 0.0, 0.0, 5.0)];
        let mut sim = build(&defs, &config);

        let mut removed = Vec::new();
        for _ in 0..120 {
            removed.extend(sim.step().removed);
        }
        assert_eq!(removed, vec![BodyId(1)]);
        assert!(!sim.contains(BodyId(1)));
        assert!(sim.snapshot().iter().all(|b| b.id != BodyId(1)));
        assert!(!sim.remove(BodyId(1)));
        assert_eq!(sim.pose(BodyId(1)), None);
        assert!(sim.step().quiescent);
    }

    #[test]
    fn marble_resting_on_track_settles() {
        let config = PhysicsConfig::default();
        let defs = [
            BodyDef::marble(BodyId(1), 0.0, -10.0, 10.0),
            BodyDef::track_block(BodyId(2), -200.0, 0.0, 400.0, 20.0),
        ];
        let mut sim = build(&defs, &config);

        let settled_at = (0..2000).position(|_| sim.step().quiescent);
        assert!(settled_at.is_some(), "marble never settled");
        let pose = sim.pose(BodyId(1)).unwrap();
        assert!(pose.y < 0.0, "marble fell through the track: y={}", pose.y);
    }

    #[test]
    fn rotation_is_unwrapped_for_rolling_marble() {
        let config = PhysicsConfig::default();
        let defs = [
            BodyDef::marble(BodyId(1), 0.0, -20.0, 10.0),
            BodyDef::track_block(BodyId(2), -1500.0, 0.0, 3000.0, 20.0).with_rotation(0.3),
        ];
        let mut sim = build(&defs, &config);

        let mut previous = sim.pose(BodyId(1)).unwrap().rotation;
        for _ in 0..300 {
            sim.step();
            let Some(pose) = sim.pose(BodyId(1)) else { break };
            assert!(
                (pose.rotation - previous).abs() < std::f32::consts::PI,
                "rotation jumped from {previous} to {}",
                pose.rotation
            );
            previous = pose.rotation;
        }
    }
}
