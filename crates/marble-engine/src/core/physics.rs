use glam::Vec2;
use rapier2d::prelude::*;
use std::sync::{Mutex, PoisonError};

// ---------------------------------------------------------------------------
// Conversion helpers (private): glam ↔ rapier math
// ---------------------------------------------------------------------------

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn from_vector(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// The kind of rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Dynamic,
    Fixed,
}

impl BodyType {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyType::Dynamic => RigidBodyType::Dynamic,
            BodyType::Fixed => RigidBodyType::Fixed,
        }
    }
}

/// Shape description for a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
}

impl ColliderDesc {
    fn build_collider(&self) -> ColliderBuilder {
        match *self {
            ColliderDesc::Ball { radius } => ColliderBuilder::ball(radius),
            ColliderDesc::Cuboid { half_width, half_height } => {
                ColliderBuilder::cuboid(half_width, half_height)
            }
        }
    }
}

/// Physical material properties for a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl ColliderMaterial {
    pub const MARBLE: Self = Self { restitution: 0.4, friction: 0.01, density: 1.0 };
    pub const TRACK: Self = Self { restitution: 0.001, friction: 0.1, density: 1.0 };
    pub const NOTE: Self = Self { restitution: 1.0, friction: 0.01, density: 1.0 };
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self::TRACK
    }
}

/// Builder for describing a rigid body before creation.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub body_type: BodyType,
    pub position: Vec2,
    pub rotation: f32,
    pub ccd: bool,
    pub sensor: bool,
    pub collider: ColliderDesc,
    pub linear_damping: f32,
}

impl BodyDesc {
    /// Create a dynamic body description with the given collider shape.
    pub fn dynamic(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            rotation: 0.0,
            ccd: false,
            sensor: false,
            collider,
            linear_damping: 0.0,
        }
    }

    /// Create a fixed (static) body description with the given collider shape.
    pub fn fixed(collider: ColliderDesc) -> Self {
        Self {
            body_type: BodyType::Fixed,
            ..Self::dynamic(collider)
        }
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.position = pos;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    /// Sensors report contacts but exert no contact forces.
    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }
}

/// Handle pair referencing Rapier internals. Never leaves the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// A contact between two colliders, as reported by the narrow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub collider_a: ColliderHandle,
    pub collider_b: ColliderHandle,
    /// `true` when the contact just started, `false` when it ended.
    pub started: bool,
}

impl ContactEvent {
    /// The other collider of the pair, if `handle` is one of them.
    #[cfg(test)]
    pub fn other(&self, handle: ColliderHandle) -> Option<ColliderHandle> {
        if self.collider_a == handle {
            Some(self.collider_b)
        } else if self.collider_b == handle {
            Some(self.collider_a)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// WASM-safe event collector (no crossbeam)
// ---------------------------------------------------------------------------

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        let mut guard = self.collisions.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Wraps all Rapier2D boilerplate into a single struct.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
}

impl PhysicsWorld {
    /// Create a new physics world with the given gravity vector.
    /// The world is Y-down: positive Y gravity pulls toward the bottom of the screen.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity: to_vector(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
        }
    }

    /// Set the integration timestep.
    pub fn set_dt(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Create a rigid body + collider and return handles.
    pub fn create_body(&mut self, desc: &BodyDesc, material: ColliderMaterial) -> PhysicsBody {
        let rb = RigidBodyBuilder::new(desc.body_type.to_rapier())
            .translation(to_vector(desc.position))
            .rotation(desc.rotation)
            .ccd_enabled(desc.ccd)
            .linear_damping(desc.linear_damping)
            .build();

        let body_handle = self.bodies.insert(rb);

        let collider = desc
            .collider
            .build_collider()
            .restitution(material.restitution)
            .friction(material.friction)
            .density(material.density)
            .sensor(desc.sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Remove a body and its collider from the simulation.
    pub fn remove_body(&mut self, body: &PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Step the simulation once and collect contact events into the provided Vec.
    pub fn step_into(&mut self, events: &mut Vec<ContactEvent>) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        events.extend(self.event_collector.drain_collisions().into_iter().map(|event| {
            match event {
                CollisionEvent::Started(a, b, _) => ContactEvent {
                    collider_a: a,
                    collider_b: b,
                    started: true,
                },
                CollisionEvent::Stopped(a, b, _) => ContactEvent {
                    collider_a: a,
                    collider_b: b,
                    started: false,
                },
            }
        }));
    }

    /// Set the linear velocity of a body directly.
    pub fn set_velocity(&mut self, body: &PhysicsBody, vel: Vec2) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(to_vector(vel), true);
        }
    }

    /// Get the current linear velocity of a body.
    pub fn velocity(&self, body: &PhysicsBody) -> Vec2 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| from_vector(rb.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    /// Whether a body is asleep or moving slower than the given thresholds.
    /// Missing bodies count as resting.
    pub fn is_resting(&self, body: &PhysicsBody, max_speed: f32, max_angular_speed: f32) -> bool {
        self.bodies.get(body.body_handle).map_or(true, |rb| {
            rb.is_sleeping()
                || (rb.linvel().norm() <= max_speed && rb.angvel().abs() <= max_angular_speed)
        })
    }

    /// Get the current position and rotation of a body.
    pub fn body_position(&self, body: &PhysicsBody) -> (Vec2, f32) {
        self.bodies
            .get(body.body_handle)
            .map(|rb| (from_vector(rb.translation()), rb.rotation().angle()))
            .unwrap_or((Vec2::ZERO, 0.0))
    }

    /// Number of rigid bodies in the simulation.
    #[cfg(test)]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(radius: f32) -> BodyDesc {
        BodyDesc::dynamic(ColliderDesc::Ball { radius })
    }

    #[test]
    fn create_and_remove_body() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let body = world.create_body(&ball(10.0), ColliderMaterial::MARBLE);
        assert_eq!(world.body_count(), 1);
        world.remove_body(&body);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn gravity_pulls_downward() {
        let mut world = PhysicsWorld::new(Vec2::new(0.0, 100.0));
        world.set_dt(1.0 / 60.0);
        let body = world.create_body(&ball(5.0), ColliderMaterial::MARBLE);

        let (initial_pos, _) = world.body_position(&body);
        let mut events = Vec::new();
        for _ in 0..10 {
            world.step_into(&mut events);
        }
        let (new_pos, _) = world.body_position(&body);

        assert!(
            new_pos.y > initial_pos.y,
            "Body should fall: start={}, end={}",
            initial_pos.y,
            new_pos.y
        );
    }

    #[test]
    fn set_velocity_directly() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        let body = world.create_body(&ball(5.0), ColliderMaterial::MARBLE);

        world.set_velocity(&body, Vec2::new(50.0, -30.0));
        let vel = world.velocity(&body);
        assert!((vel.x - 50.0).abs() < 0.001);
        assert!((vel.y - (-30.0)).abs() < 0.001);
    }

    #[test]
    fn fixed_body_does_not_move() {
        let mut world = PhysicsWorld::new(Vec2::new(0.0, 100.0));
        world.set_dt(1.0 / 60.0);

        let body = world.create_body(
            &BodyDesc::fixed(ColliderDesc::Cuboid {
                half_width: 100.0,
                half_height: 10.0,
            })
            .with_position(Vec2::new(0.0, 500.0))
            .with_rotation(0.3),
            ColliderMaterial::TRACK,
        );

        let mut events = Vec::new();
        for _ in 0..10 {
            world.step_into(&mut events);
        }

        let (pos, rot) = world.body_position(&body);
        assert!((pos.y - 500.0).abs() < 0.001, "Fixed body should not move: y={}", pos.y);
        assert!((rot - 0.3).abs() < 1e-5);
        assert!(world.is_resting(&body, 0.0, 0.0));
    }

    #[test]
    fn contact_events_between_converging_bodies() {
        let mut world = PhysicsWorld::new(Vec2::ZERO);
        world.set_dt(1.0 / 60.0);

        let a = world.create_body(&ball(10.0), ColliderMaterial::MARBLE);
        let b = world.create_body(
            &ball(10.0).with_position(Vec2::new(30.0, 0.0)),
            ColliderMaterial::MARBLE,
        );
        world.set_velocity(&a, Vec2::new(200.0, 0.0));
        world.set_velocity(&b, Vec2::new(-200.0, 0.0));

        let mut events = Vec::new();
        for _ in 0..60 {
            world.step_into(&mut events);
        }

        let first = events
            .iter()
            .find(|e| e.started)
            .expect("Should have at least one contact start event");
        assert_eq!(first.other(a.collider_handle), Some(b.collider_handle));
    }

    #[test]
    fn sensor_reports_contact_without_blocking() {
        let mut world = PhysicsWorld::new(Vec2::new(0.0, 500.0));
        world.set_dt(1.0 / 60.0);

        let marble = world.create_body(&ball(5.0).with_ccd(true), ColliderMaterial::MARBLE);
        let slab = world.create_body(
            &BodyDesc::fixed(ColliderDesc::Cuboid { half_width: 100.0, half_height: 5.0 })
                .with_position(Vec2::new(0.0, 50.0))
                .with_sensor(true),
            ColliderMaterial::TRACK,
        );

        let mut events = Vec::new();
        for _ in 0..60 {
            world.step_into(&mut events);
        }

        assert!(events
            .iter()
            .any(|e| e.started && e.other(slab.collider_handle) == Some(marble.collider_handle)));
        let (pos, _) = world.body_position(&marble);
        assert!(pos.y > 60.0, "marble should pass through the sensor: y={}", pos.y);
    }

    #[test]
    fn builder_pattern() {
        let desc = ball(5.0)
            .with_position(Vec2::new(10.0, 20.0))
            .with_linear_damping(0.01)
            .with_ccd(true);

        assert_eq!(desc.body_type, BodyType::Dynamic);
        assert_eq!(desc.position, Vec2::new(10.0, 20.0));
        assert!((desc.linear_damping - 0.01).abs() < 1e-6);
        assert!(desc.ccd);
        assert!(!desc.sensor);
    }
}
