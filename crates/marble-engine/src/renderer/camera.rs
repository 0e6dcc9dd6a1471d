use glam::Vec2;

use crate::api::config::WorldBounds;

/// Viewport over the track, in world units.
/// Follows the camera-tracked body during playback.
#[derive(Debug, Clone)]
pub struct Camera2D {
    /// Visible size in world units.
    pub viewport: Vec2,
    /// Camera center position in world space.
    pub center: Vec2,
    /// Optional bounds for camera clamping.
    pub bounds: Option<WorldBounds>,
    /// Smoothing factor for camera follow (0.0 = instant, 1.0 = never moves).
    pub smoothing: f32,
}

impl Camera2D {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            viewport,
            center: viewport * 0.5,
            bounds: None,
            smoothing: 0.0,
        }
    }

    /// Set world bounds for camera clamping.
    pub fn set_bounds(&mut self, bounds: WorldBounds) {
        self.bounds = Some(bounds);
    }

    /// 0.0 = instant snap, 0.9 = very smooth/slow.
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.smoothing = smoothing.clamp(0.0, 0.99);
    }

    /// Move camera center to target position, applying bounds.
    pub fn look_at(&mut self, target: Vec2) {
        self.center = target;
        self.clamp_to_bounds();
    }

    /// Move toward the target. Call each render tick with the target's
    /// interpolated position.
    pub fn follow(&mut self, target: Vec2, dt: f32) {
        if self.smoothing <= 0.0 {
            self.look_at(target);
        } else {
            let lerp_factor = 1.0 - self.smoothing.powf(dt * 60.0);
            self.center += (target - self.center) * lerp_factor;
            self.clamp_to_bounds();
        }
    }

    /// World position of the viewport's top-left corner (the canvas offset).
    pub fn top_left(&self) -> Vec2 {
        self.center - self.viewport * 0.5
    }

    fn clamp_to_bounds(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let half = self.viewport * 0.5;
        let size = bounds.size();

        // Center on an axis the viewport cannot fit inside.
        self.center.x = if self.viewport.x >= size.x {
            bounds.center().x
        } else {
            self.center.x.clamp(bounds.min.x + half.x, bounds.max.x - half.x)
        };
        self.center.y = if self.viewport.y >= size.y {
            bounds.center().y
        } else {
            self.center.y.clamp(bounds.min.y + half.y, bounds.max.y - half.y)
        };
    }
}
