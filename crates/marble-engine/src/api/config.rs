use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Configuration shared by the executor and the playback scheduler.
///
/// Both sides of the message boundary must be built from the same config:
/// the scheduler paces frames by `physics.tick_duration`.
/// Every field has a default, so a partial JSON document only overrides
/// what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub physics: PhysicsConfig,
    pub preview: PreviewConfig,
    pub playback: PlaybackConfig,
}

impl EngineConfig {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Simulation tuning. Units are pixels and seconds, Y pointing down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fixed duration of one tick in seconds (default: 1/60).
    pub tick_duration: f32,
    /// Ticks advanced per update request (default: 20).
    pub batch_size: usize,
    /// Gravity vector. Positive Y is downward.
    pub gravity: Vec2,
    /// Playable area. Dynamic bodies leaving it are removed.
    pub bounds: WorldBounds,
    /// Thickness of the sensor slabs placed around `bounds`.
    pub boundary_thickness: f32,
    /// Speed added along the contact normal when a body strikes a note block.
    pub bounce_speed: f32,
    /// Linear speed below which a dynamic body counts as resting.
    pub rest_speed: f32,
    /// Angular speed (rad/s) below which a dynamic body counts as resting.
    pub rest_angular_speed: f32,
    /// Consecutive resting ticks before the world is reported quiescent.
    pub settle_ticks: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_duration: 1.0 / 60.0,
            batch_size: 20,
            gravity: Vec2::new(0.0, 980.0),
            bounds: WorldBounds::default(),
            boundary_thickness: 1000.0,
            bounce_speed: 200.0,
            rest_speed: 2.0,
            rest_angular_speed: 0.05,
            settle_ticks: 30,
        }
    }
}

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl WorldBounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min: Vec2::new(-2000.0, -4000.0),
            max: Vec2::new(4000.0, 3000.0),
        }
    }
}

/// Ghost-trail precomputation policy.
///
/// These constants were tuned by feel; treat them as adjustable policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Minimum wall-clock spacing between two preview starts.
    pub min_interval_ms: f64,
    /// Ticks simulated per pump before the executor checks for messages.
    pub chunk_ticks: u32,
    /// Sampling stride with no moving bodies.
    pub base_stride: u32,
    /// Extra stride per moving body.
    pub stride_per_body: u32,
    /// Tick budget with fewer than 4 moving bodies.
    pub budget_few: u32,
    /// Tick budget with fewer than 8 moving bodies.
    pub budget_some: u32,
    /// Tick budget otherwise.
    pub budget_many: u32,
}

impl PreviewConfig {
    /// Ticks between two samples for `moving` dynamic bodies.
    pub fn stride(&self, moving: usize) -> u32 {
        (self.base_stride + self.stride_per_body * moving as u32).max(1)
    }

    /// Total ticks a preview may simulate for `moving` dynamic bodies.
    pub fn tick_budget(&self, moving: usize) -> u32 {
        match moving {
            0..=3 => self.budget_few,
            4..=7 => self.budget_some,
            _ => self.budget_many,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 100.0,
            chunk_ticks: 2_000,
            base_stride: 6,
            stride_per_body: 4,
            budget_few: 100_000,
            budget_some: 90_000,
            budget_many: 75_000,
        }
    }
}

/// Render-side pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Request another batch when fewer frames than this are buffered.
    pub low_water_mark: usize,
    /// Camera follow smoothing (0.0 = snap, 0.99 = very slow).
    pub camera_smoothing: f32,
    /// Visible area of the render surface in world units.
    pub viewport: Vec2,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            low_water_mark: 20,
            camera_smoothing: 0.0,
            viewport: Vec2::new(800.0, 600.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "physics": { "batch_size": 5 }, "preview": { "min_interval_ms": 0 } }"#,
        )
        .unwrap();
        assert_eq!(config.physics.batch_size, 5);
        assert!((config.physics.tick_duration - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(config.preview.min_interval_ms, 0.0);
        assert_eq!(config.preview.chunk_ticks, 2_000);
        assert_eq!(config.playback.low_water_mark, 20);
    }

    #[test]
    fn empty_json_is_default() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config.physics.gravity, Vec2::new(0.0, 980.0));
    }

    #[test]
    fn stride_grows_with_body_count() {
        let preview = PreviewConfig::default();
        assert_eq!(preview.stride(0), 6);
        assert_eq!(preview.stride(1), 10);
        assert_eq!(preview.stride(5), 26);
    }

    #[test]
    fn budget_shrinks_with_body_count() {
        let preview = PreviewConfig::default();
        assert_eq!(preview.tick_budget(1), 100_000);
        assert_eq!(preview.tick_budget(4), 90_000);
        assert_eq!(preview.tick_budget(12), 75_000);
    }

    #[test]
    fn bounds_contain_their_center() {
        let bounds = WorldBounds::new(Vec2::ZERO, Vec2::new(100.0, 50.0));
        assert!(bounds.contains(bounds.center()));
        assert!(!bounds.contains(Vec2::new(-1.0, 10.0)));
        assert_eq!(bounds.size(), Vec2::new(100.0, 50.0));
    }
}
