use crate::api::types::Pose;

/// Linear blend that hits both endpoints exactly: `t = 0` yields `a`,
/// `t = 1` yields `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Blend position and rotation. Rotations are unwrapped upstream, so a plain
/// linear blend never spins the long way round.
#[inline]
pub fn lerp_pose(from: Pose, to: Pose, t: f32) -> Pose {
    Pose::new(
        lerp(from.x, to.x, t),
        lerp(from.y, to.y, t),
        lerp(from.rotation, to.rotation, t),
    )
}
