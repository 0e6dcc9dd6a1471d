use std::f32::consts::{PI, TAU};

use glam::Vec2;

/// Center of a rectangle placed by its top-left corner.
///
/// The render surface rotates rectangles about that corner, so the center is
/// the corner plus the half-size vector rotated by `rotation`.
pub fn top_left_to_center(corner: Vec2, size: Vec2, rotation: f32) -> Vec2 {
    corner + Vec2::from_angle(rotation).rotate(size * 0.5)
}

/// Inverse of [`top_left_to_center`].
pub fn center_to_top_left(center: Vec2, size: Vec2, rotation: f32) -> Vec2 {
    center - Vec2::from_angle(rotation).rotate(size * 0.5)
}

/// Unit normal pointing from an oriented rectangle toward `point`.
///
/// Outside the rectangle this is the direction from the closest surface point.
/// Inside, it is the face normal of the shallowest axis.
pub fn rect_contact_normal(center: Vec2, half_extents: Vec2, rotation: f32, point: Vec2) -> Vec2 {
    let local = Vec2::from_angle(-rotation).rotate(point - center);
    let closest = local.clamp(-half_extents, half_extents);
    let offset = local - closest;

    let local_normal = if offset.length_squared() > 1e-8 {
        offset.normalize()
    } else {
        let depth_x = half_extents.x - local.x.abs();
        let depth_y = half_extents.y - local.y.abs();
        if depth_x < depth_y {
            Vec2::new(local.x.signum(), 0.0)
        } else {
            Vec2::new(0.0, local.y.signum())
        }
    };

    Vec2::from_angle(rotation).rotate(local_normal)
}

/// Pick the representative of `raw` (mod 2π) closest to `previous`.
/// Keeps reported rotations continuous across ticks.
pub fn unwrap_angle(previous: f32, raw: f32) -> f32 {
    let delta = (raw - previous + PI).rem_euclid(TAU) - PI;
    previous + delta
}
