//! Planar vector helpers layered over [`glam::Vec2`].
//!
//! `glam` already supplies arithmetic, `dot`, `length`, `distance` and
//! `distance_squared`; this module only adds the conventions the simulation
//! relies on.

pub use glam::Vec2;

/// Lengths below this threshold normalise to the zero vector.
pub const NORMALIZE_EPSILON: f32 = 1.0e-4;

/// Normalises `v`, returning [`Vec2::ZERO`] for near-zero lengths.
#[must_use]
pub fn normalize(v: Vec2) -> Vec2 {
    let length = v.length();
    if length < NORMALIZE_EPSILON {
        Vec2::ZERO
    } else {
        v / length
    }
}

/// Unit vector pointing from `from` toward `to`, or zero when they coincide.
#[must_use]
pub fn direction_to(from: Vec2, to: Vec2) -> Vec2 {
    normalize(to - from)
}

/// Reports whether `point` lies inside the rectangle, edges included.
#[must_use]
pub fn point_in_rect(point: Vec2, min: Vec2, max: Vec2) -> bool {
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}

/// Orders two corners so the first is the component-wise minimum.
#[must_use]
pub fn ordered_rect(a: Vec2, b: Vec2) -> (Vec2, Vec2) {
    (a.min(b), a.max(b))
}
