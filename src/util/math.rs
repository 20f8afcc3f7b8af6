//! Angle helpers shared by the gradient, orientation and sampling stages.

use std::f32::consts::{PI, TAU};

/// Wraps an angle in radians to the range [-π, π).
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped < -PI {
        wrapped += TAU;
    }
    if wrapped >= PI {
        wrapped -= TAU;
    }
    wrapped
}

/// Absolute circular distance between two angles in radians.
pub fn angle_distance(a: f32, b: f32) -> f32 {
    wrap_angle(a - b).abs()
}
