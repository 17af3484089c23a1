//! Conversions between Euler orientations and direction vectors.
//!
//! An orientation is a `Vec3` of `(roll, pitch, yaw)` angles in degrees,
//! applied as `yaw ∘ pitch ∘ roll` around the canonical axes:
//!
//! - `x` — roll, around [`FORWARD`] (+Z)
//! - `y` — pitch, around [`LEFT`] (+X)
//! - `z` — yaw, around [`UP`] (+Y)
//!
//! [`offset_to_orient`] is the inverse of [`orient_to_offset`] up to roll,
//! which a pure direction cannot carry. [`offset_to_orient_with_up`]
//! recovers roll from an accompanying up vector.

use glam::{Mat3, Vec3};

/// Canonical left axis (+X).
pub const LEFT: Vec3 = Vec3::X;
/// Canonical up axis (+Y).
pub const UP: Vec3 = Vec3::Y;
/// Canonical forward axis (+Z).
pub const FORWARD: Vec3 = Vec3::Z;

/// Threshold below which a direction counts as purely vertical.
pub const EPSILON: f32 = 1e-4;

/// Builds the rotation matrix for an orientation, `yaw ∘ pitch ∘ roll`.
#[must_use]
pub fn rotation_from_orient(orient: Vec3) -> Mat3 {
    Mat3::from_rotation_y(orient.z.to_radians())
        * Mat3::from_rotation_x(orient.y.to_radians())
        * Mat3::from_rotation_z(orient.x.to_radians())
}

/// Rotates the canonical forward vector by pitch then yaw.
///
/// Roll has no effect on a pure direction, so it is ignored. Total over
/// all inputs.
#[must_use]
pub fn orient_to_offset(orient: Vec3) -> Vec3 {
    Mat3::from_rotation_y(orient.z.to_radians())
        * (Mat3::from_rotation_x(orient.y.to_radians()) * FORWARD)
}

/// Extracts `(0, pitch, yaw)` in degrees from a direction vector.
///
/// A near-vertical offset (both horizontal components within [`EPSILON`])
/// makes yaw undefined; it is fixed at 0 and pitch snaps to ∓90° from the
/// sign of the vertical component. This branch is what keeps the angle
/// computation away from the zero-length flattened vector.
///
/// Sign convention: `offset.x < 0` negates yaw, `offset.y > 0` negates
/// pitch (the unsigned angle primitive loses both signs).
#[must_use]
pub fn offset_to_orient(offset: Vec3) -> Vec3 {
    if offset.x.abs() < EPSILON && offset.z.abs() < EPSILON {
        let pitch = if offset.y > 0.0 {
            -90.0
        } else if offset.y < 0.0 {
            90.0
        } else {
            0.0
        };
        return Vec3::new(0.0, pitch, 0.0);
    }
    let flat = Vec3::new(offset.x, 0.0, offset.z);
    let mut pitch = flat.angle_between(offset).to_degrees();
    let mut yaw = flat.angle_between(FORWARD).to_degrees();
    if offset.x < 0.0 {
        yaw = -yaw;
    }
    if offset.y > 0.0 {
        pitch = -pitch;
    }
    Vec3::new(0.0, pitch, yaw)
}

/// Like [`offset_to_orient`], but also recovers roll from an up vector.
///
/// Roll is the signed angle, measured around the heading, from the up
/// direction implied by pitch/yaw alone to the supplied `up` projected
/// onto the plane orthogonal to the heading. If `up` is parallel to the
/// heading the roll is unrecoverable and left at 0.
#[must_use]
pub fn offset_to_orient_with_up(offset: Vec3, up: Vec3) -> Vec3 {
    let mut orient = offset_to_orient(offset);
    let heading = orient_to_offset(orient);
    let default_up = Mat3::from_rotation_y(orient.z.to_radians())
        * (Mat3::from_rotation_x(orient.y.to_radians()) * UP);
    let Some(up_proj) = (up - heading * up.dot(heading)).try_normalize() else {
        return orient;
    };
    let cos_roll = default_up.dot(up_proj).clamp(-1.0, 1.0);
    let sin_roll = default_up.cross(up_proj).dot(heading);
    orient.x = sin_roll.atan2(cos_roll).to_degrees();
    orient
}
