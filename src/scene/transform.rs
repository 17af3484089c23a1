//! Per-node pose and matrix caches.

use glam::{Mat3, Mat4, Vec3};

use crate::math::orient;

/// Local pose of a node plus its cached world-space matrices.
///
/// The pose is translate-rotate-scale, with the rotation expressed as
/// `(roll, pitch, yaw)` degrees (see [`crate::math::orient`]). The cached
/// `world_matrix` and `normal_matrix` are only meaningful while their
/// dirty flags are clear; every setter marks both flags, and the owning
/// [`SceneGraph`](crate::scene::SceneGraph) recomputes caches on demand.
#[derive(Debug, Clone)]
pub struct Transform {
    origin: Vec3,
    orientation: Vec3,
    scale: Vec3,

    pub(crate) world_matrix: Mat4,
    pub(crate) normal_matrix: Mat4,

    pub(crate) dirty_world: bool,
    pub(crate) dirty_normal: bool,
}

impl Transform {
    /// Identity pose, fully dirty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Vec3::ZERO,
            orientation: Vec3::ZERO,
            scale: Vec3::ONE,
            world_matrix: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
            dirty_world: true,
            dirty_normal: true,
        }
    }

    /// Local translation relative to the parent.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
        self.mark_dirty();
    }

    /// `(roll, pitch, yaw)` in degrees.
    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Vec3 {
        self.orientation
    }

    pub fn set_orientation(&mut self, orientation: Vec3) {
        self.orientation = orientation;
        self.mark_dirty();
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_dirty();
    }

    /// Restores the identity pose.
    pub fn reset(&mut self) {
        self.origin = Vec3::ZERO;
        self.orientation = Vec3::ZERO;
        self.scale = Vec3::ONE;
        self.mark_dirty();
    }

    /// Marks both cached matrices stale.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty_world = true;
        self.dirty_normal = true;
    }

    #[inline]
    #[must_use]
    pub fn is_world_dirty(&self) -> bool {
        self.dirty_world
    }

    #[inline]
    #[must_use]
    pub fn is_normal_dirty(&self) -> bool {
        self.dirty_normal
    }

    /// Rotation factor of the local matrix, `yaw ∘ pitch ∘ roll`.
    #[must_use]
    pub fn local_rotation(&self) -> Mat3 {
        orient::rotation_from_orient(self.orientation)
    }

    /// `translate(origin) * rotate(orientation) * scale(scale)`.
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.origin)
            * Mat4::from_mat3(self.local_rotation())
            * Mat4::from_scale(self.scale)
    }

    /// Cached world matrix. Stale unless a graph query cleaned it; prefer
    /// [`SceneGraph::world_transform`](crate::scene::SceneGraph::world_transform).
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Cached normal matrix (inverse-transpose of the world matrix).
    #[inline]
    #[must_use]
    pub fn normal_matrix(&self) -> Mat4 {
        self.normal_matrix
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
