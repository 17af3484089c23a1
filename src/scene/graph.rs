//! Arena-backed transform tree with lazy matrix caching.
//!
//! All nodes live in a `SlotMap` owned by [`SceneGraph`]; parent/child
//! relations are plain handles, so lifetime is the graph's problem and
//! detaching can never leave a dangling reference.
//!
//! # Caching discipline
//!
//! Each node caches its world matrix under a dirty flag. Queries come in
//! two modes (see [`SceneGraph::world_transform`]):
//!
//! - `trace_down = false` — memoized bottom-up pull: recompute the dirty
//!   part of this node's ancestor lineage once, reuse every clean cache.
//! - `trace_down = true` — force-invalidate the whole subtree below the
//!   node, then pull every leaf so the entire subtree is clean on return.
//!   This is the once-per-frame call a renderer makes at the root: a
//!   node's own change must invalidate all descendants' cached absolute
//!   matrices, not just itself.
//!
//! The graph-level pose setters ([`SceneGraph::set_origin`] and friends)
//! invalidate the subtree eagerly, so a memoized query issued between
//! mutations can never observe a stale descendant cache. The tree is
//! single-threaded; mutating it from inside a traversal is a caller error.

use glam::{Mat3, Mat4, Vec3};
use slotmap::SlotMap;

use crate::math::orient::{self, FORWARD, LEFT, UP};
use crate::scene::node::Node;
use crate::scene::NodeHandle;

/// The owning container of the transform tree (a forest, in general).
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, Node>,
    roots: Vec<NodeHandle>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
        }
    }

    // ========================================================================
    // Node storage and hierarchy edits
    // ========================================================================

    /// Inserts a node as a new root.
    pub fn insert(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.roots.push(handle);
        handle
    }

    /// Inserts a node directly under `parent`.
    pub fn insert_child(&mut self, node: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.insert(node);
        self.attach(handle, parent);
        handle
    }

    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// Mutable node access. Pose edits through the node's own setters mark
    /// only that node dirty; descendants are caught by the next
    /// `trace_down` query, or eagerly by the graph-level setters.
    #[must_use]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Current root handles (nodes without a parent).
    #[must_use]
    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Re-parents `child` under `parent`, keeping both sides of the
    /// relation consistent. The child's local pose is untouched, so its
    /// world pose generally jumps; use [`Self::attach_keep_world`] to move
    /// a node without a visual jump.
    ///
    /// Attaching a node to itself is rejected. Attaching a node to one of
    /// its own descendants would create a cycle and is a caller error the
    /// graph does not defend against.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("cannot attach a node to itself");
            return;
        }
        if !self.nodes.contains_key(child) {
            log::warn!("attach: stale child handle");
            return;
        }
        self.detach_internal(child);
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        } else {
            log::error!("attach: stale parent handle, child stays a root");
            self.roots.push(child);
            return;
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
        self.invalidate_descendants(child);
    }

    /// Detaches `child` from its parent, making it a root. No-op for roots.
    pub fn detach(&mut self, child: NodeHandle) {
        if !self.nodes.contains_key(child) {
            log::warn!("detach: stale handle");
            return;
        }
        self.detach_internal(child);
        self.roots.push(child);
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
            c.transform.mark_dirty();
        }
        self.invalidate_descendants(child);
    }

    /// Removes `child` from its parent's child list or from the roots.
    /// Leaves `child.parent` untouched; callers fix it up.
    fn detach_internal(&mut self, child: NodeHandle) {
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(parent) = self.nodes.get_mut(p)
                && let Some(i) = parent.children.iter().position(|&c| c == child)
            {
                parent.children.remove(i);
            }
        } else if let Some(i) = self.roots.iter().position(|&r| r == child) {
            self.roots.remove(i);
        }
    }

    /// Detaches every child of `handle`, each becoming a root.
    ///
    /// Iterates a snapshot of the child list, since detaching mutates the
    /// very list being walked.
    pub fn unlink_children(&mut self, handle: NodeHandle) {
        let children: Vec<NodeHandle> = self
            .nodes
            .get(handle)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            self.detach(child);
        }
    }

    /// Destroys a node: detaches it from its parent and orphans (does not
    /// destroy) its children, so no handle in the graph dangles.
    pub fn remove(&mut self, handle: NodeHandle) {
        if !self.nodes.contains_key(handle) {
            return;
        }
        self.unlink_children(handle);
        self.detach_internal(handle);
        self.nodes.remove(handle);
    }

    /// Re-parents `child` while preserving its absolute position: capture
    /// the world origin, relink, then express the captured position in the
    /// new parent's space and reassign the local origin.
    pub fn attach_keep_world(&mut self, child: NodeHandle, parent: NodeHandle) {
        let abs_origin = self.world_point(child, Vec3::ZERO);
        self.attach(child, parent);
        let local = self.parent_local_point(child, abs_origin);
        self.set_origin(child, local);
    }

    /// Detaches `child` while preserving its absolute position.
    pub fn detach_keep_world(&mut self, child: NodeHandle) {
        let abs_origin = self.world_point(child, Vec3::ZERO);
        self.detach(child);
        self.set_origin(child, abs_origin);
    }

    // ========================================================================
    // Pose setters (eager subtree invalidation)
    // ========================================================================

    pub fn set_origin(&mut self, handle: NodeHandle, origin: Vec3) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.set_origin(origin);
            self.invalidate_descendants(handle);
        }
    }

    pub fn set_orientation(&mut self, handle: NodeHandle, orientation: Vec3) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.set_orientation(orientation);
            self.invalidate_descendants(handle);
        }
    }

    pub fn set_scale(&mut self, handle: NodeHandle, scale: Vec3) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.set_scale(scale);
            self.invalidate_descendants(handle);
        }
    }

    pub fn reset_transform(&mut self, handle: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.reset();
            self.invalidate_descendants(handle);
        }
    }

    /// Marks `handle` and its whole subtree dirty.
    ///
    /// The repair hatch for poses edited directly through
    /// [`Self::node_mut`], which marks only the edited node: marking the
    /// subtree afterwards restores the invariant the setters above keep
    /// eagerly.
    pub fn mark_subtree_dirty(&mut self, handle: NodeHandle) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.transform.mark_dirty();
            self.invalidate_descendants(handle);
        }
    }

    /// Marks every strict descendant of `handle` dirty.
    fn invalidate_descendants(&mut self, handle: NodeHandle) {
        let mut stack: Vec<NodeHandle> = self
            .nodes
            .get(handle)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        while let Some(h) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(h) {
                node.transform.mark_dirty();
                stack.extend_from_slice(&node.children);
            }
        }
    }

    // ========================================================================
    // Matrix queries
    // ========================================================================

    /// World matrix of `handle`.
    ///
    /// With `trace_down = false` this is the cheap memoized query: only
    /// the dirty part of the ancestor lineage is recomputed, O(depth)
    /// amortized. With `trace_down = true` the entire subtree below the
    /// node is invalidated and brought up to date before returning — the
    /// per-frame call a renderer makes once at each root.
    ///
    /// Stale handles return identity with a warning.
    pub fn world_transform(&mut self, handle: NodeHandle, trace_down: bool) -> Mat4 {
        if trace_down {
            self.invalidate_descendants(handle);
            self.refresh_subtree(handle);
        }
        self.update_world_memoized(handle)
    }

    /// Normal matrix of `handle`: the inverse-transpose of the world
    /// matrix, for transforming normals under non-uniform scale.
    ///
    /// `trace_down` is forwarded to [`Self::world_transform`], so it
    /// governs the world-matrix subtree refresh; only this node's normal
    /// cache is recomputed here. Descendants' normal caches stay flagged
    /// and recompute lazily on their own query.
    pub fn normal_transform(&mut self, handle: NodeHandle, trace_down: bool) -> Mat4 {
        let world = self.world_transform(handle, trace_down);
        let Some(node) = self.nodes.get_mut(handle) else {
            return Mat4::IDENTITY;
        };
        if node.transform.dirty_normal {
            node.transform.normal_matrix = world.inverse().transpose();
            node.transform.dirty_normal = false;
        }
        node.transform.normal_matrix
    }

    /// Memoized bottom-up recomputation: walk up collecting the dirty
    /// lineage, then rebuild top-down so every parent is clean before its
    /// child. Iterative to stay safe on deep chains.
    fn update_world_memoized(&mut self, handle: NodeHandle) -> Mat4 {
        if !self.nodes.contains_key(handle) {
            log::warn!("world_transform: stale handle");
            return Mat4::IDENTITY;
        }
        let mut lineage: Vec<NodeHandle> = Vec::new();
        let mut cursor = Some(handle);
        let mut world = Mat4::IDENTITY;
        while let Some(h) = cursor {
            let Some(node) = self.nodes.get(h) else { break };
            if !node.transform.dirty_world {
                world = node.transform.world_matrix;
                break;
            }
            lineage.push(h);
            cursor = node.parent;
        }
        for &h in lineage.iter().rev() {
            if let Some(node) = self.nodes.get_mut(h) {
                world *= node.transform.local_matrix();
                node.transform.world_matrix = world;
                node.transform.dirty_world = false;
            }
        }
        self.nodes
            .get(handle)
            .map_or(Mat4::IDENTITY, |n| n.transform.world_matrix)
    }

    /// Pulls every leaf of the subtree through the memoized path, which
    /// drags each leaf-to-root lineage (this node included) clean.
    fn refresh_subtree(&mut self, handle: NodeHandle) {
        let mut stack = vec![handle];
        while let Some(h) = stack.pop() {
            let children: Vec<NodeHandle> = self
                .nodes
                .get(h)
                .map(|n| n.children.clone())
                .unwrap_or_default();
            if children.is_empty() {
                self.update_world_memoized(h);
            } else {
                stack.extend_from_slice(&children);
            }
        }
    }

    // ========================================================================
    // Coordinate mapping and direction probes
    // ========================================================================

    /// Maps a point in `handle`'s local space to world space.
    pub fn world_point(&mut self, handle: NodeHandle, local_point: Vec3) -> Vec3 {
        self.world_transform(handle, false)
            .transform_point3(local_point)
    }

    /// Maps a world-space point into the space of `handle`'s parent.
    /// For a root the parent space is world space.
    pub fn parent_local_point(&mut self, handle: NodeHandle, world_point: Vec3) -> Vec3 {
        match self.nodes.get(handle).and_then(|n| n.parent) {
            Some(parent) => self
                .world_transform(parent, false)
                .inverse()
                .transform_point3(world_point),
            None => world_point,
        }
    }

    /// Offset from `handle`'s origin to a world-space point, expressed in
    /// the parent's space. This is the direction the IK solver swings.
    pub fn offset_from_origin(&mut self, handle: NodeHandle, world_point: Vec3) -> Vec3 {
        let origin = self
            .nodes
            .get(handle)
            .map_or(Vec3::ZERO, |n| n.transform.origin());
        self.parent_local_point(handle, world_point) - origin
    }

    /// World-space heading (local +Z pushed through the normal matrix).
    pub fn world_heading(&mut self, handle: NodeHandle) -> Vec3 {
        self.world_direction(handle, FORWARD)
    }

    /// World-space up direction (local +Y).
    pub fn world_up(&mut self, handle: NodeHandle) -> Vec3 {
        self.world_direction(handle, UP)
    }

    /// World-space left direction (local +X).
    pub fn world_left(&mut self, handle: NodeHandle) -> Vec3 {
        self.world_direction(handle, LEFT)
    }

    fn world_direction(&mut self, handle: NodeHandle, local_dir: Vec3) -> Vec3 {
        (Mat3::from_mat4(self.normal_transform(handle, false)) * local_dir).normalize_or_zero()
    }

    // ========================================================================
    // Aiming
    // ========================================================================

    /// Orients `handle` so its heading points at a world-space target.
    /// Roll is reset; use [`Self::rotate_about`] for roll-preserving turns.
    pub fn point_at(&mut self, handle: NodeHandle, world_target: Vec3) {
        let offset = self.offset_from_origin(handle, world_target);
        self.set_orientation(handle, orient::offset_to_orient(offset));
    }

    /// Rotates `handle` by `angle_deg` around a world-space pivot axis,
    /// carrying both heading and up direction so roll survives.
    pub fn rotate_about(&mut self, handle: NodeHandle, angle_deg: f32, pivot: Vec3) {
        let Some(axis) = pivot.try_normalize() else {
            log::warn!("rotate_about: zero pivot axis");
            return;
        };
        let rot = Mat3::from_axis_angle(axis, angle_deg.to_radians());
        let abs_origin = self.world_point(handle, Vec3::ZERO);
        let heading = self.world_heading(handle);
        let up = self.world_up(handle);
        let new_heading = self.offset_from_origin(handle, abs_origin + rot * heading);
        let new_up = self.offset_from_origin(handle, abs_origin + rot * up);
        self.set_orientation(handle, orient::offset_to_orient_with_up(new_heading, new_up));
    }
}
