//! Cyclic-Coordinate-Descent inverse kinematics over the transform graph.
//!
//! [`solve_ik_ccd`] drives the tip of a joint chain toward a world-space
//! target by swinging one joint at a time, tip to root, repeatedly. Each
//! swing is computed in the joint's parent space and written back as a
//! roll-preserving orientation, so chains do not accumulate twist.

use glam::{Mat3, Vec3};
use rustc_hash::FxHashMap;

use crate::math::orient::{self, FORWARD, UP};
use crate::scene::{NodeHandle, SceneGraph};

/// Last-computed solver internals for one joint, for guide-wire rendering.
/// Carries no contract beyond "last value the solver derived".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointTrace {
    /// Normalized direction from the joint to the target, parent space.
    pub target_dir: Vec3,
    /// Normalized direction from the joint to the effector tip, parent space.
    pub effector_dir: Vec3,
    /// Swing axis the joint would rotate around.
    pub pivot_axis: Vec3,
    /// Unnormalized offset from the joint to the target, parent space.
    pub local_target: Vec3,
}

/// Optional per-joint debug output of [`solve_ik_ccd`].
#[derive(Debug, Default)]
pub struct IkTrace {
    pub joints: FxHashMap<NodeHandle, JointTrace>,
}

impl IkTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn joint(&self, handle: NodeHandle) -> Option<&JointTrace> {
        self.joints.get(&handle)
    }

    pub fn clear(&mut self) {
        self.joints.clear();
    }
}

/// Swing axis and angle (radians) taking direction `from` onto `to`.
///
/// The axis is built from the normalized difference and midpoint of the
/// two directions, which stay well-conditioned even when the directions
/// are nearly anti-parallel (where a plain cross product collapses). The
/// two construction vectors are orthogonal, so the axis is already unit
/// length. Returns `None` when the directions already coincide.
fn swing_between(from: Vec3, to: Vec3) -> Option<(Vec3, f32)> {
    let arc_dir = (to - from).try_normalize()?;
    let axis = match ((to + from) * 0.5).try_normalize() {
        Some(midpoint) => arc_dir.cross(midpoint),
        // Anti-parallel: a half turn around anything orthogonal works.
        None => arc_dir.any_orthonormal_vector(),
    };
    Some((axis, from.angle_between(to)))
}

/// Iteratively rotates the joints from `effector` up to and including
/// `root` so that `local_effector_tip` (a point in `effector`'s local
/// space) reaches `target` (world space).
///
/// Returns `true` the moment the tip comes within `accept_distance` of
/// the target; `false` once `max_iters` passes are exhausted. Unreachable
/// targets exhaust the iterations and return `false` — that is expected,
/// not an error, and the partial pose already written into the graph is
/// kept (best effort, no rollback).
///
/// The last pass never writes orientations; it only records would-be
/// values into `trace`, giving the caller one extra frame of guide wires
/// for the final unapplied step.
pub fn solve_ik_ccd(
    graph: &mut SceneGraph,
    effector: NodeHandle,
    root: NodeHandle,
    local_effector_tip: Vec3,
    target: Vec3,
    max_iters: usize,
    accept_distance: f32,
    mut trace: Option<&mut IkTrace>,
) -> bool {
    for iter in 0..max_iters {
        let write_pass = iter + 1 < max_iters;
        let mut current = Some(effector);
        while let Some(joint) = current {
            // The tip depends on every upstream joint, some of which this
            // pass may have just rotated, so it is recomputed each step.
            let tip = graph.world_point(effector, local_effector_tip);
            if tip.distance(target) < accept_distance {
                return true;
            }

            let target_offset = graph.offset_from_origin(joint, target);
            let target_dir = target_offset.normalize_or_zero();
            let tip_dir = graph
                .offset_from_origin(joint, tip)
                .normalize_or_zero();

            if target_dir != Vec3::ZERO
                && tip_dir != Vec3::ZERO
                && let Some((axis, angle)) = swing_between(tip_dir, target_dir)
            {
                if write_pass {
                    let Some(node) = graph.node(joint) else { break };
                    let joint_rot = node.transform.local_rotation();
                    let arc_rot = Mat3::from_axis_angle(axis, -angle);
                    let new_heading = arc_rot * (joint_rot * FORWARD);
                    let new_up = arc_rot * (joint_rot * UP);
                    graph.set_orientation(
                        joint,
                        orient::offset_to_orient_with_up(new_heading, new_up),
                    );
                }
                if let Some(trace) = trace.as_deref_mut() {
                    trace.joints.insert(
                        joint,
                        JointTrace {
                            target_dir,
                            effector_dir: tip_dir,
                            pivot_axis: axis,
                            local_target: target_offset,
                        },
                    );
                }
            }

            if joint == root {
                break;
            }
            current = graph.node(joint).and_then(|n| n.parent());
        }
    }
    false
}
