//! Transform graph tests
//!
//! Tests for:
//! - Cache correctness against from-scratch recomputation
//! - Dirty isolation between sibling subtrees
//! - Direct pose edits repaired through `mark_subtree_dirty`
//! - Reparenting with and without world-pose preservation
//! - Unlink safety over a mutating child list
//! - Normal matrix and direction probes under rotation and scale
//! - Deep chains (iterative recomputation, no stack overflow)

use armature::scene::{Node, NodeHandle, SceneGraph};
use glam::{Mat4, Vec3};

const EPSILON: f32 = 1e-4;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn mat4_approx(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

/// Recomputes a node's world matrix from scratch by composing local
/// matrices up the ancestor chain, ignoring all caches.
fn world_from_scratch(graph: &SceneGraph, handle: NodeHandle) -> Mat4 {
    let mut chain = Vec::new();
    let mut cursor = Some(handle);
    while let Some(h) = cursor {
        let node = graph.node(h).unwrap();
        chain.push(node.transform.local_matrix());
        cursor = node.parent();
    }
    chain
        .iter()
        .rev()
        .fold(Mat4::IDENTITY, |acc, local| acc * *local)
}

/// Root with two branches: (root -> a -> a1, a2) and (root -> b -> b1).
fn two_branch_tree() -> (SceneGraph, [NodeHandle; 6]) {
    let mut graph = SceneGraph::new();
    let root = graph.insert(Node::new("root"));
    let a = graph.insert_child(Node::new("a"), root);
    let a1 = graph.insert_child(Node::new("a1"), a);
    let a2 = graph.insert_child(Node::new("a2"), a);
    let b = graph.insert_child(Node::new("b"), root);
    let b1 = graph.insert_child(Node::new("b1"), b);

    graph.set_origin(root, Vec3::new(1.0, 0.0, 0.0));
    graph.set_origin(a, Vec3::new(0.0, 2.0, 0.0));
    graph.set_orientation(a, Vec3::new(0.0, 30.0, 45.0));
    graph.set_origin(a1, Vec3::new(0.0, 0.0, 1.5));
    graph.set_origin(a2, Vec3::new(0.5, 0.5, 0.5));
    graph.set_scale(a2, Vec3::new(2.0, 1.0, 1.0));
    graph.set_origin(b, Vec3::new(-3.0, 0.0, 0.0));
    graph.set_orientation(b1, Vec3::new(10.0, 20.0, 30.0));
    graph.set_origin(b1, Vec3::new(0.0, 1.0, 0.0));

    (graph, [root, a, a1, a2, b, b1])
}

// ============================================================================
// Cache correctness
// ============================================================================

#[test]
fn trace_down_matches_from_scratch_recompute() {
    let (mut graph, handles) = two_branch_tree();

    let root = handles[0];
    graph.world_transform(root, true);

    for &h in &handles {
        let cached = graph.node(h).unwrap().transform.world_matrix();
        let expected = world_from_scratch(&graph, h);
        assert!(
            mat4_approx(cached, expected),
            "cache mismatch for {}",
            graph.node(h).unwrap().name
        );
        assert!(!graph.node(h).unwrap().transform.is_world_dirty());
    }
}

#[test]
fn cache_stays_correct_across_mutation_sequences() {
    let (mut graph, handles) = two_branch_tree();
    let [root, a, a1, _a2, b, b1] = handles;

    graph.world_transform(root, true);

    // A batch of pose edits and a reparent, then one global refresh.
    graph.set_origin(a1, Vec3::new(4.0, 0.0, 0.0));
    graph.set_orientation(root, Vec3::new(0.0, 0.0, 90.0));
    graph.attach(b1, a);
    graph.set_scale(b, Vec3::splat(3.0));
    graph.world_transform(root, true);

    for &h in &[root, a, a1, b, b1] {
        let cached = graph.node(h).unwrap().transform.world_matrix();
        assert!(mat4_approx(cached, world_from_scratch(&graph, h)));
    }

    // world == parent_world * local, checked directly.
    let parent_world = graph.node(a).unwrap().transform.world_matrix();
    let local = graph.node(b1).unwrap().transform.local_matrix();
    let child_world = graph.node(b1).unwrap().transform.world_matrix();
    assert!(mat4_approx(child_world, parent_world * local));
}

#[test]
fn memoized_query_is_consistent_with_trace_down() {
    let (mut graph, handles) = two_branch_tree();
    let memoized = graph.world_transform(handles[2], false);

    let (mut graph2, handles2) = two_branch_tree();
    graph2.world_transform(handles2[0], true);
    let traced = graph2.node(handles2[2]).unwrap().transform.world_matrix();

    assert!(mat4_approx(memoized, traced));
}

// ============================================================================
// Dirty isolation
// ============================================================================

#[test]
fn leaf_mutation_leaves_sibling_subtree_clean() {
    let (mut graph, handles) = two_branch_tree();
    let [root, _a, a1, _a2, b, b1] = handles;

    graph.world_transform(root, true);
    let b_world = graph.node(b).unwrap().transform.world_matrix();
    let b1_world = graph.node(b1).unwrap().transform.world_matrix();

    // Mutating a leaf in branch A must not invalidate branch B.
    graph.set_origin(a1, Vec3::new(9.0, 9.0, 9.0));

    for &h in &[b, b1] {
        let node = graph.node(h).unwrap();
        assert!(!node.transform.is_world_dirty(), "over-invalidation");
    }
    assert!(mat4_approx(graph.world_transform(b, false), b_world));
    assert!(mat4_approx(graph.world_transform(b1, false), b1_world));
}

#[test]
fn direct_pose_edit_repaired_by_mark_subtree_dirty() {
    init_logs();
    let mut graph = SceneGraph::new();
    let a = graph.insert(Node::new("a"));
    let b = graph.insert_child(Node::new("b"), a);
    let c = graph.insert_child(Node::new("c"), b);
    graph.set_origin(a, Vec3::new(1.0, 0.0, 0.0));
    graph.set_origin(b, Vec3::new(0.0, 0.0, 1.0));
    graph.set_origin(c, Vec3::new(0.0, 0.0, 1.0));
    graph.world_transform(a, true);

    // Editing a pose through `node_mut` marks only that node, so a clean
    // descendant's memoized query still serves its old cache.
    graph
        .node_mut(a)
        .unwrap()
        .transform
        .set_origin(Vec3::new(0.0, 6.0, 0.0));
    assert!(graph.node(a).unwrap().transform.is_world_dirty());
    assert!(!graph.node(c).unwrap().transform.is_world_dirty());
    let stale = graph.world_transform(c, false);
    assert!(approx_eq(stale.w_axis.y, 0.0));

    // Marking the subtree restores the invariant the graph-level setters
    // keep eagerly.
    graph.mark_subtree_dirty(a);
    let repaired = graph.world_transform(c, false);
    assert!(approx_eq(repaired.w_axis.y, 6.0));
    assert!(approx_eq(repaired.w_axis.z, 2.0));
}

#[test]
fn reset_transform_restores_identity() {
    let mut graph = SceneGraph::new();
    let parent = graph.insert(Node::new("parent"));
    let child = graph.insert_child(Node::new("child"), parent);
    graph.set_origin(parent, Vec3::new(3.0, -1.0, 2.0));
    graph.set_orientation(parent, Vec3::new(15.0, 30.0, -45.0));
    graph.set_scale(parent, Vec3::new(2.0, 2.0, 2.0));
    graph.set_origin(child, Vec3::new(0.0, 0.0, 1.0));
    graph.world_transform(parent, true);

    graph.reset_transform(parent);

    assert!(mat4_approx(graph.world_transform(parent, false), Mat4::IDENTITY));
    // The reset invalidated the child too; its world is now just its local.
    let child_world = graph.world_transform(child, false);
    assert!(vec3_approx(child_world.w_axis.truncate(), Vec3::new(0.0, 0.0, 1.0)));
}

// ============================================================================
// Reparenting
// ============================================================================

#[test]
fn attach_keep_world_preserves_world_position() {
    let mut graph = SceneGraph::new();
    let old_parent = graph.insert(Node::new("old"));
    let new_parent = graph.insert(Node::new("new"));
    let child = graph.insert_child(Node::new("child"), old_parent);

    graph.set_origin(old_parent, Vec3::new(2.0, 1.0, 0.0));
    graph.set_orientation(old_parent, Vec3::new(0.0, 0.0, 90.0));
    graph.set_origin(new_parent, Vec3::new(-5.0, 0.0, 3.0));
    graph.set_orientation(new_parent, Vec3::new(0.0, 45.0, 0.0));
    graph.set_origin(child, Vec3::new(0.0, 0.0, 2.0));

    let before = graph.world_point(child, Vec3::ZERO);
    graph.attach_keep_world(child, new_parent);
    let after = graph.world_point(child, Vec3::ZERO);

    assert_eq!(graph.node(child).unwrap().parent(), Some(new_parent));
    assert!(vec3_approx(before, after), "{before} != {after}");
}

#[test]
fn detach_keep_world_preserves_world_position() {
    let mut graph = SceneGraph::new();
    let parent = graph.insert(Node::new("parent"));
    let child = graph.insert_child(Node::new("child"), parent);
    graph.set_origin(parent, Vec3::new(0.0, 4.0, 0.0));
    graph.set_orientation(parent, Vec3::new(0.0, -30.0, 60.0));
    graph.set_origin(child, Vec3::new(1.0, 0.0, 1.0));

    let before = graph.world_point(child, Vec3::ZERO);
    graph.detach_keep_world(child);
    let after = graph.world_point(child, Vec3::ZERO);

    assert_eq!(graph.node(child).unwrap().parent(), None);
    assert!(vec3_approx(before, after));
}

#[test]
fn plain_attach_marks_child_dirty() {
    let mut graph = SceneGraph::new();
    let a = graph.insert(Node::new("a"));
    let b = graph.insert(Node::new("b"));
    let c = graph.insert_child(Node::new("c"), b);
    graph.set_origin(a, Vec3::new(7.0, 0.0, 0.0));
    graph.world_transform(a, true);
    graph.world_transform(b, true);

    graph.attach(b, a);
    assert!(graph.node(b).unwrap().transform.is_world_dirty());
    assert!(graph.node(c).unwrap().transform.is_world_dirty());

    // Next query reflects the new parent chain.
    let world_c = graph.world_transform(c, false);
    assert!(approx_eq(world_c.w_axis.x, 7.0));
}

// ============================================================================
// Unlink safety and removal
// ============================================================================

#[test]
fn unlink_children_orphans_every_child() {
    let mut graph = SceneGraph::new();
    let parent = graph.insert(Node::new("parent"));
    let children: Vec<NodeHandle> = (0..5)
        .map(|i| graph.insert_child(Node::new(&format!("c{i}")), parent))
        .collect();

    graph.unlink_children(parent);

    assert!(graph.node(parent).unwrap().children().is_empty());
    for &c in &children {
        assert_eq!(graph.node(c).unwrap().parent(), None);
        assert!(graph.roots().contains(&c));
    }
}

#[test]
fn remove_detaches_and_orphans() {
    let mut graph = SceneGraph::new();
    let root = graph.insert(Node::new("root"));
    let mid = graph.insert_child(Node::new("mid"), root);
    let leaf = graph.insert_child(Node::new("leaf"), mid);

    graph.remove(mid);

    assert!(graph.node(mid).is_none());
    assert!(graph.node(root).unwrap().children().is_empty());
    assert_eq!(graph.node(leaf).unwrap().parent(), None);
    // The orphan still answers queries with its own local matrix.
    graph.set_origin(leaf, Vec3::new(0.0, 0.0, 5.0));
    let world = graph.world_transform(leaf, false);
    assert!(approx_eq(world.w_axis.z, 5.0));
}

// ============================================================================
// Normal matrix and direction probes
// ============================================================================

#[test]
fn normal_matrix_is_inverse_transpose() {
    let mut graph = SceneGraph::new();
    let node = graph.insert(Node::new("n"));
    graph.set_scale(node, Vec3::new(2.0, 1.0, 0.5));
    graph.set_orientation(node, Vec3::new(0.0, 25.0, -40.0));
    graph.set_origin(node, Vec3::new(1.0, 2.0, 3.0));

    let world = graph.world_transform(node, false);
    let normal = graph.normal_transform(node, false);
    assert!(mat4_approx(normal, world.inverse().transpose()));
    assert!(!graph.node(node).unwrap().transform.is_normal_dirty());
}

#[test]
fn point_at_aims_heading_at_target() {
    let mut graph = SceneGraph::new();
    let parent = graph.insert(Node::new("parent"));
    let node = graph.insert_child(Node::new("n"), parent);
    graph.set_origin(parent, Vec3::new(0.0, 0.0, -2.0));
    graph.set_origin(node, Vec3::new(1.0, 0.0, 0.0));

    let target = Vec3::new(4.0, 2.0, 1.0);
    graph.point_at(node, target);

    let origin = graph.world_point(node, Vec3::ZERO);
    let heading = graph.world_heading(node);
    let expected = (target - origin).normalize();
    assert!(heading.dot(expected) > 1.0 - 1e-4);
}

#[test]
fn direction_probes_form_the_rotated_frame() {
    let mut graph = SceneGraph::new();
    let node = graph.insert(Node::new("n"));
    // A quarter yaw turn swings forward onto +X and left onto -Z.
    graph.set_orientation(node, Vec3::new(0.0, 0.0, 90.0));

    assert!(vec3_approx(graph.world_heading(node), Vec3::X));
    assert!(vec3_approx(graph.world_left(node), -Vec3::Z));
    assert!(vec3_approx(graph.world_up(node), Vec3::Y));
}

#[test]
fn rotate_about_quarter_turn() {
    let mut graph = SceneGraph::new();
    let node = graph.insert(Node::new("n"));

    // Quarter turn around world up: forward swings to +X.
    graph.rotate_about(node, 90.0, Vec3::Y);
    let heading = graph.world_heading(node);
    assert!(vec3_approx(heading, Vec3::X));

    // Up direction untouched by a yaw-only turn.
    let up = graph.world_up(node);
    assert!(vec3_approx(up, Vec3::Y));
}

// ============================================================================
// Deep chains
// ============================================================================

#[test]
fn deep_chain_updates_without_stack_overflow() {
    let depth = 600;
    let mut graph = SceneGraph::new();
    let root = graph.insert(Node::new("root"));
    let mut last = root;
    for i in 1..depth {
        let h = graph.insert_child(Node::new(&format!("n{i}")), last);
        graph.set_origin(h, Vec3::new(1.0, 0.0, 0.0));
        last = h;
    }

    graph.world_transform(root, true);
    let leaf_world = graph.node(last).unwrap().transform.world_matrix();
    assert!(approx_eq(leaf_world.w_axis.x, (depth - 1) as f32));
}
