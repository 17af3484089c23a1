//! Hierarchical transform graph.
//!
//! - [`Node`]: one element of the tree (hierarchy links + transform)
//! - [`Transform`]: local pose with cached world/normal matrices
//! - [`SceneGraph`]: the arena that owns the nodes and runs the
//!   dirty-flag caching discipline

pub mod graph;
pub mod node;
pub mod transform;

pub use graph::SceneGraph;
pub use node::Node;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    /// Stable handle into the [`SceneGraph`] node arena.
    pub struct NodeHandle;
}
