//! Scene node: hierarchy links plus a transform.

use crate::scene::NodeHandle;
use crate::scene::transform::Transform;

/// One node of the transform tree.
///
/// A node carries only what every traversal touches: the parent/children
/// links and the [`Transform`]. The node does not own its relatives —
/// all nodes live in the [`SceneGraph`](crate::scene::SceneGraph) arena
/// and reference each other by handle, so detaching or removing a node
/// can never dangle.
///
/// The parent/children relation is kept mutually consistent by the graph:
/// `n ∈ p.children ⇔ p == n.parent`. Callers go through
/// [`SceneGraph::attach`](crate::scene::SceneGraph::attach) and friends
/// rather than editing the links directly.
#[derive(Debug, Clone)]
pub struct Node {
    /// Display name, for debugging and guide-wire labels.
    pub name: String,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    /// Local pose and matrix caches.
    pub transform: Transform,
}

impl Node {
    /// Creates a node with an identity pose, marked fully dirty.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
        }
    }

    /// Parent handle, `None` for roots.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Read-only view of the child handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}
