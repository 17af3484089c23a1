//! Pure math helpers shared by the scene graph and the IK solver.

pub mod orient;

pub use orient::{offset_to_orient, offset_to_orient_with_up, orient_to_offset};
