#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod ik;
pub mod math;
pub mod scene;

pub use ik::{IkTrace, JointTrace, solve_ik_ccd};
pub use math::{offset_to_orient, offset_to_orient_with_up, orient_to_offset};
pub use scene::{Node, NodeHandle, SceneGraph, Transform};
