//! Reference board builder for accuracy runs.
//!
//! Each marker observation is turned into a marker pose through a planar
//! homography and the detector intrinsics, lifted to the world frame with
//! the detector pose, and fused across detectors and instants into relative
//! marker poses. [`BoardBuilder::build_board`](board_accuracy_core::BoardReconstructor::build_board)
//! chains those relative poses into a rigid [`board_accuracy_core::TargetBoard`].

mod builder;
mod homography;
mod pose;

pub use builder::{average_poses, BoardBuilder};
pub use homography::{estimate_homography, Homography};
pub use pose::{marker_pose_from_corners, PoseError};
