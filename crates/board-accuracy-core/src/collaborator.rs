//! Contracts of the collaborators driven by an accuracy run.
//!
//! The board builder under test and the synthetic scene generator are opaque
//! to the evaluation engine; any implementation of these traits can be
//! plugged into the orchestrator, including test fakes.

use nalgebra::{Isometry3, Matrix3};
use serde::{Deserialize, Serialize};

use crate::types::{CornerMap, DetectorObservationSet, TargetBoard};

/// Pinhole intrinsics of a detector (no distortion).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl DetectorIntrinsics {
    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// True if the pixel lies inside `[0, width) x [0, height)`.
    #[inline]
    pub fn contains(&self, x_px: f64, y_px: f64) -> bool {
        x_px >= 0.0 && y_px >= 0.0 && x_px < self.width as f64 && y_px < self.height as f64
    }
}

/// Fixed pose of a detector in the world frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorPose {
    pub detector_id: String,
    /// Maps detector coordinates (x right, y down, z forward) into world.
    pub world_from_detector: Isometry3<f64>,
}

/// Reconstruction algorithm under test: accepts observations, produces a board.
pub trait BoardReconstructor {
    fn set_intrinsic_parameters(&mut self, detector_id: &str, intrinsics: DetectorIntrinsics);

    fn set_detector_poses(&mut self, poses: &[DetectorPose]);

    /// Accumulate one instant of (noisy) 2D observations.
    fn collect_data(&mut self, observations: &DetectorObservationSet);

    /// Fuse everything collected so far; `None` when nothing usable was seen.
    fn build_board(&mut self) -> Option<TargetBoard>;
}

/// Synthetic scene generator: produces ground-truth snapshots and their
/// per-detector projections.
pub trait SceneGenerator {
    /// Ground-truth 3D marker corners for `count` instants.
    fn generate_virtual_snapshots(&mut self, board: &CornerMap, count: usize) -> Vec<CornerMap>;

    /// Project one snapshot into every detector.
    fn generate_data(
        &self,
        snapshot: &CornerMap,
        detector_poses: &[DetectorPose],
        remove_markers_out_of_frame: bool,
    ) -> DetectorObservationSet;
}
