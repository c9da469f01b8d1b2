//! Random rigid-motion scene generator.

use std::collections::HashMap;

use board_accuracy_core::{
    CornerMap, DetectorIntrinsics, DetectorObservationSet, DetectorPose, MarkerSnapshot,
    SceneGenerator,
};
use log::{debug, trace};
use nalgebra::{Isometry3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::camera::project_marker;

/// Bounds of the random rigid motion applied to each snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMotion {
    /// Largest rotation angle about the board centroid, in degrees.
    pub max_rotation_deg: f64,
    /// Largest translation along each world axis, in board units.
    pub max_translation: f64,
}

impl Default for SnapshotMotion {
    fn default() -> Self {
        Self {
            max_rotation_deg: 20.0,
            max_translation: 30.0,
        }
    }
}

impl SnapshotMotion {
    /// Largest translation bound the uniform sampler accepts.
    pub const TRANSLATION_LIMIT: f64 = f64::MAX / 4.0;

    /// Snapshots are exact copies of the board.
    pub fn none() -> Self {
        Self {
            max_rotation_deg: 0.0,
            max_translation: 0.0,
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.max_rotation_deg == 0.0 && self.max_translation == 0.0
    }
}

/// Scene generator that moves the board rigidly in front of pinhole detectors.
#[derive(Debug)]
pub struct RigidMotionScene {
    intrinsics: DetectorIntrinsics,
    overrides: HashMap<String, DetectorIntrinsics>,
    motion: SnapshotMotion,
    rng: StdRng,
}

impl RigidMotionScene {
    /// `seed = None` draws the motion from OS entropy.
    pub fn new(intrinsics: DetectorIntrinsics, motion: SnapshotMotion, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            intrinsics,
            overrides: HashMap::new(),
            motion,
            rng,
        }
    }

    /// Use different intrinsics for one detector.
    pub fn with_detector_intrinsics(
        mut self,
        detector_id: impl Into<String>,
        intrinsics: DetectorIntrinsics,
    ) -> Self {
        self.overrides.insert(detector_id.into(), intrinsics);
        self
    }

    pub fn intrinsics_for(&self, detector_id: &str) -> &DetectorIntrinsics {
        self.overrides.get(detector_id).unwrap_or(&self.intrinsics)
    }

    pub fn motion(&self) -> SnapshotMotion {
        self.motion
    }

    fn random_motion(&mut self, centroid: &Point3<f64>) -> Isometry3<f64> {
        let max_angle = sampling_bound(self.motion.max_rotation_deg.to_radians());
        let max_t = sampling_bound(self.motion.max_translation);

        let axis_angle = if max_angle > 0.0 {
            let axis = loop {
                let v = Vector3::<f64>::new(
                    self.rng.random_range(-1.0..=1.0),
                    self.rng.random_range(-1.0..=1.0),
                    self.rng.random_range(-1.0..=1.0),
                );
                let n = v.norm();
                if n > 1e-6 && n <= 1.0 {
                    break v / n;
                }
            };
            axis * self.rng.random_range(-max_angle..=max_angle)
        } else {
            Vector3::zeros()
        };
        let t = if max_t > 0.0 {
            Vector3::new(
                self.rng.random_range(-max_t..=max_t),
                self.rng.random_range(-max_t..=max_t),
                self.rng.random_range(-max_t..=max_t),
            )
        } else {
            Vector3::zeros()
        };

        // Rotate about the centroid, then translate.
        Isometry3::new(centroid.coords + t, axis_angle)
            * Isometry3::new(-centroid.coords, Vector3::zeros())
    }
}

/// Half-width of a symmetric sampling range; its scaled width must stay finite.
fn sampling_bound(bound: f64) -> f64 {
    if bound.is_finite() {
        bound.abs().min(SnapshotMotion::TRANSLATION_LIMIT)
    } else {
        0.0
    }
}

fn board_centroid(board: &CornerMap) -> Point3<f64> {
    let n = (board.len() * 4).max(1) as f64;
    let sum = board
        .values()
        .flat_map(|c| c.iter())
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / n)
}

impl SceneGenerator for RigidMotionScene {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, board), fields(markers = board.len()))
    )]
    fn generate_virtual_snapshots(&mut self, board: &CornerMap, count: usize) -> Vec<CornerMap> {
        if self.motion.is_identity() {
            return vec![board.clone(); count];
        }
        let centroid = board_centroid(board);
        (0..count)
            .map(|idx| {
                let motion = self.random_motion(&centroid);
                trace!(
                    "snapshot {idx}: angle {:.3} rad, shift {:?}",
                    motion.rotation.angle(),
                    motion.translation.vector.as_slice()
                );
                board
                    .iter()
                    .map(|(&id, corners)| (id, corners.map(|p| motion * p)))
                    .collect()
            })
            .collect()
    }

    fn generate_data(
        &self,
        snapshot: &CornerMap,
        detector_poses: &[DetectorPose],
        remove_markers_out_of_frame: bool,
    ) -> DetectorObservationSet {
        let mut observations = DetectorObservationSet::new();
        for pose in detector_poses {
            let intrinsics = self.intrinsics_for(&pose.detector_id);
            let detector_from_world = pose.world_from_detector.inverse();
            let mut seen = Vec::new();
            for (&id, corners) in snapshot {
                let local = corners.map(|p| detector_from_world * p);
                match project_marker(intrinsics, &local, remove_markers_out_of_frame) {
                    Ok(corner_points) => seen.push(MarkerSnapshot {
                        label: id,
                        corner_points,
                    }),
                    Err(reason) => {
                        trace!("detector {} drops marker {id}: {reason:?}", pose.detector_id)
                    }
                }
            }
            debug!(
                "detector {} sees {}/{} markers",
                pose.detector_id,
                seen.len(),
                snapshot.len()
            );
            observations.insert(pose.detector_id.clone(), seen);
        }
        observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::detector_looking_at;
    use crate::scenes::two_markers;
    use board_accuracy_core::{relative_transform, snapshot_fidelity};

    fn intrinsics() -> DetectorIntrinsics {
        DetectorIntrinsics {
            fx: 1000.0,
            fy: 1000.0,
            cx: 960.0,
            cy: 540.0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn zero_motion_copies_the_board() {
        let board = two_markers(10.0).corners;
        let mut scene = RigidMotionScene::new(intrinsics(), SnapshotMotion::none(), Some(1));
        let snaps = scene.generate_virtual_snapshots(&board, 3);
        assert_eq!(snaps.len(), 3);
        assert!(snaps.iter().all(|s| *s == board));
        assert_eq!(snapshot_fidelity(&board, &snaps).expect("fidelity"), 0.0);
    }

    #[test]
    fn extreme_motion_bounds_do_not_panic() {
        let board = two_markers(10.0).corners;
        for max_translation in [1e308, f64::INFINITY, f64::NAN] {
            let motion = SnapshotMotion {
                max_rotation_deg: f64::NAN,
                max_translation,
            };
            let mut scene = RigidMotionScene::new(intrinsics(), motion, Some(3));
            let snaps = scene.generate_virtual_snapshots(&board, 1);
            assert_eq!(snaps.len(), 1);
            assert!(snaps[0]
                .values()
                .flat_map(|c| c.iter())
                .all(|p| p.coords.iter().all(|v| v.is_finite())));
        }
    }

    #[test]
    fn random_motion_is_rigid_and_bounded() {
        let board = two_markers(10.0).corners;
        let motion = SnapshotMotion {
            max_rotation_deg: 15.0,
            max_translation: 5.0,
        };
        let mut scene = RigidMotionScene::new(intrinsics(), motion, Some(7));
        let snaps = scene.generate_virtual_snapshots(&board, 10);

        let expected = relative_transform(&board[&0], &board[&1]).expect("frame");
        for snap in &snaps {
            assert_ne!(*snap, board);
            let got = relative_transform(&snap[&0], &snap[&1]).expect("frame");
            assert!((expected - got).norm() < 1e-9);

            let shift = board_centroid(snap) - board_centroid(&board);
            assert!(shift.iter().all(|d| d.abs() <= 5.0 + 1e-9));
        }
    }

    #[test]
    fn same_seed_reproduces_snapshots() {
        let board = two_markers(10.0).corners;
        let run = |seed| {
            RigidMotionScene::new(intrinsics(), SnapshotMotion::default(), Some(seed))
                .generate_virtual_snapshots(&board, 4)
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }

    #[test]
    fn generate_data_reports_every_detector() {
        let board = two_markers(10.0).corners;
        let scene = RigidMotionScene::new(intrinsics(), SnapshotMotion::none(), Some(0));
        let poses = vec![
            detector_looking_at("front", Point3::new(0.0, 0.0, 200.0), Point3::origin()),
            detector_looking_at("back", Point3::new(0.0, 0.0, -200.0), Point3::origin()),
        ];

        let culled = scene.generate_data(&board, &poses, true);
        assert_eq!(culled.len(), 2);
        assert_eq!(culled["front"].len(), 2);
        assert!(culled["back"].is_empty());
        for snap in &culled["front"] {
            assert_eq!(snap.corner_points.len(), 4);
        }

        let raw = scene.generate_data(&board, &poses, false);
        assert_eq!(raw["back"].len(), 2);
    }

    #[test]
    fn detector_overrides_change_projection() {
        let board = two_markers(10.0).corners;
        let mut narrow = intrinsics();
        narrow.cx = 100.0;
        let scene = RigidMotionScene::new(intrinsics(), SnapshotMotion::none(), Some(0))
            .with_detector_intrinsics("b", narrow);
        let eye = Point3::new(0.0, 0.0, 200.0);
        let poses = vec![
            detector_looking_at("a", eye, Point3::origin()),
            detector_looking_at("b", eye, Point3::origin()),
        ];
        let data = scene.generate_data(&board, &poses, false);
        let (a, b) = (&data["a"][0].corner_points[0], &data["b"][0].corner_points[0]);
        assert!((a.x_px - b.x_px - 860.0).abs() < 1e-9);
        assert_eq!(a.y_px, b.y_px);
    }
}
