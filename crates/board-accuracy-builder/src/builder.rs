//! Homography-based board builder.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use board_accuracy_core::{
    BoardReconstructor, DetectorIntrinsics, DetectorObservationSet, DetectorPose, Marker,
    MarkerId, TargetBoard,
};
use log::{debug, info, warn};
use nalgebra::{Isometry3, Matrix3, Translation3, UnitQuaternion, Vector3};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::pose::{marker_pose_from_corners, project_to_rotation};

/// Chordal mean of rigid poses: rotation matrices are summed and projected
/// back onto SO(3); translations are averaged.
pub fn average_poses(poses: &[Isometry3<f64>]) -> Option<Isometry3<f64>> {
    if poses.is_empty() {
        return None;
    }
    if let [single] = poses {
        return Some(*single);
    }
    let n = poses.len() as f64;
    let (r_sum, t_sum) = poses.iter().fold(
        (Matrix3::zeros(), Vector3::zeros()),
        |(r, t), p| {
            (
                r + p.rotation.to_rotation_matrix().into_inner(),
                t + p.translation.vector,
            )
        },
    );
    let rotation = project_to_rotation(&(r_sum / n))?;
    Some(Isometry3::from_parts(
        Translation3::from(t_sum / n),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

/// Fuses multi-detector marker observations into a rigid board.
///
/// Every collected instant turns co-visible marker pairs into relative pose
/// samples, so the board may move freely between instants.
#[derive(Debug)]
pub struct BoardBuilder {
    target_id: String,
    marker_size: f64,
    intrinsics: HashMap<String, DetectorIntrinsics>,
    poses: HashMap<String, Isometry3<f64>>,
    pair_samples: BTreeMap<(MarkerId, MarkerId), Vec<Isometry3<f64>>>,
    observed: BTreeSet<MarkerId>,
    skipped: usize,
}

impl BoardBuilder {
    pub fn new(target_id: impl Into<String>, marker_size: f64) -> Self {
        Self {
            target_id: target_id.into(),
            marker_size,
            intrinsics: HashMap::new(),
            poses: HashMap::new(),
            pair_samples: BTreeMap::new(),
            observed: BTreeSet::new(),
            skipped: 0,
        }
    }

    /// Marker observations dropped so far (unknown detector or bad corners).
    #[inline]
    pub fn skipped_observations(&self) -> usize {
        self.skipped
    }

    /// Relative pose samples gathered for the pair `(i, j)`, `i < j`.
    pub fn pair_sample_count(&self, i: MarkerId, j: MarkerId) -> usize {
        self.pair_samples.get(&(i, j)).map_or(0, Vec::len)
    }

    /// World poses of the markers seen in one instant, averaged over detectors.
    fn instant_marker_poses(
        &mut self,
        observations: &DetectorObservationSet,
    ) -> BTreeMap<MarkerId, Isometry3<f64>> {
        let mut per_marker: BTreeMap<MarkerId, Vec<Isometry3<f64>>> = BTreeMap::new();
        for (detector_id, snapshots) in observations {
            let (Some(k), Some(world_from_detector)) =
                (self.intrinsics.get(detector_id), self.poses.get(detector_id))
            else {
                warn!(
                    "skipping {} observations of detector {detector_id}: intrinsics or pose not set",
                    snapshots.len()
                );
                self.skipped += snapshots.len();
                continue;
            };
            for snap in snapshots {
                match marker_pose_from_corners(k, self.marker_size, &snap.corner_points) {
                    Ok(detector_from_marker) => per_marker
                        .entry(snap.label)
                        .or_default()
                        .push(world_from_detector * detector_from_marker),
                    Err(err) => {
                        warn!("skipping marker {} in {detector_id}: {err}", snap.label);
                        self.skipped += 1;
                    }
                }
            }
        }
        per_marker
            .into_iter()
            .filter_map(|(id, poses)| average_poses(&poses).map(|p| (id, p)))
            .collect()
    }

    /// Board-frame pose of every marker reachable from `root` in the pair graph.
    fn chain_poses(&self, root: MarkerId) -> BTreeMap<MarkerId, Isometry3<f64>> {
        let mut edges: HashMap<MarkerId, Vec<(MarkerId, Isometry3<f64>)>> = HashMap::new();
        for (&(i, j), samples) in &self.pair_samples {
            let Some(i_from_j) = average_poses(samples) else {
                continue;
            };
            edges.entry(i).or_default().push((j, i_from_j));
            edges.entry(j).or_default().push((i, i_from_j.inverse()));
        }

        let mut placed = BTreeMap::from([(root, Isometry3::identity())]);
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            let current_pose = placed[&current];
            for (next, current_from_next) in edges.get(&current).into_iter().flatten() {
                if !placed.contains_key(next) {
                    placed.insert(*next, current_pose * current_from_next);
                    queue.push_back(*next);
                }
            }
        }
        placed
    }
}

impl BoardReconstructor for BoardBuilder {
    fn set_intrinsic_parameters(&mut self, detector_id: &str, intrinsics: DetectorIntrinsics) {
        self.intrinsics.insert(detector_id.to_string(), intrinsics);
    }

    fn set_detector_poses(&mut self, poses: &[DetectorPose]) {
        for pose in poses {
            self.poses
                .insert(pose.detector_id.clone(), pose.world_from_detector);
        }
    }

    fn collect_data(&mut self, observations: &DetectorObservationSet) {
        let world_poses = self.instant_marker_poses(observations);
        debug!("instant with {} resolved markers", world_poses.len());
        self.observed.extend(world_poses.keys().copied());

        let entries: Vec<_> = world_poses.into_iter().collect();
        for (a, (i, pose_i)) in entries.iter().enumerate() {
            for (j, pose_j) in &entries[a + 1..] {
                self.pair_samples
                    .entry((*i, *j))
                    .or_default()
                    .push(pose_i.inverse() * pose_j);
            }
        }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self), fields(markers = self.observed.len()))
    )]
    fn build_board(&mut self) -> Option<TargetBoard> {
        let root = *self.observed.first()?;
        let placed = self.chain_poses(root);

        let unreachable: Vec<MarkerId> = self
            .observed
            .iter()
            .filter(|id| !placed.contains_key(*id))
            .copied()
            .collect();
        if !unreachable.is_empty() {
            warn!("markers {unreachable:?} share no view with marker {root}; dropped");
        }

        let markers = placed
            .iter()
            .map(|(&id, pose)| Marker::from_pose(id, self.marker_size, pose))
            .collect();
        match TargetBoard::new(self.target_id.clone(), markers) {
            Ok(board) => {
                info!(
                    "built board '{}' with {} markers from {} pairs",
                    board.target_id,
                    board.len(),
                    self.pair_samples.len()
                );
                Some(board)
            }
            Err(err) => {
                warn!("board assembly failed: {err}");
                None
            }
        }
    }
}
