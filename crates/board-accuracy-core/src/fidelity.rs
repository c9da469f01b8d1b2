//! Snapshot fidelity: how faithfully simulated snapshots keep the ground-truth
//! marker-to-marker geometry.

use std::collections::BTreeMap;

use crate::frame::{relative_transform, GeometryError, RelativeTransform};
use crate::types::{CornerMap, MarkerId};

/// Fidelity validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FidelityError {
    /// No snapshot contained two markers; the mean is undefined.
    #[error("no comparable marker pairs in any snapshot")]
    NoComparablePairs,
    #[error("snapshot pair ({0}, {1}) is not part of the ground truth")]
    UnknownPair(MarkerId, MarkerId),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Relative transforms for every unordered pair `(i < j)` of a corner map.
fn pairwise_transforms(
    corners: &CornerMap,
) -> impl Iterator<Item = Result<((MarkerId, MarkerId), RelativeTransform), GeometryError>> + '_ {
    corners.iter().enumerate().flat_map(move |(idx, (&i, a))| {
        corners
            .iter()
            .skip(idx + 1)
            .map(move |(&j, b)| relative_transform(a, b).map(|t| ((i, j), t)))
    })
}

/// Mean Frobenius-norm discrepancy between snapshot and ground-truth relative
/// transforms, over every marker pair visible in every snapshot.
pub fn snapshot_fidelity(
    ground_truth: &CornerMap,
    snapshots: &[CornerMap],
) -> Result<f64, FidelityError> {
    let theoretical = pairwise_transforms(ground_truth)
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let mut total = 0.0;
    let mut comparisons = 0usize;
    for snapshot in snapshots {
        for entry in pairwise_transforms(snapshot) {
            let ((i, j), empirical) = entry?;
            let expected = theoretical
                .get(&(i, j))
                .ok_or(FidelityError::UnknownPair(i, j))?;
            total += (expected - empirical).norm();
            comparisons += 1;
        }
    }

    if comparisons == 0 {
        return Err(FidelityError::NoComparablePairs);
    }
    Ok(total / comparisons as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::marker_corners_local;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

    fn board() -> CornerMap {
        let place = |x: f64, yaw: f64| {
            let pose = Isometry3::from_parts(
                Translation3::new(x, 0.0, 0.0),
                UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
            );
            marker_corners_local(10.0).map(|p| pose * p)
        };
        CornerMap::from([(0, place(0.0, 0.0)), (1, place(20.0, 0.3)), (2, place(40.0, -0.2))])
    }

    fn moved(corners: &CornerMap, pose: &Isometry3<f64>) -> CornerMap {
        corners
            .iter()
            .map(|(&id, pts)| (id, pts.map(|p| pose * p)))
            .collect()
    }

    #[test]
    fn exact_copies_have_zero_discrepancy() {
        let gt = board();
        let value = snapshot_fidelity(&gt, &[gt.clone(), gt.clone()]).expect("fidelity");
        assert_eq!(value, 0.0);
    }

    #[test]
    fn rigid_motion_keeps_relative_geometry() {
        let gt = board();
        let pose = Isometry3::from_parts(
            Translation3::new(5.0, -3.0, 100.0),
            UnitQuaternion::from_euler_angles(0.3, -0.5, 1.2),
        );
        let value = snapshot_fidelity(&gt, &[moved(&gt, &pose)]).expect("fidelity");
        assert!(value < 1e-12, "value = {value}");
    }

    #[test]
    fn deformation_is_detected() {
        let gt = board();
        let mut warped = gt.clone();
        if let Some(pts) = warped.get_mut(&2) {
            for p in pts.iter_mut() {
                *p += Vector3::new(0.0, 1.0, 0.0);
            }
        }
        // pairs (0,2) and (1,2) differ by a 1.0 translation, (0,1) is exact
        let value = snapshot_fidelity(&gt, &[warped]).expect("fidelity");
        assert!((value - 2.0 / 3.0).abs() < 1e-9, "value = {value}");
    }

    #[test]
    fn partial_snapshots_only_compare_visible_pairs() {
        let gt = board();
        let mut partial = gt.clone();
        partial.remove(&1);
        assert_eq!(snapshot_fidelity(&gt, &[partial]).expect("fidelity"), 0.0);
    }

    #[test]
    fn single_marker_snapshots_are_a_degenerate_scenario() {
        let gt = board();
        let lone: CornerMap = gt.iter().take(1).map(|(&k, v)| (k, *v)).collect();
        assert_eq!(
            snapshot_fidelity(&gt, &[lone]),
            Err(FidelityError::NoComparablePairs)
        );
        assert_eq!(snapshot_fidelity(&gt, &[]), Err(FidelityError::NoComparablePairs));
    }

    #[test]
    fn unknown_markers_are_reported() {
        let gt = board();
        let mut extra = gt.clone();
        let first = gt[&0];
        extra.insert(9, first.map(|p| p + Vector3::new(0.0, 50.0, 0.0)));
        assert_eq!(
            snapshot_fidelity(&gt, &[extra]),
            Err(FidelityError::UnknownPair(0, 9))
        );
    }
}
