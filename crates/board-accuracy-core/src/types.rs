//! Data model shared by the evaluation engine and its collaborators.

use nalgebra::{Isometry3, Matrix4, Point3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Integer marker identifier.
pub type MarkerId = u32;

/// The four ordered 3D corners of one planar marker.
pub type MarkerCorners = [Point3<f64>; 4];

/// Marker id -> 3D corners. Used for ground-truth definitions and 3D snapshots.
pub type CornerMap = BTreeMap<MarkerId, MarkerCorners>;

/// Detector id -> marker observations of a single instant.
pub type DetectorObservationSet = BTreeMap<String, Vec<MarkerSnapshot>>;

/// A single detected 2D image coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerPoint {
    pub x_px: f64,
    pub y_px: f64,
}

impl CornerPoint {
    #[inline]
    pub fn new(x_px: f64, y_px: f64) -> Self {
        Self { x_px, y_px }
    }
}

/// One detector's observation of one marker.
///
/// Corner order is meaningful: index `k` always refers to the same physical
/// marker corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    pub label: MarkerId,
    pub corner_points: Vec<CornerPoint>,
}

/// Marker corners in the marker's own frame.
///
/// Order is top-left, top-right, bottom-right, bottom-left as seen from the
/// front; the front face looks towards local +z.
pub fn marker_corners_local(marker_size: f64) -> MarkerCorners {
    let h = 0.5 * marker_size;
    [
        Point3::new(-h, h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(h, -h, 0.0),
        Point3::new(-h, -h, 0.0),
    ]
}

/// A marker's 3D corner geometry in some board-local or world frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub marker_id: MarkerId,
    pub marker_size: f64,
    pub points: MarkerCorners,
}

impl Marker {
    pub fn new(marker_id: MarkerId, marker_size: f64, points: MarkerCorners) -> Self {
        Self {
            marker_id,
            marker_size,
            points,
        }
    }

    /// Place the local corner model with the given marker-to-frame pose.
    pub fn from_pose(marker_id: MarkerId, marker_size: f64, pose: &Isometry3<f64>) -> Self {
        let points = marker_corners_local(marker_size).map(|p| pose * p);
        Self::new(marker_id, marker_size, points)
    }

    /// Mean of the four corners.
    pub fn center(&self) -> Point3<f64> {
        corners_centroid(&self.points)
    }

    /// Apply a homogeneous 4x4 transform to every corner.
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        let points = self.points.map(|p| transform.transform_point(&p));
        Self::new(self.marker_id, self.marker_size, points)
    }
}

pub(crate) fn corners_centroid(points: &MarkerCorners) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / 4.0)
}

/// Board construction errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("duplicate marker id {0}")]
    DuplicateMarker(MarkerId),
    #[error("reference marker {0} is not part of the board")]
    UnknownReferenceMarker(MarkerId),
}

/// A rigid assembly of markers.
///
/// Markers are kept sorted by id, so [`TargetBoard::get_points`] is ordered
/// consistently between any two boards with the same id set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetBoard {
    pub target_id: String,
    markers: Vec<Marker>,
}

impl TargetBoard {
    pub fn new(target_id: impl Into<String>, mut markers: Vec<Marker>) -> Result<Self, BoardError> {
        markers.sort_by_key(|m| m.marker_id);
        if let Some(dup) = markers.windows(2).find(|w| w[0].marker_id == w[1].marker_id) {
            return Err(BoardError::DuplicateMarker(dup[0].marker_id));
        }
        Ok(Self {
            target_id: target_id.into(),
            markers,
        })
    }

    #[inline]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, marker_id: MarkerId) -> Option<&Marker> {
        self.markers
            .binary_search_by_key(&marker_id, |m| m.marker_id)
            .ok()
            .map(|idx| &self.markers[idx])
    }

    /// Sorted marker ids.
    pub fn marker_ids(&self) -> Vec<MarkerId> {
        self.markers.iter().map(|m| m.marker_id).collect()
    }

    /// Same board with a homogeneous transform applied to every corner.
    pub fn transformed(&self, transform: &Matrix4<f64>) -> Self {
        Self {
            target_id: self.target_id.clone(),
            markers: self.markers.iter().map(|m| m.transformed(transform)).collect(),
        }
    }

    /// All marker corners concatenated in marker-id order.
    pub fn get_points(&self) -> Vec<Point3<f64>> {
        self.markers
            .iter()
            .flat_map(|m| m.points.iter().copied())
            .collect()
    }
}

/// Ground-truth board: marker corners in the canonical board frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardDefinition {
    pub marker_size: f64,
    pub corners: CornerMap,
}

impl BoardDefinition {
    /// Build a definition by placing the local corner model of every marker.
    pub fn from_marker_poses(
        marker_size: f64,
        poses: impl IntoIterator<Item = (MarkerId, Isometry3<f64>)>,
    ) -> Self {
        let corners = poses
            .into_iter()
            .map(|(id, pose)| (id, Marker::from_pose(id, marker_size, &pose).points))
            .collect();
        Self {
            marker_size,
            corners,
        }
    }

    #[inline]
    pub fn marker_ids(&self) -> BTreeSet<MarkerId> {
        self.corners.keys().copied().collect()
    }

    /// Re-express the definition around the corner centroid of `reference`.
    ///
    /// Axes are left untouched; only the origin moves.
    pub fn recentered_board(
        &self,
        target_id: &str,
        reference: MarkerId,
    ) -> Result<TargetBoard, BoardError> {
        let origin = self
            .corners
            .get(&reference)
            .map(corners_centroid)
            .ok_or(BoardError::UnknownReferenceMarker(reference))?;

        let markers = self
            .corners
            .iter()
            .map(|(&id, points)| {
                Marker::new(id, self.marker_size, points.map(|p| Point3::from(p - origin)))
            })
            .collect();
        TargetBoard::new(target_id, markers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    fn square(offset_x: f64) -> MarkerCorners {
        marker_corners_local(2.0).map(|p| p + Vector3::new(offset_x, 0.0, 0.0))
    }

    #[test]
    fn points_follow_marker_id_order() {
        let board = TargetBoard::new(
            "b",
            vec![Marker::new(7, 2.0, square(10.0)), Marker::new(3, 2.0, square(0.0))],
        )
        .expect("board");

        assert_eq!(board.marker_ids(), vec![3, 7]);
        let pts = board.get_points();
        assert_eq!(pts.len(), 8);
        assert_eq!(pts[0], square(0.0)[0]);
        assert_eq!(pts[4], square(10.0)[0]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = TargetBoard::new(
            "b",
            vec![Marker::new(1, 2.0, square(0.0)), Marker::new(1, 2.0, square(5.0))],
        )
        .unwrap_err();
        assert_eq!(err, BoardError::DuplicateMarker(1));
    }

    #[test]
    fn recentering_moves_reference_center_to_origin() {
        let pose = |x: f64| {
            Isometry3::from_parts(
                Translation3::new(x, 4.0, -2.0),
                UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            )
        };
        let def = BoardDefinition::from_marker_poses(10.0, [(0, pose(1.0)), (1, pose(30.0))]);
        let board = def.recentered_board("reference", 0).expect("board");

        let c0 = board.marker(0).expect("marker 0").center();
        assert!(c0.coords.norm() < 1e-12);
        let c1 = board.marker(1).expect("marker 1").center();
        assert!((c1 - Point3::new(29.0, 0.0, 0.0)).norm() < 1e-12);

        assert_eq!(
            def.recentered_board("reference", 9).unwrap_err(),
            BoardError::UnknownReferenceMarker(9)
        );
    }
}
