//! Pinhole projection and detector placement helpers.

use board_accuracy_core::{CornerPoint, DetectorIntrinsics, DetectorPose, MarkerCorners};
use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

/// Points closer than this to the detector plane are treated as behind it.
const MIN_DEPTH: f64 = 1e-9;

/// Project a point given in detector coordinates. `None` behind the detector.
#[inline]
pub fn project(intrinsics: &DetectorIntrinsics, p_detector: &Point3<f64>) -> Option<CornerPoint> {
    if p_detector.z <= MIN_DEPTH {
        return None;
    }
    let x = intrinsics.fx * p_detector.x / p_detector.z + intrinsics.cx;
    let y = intrinsics.fy * p_detector.y / p_detector.z + intrinsics.cy;
    Some(CornerPoint::new(x, y))
}

/// Why a marker was not reported by a detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    BehindDetector,
    OutOfFrame,
    FacingAway,
}

/// Project the four corners of a marker given in detector coordinates.
///
/// Corners behind the detector cannot be projected, so such markers are
/// always dropped. Out-of-frame and back-facing markers are only dropped
/// when `cull` is set.
pub fn project_marker(
    intrinsics: &DetectorIntrinsics,
    corners_detector: &MarkerCorners,
    cull: bool,
) -> Result<Vec<CornerPoint>, Visibility> {
    let projected = corners_detector
        .iter()
        .map(|p| project(intrinsics, p))
        .collect::<Option<Vec<_>>>()
        .ok_or(Visibility::BehindDetector)?;

    if cull {
        if !projected.iter().all(|c| intrinsics.contains(c.x_px, c.y_px)) {
            return Err(Visibility::OutOfFrame);
        }
        if !faces_detector(corners_detector) {
            return Err(Visibility::FacingAway);
        }
    }
    Ok(projected)
}

/// Front face normal is `(p3 - p0) x (p1 - p0)`; the detector sits at the origin.
fn faces_detector(corners: &MarkerCorners) -> bool {
    let [p0, p1, _, p3] = corners;
    let front = (p3 - p0).cross(&(p1 - p0));
    let center = corners.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / 4.0;
    front.dot(&(-center)) > 0.0
}

/// Detector at `eye` whose optical axis (+z) points at `target`.
pub fn detector_looking_at(
    detector_id: impl Into<String>,
    eye: Point3<f64>,
    target: Point3<f64>,
) -> DetectorPose {
    let dir = target - eye;
    // Image y points down; pick a reference "down" that is not parallel to the axis.
    let mut down = -Vector3::y();
    if dir.cross(&down).norm() < 1e-9 * dir.norm().max(1.0) {
        down = Vector3::x();
    }
    let rotation = UnitQuaternion::face_towards(&dir, &down);
    DetectorPose {
        detector_id: detector_id.into(),
        world_from_detector: Isometry3::from_parts(eye.coords.into(), rotation),
    }
}
