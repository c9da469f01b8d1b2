//! Planar marker pose from one detector observation.

use board_accuracy_core::{marker_corners_local, CornerPoint, DetectorIntrinsics};
use nalgebra::{Isometry3, Matrix3, Point2, Rotation3, Translation3, UnitQuaternion};

use crate::homography::estimate_homography;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("expected 4 marker corners, got {0}")]
    WrongCornerCount(usize),
    #[error("marker corners do not define a homography")]
    DegenerateHomography,
    #[error("camera matrix is singular")]
    SingularIntrinsics,
    #[error("homography columns have zero scale")]
    ZeroScale,
    #[error("SVD of the rotation estimate failed")]
    SvdFailed,
}

/// Closest rotation to `m` in the Frobenius sense.
pub(crate) fn project_to_rotation(m: &Matrix3<f64>) -> Option<Rotation3<f64>> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }
    Some(Rotation3::from_matrix_unchecked(r))
}

/// Pose of a square marker in detector coordinates (`detector_from_marker`).
///
/// The corners must follow the local corner model order. `K^-1 H` is split
/// into `λ [r1 r2 t]`; the sign of `λ` keeps the marker in front of the
/// detector and the rotation is re-orthonormalized.
pub fn marker_pose_from_corners(
    intrinsics: &DetectorIntrinsics,
    marker_size: f64,
    corners: &[CornerPoint],
) -> Result<Isometry3<f64>, PoseError> {
    let [c0, c1, c2, c3] = corners else {
        return Err(PoseError::WrongCornerCount(corners.len()));
    };
    let plane = marker_corners_local(marker_size).map(|p| Point2::new(p.x, p.y));
    let img = [c0, c1, c2, c3].map(|c| Point2::new(c.x_px, c.y_px));

    let h = estimate_homography(&plane, &img).ok_or(PoseError::DegenerateHomography)?;
    let k_inv = intrinsics
        .camera_matrix()
        .try_inverse()
        .ok_or(PoseError::SingularIntrinsics)?;
    let m = k_inv * h.h;

    let (m1, m2, m3) = (m.column(0), m.column(1), m.column(2));
    let scale = 0.5 * (m1.norm() + m2.norm());
    if scale < 1e-12 {
        return Err(PoseError::ZeroScale);
    }
    let mut lambda = 1.0 / scale;
    if m3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = m1 * lambda;
    let r2 = m2 * lambda;
    let r3 = r1.cross(&r2);
    let t = m3 * lambda;

    let approx = Matrix3::from_columns(&[r1, r2, r3]);
    let rotation = project_to_rotation(&approx).ok_or(PoseError::SvdFailed)?;
    Ok(Isometry3::from_parts(
        Translation3::from(t),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}
