//! Local rigid frames of planar markers and relative transforms between them.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::types::corners_centroid;

/// Homogeneous rigid transform: pose of one frame expressed in another.
pub type RelativeTransform = Matrix4<f64>;

const MIN_AXIS_NORM: f64 = 1e-12;

/// Frame construction errors.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("degenerate marker corners: {axis} has length {norm:e}")]
    DegenerateMarker { axis: &'static str, norm: f64 },
}

/// Build the local frame of a marker from its four ordered corners.
///
/// Origin is the corner centroid, x runs along `p1 - p0`, z is the normal of
/// `(p1 - p0) x (p3 - p0)` and y completes a right-handed basis. The result
/// depends only on corner order, so every marker being compared must use the
/// same winding.
pub fn marker_frame(points: &[Point3<f64>; 4]) -> Result<RelativeTransform, GeometryError> {
    let center = corners_centroid(points);
    let v1 = points[1] - points[0];
    let v2 = points[3] - points[0];

    let x_axis = normalized(v1, "edge p1 - p0")?;
    let z_axis = normalized(x_axis.cross(&v2), "normal")?;
    let y_axis = z_axis.cross(&x_axis);

    let rotation = Matrix3::from_columns(&[x_axis, y_axis, z_axis]);
    let mut transform = Matrix4::identity();
    transform.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    transform
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&center.coords);
    Ok(transform)
}

fn normalized(v: Vector3<f64>, axis: &'static str) -> Result<Vector3<f64>, GeometryError> {
    let norm = v.norm();
    if !norm.is_finite() || norm < MIN_AXIS_NORM {
        return Err(GeometryError::DegenerateMarker { axis, norm });
    }
    Ok(v / norm)
}

/// Closed-form inverse of a rigid homogeneous transform.
pub fn invert_rigid(transform: &RelativeTransform) -> RelativeTransform {
    let r_t = transform.fixed_view::<3, 3>(0, 0).transpose();
    let t = transform.fixed_view::<3, 1>(0, 3);
    let t_inv = -(r_t * t);

    let mut inv = Matrix4::identity();
    inv.fixed_view_mut::<3, 3>(0, 0).copy_from(&r_t);
    inv.fixed_view_mut::<3, 1>(0, 3).copy_from(&t_inv);
    inv
}

/// Pose of marker `b`'s frame expressed in marker `a`'s frame:
/// `inverse(frame(a)) * frame(b)`.
pub fn relative_transform(
    a: &[Point3<f64>; 4],
    b: &[Point3<f64>; 4],
) -> Result<RelativeTransform, GeometryError> {
    let frame_a = marker_frame(a)?;
    let frame_b = marker_frame(b)?;
    Ok(invert_rigid(&frame_a) * frame_b)
}
