//! Rigid registration of corresponding point sets and board alignment.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::Serialize;

use crate::types::{MarkerId, TargetBoard};

/// Correspondence registration errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("point sets must have the same length (source={source_len}, target={target_len})")]
    LengthMismatch {
        source_len: usize,
        target_len: usize,
    },
    #[error("need at least 3 correspondences, got {0}")]
    TooFewPoints(usize),
    #[error("SVD of the cross-covariance failed")]
    SvdFailed,
}

/// Board alignment errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("boards have different marker ids (predicted={predicted:?}, reference={reference:?})")]
    MarkerSetMismatch {
        predicted: Vec<MarkerId>,
        reference: Vec<MarkerId>,
    },
    #[error("cannot align boards without markers")]
    EmptyBoard,
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Best-fit rigid transform (Kabsch) mapping `source` onto `target`.
///
/// Points are paired by index. The reflection case is corrected so the
/// rotation always has determinant +1.
pub fn register_corresponding_points(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<Matrix4<f64>, RegistrationError> {
    if source.len() != target.len() {
        return Err(RegistrationError::LengthMismatch {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    if source.len() < 3 {
        return Err(RegistrationError::TooFewPoints(source.len()));
    }

    let n = source.len() as f64;
    let c_src = source.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
    let c_dst = target.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;

    let mut h = Matrix3::<f64>::zeros();
    for (ps, pd) in source.iter().zip(target) {
        h += (pd.coords - c_dst) * (ps.coords - c_src).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(RegistrationError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(RegistrationError::SvdFailed)?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fix = u;
        u_fix.column_mut(2).neg_mut();
        r = u_fix * v_t;
    }
    let t = c_dst - r * c_src;

    let mut transform = Matrix4::identity();
    transform.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    transform.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
    Ok(transform)
}

/// Reference board moved into the predicted board's frame.
#[derive(Clone, Debug, Serialize)]
pub struct BoardAlignment {
    /// Transform applied to the reference corners.
    pub transform: Matrix4<f64>,
    /// Reference board carrying the transformed corners.
    pub aligned_reference: TargetBoard,
}

/// Rigidly align `reference` onto `predicted`.
///
/// Only the reference is moved, so the predicted board keeps its own frame
/// and a later RMS comparison measures its internal geometry rather than a
/// global offset.
pub fn align_boards(
    predicted: &TargetBoard,
    reference: &TargetBoard,
) -> Result<BoardAlignment, AlignError> {
    let (predicted_ids, reference_ids) = (predicted.marker_ids(), reference.marker_ids());
    if predicted_ids != reference_ids {
        return Err(AlignError::MarkerSetMismatch {
            predicted: predicted_ids,
            reference: reference_ids,
        });
    }
    if reference.is_empty() {
        return Err(AlignError::EmptyBoard);
    }

    let transform =
        register_corresponding_points(&reference.get_points(), &predicted.get_points())?;
    let aligned_reference = reference.transformed(&transform);
    Ok(BoardAlignment {
        transform,
        aligned_reference,
    })
}
