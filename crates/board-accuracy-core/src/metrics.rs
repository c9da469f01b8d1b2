//! Point-wise RMS error between corresponding point sets.

use crate::types::{MarkerId, TargetBoard};

/// Shape errors for metric computation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("point lists must have the same length (left={left}, right={right})")]
    LengthMismatch { left: usize, right: usize },
    #[error("point {index} has mismatched dimensions (left={left}, right={right})")]
    DimensionMismatch {
        index: usize,
        left: usize,
        right: usize,
    },
    #[error("point lists are empty")]
    EmptyInput,
    #[error("boards have different marker ids (left={left:?}, right={right:?})")]
    MarkerSetMismatch {
        left: Vec<MarkerId>,
        right: Vec<MarkerId>,
    },
}

/// Root-mean-square error between two equally ordered point lists.
///
/// For each pair the squared coordinate differences are averaged over the
/// point's dimensions; these per-point values are averaged over all points
/// and the square root is returned. Lists are never truncated or padded.
pub fn rms_error<A, B>(left: &[A], right: &[B]) -> Result<f64, MetricError>
where
    A: AsRef<[f64]>,
    B: AsRef<[f64]>,
{
    if left.len() != right.len() {
        return Err(MetricError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    if left.is_empty() {
        return Err(MetricError::EmptyInput);
    }

    let mut sum = 0.0;
    for (index, (a, b)) in left.iter().zip(right).enumerate() {
        let (a, b) = (a.as_ref(), b.as_ref());
        if a.len() != b.len() {
            return Err(MetricError::DimensionMismatch {
                index,
                left: a.len(),
                right: b.len(),
            });
        }
        if a.is_empty() {
            return Err(MetricError::EmptyInput);
        }
        let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
        sum += sq / a.len() as f64;
    }

    Ok((sum / left.len() as f64).sqrt())
}

/// RMS error between the corners of two boards with identical marker ids.
pub fn board_rms_error(left: &TargetBoard, right: &TargetBoard) -> Result<f64, MetricError> {
    let (left_ids, right_ids) = (left.marker_ids(), right.marker_ids());
    if left_ids != right_ids {
        return Err(MetricError::MarkerSetMismatch {
            left: left_ids,
            right: right_ids,
        });
    }

    let a: Vec<[f64; 3]> = left.get_points().iter().map(|p| p.coords.into()).collect();
    let b: Vec<[f64; 3]> = right.get_points().iter().map(|p| p.coords.into()).collect();
    rms_error(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{marker_corners_local, Marker};
    use approx::assert_relative_eq;

    fn cloud() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 2.0, 3.0],
            [-4.0, 0.5, 2.0],
            [7.0, -1.0, 0.25],
        ]
    }

    #[test]
    fn identical_lists_have_zero_error() {
        let x = cloud();
        assert_eq!(rms_error(&x, &x).expect("rms"), 0.0);
    }

    #[test]
    fn error_is_symmetric_and_matches_hand_computation() {
        let a = vec![[0.0, 0.0], [1.0, 1.0]];
        let b = vec![[3.0, 0.0], [1.0, 5.0]];
        // point 0: (9 + 0) / 2 = 4.5, point 1: (0 + 16) / 2 = 8, mean 6.25
        assert_relative_eq!(rms_error(&a, &b).expect("rms"), 2.5, epsilon = 1e-15);
        assert_eq!(rms_error(&a, &b), rms_error(&b, &a));
    }

    #[test]
    fn length_mismatch_fails_instead_of_truncating() {
        let a = cloud();
        let b = &a[..3];
        assert_eq!(
            rms_error(b, &a),
            Err(MetricError::LengthMismatch { left: 3, right: 4 })
        );
    }

    #[test]
    fn dimension_mismatch_fails() {
        let a: Vec<Vec<f64>> = vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]];
        let b: Vec<Vec<f64>> = vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0]];
        assert_eq!(
            rms_error(&a, &b),
            Err(MetricError::DimensionMismatch {
                index: 1,
                left: 3,
                right: 2
            })
        );
    }

    #[test]
    fn empty_input_is_not_a_zero_error() {
        let empty: Vec<[f64; 3]> = Vec::new();
        assert_eq!(rms_error(&empty, &empty), Err(MetricError::EmptyInput));
    }

    #[test]
    fn boards_with_different_ids_fail() {
        let m = |id| Marker::new(id, 1.0, marker_corners_local(1.0));
        let a = TargetBoard::new("a", vec![m(0), m(1)]).expect("a");
        let b = TargetBoard::new("b", vec![m(0), m(2)]).expect("b");
        assert!(matches!(
            board_rms_error(&a, &b),
            Err(MetricError::MarkerSetMismatch { .. })
        ));
        assert_eq!(board_rms_error(&a, &a).expect("rms"), 0.0);
    }
}
