use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Plane-to-image homography: `p_img ~ H * p_plane`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize_points(pts: &[Point2<f64>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let n = pts.len() as f64;
    let (cx, cy) = pts
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (cx / n, cy / n);

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts.map(|p| {
        let v = t * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0], v[1])
    });
    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Estimate H such that `img ~ H * plane` from four correspondences.
///
/// The normalized 8x8 system is solved exactly; `None` for degenerate
/// configurations such as coincident points.
pub fn estimate_homography(
    plane: &[Point2<f64>; 4],
    img: &[Point2<f64>; 4],
) -> Option<Homography> {
    // Unknowns [h11 h12 h13 h21 h22 h23 h31 h32] with h33 = 1.
    let (src_n, t_src) = normalize_points(plane);
    let (dst_n, t_dst) = normalize_points(img);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h_den = denormalize_homography(hn, t_src, t_dst)?;
    Some(Homography::new(normalize_homography(h_den)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a - b).norm() < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ))
    }

    #[test]
    fn four_point_solution_is_exact() {
        let h = ground_truth();
        let plane = [
            Point2::new(-5.0, 5.0),
            Point2::new(5.0, 5.0),
            Point2::new(5.0, -5.0),
            Point2::new(-5.0, -5.0),
        ];
        let img = plane.map(|p| h.apply(p));

        let recovered = estimate_homography(&plane, &img).expect("recoverable");
        for p in [Point2::new(0.0, 0.0), Point2::new(2.0, -3.0), Point2::new(40.0, 12.0)] {
            assert_close(recovered.apply(p), h.apply(p), 1e-9);
        }
    }

    #[test]
    fn rotated_square_maps_through_the_plane() {
        // Pure in-plane rotation by 90 degrees plus a shift.
        let plane = [
            Point2::new(-1.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, -1.0),
            Point2::new(-1.0, -1.0),
        ];
        let img = plane.map(|p| Point2::new(-p.y + 10.0, p.x + 20.0));

        let h = estimate_homography(&plane, &img).expect("estimate");
        assert_close(h.apply(Point2::new(0.5, 0.0)), Point2::new(10.0, 20.5), 1e-9);
        assert!(h.h[(2, 0)].abs() < 1e-9 && h.h[(2, 1)].abs() < 1e-9);
    }

    #[test]
    fn bad_inputs_fail() {
        // All points coincide: the linear system is singular.
        let plane = [Point2::new(0.0, 0.0); 4];
        let img = [Point2::new(1.0, 1.0); 4];
        assert!(estimate_homography(&plane, &img).is_none());
    }
}
