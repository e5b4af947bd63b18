//! Two-view linear triangulation and redundant-estimate fusion.
//!
//! Uses a DLT formulation on the camera projection matrices and image
//! points. Output points are expressed in the pair's reference-camera frame.

use nalgebra::{Matrix3, Matrix3x4, Matrix4, Point2, Point3, Vector3};

use crate::camera::CameraIntrinsics;
use crate::pair::StereoCalibration;

/// Homogeneous scales below this are treated as degenerate geometry.
pub const W_EPSILON: f64 = 1e-12;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TriangulationError {
    #[error("observation ({0}, {1}) is not a finite 2D coordinate")]
    NonFiniteInput(f64, f64),
    #[error("degenerate geometry: homogeneous scale {0:e} is numerically zero")]
    DegenerateGeometry(f64),
    #[error("fusion needs at least one pair estimate")]
    NoEstimates,
}

/// Full 3x4 projection matrix of one camera: `K * [R | T]`.
///
/// Each camera contributes its own intrinsics; the extrinsics express its
/// frame relative to the pair's reference camera.
pub fn projection_matrix(
    intrinsics: &CameraIntrinsics,
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
) -> Matrix3x4<f64> {
    let mut rt = Matrix3x4::<f64>::zeros();
    rt.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    rt.column_mut(3).copy_from(translation);
    intrinsics.matrix * rt
}

fn check_finite(p: &Point2<f64>) -> Result<(), TriangulationError> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(())
    } else {
        Err(TriangulationError::NonFiniteInput(p.x, p.y))
    }
}

/// Recover the 3D point observed at `point_ref` in the pair's reference
/// camera and at `point_other` in the other camera.
///
/// The reference camera carries identity extrinsics; the other camera
/// carries the pair's `R, T`. The two projection equations are stacked into
/// `A x = 0` (rows `u*p3 - p1`, `v*p3 - p2` per view) and solved via SVD;
/// the homogeneous solution is dehomogenized by its fourth component, which
/// must not be numerically zero.
pub fn triangulate_pair(
    point_ref: &Point2<f64>,
    point_other: &Point2<f64>,
    calib: &StereoCalibration,
) -> Result<Point3<f64>, TriangulationError> {
    check_finite(point_ref)?;
    check_finite(point_other)?;

    let p_ref = projection_matrix(&calib.reference, &Matrix3::identity(), &Vector3::zeros());
    let p_other = projection_matrix(&calib.other, &calib.rotation, &calib.translation);

    let mut a = Matrix4::<f64>::zeros();
    for (i, (p, cam)) in [(point_ref, &p_ref), (point_other, &p_other)]
        .into_iter()
        .enumerate()
    {
        let r0 = 2 * i;
        let row0 = cam.row(0);
        let row1 = cam.row(1);
        let row2 = cam.row(2);
        a.row_mut(r0).copy_from(&(p.x * row2 - row0));
        a.row_mut(r0 + 1).copy_from(&(p.y * row2 - row1));
    }

    let svd = a.svd(true, true);
    let v_t = svd
        .v_t
        .ok_or(TriangulationError::DegenerateGeometry(0.0))?;
    let x_h = v_t.row(v_t.nrows() - 1);

    let w = x_h[3];
    if w.abs() <= W_EPSILON {
        return Err(TriangulationError::DegenerateGeometry(w));
    }

    Ok(Point3::new(x_h[0] / w, x_h[1] / w, x_h[2] / w))
}

/// Component-wise mean of several pair estimates of the same physical point.
///
/// An empty slice is an error rather than a zero vector: a zero vector is
/// indistinguishable from a legitimate origin point, and the pipeline gates
/// fusion on having collected at least one estimate.
pub fn fuse(estimates: &[Point3<f64>]) -> Result<Point3<f64>, TriangulationError> {
    if estimates.is_empty() {
        return Err(TriangulationError::NoEstimates);
    }
    let n = estimates.len() as f64;
    let mut sum = Vector3::<f64>::zeros();
    for p in estimates {
        sum += p.coords;
    }
    Ok(Point3::from(sum / n))
}
