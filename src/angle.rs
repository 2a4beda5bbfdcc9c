// angle.rs - 两个 3D 方向之间的夹角 (度)

use glam::DVec3;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AngleError {
    #[error("cannot measure an angle against a zero-length vector {0:?}")]
    ZeroVector(DVec3),
    #[error("vector {0:?} has a NaN or infinite component")]
    NonFinite(DVec3),
}

fn normalized(v: DVec3) -> Result<DVec3, AngleError> {
    if !v.is_finite() {
        return Err(AngleError::NonFinite(v));
    }
    if v == DVec3::ZERO {
        return Err(AngleError::ZeroVector(v));
    }
    // 先按最大分量缩放，|v| 本身可能上溢或下溢
    let scaled = v / v.abs().max_element();
    Ok(scaled / scaled.length())
}

/// Geometric angle between two vectors, in degrees within `[0, 180]`.
pub fn angle_between(v1: DVec3, v2: DVec3) -> Result<f64, AngleError> {
    let a = normalized(v1)?;
    let b = normalized(v2)?;

    // 浮点误差可能让点积略微超出 [-1, 1]，acos 会返回 NaN
    let dot = a.dot(b).clamp(-1.0, 1.0);
    Ok(dot.acos().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_and_opposite_directions() {
        let v = DVec3::new(3.0, -4.0, 12.0);
        assert!(angle_between(v, v).unwrap() < 1e-6);
        assert!((angle_between(v, -v).unwrap() - 180.0).abs() < 1e-6);
        assert!(angle_between(v, v * 1000.0).unwrap() < 1e-6);
    }

    #[test]
    fn orthogonal_axes_are_ninety() {
        for (a, b) in [(DVec3::X, DVec3::Y), (DVec3::Y, DVec3::Z), (DVec3::Z, -DVec3::X)] {
            assert!((angle_between(a, b).unwrap() - 90.0).abs() < 1e-12);
        }
    }

    #[test]
    fn nearly_parallel_does_not_nan() {
        let a = DVec3::new(0.1, 0.2, 0.3);
        let b = DVec3::new(0.1, 0.2, 0.3 + 1e-17);
        let angle = angle_between(a, b).unwrap();
        assert!(angle.is_finite());
        assert!(angle >= 0.0);
    }

    #[test]
    fn huge_and_tiny_components_still_measure() {
        let expected = (1.0 / 3f64.sqrt()).acos().to_degrees();
        let huge = DVec3::splat(1e200);
        assert!((angle_between(huge, DVec3::X).unwrap() - expected).abs() < 1e-9);
        assert!(angle_between(huge, huge).unwrap() < 1e-6);

        let tiny = DVec3::new(1e-200, 0.0, -1e-200);
        assert!((angle_between(tiny, DVec3::X).unwrap() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_is_rejected() {
        let v = DVec3::new(f64::NAN, 1.0, 0.0);
        assert!(matches!(angle_between(v, DVec3::X), Err(AngleError::NonFinite(_))));
        assert!(matches!(
            angle_between(DVec3::Y, DVec3::new(0.0, f64::INFINITY, 0.0)),
            Err(AngleError::NonFinite(_))
        ));
    }

    #[test]
    fn zero_vector_is_rejected() {
        assert_eq!(
            angle_between(DVec3::ZERO, DVec3::X),
            Err(AngleError::ZeroVector(DVec3::ZERO))
        );
        assert!(angle_between(DVec3::Y, DVec3::ZERO).is_err());
    }
}
