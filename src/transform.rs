// transform.rs - 平面像素坐标 <-> 球面 3D 坐标 (Mercator / Gudermannian)

use glam::{DQuat, DVec3, EulerRot};
use serde::Deserialize;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

pub const RAD2DEG: f64 = 180.0 / PI;
pub const DEG2RAD: f64 = PI / 180.0;

/// Beyond this |y / R| the latitude is already ±90° in f64, and `exp` would
/// start heading toward overflow.
const MAX_MERCATOR_Y: f64 = 40.0;

/// Latitude limit used by the inverse mapping; `ln(tan(..))` diverges at the poles.
const MAX_INVERSE_LAT: f64 = FRAC_PI_2 - 1e-9;

/// Authored hotspot position in the flat (pixel) plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Cartesian point on (or near) the panorama sphere.
pub type SpherePoint3D = DVec3;

/// A single rotation value built from pitch/yaw/roll.
///
/// The three angles are folded into one quaternion (yaw about Y, then pitch
/// about X, then roll about Z, as one product) so that applying it never
/// depends on the order individual axis rotations would be applied in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundOrientation(DQuat);

impl CompoundOrientation {
    pub fn from_angles(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self(DQuat::from_euler(EulerRot::YXZ, yaw, pitch, roll))
    }

    pub fn rotate(&self, v: DVec3) -> DVec3 {
        self.0 * v
    }
}

pub fn radians_to_degrees(radians: f64) -> f64 {
    radians * RAD2DEG
}

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees * DEG2RAD
}

/// Place an authored 2D point on a sphere of radius `radius`.
///
/// Longitude is linear in `x`; latitude uses the inverse Mercator mapping
/// `2·atan(exp(y / R)) − π/2`. The reference point `(0, 0, R)` is rotated by
/// one [`CompoundOrientation`], so the result always has length `R`.
pub fn plane_to_sphere(p: PlanePoint, radius: f64) -> SpherePoint3D {
    debug_assert!(radius > 0.0, "sphere radius must be positive");

    let longitude = RAD2DEG * (p.x / radius);
    let mercator_y = (p.y / radius).clamp(-MAX_MERCATOR_Y, MAX_MERCATOR_Y);
    let latitude = RAD2DEG * (2.0 * mercator_y.exp().atan() - FRAC_PI_2);

    let phi = latitude * DEG2RAD;
    let theta = (270.0 - longitude) * DEG2RAD;

    let reference = DVec3::new(0.0, 0.0, radius);
    CompoundOrientation::from_angles(phi, theta, 0.0).rotate(reference)
}

/// Inverse of [`plane_to_sphere`]: recover the authored plane coordinate.
///
/// Only the direction of `point` matters. Longitude is wrapped into one
/// sphere turn, `x ∈ (-π·R, π·R]`. Points at the poles map to a finite `y`.
pub fn sphere_to_plane(point: SpherePoint3D, radius: f64) -> PlanePoint {
    debug_assert!(radius > 0.0, "sphere radius must be positive");

    // 正向: (R·cosφ·sinθ, −R·sinφ, R·cosφ·cosθ)
    let dir = point.normalize_or_zero();
    let phi = (-dir.y).clamp(-1.0, 1.0).asin();
    let theta = dir.x.atan2(dir.z);

    let mut longitude = 270.0 * DEG2RAD - theta;
    longitude = (longitude + PI).rem_euclid(TAU) - PI;
    if longitude == -PI {
        longitude = PI;
    }

    let phi = phi.clamp(-MAX_INVERSE_LAT, MAX_INVERSE_LAT);
    let y = radius * (FRAC_PI_4 + phi / 2.0).tan().ln();

    PlanePoint::new(longitude * radius, y)
}
