// camera.rs - 球心处的全景相机：yaw / pitch / fov、拖拽惯性、对准热点

use crate::projection::{ViewProjectionContext, Viewport};
use glam::{DMat4, DVec3};

pub const DEFAULT_FOV_DEG: f64 = 57.3;
pub const MIN_FOV_DEG: f64 = 5.0;
pub const MAX_FOV_DEG: f64 = 120.0;
const PITCH_LIMIT_DEG: f64 = 89.9;
const NEAR_PLANE: f64 = 1.0;
/// Residual spin below this (degrees per frame) is dropped.
const MIN_SPIN_DEG: f64 = 1e-3;
const FOCUS_EASE: f64 = 0.15;
const FOCUS_DONE_DEG: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct PanoramaCamera {
    /// 度；0 时朝向 -X（平面坐标原点所在方向）
    pub yaw: f64,
    pub pitch: f64,
    pub fov: f64,
    pub sensitivity_scale: f64,
    /// 0 = 松手即停，1 = 永不减速
    pub inertia: f64,
    spin: (f64, f64),
    focus: Option<DVec3>,
}

impl Default for PanoramaCamera {
    fn default() -> Self {
        Self::new(DEFAULT_FOV_DEG, 1.0, 0.7)
    }
}

impl PanoramaCamera {
    pub fn new(fov: f64, sensitivity_scale: f64, inertia: f64) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            fov: fov.clamp(MIN_FOV_DEG, MAX_FOV_DEG),
            sensitivity_scale,
            inertia: inertia.clamp(0.0, 1.0),
            spin: (0.0, 0.0),
            focus: None,
        }
    }

    pub fn reset(&mut self, fov: f64) {
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.fov = fov.clamp(MIN_FOV_DEG, MAX_FOV_DEG);
        self.spin = (0.0, 0.0);
        self.focus = None;
    }

    pub fn forward(&self) -> DVec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        DVec3::new(-pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin())
    }

    pub fn view_matrix(&self) -> DMat4 {
        DMat4::look_to_rh(DVec3::ZERO, self.forward(), DVec3::Y)
    }

    /// `far` must lie beyond the panorama sphere so hotspots are not clipped.
    pub fn projection_matrix(&self, aspect: f64, far: f64) -> DMat4 {
        DMat4::perspective_rh(self.fov.to_radians(), aspect, NEAR_PLANE, far)
    }

    pub fn context(&self, width: f64, height: f64, far: f64) -> ViewProjectionContext {
        let aspect = if height > 0.0 { width / height } else { 1.0 };
        ViewProjectionContext::new(
            self.projection_matrix(aspect, far) * self.view_matrix(),
            Viewport::full(width, height),
        )
    }

    /// Grab-style drag: the panorama follows the pointer.
    pub fn drag(&mut self, dx: f64, dy: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let v_f = self.fov.to_radians();
        let h_f = 2.0 * ((v_f / 2.0).tan() * (width / height)).atan();

        let d_yaw = dx * (h_f / width).to_degrees() * self.sensitivity_scale;
        let d_pitch = dy * (v_f / height).to_degrees() * self.sensitivity_scale;

        self.focus = None;
        self.spin = (d_yaw, d_pitch);
        self.rotate(d_yaw, d_pitch);
    }

    pub fn release(&mut self) {
        if self.inertia == 0.0 {
            self.spin = (0.0, 0.0);
        }
    }

    pub fn zoom(&mut self, scroll: f64) {
        self.fov = (self.fov - scroll * 2.5).clamp(MIN_FOV_DEG, MAX_FOV_DEG);
    }

    /// Turn smoothly until `direction` is centred on screen.
    pub fn focus_on(&mut self, direction: DVec3) {
        if direction.length_squared() > 0.0 {
            self.spin = (0.0, 0.0);
            self.focus = Some(direction.normalize());
        }
    }

    pub fn is_focusing(&self) -> bool {
        self.focus.is_some()
    }

    /// Advance one frame of inertial spin or focus animation.
    pub fn update(&mut self, dragging: bool) {
        if let Some(target) = self.focus {
            // 目标俯仰角也受相机上限约束，否则极点附近永远对不准
            let pitch = target
                .y
                .clamp(-1.0, 1.0)
                .asin()
                .to_degrees()
                .clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
            let yaw = target.z.atan2(-target.x).to_degrees();
            // 走最短的一侧
            let d_yaw = (yaw - self.yaw + 180.0).rem_euclid(360.0) - 180.0;
            let d_pitch = pitch - self.pitch;

            if d_yaw.abs() < FOCUS_DONE_DEG && d_pitch.abs() < FOCUS_DONE_DEG {
                self.rotate(d_yaw, d_pitch);
                self.focus = None;
            } else {
                self.rotate(d_yaw * FOCUS_EASE, d_pitch * FOCUS_EASE);
            }
            return;
        }

        if dragging {
            return;
        }
        let (d_yaw, d_pitch) = (self.spin.0 * self.inertia, self.spin.1 * self.inertia);
        if d_yaw.abs() < MIN_SPIN_DEG && d_pitch.abs() < MIN_SPIN_DEG {
            self.spin = (0.0, 0.0);
            return;
        }
        self.spin = (d_yaw, d_pitch);
        self.rotate(d_yaw, d_pitch);
    }

    fn rotate(&mut self, d_yaw: f64, d_pitch: f64) {
        self.yaw = (self.yaw + d_yaw).rem_euclid(360.0);
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::angle_between;
    use crate::projection::world_to_screen;
    use crate::transform::{plane_to_sphere, PlanePoint};

    #[test]
    fn default_view_centres_plane_origin() {
        let cam = PanoramaCamera::default();
        let ctx = cam.context(1280.0, 720.0, 8192.0);
        let anchor = plane_to_sphere(PlanePoint::new(0.0, 0.0), 2048.0);
        let s = world_to_screen(anchor, &ctx);
        assert!((s - ctx.viewport.center()).length() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped_and_yaw_wraps() {
        let mut cam = PanoramaCamera::new(60.0, 1.0, 0.0);
        cam.rotate(-30.0, 500.0);
        assert_eq!(cam.pitch, PITCH_LIMIT_DEG);
        assert!((cam.yaw - 330.0).abs() < 1e-9);
    }

    #[test]
    fn drag_right_turns_left() {
        let mut cam = PanoramaCamera::new(60.0, 1.0, 0.0);
        cam.drag(100.0, 0.0, 800.0, 600.0);
        assert!(cam.yaw > 0.0 && cam.yaw < 90.0);
        assert!(cam.forward().z > 0.0);
    }

    #[test]
    fn inertia_decays_to_rest() {
        let mut cam = PanoramaCamera::new(60.0, 1.0, 0.5);
        cam.drag(50.0, 0.0, 800.0, 600.0);
        let after_drag = cam.yaw;
        cam.release();
        cam.update(false);
        assert!(cam.yaw > after_drag);
        for _ in 0..100 {
            cam.update(false);
        }
        let settled = cam.yaw;
        cam.update(false);
        assert_eq!(cam.yaw, settled);
    }

    #[test]
    fn zero_inertia_stops_on_release() {
        let mut cam = PanoramaCamera::new(60.0, 1.0, 0.0);
        cam.drag(50.0, 10.0, 800.0, 600.0);
        let (yaw, pitch) = (cam.yaw, cam.pitch);
        cam.release();
        cam.update(false);
        assert_eq!((cam.yaw, cam.pitch), (yaw, pitch));
    }

    #[test]
    fn focus_converges_on_target() {
        let mut cam = PanoramaCamera::default();
        let target = plane_to_sphere(PlanePoint::new(-2500.0, 900.0), 2048.0);
        cam.focus_on(target);
        for _ in 0..200 {
            cam.update(false);
        }
        assert!(!cam.is_focusing());
        assert!(angle_between(cam.forward(), target).unwrap() < 0.1);
    }

    #[test]
    fn focus_on_saturated_pole_finishes() {
        let mut cam = PanoramaCamera::default();
        let target = plane_to_sphere(PlanePoint::new(500.0, 1e6), 2048.0);
        cam.focus_on(target);
        for _ in 0..500 {
            cam.update(false);
        }
        assert!(!cam.is_focusing());
        assert!((cam.pitch + PITCH_LIMIT_DEG).abs() < 1e-9);
        assert!(angle_between(cam.forward(), target).unwrap() < 0.2);

        // 对准结束后惯性恢复
        cam.drag(40.0, 0.0, 800.0, 600.0);
        cam.release();
        let yaw = cam.yaw;
        cam.update(false);
        assert_ne!(cam.yaw, yaw);
    }

    #[test]
    fn zoom_respects_limits() {
        let mut cam = PanoramaCamera::default();
        cam.zoom(1000.0);
        assert_eq!(cam.fov, MIN_FOV_DEG);
        cam.zoom(-1000.0);
        assert_eq!(cam.fov, MAX_FOV_DEG);
    }
}
