// projection.rs - 世界坐标 -> 屏幕坐标 (左上角为原点)，以及反向的拾取射线

use glam::{DMat4, DVec2, DVec3, DVec4};

/// Pixel rectangle the scene is rendered into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub const fn full(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Camera viewports are stored as fractions of the surface; convert to pixels.
    pub fn from_normalized(rect: [f64; 4], surface_width: f64, surface_height: f64) -> Self {
        Self::new(
            rect[0] * surface_width,
            rect[1] * surface_height,
            rect[2] * surface_width,
            rect[3] * surface_height,
        )
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

pub type ScreenPoint = DVec2;

/// Per-frame camera state handed to the projector and to picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjectionContext {
    pub view_projection: DMat4,
    pub viewport: Viewport,
}

impl ViewProjectionContext {
    pub fn new(view_projection: DMat4, viewport: Viewport) -> Self {
        Self {
            view_projection,
            viewport,
        }
    }
}

/// A projected point together with what is needed to decide its visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub screen: ScreenPoint,
    /// NDC depth, `0` on the near plane and `1` on the far plane.
    pub depth: f64,
    /// Clip-space `w`; negative behind the camera.
    pub w: f64,
    ndc: DVec2,
}

impl ProjectedPoint {
    pub fn is_in_frustum(&self) -> bool {
        self.w > 0.0
            && self.ndc.x.abs() <= 1.0
            && self.ndc.y.abs() <= 1.0
            && (0.0..=1.0).contains(&self.depth)
    }
}

pub fn project(point: DVec3, ctx: &ViewProjectionContext) -> ProjectedPoint {
    let clip = ctx.view_projection * DVec4::new(point.x, point.y, point.z, 1.0);
    let ndc = clip.truncate() / clip.w;
    let vp = &ctx.viewport;

    let screen = ScreenPoint::new(
        vp.x + (ndc.x + 1.0) * 0.5 * vp.width,
        vp.y + (1.0 - ndc.y) * 0.5 * vp.height,
    );

    ProjectedPoint {
        screen,
        depth: ndc.z,
        w: clip.w,
        ndc: ndc.truncate(),
    }
}

/// Screen position of a world point, origin at the top-left of the surface.
///
/// Points outside the frustum (including behind the camera) still yield a
/// value; use [`project`] and [`ProjectedPoint::is_in_frustum`] to hide them.
pub fn world_to_screen(point: DVec3, ctx: &ViewProjectionContext) -> ScreenPoint {
    project(point, ctx).screen
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit length.
    pub direction: DVec3,
}

impl Ray {
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first hit with a sphere, if it is in front.
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t0 = -b - sq;
        let t1 = -b + sq;
        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            // 射线起点在球内
            Some(t1)
        } else {
            None
        }
    }
}

/// Unproject a pointer position into a world-space ray through the near and far planes.
pub fn screen_to_ray(screen: ScreenPoint, ctx: &ViewProjectionContext) -> Option<Ray> {
    let vp = &ctx.viewport;
    if vp.width <= 0.0 || vp.height <= 0.0 {
        return None;
    }
    if ctx.view_projection.determinant().abs() < f64::EPSILON {
        return None;
    }

    let ndc_x = (screen.x - vp.x) / vp.width * 2.0 - 1.0;
    let ndc_y = 1.0 - (screen.y - vp.y) / vp.height * 2.0;

    let inv = ctx.view_projection.inverse();
    let near = inv.project_point3(DVec3::new(ndc_x, ndc_y, 0.0));
    let far = inv.project_point3(DVec3::new(ndc_x, ndc_y, 1.0));

    let direction = (far - near).try_normalize()?;
    if !near.is_finite() {
        return None;
    }
    Some(Ray {
        origin: near,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_neg_z(width: f64, height: f64) -> ViewProjectionContext {
        let view = DMat4::look_to_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
        let proj = DMat4::perspective_rh(60f64.to_radians(), width / height, 0.1, 100.0);
        ViewProjectionContext::new(proj * view, Viewport::full(width, height))
    }

    #[test]
    fn focal_point_maps_to_viewport_center() {
        let ctx = looking_down_neg_z(1280.0, 720.0);
        let s = world_to_screen(DVec3::new(0.0, 0.0, -10.0), &ctx);
        assert!((s - DVec2::new(640.0, 360.0)).length() < 1e-9);
    }

    #[test]
    fn up_and_right_follow_screen_axes() {
        let ctx = looking_down_neg_z(800.0, 600.0);
        let up = world_to_screen(DVec3::new(0.0, 1.0, -10.0), &ctx);
        let right = world_to_screen(DVec3::new(1.0, 0.0, -10.0), &ctx);
        assert!(up.y < 300.0, "screen y grows downward");
        assert!(right.x > 400.0);
    }

    #[test]
    fn frustum_edge_lands_on_viewport_edge() {
        let ctx = looking_down_neg_z(800.0, 600.0);
        let half = 30f64.to_radians().tan() * 10.0;
        let top = world_to_screen(DVec3::new(0.0, half, -10.0), &ctx);
        assert!(top.y.abs() < 1e-9);
    }

    #[test]
    fn visible_points_stay_inside_viewport() {
        let ctx = looking_down_neg_z(640.0, 480.0);
        for p in [DVec3::new(2.0, -1.0, -8.0), DVec3::new(-3.0, 2.0, -20.0)] {
            let projected = project(p, &ctx);
            assert!(projected.is_in_frustum());
            assert!(ctx.viewport.contains(projected.screen));
        }
    }

    #[test]
    fn behind_camera_is_not_in_frustum() {
        let ctx = looking_down_neg_z(640.0, 480.0);
        let projected = project(DVec3::new(0.0, 0.0, 10.0), &ctx);
        assert!(projected.w < 0.0);
        assert!(!projected.is_in_frustum());
        assert!(projected.screen.is_finite());
    }

    #[test]
    fn viewport_offset_and_normalized_rect() {
        let vp = Viewport::from_normalized([0.5, 0.0, 0.5, 1.0], 1000.0, 500.0);
        assert_eq!(vp, Viewport::new(500.0, 0.0, 500.0, 500.0));
        let view = DMat4::look_to_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
        let proj = DMat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let ctx = ViewProjectionContext::new(proj * view, vp);
        let s = world_to_screen(DVec3::new(0.0, 0.0, -5.0), &ctx);
        assert!((s - vp.center()).length() < 1e-9);
    }

    #[test]
    fn ray_through_projected_point_hits_it() {
        let ctx = looking_down_neg_z(1024.0, 768.0);
        let target = DVec3::new(1.5, -0.5, -12.0);
        let ray = screen_to_ray(world_to_screen(target, &ctx), &ctx).unwrap();
        let t = ray.intersect_sphere(target, 0.01).unwrap();
        assert!((ray.at(t) - target).length() < 0.02);
    }

    #[test]
    fn degenerate_viewport_has_no_ray() {
        let mut ctx = looking_down_neg_z(100.0, 100.0);
        ctx.viewport.width = 0.0;
        assert!(screen_to_ray(DVec2::new(1.0, 1.0), &ctx).is_none());
    }

    #[test]
    fn ray_sphere_misses_and_inside() {
        let ray = Ray {
            origin: DVec3::ZERO,
            direction: DVec3::NEG_Z,
        };
        assert!(ray.intersect_sphere(DVec3::new(5.0, 0.0, -10.0), 1.0).is_none());
        assert!(ray.intersect_sphere(DVec3::new(0.0, 0.0, 10.0), 1.0).is_none());
        let t = ray.intersect_sphere(DVec3::ZERO, 3.0).unwrap();
        assert!((t - 3.0).abs() < 1e-12);
    }
}
