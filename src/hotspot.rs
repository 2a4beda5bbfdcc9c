// hotspot.rs - 热点数据与可拾取场景 (mesh 标记 / sprite 广告牌)

use crate::angle::angle_between;
use crate::picking::{MeshId, PickQuery, SpriteId};
use crate::projection::{project, screen_to_ray, Ray, ScreenPoint, ViewProjectionContext};
use crate::transform::{plane_to_sphere, PlanePoint, SpherePoint3D};
use glam::DVec3;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotspotKind {
    /// Solid marker geometry.
    Mesh,
    /// Camera-facing billboard.
    Sprite,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hotspot {
    pub id: u32,
    pub name: String,
    pub kind: HotspotKind,
    pub position: PlanePoint,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedHotspot {
    pub hotspot: Hotspot,
    pub anchor: SpherePoint3D,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SceneError {
    #[error("scene has no camera context yet")]
    NotReady,
    #[error("pointer ({x}, {y}) cannot be unprojected with the current camera")]
    Unprojectable { x: f64, y: f64 },
}

/// Where a hotspot's overlay should be drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayAnchor {
    pub index: usize,
    pub screen: ScreenPoint,
    pub radius_px: f64,
    pub visible: bool,
}

/// Hotspots placed on the panorama sphere, pickable through [`PickQuery`].
#[derive(Debug, Clone)]
pub struct HotspotScene {
    marker_size: f64,
    hotspots: Vec<PlacedHotspot>,
    context: Option<ViewProjectionContext>,
}

impl HotspotScene {
    /// `marker_size` is the world-space radius of every marker.
    pub fn new(radius: f64, marker_size: f64, hotspots: Vec<Hotspot>) -> Self {
        let hotspots = hotspots
            .into_iter()
            .map(|hotspot| PlacedHotspot {
                anchor: plane_to_sphere(hotspot.position, radius),
                hotspot,
            })
            .collect();
        Self {
            marker_size,
            hotspots,
            context: None,
        }
    }

    pub fn marker_size(&self) -> f64 {
        self.marker_size
    }

    pub fn hotspots(&self) -> &[PlacedHotspot] {
        &self.hotspots
    }

    pub fn set_context(&mut self, ctx: ViewProjectionContext) {
        self.context = Some(ctx);
    }

    pub fn context(&self) -> Option<&ViewProjectionContext> {
        self.context.as_ref()
    }

    /// Position in [`hotspots`](Self::hotspots) of the hotspot with this kind and id.
    pub fn index_of(&self, kind: HotspotKind, id: u32) -> Option<usize> {
        self.hotspots
            .iter()
            .position(|h| h.hotspot.kind == kind && h.hotspot.id == id)
    }

    fn pointer_ray(&self, x: f64, y: f64) -> Result<Ray, SceneError> {
        let ctx = self.context.as_ref().ok_or(SceneError::NotReady)?;
        screen_to_ray(ScreenPoint::new(x, y), ctx)
            .ok_or(SceneError::Unprojectable { x, y })
    }

    fn nearest(&self, kind: HotspotKind, mut hit: impl FnMut(DVec3) -> Option<f64>) -> Option<u32> {
        self.hotspots
            .iter()
            .filter(|h| h.hotspot.kind == kind)
            .filter_map(|h| hit(h.anchor).map(|t| (h.hotspot.id, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Screen anchors for every hotspot, seen from a camera looking along `forward`.
    ///
    /// A hotspot is visible when it is inside the frustum and within 90° of
    /// the view direction.
    pub fn overlay_anchors(&self, forward: DVec3) -> Vec<OverlayAnchor> {
        let Some(ctx) = self.context.as_ref() else {
            return Vec::new();
        };

        self.hotspots
            .iter()
            .enumerate()
            .map(|(index, h)| {
                let center = project(h.anchor, ctx);
                let side = h.anchor.normalize().any_orthonormal_vector();
                let edge = project(h.anchor + side * self.marker_size, ctx);
                let facing = angle_between(forward, h.anchor).map_or(false, |a| a <= 90.0);
                OverlayAnchor {
                    index,
                    screen: center.screen,
                    radius_px: (edge.screen - center.screen).length(),
                    visible: facing && center.is_in_frustum(),
                }
            })
            .collect()
    }
}

impl PickQuery for HotspotScene {
    type Error = SceneError;

    fn pick_mesh(&self, x: f64, y: f64) -> Result<Option<MeshId>, SceneError> {
        let ray = self.pointer_ray(x, y)?;
        let size = self.marker_size;
        Ok(self
            .nearest(HotspotKind::Mesh, |c| ray.intersect_sphere(c, size))
            .map(MeshId))
    }

    fn pick_sprite(&self, x: f64, y: f64) -> Result<Option<SpriteId>, SceneError> {
        let ray = self.pointer_ray(x, y)?;
        let size = self.marker_size;
        // 广告牌始终朝向相机：比较中心到射线的垂直距离
        Ok(self
            .nearest(HotspotKind::Sprite, |c| {
                let t = (c - ray.origin).dot(ray.direction);
                (t > 0.0 && ray.at(t).distance(c) <= size).then_some(t)
            })
            .map(SpriteId))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PanoramaCamera;
    use crate::projection::world_to_screen;

    const R: f64 = 2048.0;

    fn spot(id: u32, kind: HotspotKind, x: f64, y: f64) -> Hotspot {
        Hotspot {
            id,
            name: format!("spot {id}"),
            kind,
            position: PlanePoint::new(x, y),
            description: None,
        }
    }

    fn scene() -> (HotspotScene, PanoramaCamera) {
        let cam = PanoramaCamera::default();
        let mut scene = HotspotScene::new(
            R,
            30.0,
            vec![
                spot(1, HotspotKind::Mesh, 0.0, 0.0),
                spot(2, HotspotKind::Sprite, 300.0, 0.0),
                spot(3, HotspotKind::Sprite, 0.0, -250.0),
                spot(4, HotspotKind::Mesh, R * std::f64::consts::PI * 0.9, 0.0),
            ],
        );
        scene.set_context(cam.context(1280.0, 720.0, R * 4.0));
        (scene, cam)
    }

    fn screen_of(scene: &HotspotScene, index: usize) -> ScreenPoint {
        world_to_screen(scene.hotspots()[index].anchor, scene.context().unwrap())
    }

    #[test]
    fn picks_before_context_are_errors() {
        let scene = HotspotScene::new(R, 30.0, vec![spot(1, HotspotKind::Mesh, 0.0, 0.0)]);
        assert_eq!(scene.pick_mesh(1.0, 1.0), Err(SceneError::NotReady));
        assert_eq!(scene.pick_sprite(1.0, 1.0), Err(SceneError::NotReady));
    }

    #[test]
    fn anchors_lie_on_sphere() {
        let (scene, _) = scene();
        for h in scene.hotspots() {
            assert!((h.anchor.length() - R).abs() < 1e-6);
        }
    }

    #[test]
    fn clicking_a_mesh_marker_hits_only_the_mesh() {
        let (scene, _) = scene();
        let s = screen_of(&scene, 0);
        assert_eq!(scene.pick_mesh(s.x, s.y), Ok(Some(MeshId(1))));
        assert_eq!(scene.pick_sprite(s.x, s.y), Ok(None));
    }

    #[test]
    fn clicking_a_sprite_hits_only_the_sprite() {
        let (scene, _) = scene();
        let s = screen_of(&scene, 1);
        assert_eq!(scene.pick_sprite(s.x, s.y), Ok(Some(SpriteId(2))));
        assert_eq!(scene.pick_mesh(s.x, s.y), Ok(None));
        let s = screen_of(&scene, 2);
        assert_eq!(scene.pick_sprite(s.x, s.y), Ok(Some(SpriteId(3))));
    }

    #[test]
    fn empty_area_misses_everything() {
        let (scene, _) = scene();
        assert_eq!(scene.pick_mesh(5.0, 5.0), Ok(None));
        assert_eq!(scene.pick_sprite(5.0, 5.0), Ok(None));
    }

    #[test]
    fn hotspot_behind_camera_is_hidden_and_unpickable() {
        let (scene, cam) = scene();
        let anchors = scene.overlay_anchors(cam.forward());
        assert!(anchors[0].visible);
        assert!(anchors[0].radius_px > 1.0);
        assert!(!anchors[3].visible);

        // 背后的点投影到屏幕上仍有坐标，但不能被拾取
        let s = anchors[3].screen;
        assert_eq!(scene.pick_mesh(s.x, s.y), Ok(None));
    }

    #[test]
    fn lookup_by_id_respects_kind() {
        let (scene, _) = scene();
        let mesh = scene.index_of(HotspotKind::Mesh, 1).unwrap();
        assert_eq!(scene.hotspots()[mesh].hotspot.id, 1);
        // id 2 只是精灵
        assert!(scene.index_of(HotspotKind::Mesh, 2).is_none());
        let sprite = scene.index_of(HotspotKind::Sprite, 3).unwrap();
        assert_eq!(scene.hotspots()[sprite].hotspot.name, "spot 3");
        assert!(scene.index_of(HotspotKind::Sprite, 99).is_none());
    }

    #[test]
    fn hotspot_json_shape() {
        let json = r#"{"id": 5, "name": "Door", "kind": "sprite", "position": {"x": 10, "y": -20.5}}"#;
        let h: Hotspot = serde_json::from_str(json).unwrap();
        assert_eq!(h.kind, HotspotKind::Sprite);
        assert_eq!(h.position, PlanePoint::new(10.0, -20.5));
        assert!(h.description.is_none());
    }
}
