// lib.rs - 全景热点：坐标变换、屏幕投影、拾取分发

pub mod angle;
pub mod camera;
pub mod config;
pub mod hotspot;
pub mod i18n;
pub mod picking;
pub mod projection;
pub mod transform;

pub use angle::{angle_between, AngleError};
pub use camera::PanoramaCamera;
pub use config::{ConfigError, Settings};
pub use hotspot::{Hotspot, HotspotKind, HotspotScene, SceneError};
pub use picking::{DispatchPlan, MeshId, PickDispatcher, PickQuery, PickResult, SpriteId};
pub use projection::{world_to_screen, ScreenPoint, ViewProjectionContext, Viewport};
pub use transform::{plane_to_sphere, sphere_to_plane, PlanePoint, SpherePoint3D};
