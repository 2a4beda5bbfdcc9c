// picking.rs - 指针按下时的拾取分发 (mesh / sprite / outside)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sprite#{}", self.0)
    }
}

/// Outcome of a single pick query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickResult {
    MeshHit(MeshId),
    SpriteHit(SpriteId),
    Miss,
}

impl PickResult {
    pub fn is_hit(&self) -> bool {
        !matches!(self, PickResult::Miss)
    }
}

impl From<Option<MeshId>> for PickResult {
    fn from(hit: Option<MeshId>) -> Self {
        hit.map_or(PickResult::Miss, PickResult::MeshHit)
    }
}

impl From<Option<SpriteId>> for PickResult {
    fn from(hit: Option<SpriteId>) -> Self {
        hit.map_or(PickResult::Miss, PickResult::SpriteHit)
    }
}

/// Scene-side pick queries at a pointer location (viewport pixels).
pub trait PickQuery {
    type Error;

    fn pick_mesh(&self, x: f64, y: f64) -> Result<Option<MeshId>, Self::Error>;

    fn pick_sprite(&self, x: f64, y: f64) -> Result<Option<SpriteId>, Self::Error>;
}

impl<T: PickQuery + ?Sized> PickQuery for &T {
    type Error = T::Error;

    fn pick_mesh(&self, x: f64, y: f64) -> Result<Option<MeshId>, Self::Error> {
        (**self).pick_mesh(x, y)
    }

    fn pick_sprite(&self, x: f64, y: f64) -> Result<Option<SpriteId>, Self::Error> {
        (**self).pick_sprite(x, y)
    }
}

/// Which callbacks an event should trigger. More than one may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchPlan {
    pub mesh: Option<MeshId>,
    pub sprite: Option<SpriteId>,
    pub outside: bool,
}

/// Combine the mesh query and the sprite query into a [`DispatchPlan`].
///
/// `outside` is set when the sprite query missed OR a mesh was hit. This is
/// not a "nothing was picked" rule: a mesh hit fires both the mesh and the
/// outside callbacks.
pub fn resolve(mesh: Option<MeshId>, sprite: Option<SpriteId>) -> DispatchPlan {
    DispatchPlan {
        mesh,
        sprite,
        outside: sprite.is_none() || mesh.is_some(),
    }
}

pub type MeshCallback = Box<dyn FnMut(MeshId)>;
pub type SpriteCallback = Box<dyn FnMut(SpriteId)>;
pub type OutsideCallback = Box<dyn FnMut()>;

/// Routes pointer-down events to the registered mesh / sprite / outside callbacks.
pub struct PickDispatcher<S> {
    scene: S,
    on_mesh: Option<MeshCallback>,
    on_sprite: Option<SpriteCallback>,
    on_outside: Option<OutsideCallback>,
}

impl<S: PickQuery> PickDispatcher<S> {
    pub fn new(scene: S) -> Self {
        Self {
            scene,
            on_mesh: None,
            on_sprite: None,
            on_outside: None,
        }
    }

    /// Register all three callbacks at once; `None` falls back to a trace log
    /// (mesh, sprite) or to doing nothing (outside).
    pub fn with_callbacks(
        scene: S,
        on_mesh: Option<MeshCallback>,
        on_sprite: Option<SpriteCallback>,
        on_outside: Option<OutsideCallback>,
    ) -> Self {
        Self {
            scene,
            on_mesh,
            on_sprite,
            on_outside,
        }
    }

    pub fn on_mesh(mut self, f: impl FnMut(MeshId) + 'static) -> Self {
        self.on_mesh = Some(Box::new(f));
        self
    }

    pub fn on_sprite(mut self, f: impl FnMut(SpriteId) + 'static) -> Self {
        self.on_sprite = Some(Box::new(f));
        self
    }

    pub fn on_outside(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_outside = Some(Box::new(f));
        self
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Handle one pointer-down at `(x, y)`.
    ///
    /// Both queries run before any callback fires; if either fails the error
    /// is returned unchanged and nothing is dispatched.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Result<DispatchPlan, S::Error> {
        let mesh = self.scene.pick_mesh(x, y)?;
        let sprite = self.scene.pick_sprite(x, y)?;
        let plan = resolve(mesh, sprite);
        log::debug!(
            "pointer down at ({x:.1}, {y:.1}): {:?} / {:?}",
            PickResult::from(mesh),
            PickResult::from(sprite)
        );

        self.run(plan);
        Ok(plan)
    }

    fn run(&mut self, plan: DispatchPlan) {
        if let Some(id) = plan.mesh {
            match self.on_mesh.as_mut() {
                Some(f) => f(id),
                None => log::trace!("picked a mesh: {id}"),
            }
        }
        if let Some(id) = plan.sprite {
            match self.on_sprite.as_mut() {
                Some(f) => f(id),
                None => log::trace!("picked a sprite: {id}"),
            }
        }
        if plan.outside {
            if let Some(f) = self.on_outside.as_mut() {
                f();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedScene {
        mesh: Option<MeshId>,
        sprite: Option<SpriteId>,
    }

    impl PickQuery for FixedScene {
        type Error = ();

        fn pick_mesh(&self, _x: f64, _y: f64) -> Result<Option<MeshId>, ()> {
            Ok(self.mesh)
        }

        fn pick_sprite(&self, _x: f64, _y: f64) -> Result<Option<SpriteId>, ()> {
            Ok(self.sprite)
        }
    }

    #[test]
    fn policy_table() {
        let m = Some(MeshId(1));
        let s = Some(SpriteId(2));

        assert_eq!(
            resolve(m, None),
            DispatchPlan { mesh: Some(MeshId(1)), sprite: None, outside: true }
        );
        assert_eq!(
            resolve(None, s),
            DispatchPlan { mesh: None, sprite: Some(SpriteId(2)), outside: false }
        );
        assert_eq!(
            resolve(None, None),
            DispatchPlan { mesh: None, sprite: None, outside: true }
        );
        assert_eq!(
            resolve(m, s),
            DispatchPlan { mesh: Some(MeshId(1)), sprite: Some(SpriteId(2)), outside: true }
        );
    }

    #[test]
    fn plan_carries_the_ids_each_query_returned() {
        // 网格 id 与精灵 id 数值相同也不能串位
        let scene = FixedScene {
            mesh: Some(MeshId(5)),
            sprite: Some(SpriteId(5)),
        };
        let mut dispatcher = PickDispatcher::new(scene);
        let plan = dispatcher.pointer_down(0.0, 0.0).unwrap();
        assert_eq!(plan.mesh, Some(MeshId(5)));
        assert_eq!(plan.sprite, Some(SpriteId(5)));
        assert!(plan.outside);

        dispatcher.scene_mut().mesh = None;
        let plan = dispatcher.pointer_down(0.0, 0.0).unwrap();
        assert_eq!(plan, resolve(None, Some(SpriteId(5))));
        assert!(!plan.outside);
    }

    #[test]
    fn pick_result_from_query_options() {
        assert_eq!(PickResult::from(Some(MeshId(4))), PickResult::MeshHit(MeshId(4)));
        assert_eq!(PickResult::from(None::<SpriteId>), PickResult::Miss);
        assert!(!PickResult::Miss.is_hit());
    }

    #[test]
    fn callbacks_fire_in_mesh_sprite_outside_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        let scene = FixedScene {
            mesh: Some(MeshId(7)),
            sprite: Some(SpriteId(9)),
        };
        let mut dispatcher = PickDispatcher::new(scene)
            .on_mesh(move |id| a.borrow_mut().push(format!("{id}")))
            .on_sprite(move |id| b.borrow_mut().push(format!("{id}")))
            .on_outside(move || c.borrow_mut().push("outside".to_string()));

        dispatcher.pointer_down(10.0, 20.0).unwrap();
        assert_eq!(*log.borrow(), vec!["mesh#7", "sprite#9", "outside"]);
    }

    #[test]
    fn unregistered_callbacks_fall_back_silently() {
        let scene = FixedScene {
            mesh: Some(MeshId(1)),
            sprite: Some(SpriteId(1)),
        };
        let mut dispatcher = PickDispatcher::new(scene);
        let plan = dispatcher.pointer_down(0.0, 0.0).unwrap();
        assert!(plan.outside);
    }

    #[test]
    fn dispatcher_works_through_a_borrowed_scene() {
        let scene = FixedScene { mesh: None, sprite: None };
        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        let mut dispatcher = PickDispatcher::new(&scene).on_outside(move || *h.borrow_mut() += 1);
        dispatcher.pointer_down(1.0, 1.0).unwrap();
        dispatcher.pointer_down(2.0, 2.0).unwrap();
        assert_eq!(*hits.borrow(), 2);
    }
}
