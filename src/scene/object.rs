use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;

use crate::entity::{Animator, Entity, EntityRef};

/// Plain in-memory entity.
pub struct SceneObject {
    name: String,
    position: Cell<Vec2>,
    rotation: Cell<Vec2>,
    scale: Cell<Vec2>,
    active: Cell<bool>,
    animator: RefCell<Option<Rc<dyn Animator>>>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Cell::new(Vec2::ZERO),
            rotation: Cell::new(Vec2::ZERO),
            scale: Cell::new(Vec2::ONE),
            active: Cell::new(true),
            animator: RefCell::new(None),
        }
    }

    pub fn at(self, x: f32, y: f32) -> Self {
        self.position.set(Vec2::new(x, y));
        self
    }

    pub fn with_animator(self, animator: Rc<dyn Animator>) -> Self {
        *self.animator.borrow_mut() = Some(animator);
        self
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation.get()
    }

    pub fn scale(&self) -> Vec2 {
        self.scale.get()
    }

    pub fn into_ref(self) -> EntityRef {
        Rc::new(self)
    }
}

impl Entity for SceneObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> Vec2 {
        self.position.get()
    }

    fn set_position(&self, position: Vec2) {
        self.position.set(position);
    }

    fn set_rotation(&self, euler: Vec2) {
        self.rotation.set(euler);
    }

    fn set_scale(&self, scale: Vec2) {
        self.scale.set(scale);
    }

    fn set_active(&self, active: bool) {
        self.active.set(active);
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn animator(&self) -> Option<Rc<dyn Animator>> {
        self.animator.borrow().clone()
    }
}
