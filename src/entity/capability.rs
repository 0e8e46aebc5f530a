//! Interfaces the host implements so scripts can drive its entities.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use glam::Vec2;

use crate::Result;

/// Shared reference to a host entity.
pub type EntityRef = Rc<dyn Entity>;

/// Keyed lookup of host entities.
pub trait EntityResolver {
    /// Find the entity registered under `key`.
    fn get_entity(&self, key: &str) -> Option<EntityRef>;
}

/// A host object a script can address by name.
pub trait Entity {
    /// Display name.
    fn name(&self) -> &str;

    /// World position.
    fn position(&self) -> Vec2;

    /// Move the entity to `position` immediately.
    fn set_position(&self, position: Vec2);

    /// Set the rotation as euler angles in degrees.
    fn set_rotation(&self, euler: Vec2);

    /// Set the local scale.
    fn set_scale(&self, scale: Vec2);

    /// Show or hide the entity.
    fn set_active(&self, active: bool);

    /// Whether the entity is shown.
    fn is_active(&self) -> bool;

    /// Animation component, if the entity has one.
    fn animator(&self) -> Option<Rc<dyn Animator>> {
        None
    }
}

/// Animation playback for an entity.
pub trait Animator {
    /// Play `name`. When `wait_for_completion` is set the future resolves
    /// once the animation has finished, otherwise right after it started.
    fn play_animation<'a>(
        &'a self,
        name: &'a str,
        wait_for_completion: bool,
    ) -> LocalBoxFuture<'a, Result<()>>;

    /// Face right (`true`) or left.
    fn flip(&self, is_right: bool);
}

/// The scene camera.
pub trait CameraRig {
    /// Current camera position.
    fn position(&self) -> Vec2;

    /// Offset kept between the camera and its target.
    fn position_offset(&self) -> Vec2;

    /// Start following `target`; `follow_speed` is the smoothing factor.
    fn follow_target(&self, target: EntityRef, follow_speed: f32);
}
