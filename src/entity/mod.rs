//! Script-facing access to host entities.
//!
//! A script asks the facade for an entity by key and receives a handle.
//! The handle hands out one command object per capability (transform,
//! movement, animation, camera, actions, events), created on first use and
//! cached for the handle's lifetime.

pub mod capability;
pub mod command;
mod facade;
mod handle;

use std::fmt;
use std::rc::Rc;

use crate::config::{CameraConfig, MovementConfig};
use crate::registry::{ActionRegistry, EventBus};

pub use capability::{Animator, CameraRig, Entity, EntityRef, EntityResolver};
pub use command::{
    ActionCommand, AnimationCommand, CameraCommand, CommandRef, EventCommand, MovementCommand,
    ScriptCommand, TransformCommand,
};
pub use facade::EntityFacade;
pub use handle::EntityHandle;

/// Capabilities an entity handle can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Transform,
    Movement,
    Animation,
    Camera,
    Action,
    Event,
}

impl CapabilityKind {
    /// Name used in logs and `tostring` output.
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityKind::Transform => "Transform",
            CapabilityKind::Movement => "Movement",
            CapabilityKind::Animation => "Animation",
            CapabilityKind::Camera => "Camera",
            CapabilityKind::Action => "Action",
            CapabilityKind::Event => "Event",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host services reachable from commands.
#[derive(Clone)]
pub struct CapabilityServices {
    pub actions: Rc<ActionRegistry>,
    pub events: Rc<EventBus>,
    pub camera: Option<Rc<dyn CameraRig>>,
    pub movement: MovementConfig,
    pub camera_settings: CameraConfig,
}

impl CapabilityServices {
    /// Services with default settings and no camera.
    pub fn new(actions: Rc<ActionRegistry>, events: Rc<EventBus>) -> Self {
        Self {
            actions,
            events,
            camera: None,
            movement: MovementConfig::default(),
            camera_settings: CameraConfig::default(),
        }
    }

    /// Attach the scene camera.
    pub fn with_camera(mut self, camera: Rc<dyn CameraRig>) -> Self {
        self.camera = Some(camera);
        self
    }
}
