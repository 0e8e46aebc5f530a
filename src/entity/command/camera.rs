use std::cell::RefCell;
use std::rc::Rc;

use mlua::{UserData, UserDataMethods};
use tracing::{debug, warn};

use super::{add_command_meta, CommandBase, CommandRef, ScriptCommand};
use crate::entity::{CameraRig, CapabilityKind};
use crate::{FlowError, Result};

/// Points the scene camera at an entity.
pub struct CameraCommand {
    base: CommandBase,
    rig: RefCell<Option<Rc<dyn CameraRig>>>,
}

impl CameraCommand {
    pub(crate) fn new(base: CommandBase) -> Self {
        Self {
            base,
            rig: RefCell::new(None),
        }
    }

    fn rig(&self) -> Result<Rc<dyn CameraRig>> {
        self.rig.borrow().clone().ok_or_else(|| {
            warn!("No camera available to follow '{}'", self.base.entity().name());
            FlowError::NotFound("camera".to_string())
        })
    }

    /// Make the camera follow this entity.
    ///
    /// With `wait_for_arrival` set, resolves once the camera sits within
    /// the arrival threshold of the entity plus the camera offset.
    pub async fn follow(&self, speed: Option<f32>, wait_for_arrival: bool) -> Result<()> {
        self.base.ensure_live()?;
        let rig = self.rig()?;
        let settings = &self.base.services().camera_settings;
        let speed = speed.unwrap_or(settings.follow_speed);
        let entity = self.base.entity();

        debug!("Camera following '{}' at {}", entity.name(), speed);
        rig.follow_target(Rc::clone(entity), speed);

        if wait_for_arrival {
            let threshold = settings.arrival_threshold;
            loop {
                let target = entity.position() + rig.position_offset();
                if rig.position().distance(target) < threshold {
                    break;
                }
                self.base.scope().tick().await?;
            }
        }
        Ok(())
    }
}

impl ScriptCommand for CameraCommand {
    const KIND: CapabilityKind = CapabilityKind::Camera;

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn initialize(&self) {
        if self.base.begin_initialize() {
            *self.rig.borrow_mut() = self.base.services().camera.clone();
        }
    }
}

impl UserData for CommandRef<CameraCommand> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_async_method(
            "follow",
            |_, this, (speed, wait): (Option<f32>, Option<bool>)| {
                let command = Rc::clone(&this.0);
                async move {
                    command
                        .follow(speed, wait.unwrap_or(false))
                        .await
                        .map_err(FlowError::into_lua)
                }
            },
        );
        add_command_meta(methods);
    }
}
