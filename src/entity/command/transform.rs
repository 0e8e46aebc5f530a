use glam::Vec2;
use mlua::{UserData, UserDataMethods};

use super::{add_command_meta, CommandBase, CommandRef, ScriptCommand};
use crate::entity::CapabilityKind;
use crate::{FlowError, Result};

/// Immediate placement of an entity.
pub struct TransformCommand {
    base: CommandBase,
}

impl TransformCommand {
    pub(crate) fn new(base: CommandBase) -> Self {
        Self { base }
    }

    pub fn set_position(&self, x: f32, y: f32) -> Result<()> {
        self.base.ensure_live()?;
        self.base.entity().set_position(Vec2::new(x, y));
        Ok(())
    }

    /// Euler angles in degrees.
    pub fn set_rotation(&self, x: f32, y: f32) -> Result<()> {
        self.base.ensure_live()?;
        self.base.entity().set_rotation(Vec2::new(x, y));
        Ok(())
    }

    pub fn set_scale(&self, x: f32, y: f32) -> Result<()> {
        self.base.ensure_live()?;
        self.base.entity().set_scale(Vec2::new(x, y));
        Ok(())
    }

    pub fn position(&self) -> Vec2 {
        self.base.entity().position()
    }
}

impl ScriptCommand for TransformCommand {
    const KIND: CapabilityKind = CapabilityKind::Transform;

    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl UserData for CommandRef<TransformCommand> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("setPosition", |_, this, (x, y): (f32, f32)| {
            this.0.set_position(x, y).map_err(FlowError::into_lua)
        });
        methods.add_method("setRotation", |_, this, (x, y): (f32, f32)| {
            this.0.set_rotation(x, y).map_err(FlowError::into_lua)
        });
        methods.add_method("setScale", |_, this, (x, y): (f32, f32)| {
            this.0.set_scale(x, y).map_err(FlowError::into_lua)
        });
        methods.add_method("position", |_, this, ()| {
            let position = this.0.position();
            Ok((position.x, position.y))
        });
        add_command_meta(methods);
    }
}
