use mlua::{UserData, UserDataMethods, Value};

use super::{add_command_meta, capture_argument, CommandBase, CommandRef, ScriptCommand};
use crate::entity::CapabilityKind;
use crate::value::ScriptValue;
use crate::{FlowError, Result};

/// Publishes events on the host bus.
///
/// Payloads published from a script arrive as [`ScriptValue`], so only
/// subscribers registered for `ScriptValue` receive them.
pub struct EventCommand {
    base: CommandBase,
}

impl EventCommand {
    pub(crate) fn new(base: CommandBase) -> Self {
        Self { base }
    }

    /// Publish a parameterless event. Returns the number of subscribers
    /// notified.
    pub fn publish(&self, name: &str) -> Result<usize> {
        self.base.ensure_live()?;
        Ok(self.base.services().events.publish(name))
    }

    /// Publish an event carrying `value`.
    pub fn publish_with(&self, name: &str, value: ScriptValue) -> Result<usize> {
        self.base.ensure_live()?;
        Ok(self.base.services().events.publish_with(name, &value))
    }

    /// Publish a payload taken as the script passed it. A payload the host
    /// cannot represent is dropped and nobody is notified.
    pub fn publish_script(&self, name: &str, payload: &Value) -> Result<usize> {
        self.base.ensure_live()?;
        match capture_argument(name, payload) {
            Some(value) => self.publish_with(name, value),
            None => Ok(0),
        }
    }
}

impl ScriptCommand for EventCommand {
    const KIND: CapabilityKind = CapabilityKind::Event;

    fn base(&self) -> &CommandBase {
        &self.base
    }
}

impl UserData for CommandRef<EventCommand> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("exec", |_, this, name: String| {
            this.0.publish(&name).map_err(FlowError::into_lua)
        });
        methods.add_method("execP", |_, this, (name, payload): (String, Value)| {
            this.0
                .publish_script(&name, &payload)
                .map_err(FlowError::into_lua)
        });
        add_command_meta(methods);
    }
}
