use std::rc::Rc;

use mlua::{UserData, UserDataMethods, Value};

use super::{add_command_meta, capture_argument, CommandBase, CommandRef, ScriptCommand};
use crate::entity::CapabilityKind;
use crate::value::ScriptValue;
use crate::{FlowError, Result};

/// Runs registered host actions on behalf of a script.
///
/// Action failures are logged by the registry and reported to the script
/// as `false`, as are arguments the host cannot represent. Only a closed
/// or cancelled session raises an error.
pub struct ActionCommand {
    base: CommandBase,
}

impl ActionCommand {
    pub(crate) fn new(base: CommandBase) -> Self {
        Self { base }
    }

    /// Run a synchronous action. Returns whether it succeeded.
    pub fn exec(&self, name: &str, parameter: Option<ScriptValue>) -> Result<bool> {
        self.base.ensure_live()?;
        Ok(self
            .base
            .services()
            .actions
            .execute(name, parameter)
            .is_ok())
    }

    /// Run an action of any shape and wait for it to finish.
    pub async fn exec_async(&self, name: &str, parameter: Option<ScriptValue>) -> Result<bool> {
        self.base.ensure_live()?;
        let actions = Rc::clone(&self.base.services().actions);
        let token = self.base.scope().token();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FlowError::Cancelled),
            result = actions.execute_async(name, parameter) => Ok(result.is_ok()),
        }
    }

    /// [`exec`](Self::exec) with an argument taken as the script passed it.
    pub fn exec_script(&self, name: &str, argument: &Value) -> Result<bool> {
        self.base.ensure_live()?;
        match capture_argument(name, argument) {
            Some(value) => self.exec(name, parameter_of(value)),
            None => Ok(false),
        }
    }

    /// [`exec_async`](Self::exec_async) with an argument taken as the script
    /// passed it.
    pub async fn exec_async_script(&self, name: &str, argument: Value) -> Result<bool> {
        self.base.ensure_live()?;
        match capture_argument(name, &argument) {
            Some(value) => self.exec_async(name, parameter_of(value)).await,
            None => Ok(false),
        }
    }
}

impl ScriptCommand for ActionCommand {
    const KIND: CapabilityKind = CapabilityKind::Action;

    fn base(&self) -> &CommandBase {
        &self.base
    }
}

fn parameter_of(value: ScriptValue) -> Option<ScriptValue> {
    (!value.is_nil()).then_some(value)
}

impl UserData for CommandRef<ActionCommand> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("exec", |_, this, (name, param): (String, Value)| {
            this.0
                .exec_script(&name, &param)
                .map_err(FlowError::into_lua)
        });
        methods.add_async_method("execAsync", |_, this, (name, param): (String, Value)| {
            let command = Rc::clone(&this.0);
            async move {
                command
                    .exec_async_script(&name, param)
                    .await
                    .map_err(FlowError::into_lua)
            }
        });
        add_command_meta(methods);
    }
}
