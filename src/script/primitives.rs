//! Host functions injected into every session: `wait`, `log` and `get`.

use std::rc::Rc;
use std::time::Duration;

use mlua::{Lua, Result as LuaResult, Value};
use tracing::info;

use crate::entity::EntityFacade;
use crate::logging::SCRIPT_TARGET;
use crate::scope::SessionScope;
use crate::FlowError;

/// Builder registering the session primitives with a Lua state.
pub struct ScriptPrimitives {
    facade: Rc<EntityFacade>,
    scope: Rc<SessionScope>,
}

impl ScriptPrimitives {
    pub fn new(facade: Rc<EntityFacade>, scope: Rc<SessionScope>) -> Self {
        Self { facade, scope }
    }

    /// Install the primitives as globals.
    pub fn register(self, lua: &Lua) -> LuaResult<()> {
        let globals = lua.globals();

        // wait(seconds) suspends the calling script
        let scope = Rc::clone(&self.scope);
        let wait_fn = lua.create_async_function(move |_, seconds: f64| {
            let scope = Rc::clone(&scope);
            async move {
                let duration = wait_duration(seconds).map_err(FlowError::into_lua)?;
                scope.sleep(duration).await.map_err(FlowError::into_lua)
            }
        })?;
        globals.set("wait", wait_fn)?;

        let log_fn = lua.create_function(|_, text: Value| {
            info!(target: SCRIPT_TARGET, "{}", value_to_string(&text));
            Ok(())
        })?;
        globals.set("log", log_fn)?;

        // get(key) returns an entity handle or nil
        let facade = Rc::clone(&self.facade);
        let scope = Rc::clone(&self.scope);
        let get_fn = lua.create_function(move |_, key: String| {
            scope.ensure_live().map_err(FlowError::into_lua)?;
            Ok(facade.resolve_in(&key, &scope))
        })?;
        globals.set("get", get_fn)?;

        Ok(())
    }
}

fn wait_duration(seconds: f64) -> crate::Result<Duration> {
    let invalid = || {
        FlowError::Validation(format!(
            "wait expects a finite number of seconds, got {}",
            seconds
        ))
    };
    if !seconds.is_finite() {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(seconds.max(0.0)).map_err(|_| invalid())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.to_string_lossy().to_string(),
        other => format!("[{}]", other.type_name()),
    }
}
