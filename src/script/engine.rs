//! Lua script engine with sandboxing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mlua::{Function, HookTriggers, Lua, Result as LuaResult, Value, Variadic, VmState};

use crate::config::ScriptConfig;
use crate::value::ScriptValue;
use crate::{FlowError, Result};

/// Globals removed from a sandboxed state.
const SANDBOXED_GLOBALS: &[&str] = &[
    "os",
    "io",
    "loadfile",
    "dofile",
    "load",
    "require",
    "package",
    "debug",
    "collectgarbage",
];

/// Instructions between two limit checks.
const HOOK_INTERVAL: u32 = 10_000;

/// Resource limits for script execution.
#[derive(Debug, Clone, Default)]
pub struct ResourceLimits {
    /// Maximum number of instructions per call (0 = unlimited).
    pub max_instructions: u64,
    /// Maximum memory in bytes (0 = unlimited).
    pub max_memory: usize,
}

impl From<&ScriptConfig> for ResourceLimits {
    fn from(config: &ScriptConfig) -> Self {
        Self {
            max_instructions: config.max_instructions,
            max_memory: config.max_memory_mb * 1024 * 1024,
        }
    }
}

/// Lua state plus the limits applied to it.
///
/// Cloning is cheap and yields another handle to the same state.
#[derive(Clone)]
pub struct ScriptEngine {
    lua: Lua,
    instruction_count: Arc<AtomicU64>,
    limits: ResourceLimits,
}

impl ScriptEngine {
    /// Create a sandboxed engine without limits.
    pub fn new() -> Result<Self> {
        Self::with_limits(ResourceLimits::default(), true)
    }

    /// Create an engine from the `[script]` configuration section.
    pub fn from_config(config: &ScriptConfig) -> Result<Self> {
        Self::with_limits(ResourceLimits::from(config), config.sandbox)
    }

    pub fn with_limits(limits: ResourceLimits, sandbox: bool) -> Result<Self> {
        let lua = Lua::new();

        if sandbox {
            Self::apply_sandbox(&lua)?;
        }

        if limits.max_memory > 0 {
            lua.set_memory_limit(limits.max_memory)
                .map_err(|e| FlowError::Script(format!("Failed to set memory limit: {}", e)))?;
        }

        Ok(Self {
            lua,
            instruction_count: Arc::new(AtomicU64::new(0)),
            limits,
        })
    }

    fn apply_sandbox(lua: &Lua) -> Result<()> {
        let globals = lua.globals();
        for name in SANDBOXED_GLOBALS {
            globals
                .set(*name, Value::Nil)
                .map_err(|e| FlowError::Script(format!("Failed to disable {}: {}", name, e)))?;
        }
        Ok(())
    }

    /// Reset the instruction budget for the next call.
    fn arm_instruction_limit(&self) {
        self.instruction_count.store(0, Ordering::SeqCst);
        if self.limits.max_instructions == 0 {
            return;
        }

        let count = Arc::clone(&self.instruction_count);
        let limit = self.limits.max_instructions;
        self.lua.set_hook(
            HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
            move |_lua, _debug| {
                let current = count.fetch_add(HOOK_INTERVAL as u64, Ordering::SeqCst)
                    + HOOK_INTERVAL as u64;
                if current > limit {
                    Err(mlua::Error::RuntimeError(
                        "Script exceeded instruction limit".to_string(),
                    ))
                } else {
                    Ok(VmState::Continue)
                }
            },
        );
    }

    /// Run a chunk to completion, awaiting any suspension inside it.
    pub async fn exec_async(&self, source: &str, chunk_name: &str) -> Result<()> {
        self.arm_instruction_limit();
        let result = self
            .lua
            .load(source)
            .set_name(chunk_name)
            .exec_async()
            .await;
        self.lua.remove_hook();
        result.map_err(|e| FlowError::Script(format!("Script error: {}", e)))
    }

    /// Call the global function `name` with `args` and await it.
    pub async fn call_async(&self, name: &str, args: Vec<ScriptValue>) -> Result<()> {
        let function = match self.get_global::<Value>(name)? {
            Value::Function(function) => function,
            other => {
                return Err(FlowError::NotFound(format!(
                    "function '{}' (found {})",
                    name,
                    other.type_name()
                )))
            }
        };

        self.arm_instruction_limit();
        let result = function
            .call_async::<()>(Variadic::from_iter(args))
            .await;
        self.lua.remove_hook();
        result.map_err(|e| FlowError::Script(format!("Error in '{}': {}", name, e)))
    }

    pub fn set_global<V: mlua::IntoLua>(&self, name: &str, value: V) -> Result<()> {
        self.lua
            .globals()
            .set(name, value)
            .map_err(|e| FlowError::Script(format!("Failed to set global '{}': {}", name, e)))
    }

    pub fn get_global<V: mlua::FromLua>(&self, name: &str) -> Result<V> {
        self.lua
            .globals()
            .get(name)
            .map_err(|e| FlowError::Script(format!("Failed to get global '{}': {}", name, e)))
    }

    /// Create a Lua function from a Rust closure.
    pub fn create_function<F, A, R>(&self, func: F) -> Result<Function>
    where
        F: Fn(&Lua, A) -> LuaResult<R> + 'static,
        A: mlua::FromLuaMulti,
        R: mlua::IntoLuaMulti,
    {
        self.lua
            .create_function(func)
            .map_err(|e| FlowError::Script(format!("Failed to create function: {}", e)))
    }

    /// Instructions counted during the last call, in hook-sized steps.
    pub fn instruction_count(&self) -> u64 {
        self.instruction_count.load(Ordering::SeqCst)
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}
