//! Per-capability command objects handed to scripts.

pub mod action;
pub mod animation;
pub mod camera;
pub mod event;
pub mod movement;
pub mod transform;

use std::cell::Cell;
use std::rc::Rc;

use mlua::{AnyUserData, MetaMethod, UserData, UserDataMethods, Value};
use tracing::error;

use super::capability::EntityRef;
use super::{CapabilityKind, CapabilityServices};
use crate::scope::SessionScope;
use crate::value::ScriptValue;
use crate::Result;

pub use action::ActionCommand;
pub use animation::AnimationCommand;
pub use camera::CameraCommand;
pub use event::EventCommand;
pub use movement::MovementCommand;
pub use transform::TransformCommand;

/// State shared by every command: its entity, session scope and services.
pub struct CommandBase {
    entity: EntityRef,
    scope: Rc<SessionScope>,
    services: Rc<CapabilityServices>,
    initialized: Cell<bool>,
}

impl CommandBase {
    pub(crate) fn new(
        entity: EntityRef,
        scope: Rc<SessionScope>,
        services: Rc<CapabilityServices>,
    ) -> Self {
        Self {
            entity,
            scope,
            services,
            initialized: Cell::new(false),
        }
    }

    /// Entity the command acts on.
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Scope of the owning session.
    pub fn scope(&self) -> &Rc<SessionScope> {
        &self.scope
    }

    /// Registries and settings.
    pub fn services(&self) -> &CapabilityServices {
        &self.services
    }

    /// Fail once the owning session is gone or cancelled.
    pub fn ensure_live(&self) -> Result<()> {
        self.scope.ensure_live()
    }

    /// Returns true exactly once, for the call that should perform the
    /// one-time setup.
    pub(crate) fn begin_initialize(&self) -> bool {
        !self.initialized.replace(true)
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.get()
    }
}

/// A capability command bound to one entity.
pub trait ScriptCommand {
    /// Capability implemented by this command.
    const KIND: CapabilityKind;

    /// Shared command state.
    fn base(&self) -> &CommandBase;

    /// One-time setup run right after construction. Calling it again does
    /// nothing.
    fn initialize(&self) {
        self.base().begin_initialize();
    }

    /// Whether `initialize` has run.
    fn is_initialized(&self) -> bool {
        self.base().is_initialized()
    }
}

/// Capture an argument a script passed on to `target`.
///
/// Tables, functions and other values without a host representation are
/// logged and yield `None`; the caller then skips the call.
pub(crate) fn capture_argument(target: &str, argument: &Value) -> Option<ScriptValue> {
    match ScriptValue::from_lua_value(argument) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("Skipping '{}': {}", target, e);
            None
        }
    }
}

/// Script-side reference to a cached command.
///
/// Several references may point to the same command; `==` in Lua compares
/// the command, not the reference.
pub struct CommandRef<T>(pub Rc<T>);

impl<T> Clone for CommandRef<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

/// Register `__eq` and `__tostring` for a command reference type.
pub(crate) fn add_command_meta<T, M>(methods: &mut M)
where
    T: ScriptCommand + 'static,
    CommandRef<T>: UserData,
    M: UserDataMethods<CommandRef<T>>,
{
    methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
        Ok(other
            .borrow::<CommandRef<T>>()
            .map(|other| Rc::ptr_eq(&this.0, &other.0))
            .unwrap_or(false))
    });
    methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
        Ok(format!("{}({})", T::KIND, this.0.base().entity().name()))
    });
}
