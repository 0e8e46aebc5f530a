//! Named host actions callable from scripts.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, error, warn};

use crate::value::{bind_parameter, FromScriptValue, ScriptValue};
use crate::{FlowError, Result};

type SyncCall = Rc<dyn Fn(Option<ScriptValue>) -> Result<()>>;
type AsyncCall = Rc<dyn Fn(Option<ScriptValue>) -> LocalBoxFuture<'static, Result<()>>>;

/// Calling convention of a registered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionShape {
    /// Synchronous, no parameter.
    Sync,
    /// Synchronous, one typed parameter.
    SyncWithParam,
    /// Asynchronous, no parameter.
    Async,
    /// Asynchronous, one typed parameter.
    AsyncWithParam,
}

impl ActionShape {
    /// Returns true for the asynchronous shapes.
    pub fn is_async(self) -> bool {
        matches!(self, ActionShape::Async | ActionShape::AsyncWithParam)
    }

    /// Returns true for the shapes taking a parameter.
    pub fn takes_parameter(self) -> bool {
        matches!(self, ActionShape::SyncWithParam | ActionShape::AsyncWithParam)
    }
}

#[derive(Clone)]
enum ActionCall {
    Sync(SyncCall),
    Async(AsyncCall),
}

#[derive(Clone)]
struct ActionEntry {
    shape: ActionShape,
    call: ActionCall,
}

/// Registry of host functions that scripts invoke by name.
///
/// Each name maps to exactly one action. Registering a name that is already
/// taken is rejected and the original action stays in place.
#[derive(Default)]
pub struct ActionRegistry {
    actions: RefCell<HashMap<String, ActionEntry>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous action without a parameter.
    pub fn register<F>(&self, name: impl Into<String>, action: F) -> Result<()>
    where
        F: Fn() -> Result<()> + 'static,
    {
        let call: SyncCall = Rc::new(move |parameter: Option<ScriptValue>| {
            if let Some(value) = parameter {
                debug!("Ignoring parameter {} for parameterless action", value);
            }
            action()
        });
        self.insert(name.into(), ActionShape::Sync, ActionCall::Sync(call))
    }

    /// Register a synchronous action taking one parameter of type `T`.
    pub fn register_with<T, F>(&self, name: impl Into<String>, action: F) -> Result<()>
    where
        T: FromScriptValue,
        F: Fn(T) -> Result<()> + 'static,
    {
        let call: SyncCall = Rc::new(move |parameter: Option<ScriptValue>| {
            let argument = bind_parameter::<T>(parameter.as_ref())?;
            action(argument)
        });
        self.insert(name.into(), ActionShape::SyncWithParam, ActionCall::Sync(call))
    }

    /// Register an asynchronous action without a parameter.
    pub fn register_async<F, Fut>(&self, name: impl Into<String>, action: F) -> Result<()>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let call: AsyncCall =
            Rc::new(move |_parameter: Option<ScriptValue>| action().boxed_local());
        self.insert(name.into(), ActionShape::Async, ActionCall::Async(call))
    }

    /// Register an asynchronous action taking one parameter of type `T`.
    pub fn register_async_with<T, F, Fut>(&self, name: impl Into<String>, action: F) -> Result<()>
    where
        T: FromScriptValue,
        F: Fn(T) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let call: AsyncCall = Rc::new(move |parameter: Option<ScriptValue>| {
            match bind_parameter::<T>(parameter.as_ref()) {
                Ok(argument) => action(argument).boxed_local(),
                Err(e) => futures::future::ready(Err(e)).boxed_local(),
            }
        });
        self.insert(
            name.into(),
            ActionShape::AsyncWithParam,
            ActionCall::Async(call),
        )
    }

    fn insert(&self, name: String, shape: ActionShape, call: ActionCall) -> Result<()> {
        let mut actions = self.actions.borrow_mut();
        if actions.contains_key(&name) {
            warn!("Action '{}' already exists; keeping the original", name);
            return Err(FlowError::AlreadyRegistered(name));
        }
        debug!("Registered action '{}' ({:?})", name, shape);
        actions.insert(name, ActionEntry { shape, call });
        Ok(())
    }

    /// Remove an action. Returns true if it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.actions.borrow_mut().remove(name).is_some()
    }

    /// Remove every action.
    pub fn clear(&self) {
        self.actions.borrow_mut().clear();
    }

    /// Check whether an action is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.borrow().contains_key(name)
    }

    /// Calling convention of the action registered under `name`.
    pub fn shape(&self, name: &str) -> Option<ActionShape> {
        self.actions.borrow().get(name).map(|entry| entry.shape)
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.borrow().len()
    }

    /// Returns true if no action is registered.
    pub fn is_empty(&self) -> bool {
        self.actions.borrow().is_empty()
    }

    /// Sorted list of registered action names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, name: &str) -> Option<ActionEntry> {
        self.actions.borrow().get(name).cloned()
    }

    /// Run a synchronous action.
    ///
    /// Every failure is logged here; the returned error only tells the
    /// caller what happened.
    pub fn execute(&self, name: &str, parameter: Option<ScriptValue>) -> Result<()> {
        let Some(entry) = self.lookup(name) else {
            warn!("Unregistered action: {}", name);
            return Err(FlowError::NotFound(format!("action '{name}'")));
        };

        match entry.call {
            ActionCall::Sync(call) => report(name, call(parameter)),
            ActionCall::Async(_) => {
                warn!("Action '{}' is asynchronous; use execAsync", name);
                Err(FlowError::NotFound(format!("synchronous action '{name}'")))
            }
        }
    }

    /// Run an action of any shape, awaiting it if it is asynchronous.
    pub async fn execute_async(&self, name: &str, parameter: Option<ScriptValue>) -> Result<()> {
        let Some(entry) = self.lookup(name) else {
            warn!("Unregistered async action: {}", name);
            return Err(FlowError::NotFound(format!("action '{name}'")));
        };

        let result = match entry.call {
            ActionCall::Sync(call) => call(parameter),
            ActionCall::Async(call) => call(parameter).await,
        };
        report(name, result)
    }
}

fn report(name: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(FlowError::TypeMismatch { from, to }) => {
            error!(
                "Action '{}' skipped: parameter conversion failed ({} -> {})",
                name, from, to
            );
            Err(FlowError::TypeMismatch { from, to })
        }
        Err(e) => {
            error!("Action '{}' failed: {}", name, e);
            Err(FlowError::Callback {
                name: name.to_string(),
                message: e.to_string(),
            })
        }
    }
}
