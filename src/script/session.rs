//! One interpreter context running one cutscene script.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use super::engine::ScriptEngine;
use super::primitives::ScriptPrimitives;
use crate::config::ScriptConfig;
use crate::entity::EntityFacade;
use crate::scope::SessionScope;
use crate::value::ScriptValue;
use crate::{FlowError, Result};

/// Lifecycle of a [`ScriptSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Context created, no script loaded yet.
    Uninitialized,
    /// A script body ran successfully.
    Loaded,
    /// Context discarded; nothing bound to it works any more.
    Destroyed,
}

/// A sandboxed Lua context with the session primitives installed.
///
/// Destroying the session drops its Lua state and invalidates its scope,
/// which turns every command object handed out by it into a dead reference.
pub struct ScriptSession {
    scope: Rc<SessionScope>,
    engine: RefCell<Option<ScriptEngine>>,
    state: Cell<SessionState>,
    source: RefCell<Option<String>>,
}

impl ScriptSession {
    /// Create a fresh context and inject `wait`, `log` and `get`.
    pub fn create(facade: Rc<EntityFacade>, config: &ScriptConfig) -> Result<Self> {
        let engine = ScriptEngine::from_config(config)?;
        let scope = SessionScope::new(facade.tick_interval());
        ScriptPrimitives::new(facade, Rc::clone(&scope)).register(engine.lua())?;

        debug!("Created script session {}", scope.id());
        Ok(Self {
            scope,
            engine: RefCell::new(Some(engine)),
            state: Cell::new(SessionState::Uninitialized),
            source: RefCell::new(None),
        })
    }

    pub fn id(&self) -> Uuid {
        self.scope.id()
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn scope(&self) -> &Rc<SessionScope> {
        &self.scope
    }

    /// Source text of the last successfully loaded script.
    pub fn source(&self) -> Option<String> {
        self.source.borrow().clone()
    }

    fn engine(&self) -> Result<ScriptEngine> {
        self.engine.borrow().clone().ok_or(FlowError::SessionClosed)
    }

    /// Run the full script body under `token`.
    pub async fn load_and_run(
        &self,
        source: &str,
        chunk_name: &str,
        token: &CancellationToken,
    ) -> Result<()> {
        let engine = self.engine()?;
        self.scope.bind(token.clone());

        let result = self
            .guarded(token, engine.exec_async(source, chunk_name))
            .await;
        match result {
            Ok(()) => {
                self.state.set(SessionState::Loaded);
                *self.source.borrow_mut() = Some(source.to_string());
                debug!("Session {} loaded '{}'", self.id(), chunk_name);
                Ok(())
            }
            Err(FlowError::Cancelled) => Err(FlowError::Cancelled),
            Err(e) => {
                error!("Failed to load '{}': {}", chunk_name, e);
                Err(e)
            }
        }
    }

    /// Call the global function `name` with `args` under `token`.
    pub async fn call_function(
        &self,
        name: &str,
        token: &CancellationToken,
        args: Vec<ScriptValue>,
    ) -> Result<()> {
        let engine = self.engine()?;
        self.scope.bind(token.clone());

        match self.guarded(token, engine.call_async(name, args)).await {
            Ok(()) => Ok(()),
            Err(FlowError::Cancelled) => Err(FlowError::Cancelled),
            Err(e @ FlowError::NotFound(_)) => {
                error!("Script function '{}' is not callable", name);
                Err(e)
            }
            Err(e) => {
                error!("Script function '{}' failed: {}", name, e);
                Err(e)
            }
        }
    }

    /// Let background tasks such as detached moves run to completion.
    pub async fn settle(&self, token: &CancellationToken) -> Result<()> {
        let pending = self.scope.background_len();
        if pending > 0 {
            debug!("Session {} settling {} background task(s)", self.id(), pending);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FlowError::Cancelled),
            () = self.scope.settle() => Ok(()),
        }
    }

    /// Race `future` against `token` and classify its failure. Background
    /// tasks are driven for as long as `future` runs.
    ///
    /// Script errors raised while unwinding from a cancellation surface as
    /// `Cancelled` rather than as the error text Lua produced.
    async fn guarded<F>(&self, token: &CancellationToken, future: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(FlowError::Cancelled),
            result = future => result,
            never = self.scope.drive_background() => match never {},
        };
        match result {
            Err(_) if !self.scope.is_alive() => Err(FlowError::SessionClosed),
            Err(_) if token.is_cancelled() => Err(FlowError::Cancelled),
            other => other,
        }
    }

    /// Discard the interpreter context and invalidate bound commands.
    pub fn cleanup(&self) {
        if self.state.replace(SessionState::Destroyed) == SessionState::Destroyed {
            return;
        }
        self.scope.invalidate();
        self.engine.borrow_mut().take();
        self.source.borrow_mut().take();
        debug!("Destroyed script session {}", self.id());
    }
}

impl Drop for ScriptSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}
