use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ScriptConfig;
use crate::entity::EntityFacade;
use crate::script::{ScriptSession, ScriptSource};
use crate::{FlowError, Result};

/// Where the orchestrator is in a playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl PlaybackState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlaybackState::Cancelled | PlaybackState::Completed | PlaybackState::Failed
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Running => "running",
            PlaybackState::Cancelled => "cancelled",
            PlaybackState::Completed => "completed",
            PlaybackState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Plays one cutscene at a time.
///
/// A play request made while another playback is in progress is rejected,
/// never queued. Every playback gets its own session and cancellation
/// token.
pub struct PlaybackOrchestrator {
    source: Rc<dyn ScriptSource>,
    facade: Rc<EntityFacade>,
    script_config: ScriptConfig,
    entry_function: String,
    busy: Cell<bool>,
    state: Cell<PlaybackState>,
    last_outcome: Cell<Option<PlaybackState>>,
    session: RefCell<Option<Rc<ScriptSession>>>,
    token: RefCell<Option<CancellationToken>>,
}

impl PlaybackOrchestrator {
    pub fn new(
        source: Rc<dyn ScriptSource>,
        facade: Rc<EntityFacade>,
        script_config: ScriptConfig,
        entry_function: impl Into<String>,
    ) -> Self {
        Self {
            source,
            facade,
            script_config,
            entry_function: entry_function.into(),
            busy: Cell::new(false),
            state: Cell::new(PlaybackState::Idle),
            last_outcome: Cell::new(None),
            session: RefCell::new(None),
            token: RefCell::new(None),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    /// Terminal state of the most recent playback.
    pub fn last_outcome(&self) -> Option<PlaybackState> {
        self.last_outcome.get()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn entry_function(&self) -> &str {
        &self.entry_function
    }

    /// The live session, if any. A session outlives a successful playback
    /// until the next one starts.
    pub fn session(&self) -> Option<Rc<ScriptSession>> {
        self.session.borrow().clone()
    }

    /// Play `Chap{chapter}/{name}`. Returns whether it ran to completion.
    pub async fn play(&self, chapter: u32, name: &str) -> bool {
        self.try_play(chapter, name).await.is_ok()
    }

    /// Like [`play`](Self::play) but reports why a playback did not
    /// complete.
    pub async fn try_play(&self, chapter: u32, name: &str) -> Result<()> {
        if self.busy.get() {
            warn!(
                "A cutscene is already playing, ignoring Chap{}/{}",
                chapter, name
            );
            return Err(FlowError::AlreadyBusy);
        }

        let token = CancellationToken::new();
        let mut guard = PlaybackGuard::engage(self, token.clone());
        info!("Playing cutscene Chap{}/{}", chapter, name);

        match self.run(chapter, name, &token).await {
            Ok(()) => {
                info!("Cutscene Chap{}/{} completed", chapter, name);
                guard.finish(PlaybackState::Completed);
                Ok(())
            }
            Err(FlowError::Cancelled) => {
                info!("Cutscene Chap{}/{} was cancelled", chapter, name);
                self.destroy_session();
                guard.finish(PlaybackState::Cancelled);
                Err(FlowError::Cancelled)
            }
            Err(e) => {
                error!("Cutscene Chap{}/{} failed: {}", chapter, name, e);
                self.destroy_session();
                guard.finish(PlaybackState::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, chapter: u32, name: &str, token: &CancellationToken) -> Result<()> {
        let source = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(FlowError::Cancelled),
            source = self.source.load_script(chapter, name) => source?,
        };

        self.destroy_session();
        let session = Rc::new(ScriptSession::create(
            Rc::clone(&self.facade),
            &self.script_config,
        )?);
        *self.session.borrow_mut() = Some(Rc::clone(&session));

        let chunk_name = format!("Chap{}/{}", chapter, name);
        session.load_and_run(&source, &chunk_name, token).await?;

        self.state.set(PlaybackState::Running);
        session
            .call_function(&self.entry_function, token, Vec::new())
            .await?;
        session.settle(token).await
    }

    /// Cancel the active playback. Returns false when nothing is playing.
    pub fn cancel(&self) -> bool {
        match self.token.borrow().as_ref() {
            Some(token) => {
                info!("Cancelling cutscene");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel any playback and destroy the current session.
    pub fn shutdown(&self) {
        self.cancel();
        self.destroy_session();
    }

    fn destroy_session(&self) {
        let previous = self.session.borrow_mut().take();
        if let Some(session) = previous {
            session.cleanup();
        }
    }
}

/// Resets the busy flag and disposes the playback token however the play
/// future ends, including being dropped.
struct PlaybackGuard<'a> {
    orchestrator: &'a PlaybackOrchestrator,
    outcome: Option<PlaybackState>,
}

impl<'a> PlaybackGuard<'a> {
    fn engage(orchestrator: &'a PlaybackOrchestrator, token: CancellationToken) -> Self {
        orchestrator.busy.set(true);
        orchestrator.state.set(PlaybackState::Loading);
        *orchestrator.token.borrow_mut() = Some(token);
        Self {
            orchestrator,
            outcome: None,
        }
    }

    fn finish(&mut self, outcome: PlaybackState) {
        self.outcome = Some(outcome);
    }
}

impl Drop for PlaybackGuard<'_> {
    fn drop(&mut self) {
        let orchestrator = self.orchestrator;
        let outcome = match self.outcome {
            Some(outcome) => outcome,
            None => {
                debug!("Playback dropped before it finished");
                orchestrator.destroy_session();
                PlaybackState::Cancelled
            }
        };

        orchestrator.token.borrow_mut().take();
        orchestrator.last_outcome.set(Some(outcome));
        orchestrator.state.set(PlaybackState::Idle);
        orchestrator.busy.set(false);
    }
}
