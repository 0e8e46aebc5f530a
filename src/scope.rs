//! Cancellation and liveness shared by a session and the commands it hands out.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::future::{poll_fn, Future};
use std::mem;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{FlowError, Result};

/// Execution scope of one script session.
///
/// Every command created for a session holds the scope. Suspending
/// operations wait through it so they observe the current playback's
/// cancellation token, and once the session is destroyed the scope refuses
/// further use.
///
/// The scope also owns the session's background tasks, such as detached
/// moves. They make progress only while the playback drives them, so no
/// task-local executor is needed.
pub struct SessionScope {
    id: Uuid,
    token: RefCell<CancellationToken>,
    alive: Cell<bool>,
    tick: Duration,
    running: RefCell<FuturesUnordered<LocalBoxFuture<'static, ()>>>,
    incoming: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    waker: RefCell<Option<Waker>>,
}

impl SessionScope {
    /// Create a live scope with a fresh token.
    pub fn new(tick: Duration) -> Rc<Self> {
        Rc::new(Self {
            id: Uuid::new_v4(),
            token: RefCell::new(CancellationToken::new()),
            alive: Cell::new(true),
            tick,
            running: RefCell::new(FuturesUnordered::new()),
            incoming: RefCell::new(Vec::new()),
            waker: RefCell::new(None),
        })
    }

    /// Scope identifier, shared with the owning session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Length of one scheduler tick.
    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Token observed by suspension points.
    pub fn token(&self) -> CancellationToken {
        self.token.borrow().clone()
    }

    /// Bind the token of the playback currently driving the session.
    pub fn bind(&self, token: CancellationToken) {
        *self.token.borrow_mut() = token;
    }

    /// Returns true until the session is destroyed.
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Mark the session destroyed and stop anything still waiting on it.
    pub fn invalidate(&self) {
        self.alive.set(false);
        self.token.borrow().cancel();
        // Tasks hold the scope; dropping them breaks the cycle. A task being
        // polled right now ends on its next tick instead.
        if let Ok(mut running) = self.running.try_borrow_mut() {
            running.clear();
        }
        if let Ok(mut incoming) = self.incoming.try_borrow_mut() {
            incoming.clear();
        }
    }

    /// Fail if the session is gone or its playback was cancelled.
    pub fn ensure_live(&self) -> Result<()> {
        if !self.alive.get() {
            return Err(FlowError::SessionClosed);
        }
        if self.token.borrow().is_cancelled() {
            return Err(FlowError::Cancelled);
        }
        Ok(())
    }

    /// Sleep for `duration` unless cancelled first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.ensure_live()?;
        let token = self.token();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FlowError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Yield for one tick.
    pub async fn tick(&self) -> Result<()> {
        self.sleep(self.tick).await
    }

    /// Queue `task` to run in the background of this session.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        if !self.alive.get() {
            return;
        }
        self.incoming.borrow_mut().push(task.boxed_local());
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    /// Number of background tasks that have not finished yet.
    pub fn background_len(&self) -> usize {
        let running = self.running.try_borrow().map_or(0, |running| running.len());
        running + self.incoming.try_borrow().map_or(0, |incoming| incoming.len())
    }

    /// Drive background tasks forever. Meant to be raced against the
    /// script being run.
    pub async fn drive_background(&self) -> Infallible {
        poll_fn(|cx| match self.poll_background(cx) {
            Poll::Ready(()) | Poll::Pending => Poll::Pending,
        })
        .await
    }

    /// Drive background tasks until none is left.
    pub async fn settle(&self) {
        poll_fn(|cx| self.poll_background(cx)).await
    }

    fn poll_background(&self, cx: &mut Context<'_>) -> Poll<()> {
        let Ok(mut running) = self.running.try_borrow_mut() else {
            return Poll::Pending;
        };
        loop {
            let queued = mem::take(&mut *self.incoming.borrow_mut());
            running.extend(queued);
            match running.poll_next_unpin(cx) {
                Poll::Ready(Some(())) => {}
                Poll::Ready(None) if self.incoming.borrow().is_empty() => {
                    *self.waker.borrow_mut() = Some(cx.waker().clone());
                    return Poll::Ready(());
                }
                Poll::Ready(None) => {}
                Poll::Pending => {
                    *self.waker.borrow_mut() = Some(cx.waker().clone());
                    return Poll::Pending;
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScope")
            .field("id", &self.id)
            .field("alive", &self.alive.get())
            .field("tick", &self.tick)
            .field("background", &self.background_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes() {
        let scope = SessionScope::new(Duration::from_millis(10));
        scope.sleep(Duration::from_secs(1)).await.unwrap();
        scope.tick().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_cancel() {
        let scope = SessionScope::new(Duration::from_millis(10));
        let token = CancellationToken::new();
        scope.bind(token.clone());

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(scope.sleep(Duration::from_secs(60)), canceller);
        assert!(matches!(result, Err(FlowError::Cancelled)));
    }

    #[test]
    fn test_invalidate_closes_scope() {
        let scope = SessionScope::new(Duration::from_millis(10));
        assert!(scope.ensure_live().is_ok());

        let token = scope.token();
        scope.invalidate();

        assert!(!scope.is_alive());
        assert!(token.is_cancelled());
        assert!(matches!(scope.ensure_live(), Err(FlowError::SessionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_tasks_run_until_settled() {
        let scope = SessionScope::new(Duration::from_millis(10));
        let finished = Rc::new(Cell::new(0));

        for delay in [30, 10] {
            let tasks_scope = Rc::clone(&scope);
            let finished = Rc::clone(&finished);
            scope.spawn(async move {
                if tasks_scope.sleep(Duration::from_millis(delay)).await.is_ok() {
                    finished.set(finished.get() + 1);
                }
            });
        }
        assert_eq!(scope.background_len(), 2);

        scope.settle().await;
        assert_eq!(finished.get(), 2);
        assert_eq!(scope.background_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_progresses_beside_foreground() {
        let scope = SessionScope::new(Duration::from_millis(10));
        let done = Rc::new(Cell::new(false));

        let flag = Rc::clone(&done);
        let task_scope = Rc::clone(&scope);
        scope.spawn(async move {
            if task_scope.sleep(Duration::from_millis(50)).await.is_ok() {
                flag.set(true);
            }
        });

        let foreground = tokio::time::sleep(Duration::from_millis(100));
        tokio::select! {
            () = foreground => {}
            never = scope.drive_background() => match never {},
        }
        assert!(done.get());
    }

    #[test]
    fn test_invalidate_drops_background_tasks() {
        let scope = SessionScope::new(Duration::from_millis(10));
        let task_scope = Rc::clone(&scope);
        scope.spawn(async move {
            let _ = task_scope.tick().await;
        });
        assert_eq!(Rc::strong_count(&scope), 2);

        scope.invalidate();
        assert_eq!(scope.background_len(), 0);
        assert_eq!(Rc::strong_count(&scope), 1);

        scope.spawn(async {});
        assert_eq!(scope.background_len(), 0);
    }

    #[test]
    fn test_rebinding_token_revives_after_cancel() {
        let scope = SessionScope::new(Duration::from_millis(10));
        scope.token().cancel();
        assert!(matches!(scope.ensure_live(), Err(FlowError::Cancelled)));

        scope.bind(CancellationToken::new());
        assert!(scope.ensure_live().is_ok());
    }
}
