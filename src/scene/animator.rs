use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::debug;

use crate::entity::Animator;
use crate::Result;

/// Animator whose clips simply take a fixed time to play.
#[derive(Default)]
pub struct TimedAnimator {
    clips: HashMap<String, Duration>,
    current: RefCell<Option<String>>,
    facing_right: Cell<bool>,
    played: RefCell<Vec<String>>,
}

impl TimedAnimator {
    pub fn new() -> Self {
        Self {
            facing_right: Cell::new(true),
            ..Self::default()
        }
    }

    /// Declare a clip and its length. Unknown clips finish immediately.
    pub fn with_clip(mut self, name: impl Into<String>, length: Duration) -> Self {
        self.clips.insert(name.into(), length);
        self
    }

    pub fn current(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    pub fn is_facing_right(&self) -> bool {
        self.facing_right.get()
    }

    /// Every clip started so far, in order.
    pub fn played(&self) -> Vec<String> {
        self.played.borrow().clone()
    }
}

impl Animator for TimedAnimator {
    fn play_animation<'a>(
        &'a self,
        name: &'a str,
        wait_for_completion: bool,
    ) -> LocalBoxFuture<'a, Result<()>> {
        *self.current.borrow_mut() = Some(name.to_string());
        self.played.borrow_mut().push(name.to_string());
        let length = self.clips.get(name).copied().unwrap_or_default();
        debug!("Clip '{}' started ({:?})", name, length);

        async move {
            if wait_for_completion {
                tokio::time::sleep(length).await;
            }
            Ok(())
        }
        .boxed_local()
    }

    fn flip(&self, is_right: bool) {
        self.facing_right.set(is_right);
    }
}
