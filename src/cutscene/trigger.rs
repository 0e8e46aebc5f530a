use std::cell::Cell;

use tracing::debug;

use super::PlaybackOrchestrator;

/// Tag an entity must carry to set off a trigger by default.
pub const DEFAULT_TRIGGER_TAG: &str = "Player";

/// Plays a cutscene the first time a tagged entity enters it.
pub struct CutsceneTrigger {
    chapter: u32,
    name: String,
    required_tag: String,
    armed: Cell<bool>,
}

impl CutsceneTrigger {
    pub fn new(chapter: u32, name: impl Into<String>) -> Self {
        Self {
            chapter,
            name: name.into(),
            required_tag: DEFAULT_TRIGGER_TAG.to_string(),
            armed: Cell::new(true),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.required_tag = tag.into();
        self
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// Re-enable a trigger that already fired.
    pub fn rearm(&self) {
        self.armed.set(true);
    }

    /// Handle an entity tagged `tag` entering the trigger.
    ///
    /// The first matching entry disarms the trigger before playing, so a
    /// rejected or failed playback does not fire it again. Returns whether
    /// the cutscene completed.
    pub async fn on_enter(&self, tag: &str, orchestrator: &PlaybackOrchestrator) -> bool {
        if tag != self.required_tag || !self.armed.replace(false) {
            return false;
        }
        debug!(
            "Trigger for Chap{}/{} entered by '{}'",
            self.chapter, self.name, tag
        );
        orchestrator.play(self.chapter, &self.name).await
    }
}
