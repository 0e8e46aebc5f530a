//! Cutscene playback: the single-flight orchestrator and area triggers.

mod orchestrator;
mod trigger;

pub use orchestrator::{PlaybackOrchestrator, PlaybackState};
pub use trigger::{CutsceneTrigger, DEFAULT_TRIGGER_TAG};
