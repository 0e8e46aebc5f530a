//! LuaFlow - Lua-scripted cutscenes for a host application.
//!
//! Host code registers actions and event subscribers, exposes its entities
//! through an [`EntityResolver`], and lets the [`PlaybackOrchestrator`] run
//! one cutscene script at a time. Everything runs on a single thread; the
//! async parts expect a tokio runtime with the time driver enabled. Work a
//! script starts in the background is owned and driven by its playback, so
//! no `LocalSet` is required.

pub mod app;
pub mod config;
pub mod cutscene;
pub mod entity;
pub mod error;
pub mod logging;
pub mod registry;
pub mod scene;
pub mod scope;
pub mod script;
pub mod value;

pub use app::{Application, ApplicationBuilder};
pub use config::Config;
pub use cutscene::{CutsceneTrigger, PlaybackOrchestrator, PlaybackState};
pub use entity::{
    Animator, CameraRig, CapabilityKind, CapabilityServices, Entity, EntityFacade, EntityHandle,
    EntityRef, EntityResolver,
};
pub use error::{FlowError, Result};
pub use registry::{ActionRegistry, ActionShape, EventBus, SubscriptionId};
pub use scene::{EntityRegistry, FollowCamera, SceneObject, TimedAnimator};
pub use scope::SessionScope;
pub use script::{
    DirectoryScriptSource, MemoryScriptSource, ScriptEngine, ScriptSession, ScriptSource,
    SessionState,
};
pub use value::{FromScriptValue, ScriptValue};
