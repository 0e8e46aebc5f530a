//! Lua sessions running cutscene scripts.
//!
//! Each playback gets a fresh sandboxed Lua state with three host
//! primitives installed: `wait`, `log` and `get`. Script text comes from a
//! [`ScriptSource`].

pub mod engine;
pub mod loader;
pub mod primitives;
pub mod session;

pub use engine::{ResourceLimits, ScriptEngine};
pub use loader::{DirectoryScriptSource, MemoryScriptSource, ScriptSource};
pub use primitives::ScriptPrimitives;
pub use session::{ScriptSession, SessionState};
