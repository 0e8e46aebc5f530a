//! Script sources keyed by chapter and script name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::debug;

use crate::{FlowError, Result};

/// Supplies script text for a `(chapter, name)` pair.
pub trait ScriptSource {
    fn load_script<'a>(
        &'a self,
        chapter: u32,
        name: &'a str,
    ) -> LocalBoxFuture<'a, Result<String>>;
}

/// Loads scripts from `{scripts_dir}/Chap{chapter}/{name}.lua`.
pub struct DirectoryScriptSource {
    scripts_dir: PathBuf,
}

impl DirectoryScriptSource {
    pub fn new<P: AsRef<Path>>(scripts_dir: P) -> Self {
        Self {
            scripts_dir: scripts_dir.as_ref().to_path_buf(),
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Path of the script file, or an error for names that would leave the
    /// chapter directory.
    pub fn script_path(&self, chapter: u32, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(FlowError::Validation(format!(
                "invalid script name '{}'",
                name
            )));
        }

        Ok(self
            .scripts_dir
            .join(format!("Chap{}", chapter))
            .join(format!("{}.lua", name)))
    }
}

impl ScriptSource for DirectoryScriptSource {
    fn load_script<'a>(
        &'a self,
        chapter: u32,
        name: &'a str,
    ) -> LocalBoxFuture<'a, Result<String>> {
        async move {
            let path = self.script_path(chapter, name)?;
            debug!("Loading script {}", path.display());
            match tokio::fs::read_to_string(&path).await {
                Ok(source) => Ok(source),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FlowError::NotFound(
                    format!("script {}", path.display()),
                )),
                Err(e) => Err(e.into()),
            }
        }
        .boxed_local()
    }
}

/// In-memory scripts, mainly for tests and embedding.
#[derive(Default)]
pub struct MemoryScriptSource {
    scripts: RefCell<HashMap<(u32, String), String>>,
}

impl MemoryScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a script.
    pub fn insert(&self, chapter: u32, name: impl Into<String>, source: impl Into<String>) {
        self.scripts
            .borrow_mut()
            .insert((chapter, name.into()), source.into());
    }

    pub fn with_script(
        self,
        chapter: u32,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        self.insert(chapter, name, source);
        self
    }

    pub fn remove(&self, chapter: u32, name: &str) -> bool {
        self.scripts
            .borrow_mut()
            .remove(&(chapter, name.to_string()))
            .is_some()
    }
}

impl ScriptSource for MemoryScriptSource {
    fn load_script<'a>(
        &'a self,
        chapter: u32,
        name: &'a str,
    ) -> LocalBoxFuture<'a, Result<String>> {
        let found = self
            .scripts
            .borrow()
            .get(&(chapter, name.to_string()))
            .cloned();
        async move {
            found.ok_or_else(|| FlowError::NotFound(format!("script Chap{}/{}", chapter, name)))
        }
        .boxed_local()
    }
}
