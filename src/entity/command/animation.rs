use std::cell::RefCell;
use std::rc::Rc;

use mlua::{UserData, UserDataMethods};
use tracing::{debug, warn};

use super::{add_command_meta, CommandBase, CommandRef, ScriptCommand};
use crate::entity::{Animator, CapabilityKind};
use crate::{FlowError, Result};

/// Animation playback on an entity's animator.
pub struct AnimationCommand {
    base: CommandBase,
    animator: RefCell<Option<Rc<dyn Animator>>>,
    last_played: RefCell<Option<String>>,
}

impl AnimationCommand {
    pub(crate) fn new(base: CommandBase) -> Self {
        Self {
            base,
            animator: RefCell::new(None),
            last_played: RefCell::new(None),
        }
    }

    fn animator(&self) -> Result<Rc<dyn Animator>> {
        self.animator.borrow().clone().ok_or_else(|| {
            warn!("Entity '{}' has no animator", self.base.entity().name());
            FlowError::NotFound(format!("animator on '{}'", self.base.entity().name()))
        })
    }

    /// Play `name`, optionally waiting for it to finish.
    ///
    /// Cancelling the playback interrupts the wait, not the animation.
    pub async fn play(&self, name: &str, wait_for_completion: bool) -> Result<()> {
        self.base.ensure_live()?;
        let animator = self.animator()?;
        debug!(
            "Playing animation '{}' on '{}'",
            name,
            self.base.entity().name()
        );
        *self.last_played.borrow_mut() = Some(name.to_string());

        let token = self.base.scope().token();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FlowError::Cancelled),
            result = animator.play_animation(name, wait_for_completion) => result,
        }
    }

    /// Face right or left.
    pub fn flip(&self, is_right: bool) -> Result<()> {
        self.base.ensure_live()?;
        self.animator()?.flip(is_right);
        Ok(())
    }

    /// Name of the last animation started through this command.
    pub fn last_played(&self) -> Option<String> {
        self.last_played.borrow().clone()
    }
}

impl ScriptCommand for AnimationCommand {
    const KIND: CapabilityKind = CapabilityKind::Animation;

    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn initialize(&self) {
        if self.base.begin_initialize() {
            *self.animator.borrow_mut() = self.base.entity().animator();
        }
    }
}

impl UserData for CommandRef<AnimationCommand> {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_async_method("play", |_, this, (name, wait): (String, Option<bool>)| {
            let command = Rc::clone(&this.0);
            async move {
                command
                    .play(&name, wait.unwrap_or(false))
                    .await
                    .map_err(FlowError::into_lua)
            }
        });
        methods.add_method("flip", |_, this, is_right: bool| {
            this.0.flip(is_right).map_err(FlowError::into_lua)
        });
        add_command_meta(methods);
    }
}
