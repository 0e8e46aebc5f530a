use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mlua::{UserData, UserDataMethods};

use super::command::{
    ActionCommand, AnimationCommand, CameraCommand, CommandBase, CommandRef, EventCommand,
    MovementCommand, ScriptCommand, TransformCommand,
};
use super::{CapabilityKind, CapabilityServices, EntityRef};
use crate::scope::SessionScope;
use crate::{FlowError, Result};

#[derive(Clone)]
enum CachedCommand {
    Transform(Rc<TransformCommand>),
    Movement(Rc<MovementCommand>),
    Animation(Rc<AnimationCommand>),
    Camera(Rc<CameraCommand>),
    Action(Rc<ActionCommand>),
    Event(Rc<EventCommand>),
}

trait Cached: ScriptCommand + Sized {
    fn build(base: CommandBase) -> Self;
    fn wrap(command: Rc<Self>) -> CachedCommand;
    fn unwrap(cached: &CachedCommand) -> Option<Rc<Self>>;
}

macro_rules! cached_command {
    ($command:ty, $variant:ident) => {
        impl Cached for $command {
            fn build(base: CommandBase) -> Self {
                <$command>::new(base)
            }

            fn wrap(command: Rc<Self>) -> CachedCommand {
                CachedCommand::$variant(command)
            }

            fn unwrap(cached: &CachedCommand) -> Option<Rc<Self>> {
                match cached {
                    CachedCommand::$variant(command) => Some(Rc::clone(command)),
                    _ => None,
                }
            }
        }
    };
}

cached_command!(TransformCommand, Transform);
cached_command!(MovementCommand, Movement);
cached_command!(AnimationCommand, Animation);
cached_command!(CameraCommand, Camera);
cached_command!(ActionCommand, Action);
cached_command!(EventCommand, Event);

/// A resolved entity as seen by a script.
///
/// Each capability accessor returns the same command object on every call;
/// it is built and initialized on first access.
pub struct EntityHandle {
    key: String,
    entity: EntityRef,
    scope: Rc<SessionScope>,
    services: Rc<CapabilityServices>,
    commands: RefCell<HashMap<CapabilityKind, CachedCommand>>,
}

impl EntityHandle {
    pub(crate) fn new(
        key: impl Into<String>,
        entity: EntityRef,
        scope: Rc<SessionScope>,
        services: Rc<CapabilityServices>,
    ) -> Self {
        Self {
            key: key.into(),
            entity,
            scope,
            services,
            commands: RefCell::new(HashMap::new()),
        }
    }

    /// Key the entity was resolved by.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Number of capability commands created so far.
    pub fn cached_count(&self) -> usize {
        self.commands.borrow().len()
    }

    fn capability<C: Cached>(&self) -> Rc<C> {
        if let Some(existing) = self.commands.borrow().get(&C::KIND).and_then(C::unwrap) {
            return existing;
        }

        let base = CommandBase::new(
            Rc::clone(&self.entity),
            Rc::clone(&self.scope),
            Rc::clone(&self.services),
        );
        let command = Rc::new(C::build(base));
        command.initialize();
        self.commands
            .borrow_mut()
            .insert(C::KIND, C::wrap(Rc::clone(&command)));
        command
    }

    pub fn transform(&self) -> Rc<TransformCommand> {
        self.capability()
    }

    pub fn movement(&self) -> Rc<MovementCommand> {
        self.capability()
    }

    pub fn animation(&self) -> Rc<AnimationCommand> {
        self.capability()
    }

    pub fn camera(&self) -> Rc<CameraCommand> {
        self.capability()
    }

    pub fn actions(&self) -> Rc<ActionCommand> {
        self.capability()
    }

    pub fn events(&self) -> Rc<EventCommand> {
        self.capability()
    }

    /// Show or hide the entity.
    pub fn set_active(&self, active: bool) -> Result<()> {
        self.scope.ensure_live()?;
        self.entity.set_active(active);
        Ok(())
    }
}

impl UserData for EntityHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("transform", |_, this, ()| Ok(CommandRef(this.transform())));
        methods.add_method("move", |_, this, ()| Ok(CommandRef(this.movement())));
        methods.add_method("animation", |_, this, ()| Ok(CommandRef(this.animation())));
        methods.add_method("camera", |_, this, ()| Ok(CommandRef(this.camera())));
        methods.add_method("action", |_, this, ()| Ok(CommandRef(this.actions())));
        methods.add_method("event", |_, this, ()| Ok(CommandRef(this.events())));
        methods.add_method("setActive", |_, this, active: bool| {
            this.set_active(active).map_err(FlowError::into_lua)
        });
        methods.add_method("name", |_, this, ()| Ok(this.entity.name().to_string()));
        methods.add_method("key", |_, this, ()| Ok(this.key.clone()));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use futures::future::{FutureExt, LocalBoxFuture};
    use glam::Vec2;

    use super::*;
    use crate::entity::{Animator, Entity};
    use crate::registry::{ActionRegistry, EventBus};

    struct Dummy {
        position: Cell<Vec2>,
        active: Cell<bool>,
        animator: Option<Rc<dyn Animator>>,
    }

    impl Entity for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }
        fn position(&self) -> Vec2 {
            self.position.get()
        }
        fn set_position(&self, position: Vec2) {
            self.position.set(position);
        }
        fn set_rotation(&self, _: Vec2) {}
        fn set_scale(&self, _: Vec2) {}
        fn set_active(&self, active: bool) {
            self.active.set(active);
        }
        fn is_active(&self) -> bool {
            self.active.get()
        }
        fn animator(&self) -> Option<Rc<dyn Animator>> {
            self.animator.clone()
        }
    }

    struct Flipper {
        facing_right: Cell<bool>,
    }

    impl Animator for Flipper {
        fn play_animation<'a>(&'a self, _: &'a str, _: bool) -> LocalBoxFuture<'a, Result<()>> {
            async { Ok(()) }.boxed_local()
        }
        fn flip(&self, is_right: bool) {
            self.facing_right.set(is_right);
        }
    }

    fn handle_for(animator: Option<Rc<dyn Animator>>) -> (EntityHandle, Rc<SessionScope>) {
        let entity: EntityRef = Rc::new(Dummy {
            position: Cell::new(Vec2::ZERO),
            active: Cell::new(true),
            animator,
        });
        let scope = SessionScope::new(Duration::from_millis(20));
        let services = Rc::new(CapabilityServices::new(
            Rc::new(ActionRegistry::new()),
            Rc::new(EventBus::new()),
        ));
        (
            EntityHandle::new("dummy", entity, Rc::clone(&scope), services),
            scope,
        )
    }

    #[test]
    fn test_capabilities_are_cached() {
        let (handle, _scope) = handle_for(None);
        assert_eq!(handle.cached_count(), 0);

        let first = handle.movement();
        let second = handle.movement();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.is_initialized());
        assert_eq!(handle.cached_count(), 1);

        handle.transform();
        handle.events();
        assert_eq!(handle.cached_count(), 3);
    }

    #[test]
    fn test_animation_without_animator() {
        let (handle, _scope) = handle_for(None);
        let result = handle.animation().flip(true);
        assert!(matches!(result, Err(FlowError::NotFound(_))));
    }

    #[test]
    fn test_animation_flip() {
        let flipper = Rc::new(Flipper {
            facing_right: Cell::new(false),
        });
        let (handle, _scope) = handle_for(Some(flipper.clone()));
        handle.animation().flip(true).unwrap();
        assert!(flipper.facing_right.get());
    }

    #[test]
    fn test_commands_refuse_after_invalidate() {
        let (handle, scope) = handle_for(None);
        let transform = handle.transform();
        transform.set_position(1.0, 2.0).unwrap();

        scope.invalidate();
        assert!(matches!(
            transform.set_position(3.0, 4.0),
            Err(FlowError::SessionClosed)
        ));
        assert!(matches!(
            handle.set_active(false),
            Err(FlowError::SessionClosed)
        ));
        assert_eq!(handle.entity().position(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_lua_identity_equality() {
        let (handle, _scope) = handle_for(None);
        let lua = mlua::Lua::new();
        lua.globals().set("player", handle).unwrap();

        let same: bool = lua
            .load("return player:move() == player:move()")
            .eval()
            .unwrap();
        let different: bool = lua
            .load("return player:move() == player:transform()")
            .eval()
            .unwrap();
        let label: String = lua.load("return tostring(player:move())").eval().unwrap();

        assert!(same);
        assert!(!different);
        assert_eq!(label, "Movement(dummy)");
    }
}
