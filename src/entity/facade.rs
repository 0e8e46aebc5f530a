use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{CapabilityServices, EntityHandle, EntityResolver};
use crate::scope::SessionScope;

/// Entry point scripts use to look up entities.
pub struct EntityFacade {
    resolver: Rc<dyn EntityResolver>,
    services: Rc<CapabilityServices>,
    tick: Duration,
}

impl EntityFacade {
    pub fn new(
        resolver: Rc<dyn EntityResolver>,
        services: Rc<CapabilityServices>,
        tick: Duration,
    ) -> Self {
        Self {
            resolver,
            services,
            tick,
        }
    }

    pub fn services(&self) -> &Rc<CapabilityServices> {
        &self.services
    }

    /// Tick length given to the scopes this facade creates.
    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Resolve `key` outside any session.
    ///
    /// The handle gets a scope of its own, so its suspending commands can
    /// only be stopped by dropping them.
    pub fn resolve(&self, key: &str) -> Option<EntityHandle> {
        self.resolve_in(key, &SessionScope::new(self.tick))
    }

    /// Resolve `key` for use inside the session owning `scope`.
    pub fn resolve_in(&self, key: &str, scope: &Rc<SessionScope>) -> Option<EntityHandle> {
        match self.resolver.get_entity(key) {
            Some(entity) => {
                debug!("Resolved entity '{}'", key);
                Some(EntityHandle::new(
                    key,
                    entity,
                    Rc::clone(scope),
                    Rc::clone(&self.services),
                ))
            }
            None => {
                warn!("Cannot find entity: {}", key);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::entity::Entity;
    use crate::registry::{ActionRegistry, EventBus};
    use crate::scene::{EntityRegistry, SceneObject};
    use crate::FlowError;

    fn facade() -> EntityFacade {
        let scene = Rc::new(EntityRegistry::new());
        scene.register_all([SceneObject::new("Player").into_ref()]);
        let services = Rc::new(CapabilityServices::new(
            Rc::new(ActionRegistry::new()),
            Rc::new(EventBus::new()),
        ));
        EntityFacade::new(scene, services, Duration::from_millis(20))
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_outside_session() {
        let facade = facade();
        assert!(facade.resolve("Nobody").is_none());

        let handle = facade.resolve("Player").unwrap();
        assert_eq!(handle.key(), "Player");
        handle
            .movement()
            .move_to(Vec2::new(1.0, 0.0), None)
            .await
            .unwrap();
        assert_eq!(handle.entity().position(), Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_resolve_in_shares_scope() {
        let facade = facade();
        let scope = SessionScope::new(facade.tick_interval());
        let first = facade.resolve_in("Player", &scope).unwrap();
        let second = facade.resolve_in("Player", &scope).unwrap();

        scope.invalidate();
        assert!(matches!(first.set_active(false), Err(FlowError::SessionClosed)));
        assert!(matches!(second.set_active(false), Err(FlowError::SessionClosed)));
    }
}
