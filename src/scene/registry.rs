use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::entity::{EntityRef, EntityResolver};

/// Key to entity map used to resolve names requested by scripts.
#[derive(Default)]
pub struct EntityRegistry {
    entities: RefCell<HashMap<String, EntityRef>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entity` under `key`, replacing any previous entry.
    pub fn register(&self, key: impl Into<String>, entity: EntityRef) {
        let key = key.into();
        debug!("Registered entity '{}'", key);
        self.entities.borrow_mut().insert(key, entity);
    }

    /// Register each entity under its own name.
    pub fn register_all<I>(&self, entities: I)
    where
        I: IntoIterator<Item = EntityRef>,
    {
        for entity in entities {
            let key = entity.name().to_string();
            self.register(key, entity);
        }
    }

    pub fn unregister(&self, key: &str) -> bool {
        self.entities.borrow_mut().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entities.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entities.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entities.borrow_mut().clear();
    }
}

impl EntityResolver for EntityRegistry {
    fn get_entity(&self, key: &str) -> Option<EntityRef> {
        self.entities.borrow().get(key).map(Rc::clone)
    }
}
