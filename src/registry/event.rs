//! Named events scripts can publish to host subscribers.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error};

use crate::Result;

/// Identity of one subscription, returned by `subscribe` and used to
/// unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type PlainCallback = Rc<dyn Fn() -> Result<()>>;
type TypedCallback = Rc<dyn Fn(&dyn Any) -> Result<()>>;

#[derive(Clone)]
struct PlainSubscriber {
    id: SubscriptionId,
    callback: PlainCallback,
}

#[derive(Clone)]
struct TypedSubscriber {
    id: SubscriptionId,
    type_id: TypeId,
    callback: TypedCallback,
}

/// Multicast event bus keyed by event name.
///
/// Parameterless and typed subscriptions live in separate maps. Subscribers
/// are notified in subscription order and a failing subscriber never stops
/// the remaining ones.
#[derive(Default)]
pub struct EventBus {
    plain: RefCell<HashMap<String, Vec<PlainSubscriber>>>,
    typed: RefCell<HashMap<String, Vec<TypedSubscriber>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> SubscriptionId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        SubscriptionId(id)
    }

    /// Subscribe a parameterless callback.
    pub fn subscribe<F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        F: Fn() -> Result<()> + 'static,
    {
        let id = self.allocate_id();
        self.plain
            .borrow_mut()
            .entry(name.into())
            .or_default()
            .push(PlainSubscriber {
                id,
                callback: Rc::new(callback),
            });
        id
    }

    /// Subscribe a callback receiving values of type `T`.
    ///
    /// Only `publish_with::<T>` reaches it; payloads of other types published
    /// under the same name are skipped.
    pub fn subscribe_with<T, F>(&self, name: impl Into<String>, callback: F) -> SubscriptionId
    where
        T: Any,
        F: Fn(&T) -> Result<()> + 'static,
    {
        let id = self.allocate_id();
        let erased: TypedCallback = Rc::new(move |value: &dyn Any| match value.downcast_ref::<T>() {
            Some(value) => callback(value),
            None => Ok(()),
        });
        self.typed
            .borrow_mut()
            .entry(name.into())
            .or_default()
            .push(TypedSubscriber {
                id,
                type_id: TypeId::of::<T>(),
                callback: erased,
            });
        id
    }

    /// Remove a subscription. Returns true if it existed.
    ///
    /// The name's slot is dropped once its last subscriber is gone.
    pub fn unsubscribe(&self, name: &str, id: SubscriptionId) -> bool {
        remove_subscriber(&mut self.plain.borrow_mut(), name, |s| s.id == id)
            || remove_subscriber(&mut self.typed.borrow_mut(), name, |s| s.id == id)
    }

    /// Invoke every parameterless subscriber of `name`.
    ///
    /// Returns the number of callbacks invoked. Publishing an event nobody
    /// listens to is not an error.
    pub fn publish(&self, name: &str) -> usize {
        let subscribers = match self.plain.borrow().get(name) {
            Some(list) => list.clone(),
            None => {
                debug!("No subscribers for event '{}'", name);
                return 0;
            }
        };

        for subscriber in &subscribers {
            if let Err(e) = (subscriber.callback)() {
                error!("Event '{}' subscriber {} failed: {}", name, subscriber.id, e);
            }
        }
        subscribers.len()
    }

    /// Invoke every subscriber of `name` whose parameter type is `T`.
    pub fn publish_with<T: Any>(&self, name: &str, value: &T) -> usize {
        let subscribers: Vec<TypedSubscriber> = match self.typed.borrow().get(name) {
            Some(list) => list
                .iter()
                .filter(|s| s.type_id == TypeId::of::<T>())
                .cloned()
                .collect(),
            None => {
                debug!("No typed subscribers for event '{}'", name);
                return 0;
            }
        };

        for subscriber in &subscribers {
            if let Err(e) = (subscriber.callback)(value) {
                error!("Event '{}' subscriber {} failed: {}", name, subscriber.id, e);
            }
        }
        subscribers.len()
    }

    /// Check whether `name` has any subscriber of either kind.
    pub fn has_subscribers(&self, name: &str) -> bool {
        self.subscriber_count(name) > 0
    }

    /// Number of subscribers of either kind for `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.plain.borrow().get(name).map_or(0, Vec::len)
            + self.typed.borrow().get(name).map_or(0, Vec::len)
    }

    /// Number of event names with at least one subscriber.
    pub fn event_count(&self) -> usize {
        let plain = self.plain.borrow();
        let typed = self.typed.borrow();
        plain.len() + typed.keys().filter(|k| !plain.contains_key(*k)).count()
    }

    /// Remove every subscription.
    pub fn clear(&self) {
        self.plain.borrow_mut().clear();
        self.typed.borrow_mut().clear();
    }
}

fn remove_subscriber<S>(
    map: &mut HashMap<String, Vec<S>>,
    name: &str,
    matches: impl Fn(&S) -> bool,
) -> bool {
    let Some(list) = map.get_mut(name) else {
        return false;
    };
    let Some(index) = list.iter().position(matches) else {
        return false;
    };
    list.remove(index);
    if list.is_empty() {
        map.remove(name);
    }
    true
}
