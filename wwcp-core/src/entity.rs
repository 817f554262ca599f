//! Shared identity and property-change event bus for every entity in the
//! hierarchy (EVSE, station, pool, operator, roaming network).
//!
//! Every level owns an [`EntityBase`] and forwards its children's property
//! changes upward by subscribing to the child's bus and re-firing the same
//! event (not a re-wrapped one — the original sender id is preserved, so a
//! provider listening at the top of the hierarchy can always tell which
//! EVSE or station actually changed).

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// A small closed set of value kinds carried by [`PropertyChangedEvent`].
///
/// Deliberately not `serde_json::Value`: property changes are a logging and
/// wiring concern, not a wire format, so a small enum keeps call sites
/// type-aware without pulling in a general-purpose value type.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    OptText(Option<String>),
    Status(String),
    Bool(bool),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<Option<&str>> for PropertyValue {
    fn from(s: Option<&str>) -> Self {
        PropertyValue::OptText(s.map(|s| s.to_string()))
    }
}

/// A single property change, as seen by any subscriber along the forwarding
/// chain. `sender_id` always names the entity the change originated at,
/// even after the event has been forwarded several levels up.
#[derive(Debug, Clone)]
pub struct PropertyChangedEvent<Id> {
    pub instant: DateTime<Utc>,
    pub sender_id: Id,
    pub property: &'static str,
    pub old: PropertyValue,
    pub new: PropertyValue,
}

type PropertyHandler<Id> = Arc<dyn Fn(&PropertyChangedEvent<Id>) + Send + Sync>;

/// Identity plus a property-changed bus, embedded in every entity.
pub struct EntityBase<Id: Clone + Send + Sync + 'static> {
    pub id: Id,
    handlers: RwLock<Vec<PropertyHandler<Id>>>,
}

impl<Id: Clone + Send + Sync + 'static> EntityBase<Id> {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to this entity's own property changes, and to every
    /// change forwarded up from its children.
    pub fn on_property_changed(&self, handler: impl Fn(&PropertyChangedEvent<Id>) + Send + Sync + 'static) {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Fire a property change originating at this entity.
    pub fn fire_property_changed(&self, property: &'static str, old: PropertyValue, new: PropertyValue) {
        let event = PropertyChangedEvent {
            instant: crate::now(),
            sender_id: self.id.clone(),
            property,
            old,
            new,
        };
        self.fire_raw(&event);
    }

    /// Re-fire an event that originated elsewhere, preserving its original
    /// `sender_id`. This is how a parent forwards a child's change upward
    /// without masquerading as the sender.
    pub fn fire_raw(&self, event: &PropertyChangedEvent<Id>) {
        for handler in self.handlers.read().iter() {
            handler(event);
        }
    }

    /// Wire `child`'s property changes to also fire on `self`, preserving
    /// the child's `sender_id`. Used to build the station→pool→operator→
    /// roaming-network forwarding chain.
    pub fn forward_from(self: &Arc<Self>, child: &EntityBase<Id>) {
        let parent = Arc::clone(self);
        child.on_property_changed(move |event| parent.fire_raw(event));
    }
}

/// A `HashMap<K, Arc<V>>` that fires add/remove notifications around
/// mutation, reused by [`crate::station::ChargingStation`] for its owned
/// EVSE set.
pub struct ReactiveMap<K: Eq + Hash + Clone + Send + Sync + 'static, V: Send + Sync + 'static> {
    entries: RwLock<HashMap<K, Arc<V>>>,
    on_add: RwLock<Vec<Arc<dyn Fn(&K, &Arc<V>) + Send + Sync>>>,
    on_remove: RwLock<Vec<Arc<dyn Fn(&K, &Arc<V>) + Send + Sync>>>,
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static, V: Send + Sync + 'static> Default for ReactiveMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static, V: Send + Sync + 'static> ReactiveMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            on_add: RwLock::new(Vec::new()),
            on_remove: RwLock::new(Vec::new()),
        }
    }

    pub fn on_add(&self, handler: impl Fn(&K, &Arc<V>) + Send + Sync + 'static) {
        self.on_add.write().push(Arc::new(handler));
    }

    pub fn on_remove(&self, handler: impl Fn(&K, &Arc<V>) + Send + Sync + 'static) {
        self.on_remove.write().push(Arc::new(handler));
    }

    /// Insert a new entry and fire the add handlers. Returns `false`
    /// without inserting or firing if `key` is already present.
    pub fn insert(&self, key: K, value: Arc<V>) -> bool {
        {
            let mut entries = self.entries.write();
            if entries.contains_key(&key) {
                return false;
            }
            entries.insert(key.clone(), Arc::clone(&value));
        }
        for handler in self.on_add.read().iter() {
            handler(&key, &value);
        }
        true
    }

    /// Remove an entry and fire the remove handlers, if it existed.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let removed = self.entries.write().remove(key);
        if let Some(value) = &removed {
            for handler in self.on_remove.read().iter() {
                handler(key, value);
            }
        }
        removed
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<Arc<V>> {
        self.entries.read().values().cloned().collect()
    }

    pub fn keys(&self) -> Vec<K>
    where
        K: Debug,
    {
        self.entries.read().keys().cloned().collect()
    }
}

/// A plain fire-and-forget broadcaster for a single named domain event
/// (e.g. `OnNewChargingSession`, `OnReservationCancelled`). Distinct from
/// [`EntityBase`]'s property-changed bus, which always carries an
/// old/new pair and a property name; a domain event instead carries
/// whatever payload is natural for that event.
pub struct EventBus<T> {
    handlers: RwLock<Vec<Arc<dyn Fn(&T) + Send + Sync>>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) {
        self.handlers.write().push(Arc::new(handler));
    }

    pub fn fire(&self, event: &T) {
        for handler in self.handlers.read().iter() {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fire_property_changed_reaches_subscribers() {
        let base: EntityBase<String> = EntityBase::new("station-1".to_string());
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        base.on_property_changed(move |_event| {
            seen2.fetch_add(1, Ordering::SeqCst);
        });
        base.fire_property_changed("name", PropertyValue::from("a"), PropertyValue::from("b"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn forward_from_preserves_original_sender_id() {
        let parent: Arc<EntityBase<String>> = Arc::new(EntityBase::new("pool-1".to_string()));
        let child: EntityBase<String> = EntityBase::new("station-1".to_string());
        parent.forward_from(&child);

        let seen_sender = Arc::new(parking_lot::Mutex::new(String::new()));
        let seen_sender2 = seen_sender.clone();
        parent.on_property_changed(move |event| {
            *seen_sender2.lock() = event.sender_id.clone();
        });

        child.fire_property_changed("name", PropertyValue::from("a"), PropertyValue::from("b"));
        assert_eq!(*seen_sender.lock(), "station-1");
    }

    #[test]
    fn reactive_map_fires_add_and_remove() {
        let map: ReactiveMap<String, i32> = ReactiveMap::new();
        let adds = Arc::new(AtomicUsize::new(0));
        let removes = Arc::new(AtomicUsize::new(0));
        let adds2 = adds.clone();
        let removes2 = removes.clone();
        map.on_add(move |_, _| {
            adds2.fetch_add(1, Ordering::SeqCst);
        });
        map.on_remove(move |_, _| {
            removes2.fetch_add(1, Ordering::SeqCst);
        });

        assert!(map.insert("e1".to_string(), Arc::new(1)));
        assert!(!map.insert("e1".to_string(), Arc::new(2)), "duplicate insert must be rejected");
        assert_eq!(adds.load(Ordering::SeqCst), 1);

        assert!(map.remove(&"e1".to_string()).is_some());
        assert_eq!(removes.load(Ordering::SeqCst), 1);
        assert!(map.remove(&"e1".to_string()).is_none());
        assert_eq!(removes.load(Ordering::SeqCst), 1, "removing a missing key must not fire");
    }
}
