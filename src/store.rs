//! Observable keyed store
//!
//! `Store<K, V>` is the collection every entity register is built on. Entries
//! keep insertion order and values are shared as `Arc<V>`: a stored value is
//! never mutated in place, so a write whose value is the same allocation as the
//! current one is a no-op.
//!
//! Every mutating call emits at most one event per kind, carrying all entries
//! it actually changed.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Kind of change carried by a [`StoreEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEventKind {
    Set,
    Delete,
}

/// One changed entry. For deletes, `value` is the value that was removed.
#[derive(Debug)]
pub struct Change<K, V> {
    pub key: K,
    pub value: Arc<V>,
}

impl<K: Clone, V> Clone for Change<K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

/// A batched notification emitted once per mutating call.
#[derive(Debug)]
pub struct StoreEvent<K, V> {
    pub kind: StoreEventKind,
    pub changes: Vec<Change<K, V>>,
}

impl<K: Clone, V> Clone for StoreEvent<K, V> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            changes: self.changes.clone(),
        }
    }
}

/// Callback invoked with every event of the kind it was registered for.
pub type Listener<K, V> = Arc<dyn Fn(&StoreEvent<K, V>) + Send + Sync>;

/// Cancellation flag observed by listener registrations.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Owner side of an [`AbortSignal`]. Aborting is idempotent.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn abort(&self) {
        self.signal.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }
}

/// Handle returned by [`Store::subscribe`]; dropping it keeps the subscription alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    controller: AbortController,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.controller.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.controller.is_aborted()
    }
}

struct Registration<K, V> {
    kind: StoreEventKind,
    listener: Listener<K, V>,
    signal: Option<AbortSignal>,
}

impl<K, V> Registration<K, V> {
    fn is_aborted(&self) -> bool {
        self.signal.as_ref().is_some_and(AbortSignal::is_aborted)
    }
}

pub struct Store<K, V> {
    order: Vec<K>,
    entries: HashMap<K, Arc<V>>,
    listeners: Vec<Registration<K, V>>,
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
            listeners: Vec::new(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("order", &self.order)
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).cloned()
    }

    /// Write a single entry. Returns whether the store changed.
    pub fn set(&mut self, key: K, value: impl Into<Arc<V>>) -> bool {
        self.set_many([(key, value.into())]) > 0
    }

    /// Write many entries, emitting one `Set` event for all that changed.
    /// Returns the number of changed keys.
    pub fn set_many<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, Arc<V>)>,
    {
        let mut changes: Vec<Change<K, V>> = Vec::new();
        for (key, value) in entries {
            if let Some(existing) = self.entries.get(&key) {
                if Arc::ptr_eq(existing, &value) {
                    continue;
                }
            } else {
                self.order.push(key.clone());
            }
            self.entries.insert(key.clone(), Arc::clone(&value));

            match changes.iter_mut().find(|change| change.key == key) {
                Some(change) => change.value = value,
                None => changes.push(Change { key, value }),
            }
        }

        let changed = changes.len();
        self.emit(StoreEventKind::Set, changes);
        changed
    }

    /// Remove a single entry. Returns whether it existed.
    pub fn delete(&mut self, key: &K) -> bool {
        self.delete_many([key.clone()]) > 0
    }

    /// Remove many entries, emitting one `Delete` event for the ones that existed.
    pub fn delete_many<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
    {
        let mut changes = Vec::new();
        for key in keys {
            if let Some(value) = self.entries.remove(&key) {
                changes.push(Change { key, value });
            }
        }
        if !changes.is_empty() {
            self.order.retain(|key| self.entries.contains_key(key));
        }

        let removed = changes.len();
        self.emit(StoreEventKind::Delete, changes);
        removed
    }

    /// Remove everything, emitting one `Delete` event listing every removed entry.
    pub fn clear(&mut self) -> usize {
        let mut entries = std::mem::take(&mut self.entries);
        let changes: Vec<Change<K, V>> = std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|value| Change { key, value }))
            .collect();

        let removed = changes.len();
        self.emit(StoreEventKind::Delete, changes);
        removed
    }

    pub fn entries(&self) -> Vec<(K, Arc<V>)> {
        self.order
            .iter()
            .filter_map(|key| {
                self.entries
                    .get(key)
                    .map(|value| (key.clone(), Arc::clone(value)))
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<K> {
        self.order.clone()
    }

    pub fn values(&self) -> Vec<Arc<V>> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    /// Register a listener. Registering the same listener twice for the same
    /// kind is a no-op. An aborted `signal` removes the registration.
    pub fn add_event_listener(
        &mut self,
        kind: StoreEventKind,
        listener: Listener<K, V>,
        signal: Option<AbortSignal>,
    ) {
        if signal.as_ref().is_some_and(AbortSignal::is_aborted) {
            return;
        }
        self.prune_aborted();
        let exists = self
            .listeners
            .iter()
            .any(|reg| reg.kind == kind && same_listener(&reg.listener, &listener));
        if exists {
            return;
        }
        self.listeners.push(Registration {
            kind,
            listener,
            signal,
        });
    }

    pub fn remove_event_listener(&mut self, kind: StoreEventKind, listener: &Listener<K, V>) {
        self.listeners
            .retain(|reg| !(reg.kind == kind && same_listener(&reg.listener, listener)));
    }

    /// Number of live listeners for `kind`.
    pub fn listener_count(&mut self, kind: StoreEventKind) -> usize {
        self.prune_aborted();
        self.listeners.iter().filter(|reg| reg.kind == kind).count()
    }

    /// Subscribe to both event kinds, restricted to keys accepted by `filter`.
    /// Events whose changes are all filtered out are not delivered.
    pub fn subscribe<F, C>(&mut self, filter: F, callback: C) -> Subscription
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: Fn(&K) -> bool + Send + Sync + 'static,
        C: Fn(&StoreEvent<K, V>) + Send + Sync + 'static,
    {
        let controller = AbortController::new();
        let listener: Listener<K, V> = Arc::new(move |event: &StoreEvent<K, V>| {
            let changes: Vec<Change<K, V>> = event
                .changes
                .iter()
                .filter(|change| filter(&change.key))
                .cloned()
                .collect();
            if changes.is_empty() {
                return;
            }
            callback(&StoreEvent {
                kind: event.kind,
                changes,
            });
        });

        for kind in [StoreEventKind::Set, StoreEventKind::Delete] {
            self.add_event_listener(kind, Arc::clone(&listener), Some(controller.signal()));
        }

        Subscription { controller }
    }

    fn prune_aborted(&mut self) {
        self.listeners.retain(|reg| !reg.is_aborted());
    }

    fn emit(&mut self, kind: StoreEventKind, changes: Vec<Change<K, V>>) {
        if changes.is_empty() {
            return;
        }
        self.prune_aborted();

        // Snapshot first: registrations made while notifying wait for the next event.
        let listeners: Vec<Listener<K, V>> = self
            .listeners
            .iter()
            .filter(|reg| reg.kind == kind)
            .map(|reg| Arc::clone(&reg.listener))
            .collect();
        if listeners.is_empty() {
            return;
        }

        let event = StoreEvent { kind, changes };
        for listener in listeners {
            listener(&event);
        }
    }
}

fn same_listener<K, V>(a: &Listener<K, V>, b: &Listener<K, V>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(StoreEventKind, Vec<String>)>>>;

    fn recording_listener(log: &Log) -> Listener<String, u32> {
        let log = Arc::clone(log);
        Arc::new(move |event: &StoreEvent<String, u32>| {
            let keys = event.changes.iter().map(|c| c.key.clone()).collect();
            log.lock().unwrap().push((event.kind, keys));
        })
    }

    fn store_with_log() -> (Store<String, u32>, Log) {
        let mut store = Store::new();
        let log: Log = Arc::default();
        let listener = recording_listener(&log);
        store.add_event_listener(StoreEventKind::Set, Arc::clone(&listener), None);
        store.add_event_listener(StoreEventKind::Delete, listener, None);
        (store, log)
    }

    #[test]
    fn bulk_set_emits_single_event() {
        let (mut store, log) = store_with_log();

        let changed = store.set_many(vec![
            ("a".to_string(), Arc::new(1)),
            ("b".to_string(), Arc::new(2)),
            ("c".to_string(), Arc::new(3)),
        ]);

        assert_eq!(changed, 3);
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, StoreEventKind::Set);
        assert_eq!(log[0].1, vec!["a", "b", "c"]);
    }

    #[test]
    fn identical_value_is_a_no_op() {
        let (mut store, log) = store_with_log();
        store.set("a".to_string(), 1u32);
        let current = store.get(&"a".to_string()).unwrap();

        assert!(!store.set("a".to_string(), current));
        assert_eq!(log.lock().unwrap().len(), 1);

        // Equal content in a fresh allocation is a real write.
        assert!(store.set("a".to_string(), 1u32));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn delete_skips_missing_keys() {
        let (mut store, log) = store_with_log();
        store.set("a".to_string(), 1u32);

        assert_eq!(store.delete_many(vec!["a".to_string(), "zzz".to_string()]), 1);
        assert!(!store.delete(&"missing".to_string()));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1], (StoreEventKind::Delete, vec!["a".to_string()]));
    }

    #[test]
    fn clear_emits_once_and_only_when_non_empty() {
        let (mut store, log) = store_with_log();
        assert_eq!(store.clear(), 0);
        assert!(log.lock().unwrap().is_empty());

        store.set("a".to_string(), 1u32);
        store.set("b".to_string(), 2u32);
        assert_eq!(store.clear(), 2);

        let log = log.lock().unwrap();
        assert_eq!(log.last().unwrap().1, vec!["a", "b"]);
        assert!(store.is_empty());
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut store: Store<u32, &str> = Store::new();
        store.set(3, "c");
        store.set(1, "a");
        store.set(2, "b");
        store.delete(&1);
        store.set(1, "a2");

        assert_eq!(store.keys(), vec![3, 2, 1]);
        let values: Vec<&str> = store.values().iter().map(|v| **v).collect();
        assert_eq!(values, vec!["c", "b", "a2"]);
    }

    #[test]
    fn listener_registration_has_set_semantics() {
        let mut store: Store<String, u32> = Store::new();
        let log: Log = Arc::default();
        let listener = recording_listener(&log);

        store.add_event_listener(StoreEventKind::Set, Arc::clone(&listener), None);
        store.add_event_listener(StoreEventKind::Set, Arc::clone(&listener), None);
        assert_eq!(store.listener_count(StoreEventKind::Set), 1);

        store.set("a".to_string(), 1u32);
        assert_eq!(log.lock().unwrap().len(), 1);

        store.remove_event_listener(StoreEventKind::Set, &listener);
        store.set("b".to_string(), 2u32);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn abort_signal_removes_listener() {
        let mut store: Store<String, u32> = Store::new();
        let log: Log = Arc::default();
        let controller = AbortController::new();
        store.add_event_listener(
            StoreEventKind::Set,
            recording_listener(&log),
            Some(controller.signal()),
        );

        store.set("a".to_string(), 1u32);
        controller.abort();
        controller.abort();
        store.set("b".to_string(), 2u32);

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(store.listener_count(StoreEventKind::Set), 0);
    }

    #[test]
    fn subscribe_filters_keys() {
        let mut store: Store<String, u32> = Store::new();
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let subscription = store.subscribe(
            |key: &String| key.starts_with("2024"),
            move |event| {
                for change in &event.changes {
                    sink.lock().unwrap().push(change.key.clone());
                }
            },
        );

        store.set_many(vec![
            ("2024-01-01".to_string(), Arc::new(1)),
            ("2023-12-31".to_string(), Arc::new(2)),
        ]);
        store.set("2023-01-01".to_string(), 3u32);
        store.delete(&"2024-01-01".to_string());

        assert_eq!(*seen.lock().unwrap(), vec!["2024-01-01", "2024-01-01"]);

        subscription.unsubscribe();
        assert!(!subscription.is_active());
        store.set("2024-02-02".to_string(), 4u32);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn subscribe_shares_values_without_cloning_them() {
        #[derive(Debug)]
        struct Opaque(u32);

        let mut store: Store<u32, Opaque> = Store::new();
        let seen: Arc<Mutex<Vec<Arc<Opaque>>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let _subscription = store.subscribe(
            |key: &u32| *key > 1,
            move |event| {
                for change in &event.changes {
                    sink.lock().unwrap().push(Arc::clone(&change.value));
                }
            },
        );

        let kept = Arc::new(Opaque(2));
        store.set_many(vec![(1, Arc::new(Opaque(1))), (2, Arc::clone(&kept))]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 2);
        assert!(Arc::ptr_eq(&seen[0], &kept));
    }
}
