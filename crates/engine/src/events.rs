//! Change notifications.
//!
//! Every `user` or `system` mutation dispatches a [`PreferenceChange`] to
//! all subscribed observers, synchronously, before the triggering setter
//! returns. Delivery is in-process only; cross-context propagation is
//! layered on top by the storage bridge, not by this notifier.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::preference::{Preference, PreferenceSnapshot};

/// Payload delivered to change observers.
///
/// `preference` is a live handle, not a frozen copy: an observer that holds
/// it past further mutation sees the latest state. Take a
/// [`snapshot`](Preference::snapshot) to freeze the observed values.
#[derive(Clone)]
pub struct PreferenceChange {
    /// Key of the preference that changed.
    pub key: String,
    /// The changed preference.
    pub preference: Preference,
}

/// Callback invoked synchronously on every preference change.
pub type ChangeCallback = Box<dyn FnMut(&PreferenceChange)>;

type SharedCallback = Rc<RefCell<ChangeCallback>>;

/// Registry of change observers.
///
/// Dispatch iterates a snapshot of the subscriber list, so an observer may
/// subscribe, unsubscribe, or mutate preferences from within its callback;
/// mutations re-run the full setter contract before the outer dispatch
/// continues. An observer re-entered while it is itself executing is
/// skipped for the inner dispatch.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, SharedCallback)>>,
}

impl Listeners {
    pub(crate) fn subscribe(&self, callback: ChangeCallback) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(callback))));
        id
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.entries.borrow_mut().retain(|(entry_id, _)| *entry_id != id);
    }

    pub(crate) fn dispatch(&self, change: &PreferenceChange) {
        let callbacks: Vec<SharedCallback> = self
            .entries
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            if let Ok(mut callback) = callback.try_borrow_mut() {
                (*callback)(change);
            }
        }
    }
}

/// Observer registration guard returned by
/// [`PreferenceEngine::on_change`](crate::PreferenceEngine::on_change).
///
/// The subscription must be held to keep the observer active; dropping it
/// unsubscribes.
#[must_use = "dropping the subscription unsubscribes the observer"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(listeners: &Rc<Listeners>, id: u64) -> Self {
        Self {
            listeners: Rc::downgrade(listeners),
            id,
        }
    }

    /// Keep the observer registered for the lifetime of the engine.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.unsubscribe(self.id);
        }
    }
}

/// Records every change it observes, in dispatch order.
///
/// Test helper, also the simplest template for host observers: subscribe
/// its [`callback`](ChangeCollector::callback) and inspect the records.
#[derive(Clone, Default)]
pub struct ChangeCollector {
    records: Rc<RefCell<Vec<(String, PreferenceSnapshot)>>>,
}

impl ChangeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback to pass to `PreferenceEngine::on_change`.
    ///
    /// Snapshots are taken at dispatch time, so the records preserve the
    /// state each observer actually saw.
    pub fn callback(&self) -> ChangeCallback {
        let records = self.records.clone();
        Box::new(move |change: &PreferenceChange| {
            records
                .borrow_mut()
                .push((change.key.clone(), change.preference.snapshot()));
        })
    }

    /// All records so far, as `(key, snapshot)` pairs.
    pub fn records(&self) -> Vec<(String, PreferenceSnapshot)> {
        self.records.borrow().clone()
    }

    /// Keys of all records so far, in dispatch order.
    pub fn keys(&self) -> Vec<String> {
        self.records.borrow().iter().map(|(key, _)| key.clone()).collect()
    }

    /// The most recent record.
    pub fn last(&self) -> Option<(String, PreferenceSnapshot)> {
        self.records.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Weak as RcWeak;

    fn change(key: &str, user: &str, system: &str) -> PreferenceChange {
        let preference =
            Preference::new(key, user.to_string(), system.to_string(), RcWeak::new());
        PreferenceChange { key: key.to_string(), preference }
    }

    #[test]
    fn test_collector_records_in_dispatch_order() {
        let listeners = Rc::new(Listeners::default());
        let collector = ChangeCollector::new();
        let _id = listeners.subscribe(collector.callback());

        listeners.dispatch(&change("theme", "dark", "light"));
        listeners.dispatch(&change("motion", "system", "full"));

        assert_eq!(collector.keys(), vec!["theme", "motion"]);
        let (_, snapshot) = collector.records().remove(0);
        assert_eq!(snapshot.resolved, "dark");
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let listeners = Rc::new(Listeners::default());
        let collector = ChangeCollector::new();
        let id = listeners.subscribe(collector.callback());

        listeners.dispatch(&change("theme", "dark", "light"));
        listeners.unsubscribe(id);
        listeners.dispatch(&change("theme", "light", "light"));

        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn test_subscribing_from_within_a_callback() {
        let listeners = Rc::new(Listeners::default());
        let collector = ChangeCollector::new();
        let inner = collector.clone();
        let inner_listeners = Rc::downgrade(&listeners);
        let _id = listeners.subscribe(Box::new(move |_change| {
            if let Some(listeners) = inner_listeners.upgrade() {
                listeners.subscribe(inner.callback());
            }
        }));

        // One new collector subscription per dispatch; no panic, no skipped
        // delivery for already-registered observers.
        listeners.dispatch(&change("theme", "dark", "light"));
        listeners.dispatch(&change("theme", "light", "light"));
        assert_eq!(collector.len(), 1);
    }
}
