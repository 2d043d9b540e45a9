//! The preference entity.
//!
//! A `Preference` holds the `user` and `system` slots for one key and owns
//! the resolution rule. The side-effecting contract is explicit in the API
//! rather than hidden behind property interception: every mutation updates
//! state, reflects the resolved value onto the host document, notifies
//! observers, and (user values only) persists the override.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;

use crate::engine::Hub;

/// The `user` value meaning "no override; defer to the system value".
///
/// Assigning this sentinel through [`Preference::set_user`] persists the
/// literal token, which on reload is indistinguishable from a preference
/// that was never configured. That matches the persisted contract: storage
/// always holds the raw `user` string.
pub const SYSTEM: &str = "system";

/// A single named preference.
///
/// Handles are cheap to clone and all clones share the same state. An entity
/// is created once, lives for the lifetime of its engine, and is never
/// removed from the registry.
#[derive(Clone)]
pub struct Preference {
    inner: Rc<PreferenceInner>,
}

struct PreferenceInner {
    key: String,
    user: RefCell<String>,
    system: RefCell<String>,
    hub: Weak<Hub>,
}

/// Point-in-time view of a preference, for observers and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceSnapshot {
    pub user: String,
    pub system: String,
    pub resolved: String,
}

impl Preference {
    pub(crate) fn new(key: &str, user: String, system: String, hub: Weak<Hub>) -> Self {
        Self {
            inner: Rc::new(PreferenceInner {
                key: key.to_string(),
                user: RefCell::new(user),
                system: RefCell::new(system),
                hub,
            }),
        }
    }

    /// The registry key. Immutable after creation.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// The user override, or [`SYSTEM`] when deferring to the system value.
    pub fn user(&self) -> String {
        self.inner.user.borrow().clone()
    }

    /// The platform-detected value. Never the sentinel.
    pub fn system(&self) -> String {
        self.inner.system.borrow().clone()
    }

    /// The effective value: `user` unless it is the sentinel, else `system`.
    ///
    /// Recomputed on every call, never stored, no side effects.
    pub fn resolved(&self) -> String {
        let user = self.inner.user.borrow();
        if *user == SYSTEM {
            self.inner.system.borrow().clone()
        } else {
            user.clone()
        }
    }

    /// True when the user has overridden the system value.
    pub fn is_overridden(&self) -> bool {
        *self.inner.user.borrow() != SYSTEM
    }

    /// Freeze the current state of all three tiers.
    pub fn snapshot(&self) -> PreferenceSnapshot {
        PreferenceSnapshot {
            user: self.user(),
            system: self.system(),
            resolved: self.resolved(),
        }
    }

    /// Set the user override.
    ///
    /// Setting the current value is a no-op: no reflection, no notification,
    /// no storage write. Otherwise, in fixed order: the value is stored, the
    /// resolved value is reflected onto the document, observers are
    /// notified, and the raw value (sentinel included) is written to storage
    /// under the prefixed key.
    pub fn set_user(&self, value: impl Into<String>) {
        let value = value.into();
        if *self.inner.user.borrow() == value {
            return;
        }
        *self.inner.user.borrow_mut() = value.clone();
        if let Some(hub) = self.inner.hub.upgrade() {
            hub.reflect(&self.inner.key, &self.resolved());
            hub.notify(self);
            hub.persist(&self.inner.key, &value);
        }
    }

    /// Set the system value.
    ///
    /// No dedup check, deliberately distinct from [`set_user`]: platform
    /// signals may fire redundantly, and every call reflects and notifies.
    /// System values are never persisted.
    ///
    /// [`set_user`]: Preference::set_user
    pub fn set_system(&self, value: impl Into<String>) {
        *self.inner.system.borrow_mut() = value.into();
        if let Some(hub) = self.inner.hub.upgrade() {
            hub.reflect(&self.inner.key, &self.resolved());
            hub.notify(self);
        }
    }
}

impl fmt::Debug for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preference")
            .field("key", &self.inner.key)
            .field("user", &*self.inner.user.borrow())
            .field("system", &*self.inner.system.borrow())
            .field("resolved", &self.resolved())
            .finish()
    }
}
