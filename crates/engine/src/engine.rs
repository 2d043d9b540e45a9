//! Engine wiring.
//!
//! Startup creates the registry, seeds the built-in theme and motion
//! preferences from the platform media snapshot, subscribes their watchers,
//! and registers any declared custom preferences, in that order, all
//! synchronously. Thereafter, consumers mutate entities directly through
//! their setters; the cross-context storage feed
//! ([`PreferenceEngine::apply_storage_change`]) and the media watchers are
//! the only external re-entry points.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::document::{reflect, DocumentMirror, DocumentSink};
use crate::events::{ChangeCallback, Listeners, PreferenceChange, Subscription};
use crate::media::{MediaFeature, MediaSource, Motion, StaticMedia, Theme, MOTION_KEY, THEME_KEY};
use crate::preference::{Preference, SYSTEM};
use crate::registry::Registry;
use crate::storage::{preference_key, storage_key, MemoryStore, StorageBackend, StorageChange};

/// Collaborators shared by every preference entity: the document sink, the
/// change listeners, and the optional storage backend.
pub(crate) struct Hub {
    document: Box<dyn DocumentSink>,
    storage: Option<Rc<dyn StorageBackend>>,
    listeners: Rc<Listeners>,
}

impl Hub {
    pub(crate) fn reflect(&self, key: &str, resolved: &str) {
        reflect(self.document.as_ref(), key, resolved);
    }

    pub(crate) fn notify(&self, preference: &Preference) {
        let change = PreferenceChange {
            key: preference.key().to_string(),
            preference: preference.clone(),
        };
        self.listeners.dispatch(&change);
    }

    pub(crate) fn persist(&self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            storage.set(&storage_key(key), value);
        }
    }

    fn stored_user(&self, key: &str) -> Option<String> {
        let storage = self.storage.as_ref()?;
        storage.get(&storage_key(key)).filter(|value| !value.is_empty())
    }
}

/// Engine construction options.
///
/// The default wires an in-memory [`DocumentMirror`], an in-memory store, a
/// [`StaticMedia`] source reporting every feature inactive, and no declared
/// custom preferences. Hosts keep their own handle to whatever sink, store,
/// or source they pass in.
pub struct EngineOptions {
    pub document: Box<dyn DocumentSink>,
    pub storage: Option<Rc<dyn StorageBackend>>,
    pub media: Rc<dyn MediaSource>,
    /// Declarative custom preferences: one `(key, initial system value)`
    /// pair per preference, registered after the built-ins at startup. No
    /// re-scan happens later.
    pub declared: Vec<(String, String)>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            document: Box::new(DocumentMirror::new()),
            storage: Some(Rc::new(MemoryStore::new())),
            media: Rc::new(StaticMedia::default()),
            declared: Vec::new(),
        }
    }
}

/// The preference engine: the registry plus the wiring every entity shares.
///
/// Cheap to clone; clones share all state. Construct once per host context
/// (there is exactly one registry per context lifetime).
#[derive(Clone)]
pub struct PreferenceEngine {
    hub: Rc<Hub>,
    registry: Rc<Registry>,
}

impl PreferenceEngine {
    /// Create the engine and run the startup wiring.
    pub fn new(options: EngineOptions) -> Self {
        let EngineOptions { document, storage, media, declared } = options;
        let engine = Self {
            hub: Rc::new(Hub {
                document,
                storage,
                listeners: Rc::new(Listeners::default()),
            }),
            registry: Rc::new(Registry::default()),
        };

        let theme = engine.register(
            THEME_KEY,
            Theme::from_media(media.is_active(MediaFeature::PrefersDarkColorScheme)).as_str(),
        );
        media.watch(
            MediaFeature::PrefersDarkColorScheme,
            Box::new(move |prefers_dark| {
                theme.set_system(Theme::from_media(prefers_dark).as_str());
            }),
        );

        let motion = engine.register(
            MOTION_KEY,
            Motion::from_media(media.is_active(MediaFeature::PrefersReducedMotion)).as_str(),
        );
        media.watch(
            MediaFeature::PrefersReducedMotion,
            Box::new(move |prefers_reduced| {
                motion.set_system(Motion::from_media(prefers_reduced).as_str());
            }),
        );

        for (key, value) in &declared {
            engine.register(key, value);
        }

        engine
    }

    /// Create and register a preference.
    ///
    /// Seeds `user` from storage when a non-empty value is stored, else the
    /// sentinel; seeds `system` from the argument; overwrites any existing
    /// slot under the same key (last writer wins); performs the initial
    /// document reflection. Creation dispatches no change notification.
    pub fn register(&self, key: &str, initial_system: &str) -> Preference {
        let user = self
            .hub
            .stored_user(key)
            .unwrap_or_else(|| SYSTEM.to_string());
        let preference =
            Preference::new(key, user, initial_system.to_string(), Rc::downgrade(&self.hub));
        self.registry.insert(preference.clone());
        self.hub.reflect(key, &preference.resolved());
        preference
    }

    /// Look up a preference by key.
    pub fn get(&self, key: &str) -> Option<Preference> {
        self.registry.get(key)
    }

    /// The built-in theme preference.
    ///
    /// Panics only if the registry slot was never populated, which `new`
    /// always does.
    pub fn theme(&self) -> Preference {
        self.registry
            .get(THEME_KEY)
            .expect("theme preference is registered at startup")
    }

    /// The built-in motion preference.
    pub fn motion(&self) -> Preference {
        self.registry
            .get(MOTION_KEY)
            .expect("motion preference is registered at startup")
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Subscribe to change notifications.
    ///
    /// The returned subscription must be held to keep the observer active;
    /// dropping it unsubscribes.
    pub fn on_change(&self, callback: ChangeCallback) -> Subscription {
        let id = self.hub.listeners.subscribe(callback);
        Subscription::new(&self.hub.listeners, id)
    }

    /// Apply a storage change that originated in another context.
    ///
    /// Acts only on changes whose key carries the module prefix and whose
    /// new value is non-empty; these run the full `set_user` contract on
    /// the matching preference, storage write included, so the
    /// just-received value is echoed back to storage (idempotent). Changes
    /// for unregistered keys have no effect.
    pub fn apply_storage_change(&self, change: &StorageChange) {
        let Some(new_value) = change.new_value.as_deref().filter(|value| !value.is_empty())
        else {
            return;
        };
        let Some(key) = preference_key(&change.key) else {
            return;
        };
        match self.registry.get(key) {
            Some(preference) => preference.set_user(new_value),
            None => debug!("storage change for unregistered preference {key:?} ignored"),
        }
    }
}

// ============================================================================
// Process-wide handle
// ============================================================================

thread_local! {
    static ENGINE: RefCell<Option<PreferenceEngine>> = RefCell::new(None);
}

/// Install the engine as this thread's process-wide handle.
///
/// Optional: the engine is fully usable as a plain value. Installing again
/// replaces the previous handle.
pub fn install(engine: PreferenceEngine) {
    ENGINE.with(|slot| *slot.borrow_mut() = Some(engine));
}

/// Run `f` against the installed engine, or return `None` when
/// [`install`] has not been called on this thread.
pub fn with_engine<R>(f: impl FnOnce(&PreferenceEngine) -> R) -> Option<R> {
    let engine = ENGINE.with(|slot| slot.borrow().clone());
    engine.as_ref().map(f)
}
