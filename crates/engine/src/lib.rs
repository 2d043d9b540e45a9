//! Preference resolution engine.
//!
//! Each named preference carries three tiers:
//! - `user`: an explicit override, or the sentinel `"system"`
//! - `system`: the platform-detected value
//! - `resolved`: derived, the user override unless it is the sentinel,
//!   else the system value
//!
//! All mutation flows through the entity's two setters, which perform, in
//! fixed order: state update, document reflection, change notification, and
//! (user values only) a storage write. The cross-context storage feed and
//! the platform media watchers are the only external re-entry points after
//! startup.

pub mod document;
pub mod engine;
pub mod events;
pub mod media;
pub mod preference;
pub mod registry;
pub mod storage;

pub use document::{reflect, DocumentMirror, DocumentSink};
pub use engine::{install, with_engine, EngineOptions, PreferenceEngine};
pub use events::{ChangeCallback, ChangeCollector, PreferenceChange, Subscription};
pub use media::{
    MediaCallback, MediaFeature, MediaSource, Motion, SimulatedMedia, StaticMedia, Theme,
    MOTION_KEY, THEME_KEY,
};
pub use preference::{Preference, PreferenceSnapshot, SYSTEM};
pub use registry::Registry;
pub use storage::{
    preference_key, storage_key, DiskStore, MemoryStore, StorageBackend, StorageChange,
    STORAGE_PREFIX,
};

/// Module name, visible to hosts as the storage-key prefix and the
/// config-directory name.
pub const MODULE_PREFIX: &str = "prefsync";
