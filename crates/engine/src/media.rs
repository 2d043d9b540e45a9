//! Platform signal watchers.
//!
//! The built-in preferences track boolean platform media features: theme
//! follows "prefers dark color scheme", motion follows "prefers reduced
//! motion". Hosts implement [`MediaSource`] over their platform's query
//! mechanism; [`StaticMedia`] covers hosts without one and
//! [`SimulatedMedia`] lets hosts and tests push change notifications
//! through the full watcher path.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Registry key of the built-in theme preference.
pub const THEME_KEY: &str = "theme";

/// Registry key of the built-in motion preference.
pub const MOTION_KEY: &str = "motion";

/// Boolean platform media features the engine watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFeature {
    /// The platform prefers a dark color scheme.
    PrefersDarkColorScheme,
    /// The platform prefers reduced motion.
    PrefersReducedMotion,
}

/// Callback invoked with a feature's boolean state on every platform change
/// notification, including notifications that repeat the current state.
pub type MediaCallback = Box<dyn FnMut(bool)>;

/// Platform media-feature queries and change subscriptions.
pub trait MediaSource {
    /// Current boolean state of a feature.
    fn is_active(&self, feature: MediaFeature) -> bool;

    /// Subscribe to change notifications for a feature. Subscriptions live
    /// for the lifetime of the source.
    fn watch(&self, feature: MediaFeature, callback: MediaCallback);
}

/// Theme preference value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    /// Map the "prefers dark color scheme" state to a theme value.
    pub fn from_media(prefers_dark: bool) -> Self {
        if prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

/// Motion preference value domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motion {
    Reduced,
    Full,
}

impl Motion {
    /// Map the "prefers reduced motion" state to a motion value.
    pub fn from_media(prefers_reduced: bool) -> Self {
        if prefers_reduced {
            Motion::Reduced
        } else {
            Motion::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Motion::Reduced => "reduced",
            Motion::Full => "full",
        }
    }
}

/// Fixed media states; `watch` is a no-op.
///
/// The default reports every feature inactive, the state to assume when
/// the platform query mechanism is unsupported (the less restrictive value
/// for each built-in).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticMedia {
    pub prefers_dark: bool,
    pub prefers_reduced_motion: bool,
}

impl StaticMedia {
    pub fn new(prefers_dark: bool, prefers_reduced_motion: bool) -> Self {
        Self { prefers_dark, prefers_reduced_motion }
    }
}

impl MediaSource for StaticMedia {
    fn is_active(&self, feature: MediaFeature) -> bool {
        match feature {
            MediaFeature::PrefersDarkColorScheme => self.prefers_dark,
            MediaFeature::PrefersReducedMotion => self.prefers_reduced_motion,
        }
    }

    fn watch(&self, _feature: MediaFeature, _callback: MediaCallback) {}
}

/// Mutable media states that fire watchers on every update.
///
/// Hosts bridging a real platform query push its change notifications
/// through [`set_active`](SimulatedMedia::set_active); tests drive it
/// directly. Handles are cheap to clone and share state.
#[derive(Clone, Default)]
pub struct SimulatedMedia {
    state: Rc<RefCell<SimulatedState>>,
}

#[derive(Default)]
struct SimulatedState {
    active: HashMap<MediaFeature, bool>,
    watchers: HashMap<MediaFeature, Vec<Rc<RefCell<MediaCallback>>>>,
}

impl SimulatedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset feature states before handing the source to an engine.
    pub fn with_active(self, feature: MediaFeature, active: bool) -> Self {
        self.state.borrow_mut().active.insert(feature, active);
        self
    }

    /// Update a feature's state and notify its watchers.
    ///
    /// Watchers fire even when the state is unchanged, matching platforms
    /// that deliver redundant change notifications.
    pub fn set_active(&self, feature: MediaFeature, active: bool) {
        self.state.borrow_mut().active.insert(feature, active);
        let watchers: Vec<Rc<RefCell<MediaCallback>>> = self
            .state
            .borrow()
            .watchers
            .get(&feature)
            .cloned()
            .unwrap_or_default();
        for watcher in watchers {
            if let Ok(mut watcher) = watcher.try_borrow_mut() {
                (*watcher)(active);
            }
        }
    }
}

impl MediaSource for SimulatedMedia {
    fn is_active(&self, feature: MediaFeature) -> bool {
        self.state.borrow().active.get(&feature).copied().unwrap_or(false)
    }

    fn watch(&self, feature: MediaFeature, callback: MediaCallback) {
        self.state
            .borrow_mut()
            .watchers
            .entry(feature)
            .or_default()
            .push(Rc::new(RefCell::new(callback)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_mapping() {
        assert_eq!(Theme::from_media(true).as_str(), "dark");
        assert_eq!(Theme::from_media(false).as_str(), "light");
        assert_eq!(Motion::from_media(true).as_str(), "reduced");
        assert_eq!(Motion::from_media(false).as_str(), "full");
    }

    #[test]
    fn test_static_media_defaults_to_inactive() {
        let media = StaticMedia::default();
        assert!(!media.is_active(MediaFeature::PrefersDarkColorScheme));
        assert!(!media.is_active(MediaFeature::PrefersReducedMotion));
    }

    #[test]
    fn test_simulated_media_fires_watchers() {
        let media = SimulatedMedia::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        media.watch(
            MediaFeature::PrefersDarkColorScheme,
            Box::new(move |active| sink.borrow_mut().push(active)),
        );

        media.set_active(MediaFeature::PrefersDarkColorScheme, true);
        media.set_active(MediaFeature::PrefersDarkColorScheme, true);
        media.set_active(MediaFeature::PrefersDarkColorScheme, false);

        // Redundant updates still fire.
        assert_eq!(*seen.borrow(), vec![true, true, false]);
        assert!(!media.is_active(MediaFeature::PrefersDarkColorScheme));
    }

    #[test]
    fn test_watchers_are_per_feature() {
        let media = SimulatedMedia::new();
        let seen = Rc::new(RefCell::new(0u32));
        let sink = seen.clone();
        media.watch(
            MediaFeature::PrefersReducedMotion,
            Box::new(move |_| *sink.borrow_mut() += 1),
        );

        media.set_active(MediaFeature::PrefersDarkColorScheme, true);
        assert_eq!(*seen.borrow(), 0);
        media.set_active(MediaFeature::PrefersReducedMotion, true);
        assert_eq!(*seen.borrow(), 1);
    }
}
