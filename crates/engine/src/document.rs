//! Document reflection.
//!
//! Projects a preference's resolved value onto the host surface: one data
//! attribute per preference key on the root element, plus a color-scheme
//! presentation property driven by the theme preference. Reflection is a
//! pure side effect and cannot fail.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::media::THEME_KEY;

/// Host surface receiving resolved preference values.
///
/// Hosts with a real presentation tree implement this over their root
/// element; headless hosts and tests use [`DocumentMirror`].
pub trait DocumentSink {
    /// Set the data attribute named after a preference key on the root
    /// element.
    fn set_data_attribute(&self, key: &str, value: &str);

    /// Set the root element's color-scheme presentation property.
    fn set_color_scheme(&self, value: &str);
}

/// Project a resolved value onto the document.
///
/// The theme preference additionally drives the color-scheme property.
pub fn reflect(document: &dyn DocumentSink, key: &str, value: &str) {
    document.set_data_attribute(key, value);
    if key == THEME_KEY {
        document.set_color_scheme(value);
    }
}

/// In-memory model of the host root element.
///
/// The default sink. Handles are cheap to clone and share state, so a host
/// can keep one clone to read reflected values back after handing another
/// to the engine.
#[derive(Clone, Default)]
pub struct DocumentMirror {
    state: Rc<RefCell<MirrorState>>,
}

#[derive(Default)]
struct MirrorState {
    attributes: BTreeMap<String, String>,
    color_scheme: Option<String>,
}

impl DocumentMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reflected data attribute for a preference key, if any.
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.state.borrow().attributes.get(key).cloned()
    }

    /// All reflected data attributes, ordered by key.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.state.borrow().attributes.clone()
    }

    /// The color-scheme property, once the theme preference has reflected.
    pub fn color_scheme(&self) -> Option<String> {
        self.state.borrow().color_scheme.clone()
    }
}

impl DocumentSink for DocumentMirror {
    fn set_data_attribute(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .attributes
            .insert(key.to_string(), value.to_string());
    }

    fn set_color_scheme(&self, value: &str) {
        self.state.borrow_mut().color_scheme = Some(value.to_string());
    }
}
