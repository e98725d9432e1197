//! The live session container.

use std::rc::Rc;

use crate::config::ConfRef;
use crate::namespace::{Namespace, Value};

/// Session key under which the active configuration is bound.
pub const CONF_KEY: &str = "conf";

/// The persistable part of the console namespace.
///
/// The container itself is never swapped during a run; reloads clear and
/// refill it so anything holding the session keeps seeing current data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    namespace: Namespace,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session holding only the active configuration.
    pub fn seeded(conf: &ConfRef) -> Self {
        let mut session = Self::new();
        session
            .namespace
            .insert(CONF_KEY, Value::Config(Rc::clone(conf)));
        session
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.namespace.get(name)
    }

    pub fn len(&self) -> usize {
        self.namespace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty()
    }

    /// Clear the session, then fill it from `loaded`.
    pub fn replace_with(&mut self, loaded: Namespace) {
        self.namespace.clear();
        self.namespace.extend(loaded);
    }

    /// Merge `loaded` into the session, keeping entries it does not name.
    pub fn update_with(&mut self, loaded: Namespace) {
        self.namespace.extend(loaded);
    }

    /// Apply a restored configuration snapshot to `live`, then bind `live`
    /// under [`CONF_KEY`].
    ///
    /// Returns whether a snapshot was applied.
    pub fn adopt_config(&mut self, live: &ConfRef) -> bool {
        let applied = match self.namespace.get(CONF_KEY) {
            Some(Value::Config(saved)) if !Rc::ptr_eq(saved, live) => {
                let saved = saved.borrow().clone();
                live.borrow_mut().configure(&saved);
                true
            }
            _ => false,
        };
        self.namespace
            .insert(CONF_KEY, Value::Config(Rc::clone(live)));
        applied
    }
}
