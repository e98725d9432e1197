//! The explicit execution environment handed to every component.

use std::rc::Rc;

use super::{Namespace, Value};
use crate::config::{Conf, ConfRef};
use crate::extension::ExtensionRegistry;
use crate::session::Session;

/// Everything a statement can see: the global namespace built from
/// extensions, the persistable session, the live configuration and the
/// registry extensions are resolved from.
#[derive(Debug)]
pub struct Environment {
    globals: Namespace,
    session: Session,
    conf: ConfRef,
    registry: Rc<ExtensionRegistry>,
    introduced: Vec<String>,
}

impl Environment {
    /// Create an environment with empty globals and a session holding `conf`.
    pub fn new(conf: ConfRef, registry: Rc<ExtensionRegistry>) -> Self {
        Self {
            globals: Namespace::new(),
            session: Session::seeded(&conf),
            conf,
            registry,
            introduced: Vec::new(),
        }
    }

    pub fn globals(&self) -> &Namespace {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Namespace {
        &mut self.globals
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn conf(&self) -> &ConfRef {
        &self.conf
    }

    pub fn registry(&self) -> &Rc<ExtensionRegistry> {
        &self.registry
    }

    /// A throwaway environment sharing the globals' values, the live
    /// configuration and the registry, with a fresh session.
    pub fn scratch(&self) -> Environment {
        Self {
            globals: self.globals.clone(),
            session: Session::seeded(&self.conf),
            conf: Rc::clone(&self.conf),
            registry: Rc::clone(&self.registry),
            introduced: Vec::new(),
        }
    }

    /// Merge an extension fragment into the globals, recording its names.
    pub fn introduce(&mut self, fragment: Namespace) -> usize {
        let count = fragment.len();
        for name in fragment.keys() {
            if !self.introduced.contains(name) {
                self.introduced.push(name.clone());
            }
        }
        self.globals.merge(fragment);
        count
    }

    /// Names introduced into the globals so far, in first-seen order.
    pub fn introduced(&self) -> &[String] {
        &self.introduced
    }

    /// The introduced names with their current global values.
    pub fn introduced_fragment(&self) -> Namespace {
        self.introduced
            .iter()
            .filter_map(|name| {
                self.globals
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// Look a name up in the session, then in the globals.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.session
            .namespace()
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    /// Swap in another session, returning the previous one.
    pub fn replace_session(&mut self, session: Session) -> Session {
        std::mem::replace(&mut self.session, session)
    }

    /// Remove every introduced name from the globals.
    ///
    /// Names already removed are skipped. Returns how many were present.
    pub fn teardown(&mut self) -> usize {
        let mut removed = 0;
        for name in self.introduced.drain(..) {
            if self.globals.remove(&name).is_some() {
                removed += 1;
            }
        }
        tracing::debug!(target: "packet_console::loading", removed, "environment torn down");
        removed
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Conf::default().into_ref(), Rc::new(ExtensionRegistry::new()))
    }
}
