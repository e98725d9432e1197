//! Merging extension fragments into the global namespace.

use std::rc::Rc;

use super::registry::ExtensionKind;
use crate::error::ConsoleError;
use crate::namespace::Environment;
use crate::Result;

/// Loads extensions into an [`Environment`].
///
/// Failures are isolated: a failing extension is logged and contributes
/// nothing, and loading continues with the next one. Collisions resolve
/// last-writer-wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionLoader;

impl ExtensionLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load `<kind>.<name>`. Returns whether the fragment was merged.
    pub fn load(&self, env: &mut Environment, kind: ExtensionKind, name: &str) -> bool {
        self.load_path(env, &kind.path(name))
    }

    /// Load a dotted path, logging any failure.
    pub fn load_path(&self, env: &mut Environment, path: &str) -> bool {
        match self.try_load(env, path) {
            Ok(count) => {
                tracing::debug!(
                    target: "packet_console::loading",
                    extension = path,
                    symbols = count,
                    "extension loaded"
                );
                true
            }
            Err(e) => {
                tracing::error!(target: "packet_console::interactive", "{}", e);
                false
            }
        }
    }

    /// Load a dotted path, returning the number of symbols merged.
    pub fn try_load(&self, env: &mut Environment, path: &str) -> Result<usize> {
        let registry = Rc::clone(env.registry());
        let contrib_dir = env.conf().borrow().contrib_dir.clone();
        let extension = registry.resolve(path, contrib_dir.as_deref())?;

        let fragment = extension.load(env).map_err(|e| match e {
            failed @ ConsoleError::ExtensionFailed { .. } => failed,
            other => ConsoleError::ExtensionFailed {
                path: path.to_string(),
                reason: other.to_string(),
            },
        })?;
        Ok(env.introduce(fragment))
    }

    /// Load paths in order. Returns how many succeeded.
    pub fn load_all<I, S>(&self, env: &mut Environment, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths
            .into_iter()
            .filter(|path| self.load_path(env, path.as_ref()))
            .count()
    }

    /// Load every registered layer, then every registered module.
    pub fn load_toolkit(&self, env: &mut Environment) -> usize {
        let registry = Rc::clone(env.registry());
        let paths = registry
            .paths_of(ExtensionKind::Layers)
            .into_iter()
            .chain(registry.paths_of(ExtensionKind::Modules));
        self.load_all(env, paths)
    }
}
