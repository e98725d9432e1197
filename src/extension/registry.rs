//! Extension descriptors and the registry they are resolved from.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use super::discovery::{self, ContribInfo, CONTRIB_SUFFIX};
use super::script::ScriptExtension;
use super::{layers, toolkit};
use crate::error::ConsoleError;
use crate::namespace::{Environment, Namespace};
use crate::Result;

/// Fixed namespace prefixes extensions live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKind {
    Modules,
    Layers,
    Contrib,
}

impl ExtensionKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Modules => "modules",
            Self::Layers => "layers",
            Self::Contrib => "contrib",
        }
    }

    /// Dotted path of extension `name` of this kind.
    pub fn path(self, name: &str) -> String {
        format!("{}.{}", self.prefix(), name)
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A unit contributing a namespace fragment.
pub trait Extension: fmt::Debug {
    /// Dotted path such as `layers.inet`.
    fn path(&self) -> &str;

    /// Listing metadata.
    fn info(&self) -> ContribInfo;

    /// Produce the fragment. `env` is read-only context: the fragment is
    /// merged by the caller.
    fn load(&self, env: &Environment) -> Result<Namespace>;
}

/// An extension whose fragment is built by a plain function.
pub struct StaticExtension {
    path: String,
    description: String,
    build: fn() -> Namespace,
}

impl StaticExtension {
    pub fn new(kind: ExtensionKind, name: &str, description: &str, build: fn() -> Namespace) -> Self {
        Self {
            path: kind.path(name),
            description: description.to_string(),
            build,
        }
    }
}

impl fmt::Debug for StaticExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticExtension")
            .field("path", &self.path)
            .finish()
    }
}

impl Extension for StaticExtension {
    fn path(&self) -> &str {
        &self.path
    }

    fn info(&self) -> ContribInfo {
        let name = self.path.rsplit('.').next().unwrap_or(&self.path);
        ContribInfo {
            name: name.to_string(),
            description: self.description.clone(),
            status: "loads".to_string(),
        }
    }

    fn load(&self, _env: &Environment) -> Result<Namespace> {
        Ok((self.build)())
    }
}

/// Explicitly registered extensions, in registration order.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    entries: Vec<Rc<dyn Extension>>,
}

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the bundled layers and modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ext in layers::extensions().into_iter().chain(toolkit::extensions()) {
            // bundled paths are distinct
            let _ = registry.register(ext);
        }
        registry
    }

    /// Register an extension. Paths are unique.
    pub fn register<E: Extension + 'static>(&mut self, extension: E) -> Result<()> {
        if self.get(extension.path()).is_some() {
            return Err(ConsoleError::DuplicateExtension(extension.path().to_string()));
        }
        self.entries.push(Rc::new(extension));
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<Rc<dyn Extension>> {
        self.entries.iter().find(|e| e.path() == path).cloned()
    }

    /// Listing rows of registered contrib extensions whose script name
    /// matches `pattern`.
    pub fn contrib_info(&self, pattern: Option<&str>) -> Vec<ContribInfo> {
        let glob = match glob::Pattern::new(&discovery::normalize_pattern(pattern)) {
            Ok(glob) => glob,
            Err(e) => {
                tracing::warn!(
                    target: "packet_console::interactive",
                    error = %e,
                    "invalid contrib pattern"
                );
                return Vec::new();
            }
        };
        let prefix = format!("{}.", ExtensionKind::Contrib.prefix());
        self.entries
            .iter()
            .filter(|e| {
                e.path()
                    .strip_prefix(&prefix)
                    .is_some_and(|name| glob.matches(&format!("{}{}", name, CONTRIB_SUFFIX)))
            })
            .map(|e| e.info())
            .collect()
    }

    /// Registered paths of one kind, in registration order.
    pub fn paths_of(&self, kind: ExtensionKind) -> Vec<String> {
        let prefix = format!("{}.", kind.prefix());
        self.entries
            .iter()
            .map(|e| e.path())
            .filter(|p| p.starts_with(&prefix))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a dotted path.
    ///
    /// Registered extensions come first; `contrib.<name>` may also resolve
    /// to `<contrib_dir>/<name>.pcs`.
    pub fn resolve(&self, path: &str, contrib_dir: Option<&Path>) -> Result<Rc<dyn Extension>> {
        if let Some(ext) = self.get(path) {
            return Ok(ext);
        }

        let contrib_prefix = format!("{}.", ExtensionKind::Contrib.prefix());
        if let (Some(name), Some(dir)) = (path.strip_prefix(&contrib_prefix), contrib_dir) {
            let file = dir.join(format!("{}{}", name, CONTRIB_SUFFIX));
            if file.is_file() {
                return Ok(Rc::new(ScriptExtension::new(path, file)));
            }
        }

        Err(ConsoleError::ExtensionNotFound(path.to_string()))
    }
}
