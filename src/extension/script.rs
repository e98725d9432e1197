//! Contrib scripts as extensions.

use std::fs;
use std::path::PathBuf;

use super::discovery::{self, ContribInfo};
use super::registry::Extension;
use crate::error::ConsoleError;
use crate::interp;
use crate::namespace::{Environment, Namespace};
use crate::session::CONF_KEY;
use crate::Result;

/// An extension backed by a script file.
///
/// Its fragment is whatever the script binds when run in a scratch
/// environment that sees the current globals and configuration.
#[derive(Debug, Clone)]
pub struct ScriptExtension {
    path: String,
    file: PathBuf,
}

impl ScriptExtension {
    pub fn new(path: &str, file: PathBuf) -> Self {
        Self {
            path: path.to_string(),
            file,
        }
    }
}

impl Extension for ScriptExtension {
    fn path(&self) -> &str {
        &self.path
    }

    fn info(&self) -> ContribInfo {
        discovery::read_info(&self.file).unwrap_or_else(|| ContribInfo::placeholder(&self.path))
    }

    fn load(&self, env: &Environment) -> Result<Namespace> {
        let source = fs::read_to_string(&self.file)?;
        let mut scratch = env.scratch();
        interp::run_script(&mut scratch, &source).map_err(|e| ConsoleError::ExtensionFailed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        // extensions the script loaded, overridden by its own bindings
        let mut fragment = scratch.introduced_fragment();
        let mut bindings = scratch.session().namespace().clone();
        bindings.remove(CONF_KEY);
        fragment.merge(bindings);
        Ok(fragment)
    }
}
