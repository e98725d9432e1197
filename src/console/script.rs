//! Prestart and startup scripts.

use std::fs;
use std::path::Path;

use crate::error::ConsoleError;
use crate::interp;
use crate::namespace::Environment;
use crate::Result;

/// Runs trusted configuration scripts.
///
/// A script runs in a scratch session: its own bindings are discarded, while
/// changes to `conf` and extensions it loads stay in effect. Failures are
/// logged and never abort the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigScriptRunner;

impl ConfigScriptRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run the script at `path`. Returns whether it ran to completion.
    pub fn run(&self, env: &mut Environment, path: &Path) -> bool {
        tracing::debug!(
            target: "packet_console::loading",
            "Loading config file [{}]",
            path.display()
        );
        match self.try_run(env, path) {
            Ok(_) => true,
            Err(ConsoleError::Io(e)) => {
                tracing::warn!(
                    target: "packet_console::loading",
                    "Cannot read config file [{}] [{}]",
                    path.display(),
                    e
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    target: "packet_console::loading",
                    "Error during evaluation of config file [{}]: {}",
                    path.display(),
                    e
                );
                false
            }
        }
    }

    /// Run the script at `path`, returning the number of statements executed.
    pub fn try_run(&self, env: &mut Environment, path: &Path) -> Result<usize> {
        let source = fs::read_to_string(path)?;
        let mut scratch = env.scratch();
        let outcome = interp::run_script(&mut scratch, &source);

        // extensions loaded by the script stay loaded, even after a failure
        let loaded = scratch.introduced_fragment();
        if !loaded.is_empty() {
            env.introduce(loaded);
        }

        Ok(outcome?)
    }
}
