//! Exit hooks.

use std::fmt;

use crate::Result;

/// Work deferred until the console exits.
pub type ExitHook = Box<dyn FnOnce() -> Result<()>>;

/// Hooks run once, in registration order. A failing hook is logged and
/// does not prevent the following ones from running.
#[derive(Default)]
pub struct ExitHooks {
    hooks: Vec<(String, ExitHook)>,
}

impl ExitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, hook: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.hooks.push((name.to_string(), Box::new(hook)));
    }

    /// Register an already boxed hook.
    pub fn register_boxed(&mut self, name: &str, hook: ExitHook) {
        self.hooks.push((name.to_string(), hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run and drop every pending hook. Returns how many succeeded.
    pub fn run(&mut self) -> usize {
        let mut succeeded = 0;
        for (name, hook) in self.hooks.drain(..) {
            match hook() {
                Ok(()) => succeeded += 1,
                Err(e) => tracing::warn!(hook = %name, error = %e, "exit hook failed"),
            }
        }
        succeeded
    }
}

impl fmt::Debug for ExitHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.hooks.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("ExitHooks").field("hooks", &names).finish()
    }
}

impl Drop for ExitHooks {
    fn drop(&mut self) {
        self.run();
    }
}
