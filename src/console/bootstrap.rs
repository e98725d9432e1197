//! Console lifecycle: bootstrap, interaction, save and teardown.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::hooks::ExitHooks;
use super::repl::ReplEngine;
use super::script::ConfigScriptRunner;
use crate::cli::{Args, ScriptChoice};
use crate::config::{self, ConfRef, DEFAULT_PRESTART_FILE, DEFAULT_STARTUP_FILE};
use crate::extension::{ExtensionLoader, ExtensionRegistry};
use crate::namespace::{Environment, Namespace};
use crate::session::{Session, SessionStore};
use crate::utils;
use crate::Result;

/// What to run around the REPL.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
    /// Session file restored at start and saved at exit.
    pub session_path: Option<PathBuf>,
    /// Script run before the toolkit is loaded.
    pub prestart: Option<PathBuf>,
    /// Script run after the toolkit is loaded.
    pub startup: Option<PathBuf>,
    /// Extra line appended to the banner.
    pub banner: Option<String>,
    /// Symbols added to the globals after the toolkit.
    pub extras: Namespace,
}

impl ConsoleOptions {
    /// Options selected on the command line.
    pub fn from_args(args: &Args) -> Self {
        Self {
            session_path: args.session.clone(),
            prestart: script_path(&args.prestart, DEFAULT_PRESTART_FILE),
            startup: script_path(&args.startup, DEFAULT_STARTUP_FILE),
            ..Self::default()
        }
    }
}

fn script_path(choice: &ScriptChoice, default_name: &str) -> Option<PathBuf> {
    match choice {
        ScriptChoice::Default => config::probe_home_file(default_name),
        ScriptChoice::Path(path) => Some(path.clone()),
        ScriptChoice::Disabled => None,
    }
}

/// One console invocation.
#[derive(Debug)]
pub struct ConsoleSession {
    env: Environment,
    options: ConsoleOptions,
    hooks: ExitHooks,
    store: SessionStore,
}

impl ConsoleSession {
    pub fn new(conf: ConfRef, registry: Rc<ExtensionRegistry>, options: ConsoleOptions) -> Self {
        Self {
            env: Environment::new(conf, registry),
            options,
            hooks: ExitHooks::new(),
            store: SessionStore::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Run scripts, load the toolkit and resolve the session.
    pub fn bootstrap(&mut self) {
        let scripts = ConfigScriptRunner::new();
        if let Some(path) = self.options.prestart.clone() {
            scripts.run(&mut self.env, &path);
        }

        let loaded = ExtensionLoader::new().load_toolkit(&mut self.env);
        let extras = std::mem::take(&mut self.options.extras);
        let extra_count = self.env.introduce(extras);
        tracing::debug!(
            target: "packet_console::loading",
            extensions = loaded,
            extras = extra_count,
            "toolkit loaded"
        );

        if let Some(path) = self.options.startup.clone() {
            scripts.run(&mut self.env, &path);
        }

        self.resolve_session();
    }

    /// Restore the session file, or start a new session.
    pub fn resolve_session(&mut self) {
        let conf = Rc::clone(self.env.conf());
        let Some(path) = self.options.session_path.clone() else {
            self.env.replace_session(Session::seeded(&conf));
            return;
        };
        conf.borrow_mut().session = Some(path.clone());

        if !path.exists() {
            tracing::info!(
                target: "packet_console::loading",
                "New session [{}]",
                path.display()
            );
            self.env.replace_session(Session::seeded(&conf));
            return;
        }

        match self.store.load(&path) {
            Ok(loaded) => {
                let session = self.env.session_mut();
                session.replace_with(loaded);
                session.adopt_config(&conf);
                tracing::info!(
                    target: "packet_console::loading",
                    "Using session [{}]",
                    path.display()
                );
            }
            Err(e) => {
                tracing::error!(
                    target: "packet_console::loading",
                    "Error opening session [{}]: {}",
                    path.display(),
                    e
                );
                self.env.replace_session(Session::seeded(&conf));
            }
        }
    }

    /// Hand the environment to `engine`, then save and tear down.
    pub fn run<E: ReplEngine>(mut self, mut engine: E) -> Result<()> {
        let conf = Rc::clone(self.env.conf());
        conf.borrow_mut().interactive = true;

        if let Some(hook) = engine.history_hook(&conf) {
            self.hooks.register_boxed("history", hook);
        }
        let cleanup = Rc::clone(&conf);
        self.hooks.register("temp files", move || {
            let removed = utils::delete_temp_files(&cleanup);
            tracing::debug!(removed, "temporary files removed");
            Ok(())
        });

        let banner = self.banner();
        let outcome = engine.interact(&mut self.env, &banner);

        let saved = self.save_on_exit();
        self.env.teardown();
        self.hooks.run();
        outcome.and(saved)
    }

    fn banner(&self) -> String {
        let mut banner = format!(
            "Welcome to packet-console ({})",
            self.env.conf().borrow().version
        );
        if let Some(extra) = &self.options.banner {
            banner.push('\n');
            banner.push_str(extra);
        }
        banner
    }

    fn save_on_exit(&self) -> Result<()> {
        let Some(path) = self.env.conf().borrow().session.clone() else {
            return Ok(());
        };
        save_to(&self.store, &path, self.env.session())
    }
}

fn save_to(store: &SessionStore, path: &Path, session: &Session) -> Result<()> {
    store.save(path, session).inspect_err(|e| {
        tracing::error!(
            target: "packet_console::interactive",
            "Cannot save session [{}]: {}",
            path.display(),
            e
        );
    })
}
