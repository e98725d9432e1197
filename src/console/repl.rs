//! The read-eval-print loop.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use super::hooks::ExitHook;
use crate::completion::ConsoleHelper;
use crate::config::ConfRef;
use crate::interp;
use crate::namespace::Environment;
use crate::utils;
use crate::Result;

/// Maximum number of history entries kept.
const HISTORY_LIMIT: usize = 1000;

/// Executes statements against an environment until the user exits.
pub trait ReplEngine {
    /// Run the loop. Returns when the user exits.
    fn interact(&mut self, env: &mut Environment, banner: &str) -> Result<()>;

    /// Hook persisting the command history at exit, if the engine keeps one.
    fn history_hook(&self, _conf: &ConfRef) -> Option<ExitHook> {
        None
    }
}

/// rustyline-based line editor with tab completion.
#[derive(Debug, Default)]
pub struct LineRepl {
    history: Rc<RefCell<Vec<String>>>,
}

impl LineRepl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries typed so far, including those read from the history file.
    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }

    fn load_history(&self, path: &Path) {
        if let Ok(text) = fs::read_to_string(path) {
            let mut history = self.history.borrow_mut();
            history.extend(text.lines().map(str::to_string));
            let excess = history.len().saturating_sub(HISTORY_LIMIT);
            history.drain(..excess);
        }
    }

    fn run_loop(&mut self, shared: &Rc<RefCell<Environment>>, banner: &str) -> Result<()> {
        let mut editor: Editor<ConsoleHelper, DefaultHistory> = Editor::new()?;
        editor.set_helper(Some(ConsoleHelper::new(Rc::clone(shared))));
        for entry in self.history.borrow().iter() {
            editor.add_history_entry(entry.as_str())?;
        }

        println!("{}", banner);
        loop {
            let prompt = shared.borrow().conf().borrow().prompt.clone();
            match editor.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line.as_str())?;
                    self.history.borrow_mut().push(line.clone());

                    let outcome = interp::execute_line(&mut shared.borrow_mut(), &line);
                    match outcome {
                        Ok(Some(value)) => println!("{}", value),
                        Ok(None) => {}
                        Err(e) => eprintln!("{}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl ReplEngine for LineRepl {
    fn interact(&mut self, env: &mut Environment, banner: &str) -> Result<()> {
        if let Some(path) = env.conf().borrow().histfile.clone() {
            self.load_history(&path);
        }

        // the completion helper needs shared access while the loop runs
        let shared = Rc::new(RefCell::new(std::mem::take(env)));
        let result = self.run_loop(&shared, banner);
        *env = match Rc::try_unwrap(shared) {
            Ok(cell) => cell.into_inner(),
            Err(rc) => std::mem::take(&mut *rc.borrow_mut()),
        };
        result
    }

    fn history_hook(&self, conf: &ConfRef) -> Option<ExitHook> {
        let history = Rc::clone(&self.history);
        let conf = Rc::clone(conf);
        Some(Box::new(move || {
            let Some(path) = conf.borrow().histfile.clone() else {
                return Ok(());
            };
            write_history(&conf, &path, &history.borrow())
        }))
    }
}

/// Write `entries` to `path`, falling back to a kept temporary file.
pub fn write_history(conf: &ConfRef, path: &Path, entries: &[String]) -> Result<()> {
    let start = entries.len().saturating_sub(HISTORY_LIMIT);
    let mut text = entries[start..].join("\n");
    if !text.is_empty() {
        text.push('\n');
    }

    let Err(e) = fs::write(path, &text) else {
        return Ok(());
    };
    tracing::warn!(
        "Could not write history to [{}]\n\t ({})",
        path.display(),
        e
    );
    let fallback = utils::get_temp_file(conf, true)?;
    fs::write(&fallback, &text)?;
    tracing::warn!("Wrote history to [{}]", fallback.display());
    Ok(())
}
