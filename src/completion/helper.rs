//! rustyline glue for the completion engine.

use std::cell::RefCell;
use std::rc::Rc;

use rustyline::completion::Completer;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use super::CompletionEngine;
use crate::namespace::Environment;

/// Line editor helper completing against a shared environment.
pub struct ConsoleHelper {
    env: Rc<RefCell<Environment>>,
}

impl ConsoleHelper {
    pub fn new(env: Rc<RefCell<Environment>>) -> Self {
        Self { env }
    }
}

impl Completer for ConsoleHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        // the environment is only borrowed elsewhere while a statement runs
        let Ok(env) = self.env.try_borrow() else {
            return Ok((pos, Vec::new()));
        };
        Ok(CompletionEngine::for_env(&env).complete_line(line, pos))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {}

impl Helper for ConsoleHelper {}
