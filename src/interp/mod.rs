//! The console statement language.
//!
//! Scripts and prompt input share one parser and one evaluator. A statement
//! is an assignment (`name = expr`, `name.attr = expr`), a deletion
//! (`del name`) or a bare expression. Names bind in the session; lookups
//! try the session first, then the globals.

pub mod ast;
mod eval;
mod parser;

pub use eval::{call, evaluate, execute, execute_line, resolve_dotted, run_script};
pub use parser::{parse_expression, parse_statement};
