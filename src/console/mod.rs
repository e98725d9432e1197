//! The interactive console.
//!
//! [`ConsoleSession`] runs the prestart script, loads the toolkit, runs the
//! startup script and resolves the session before handing the environment
//! to a [`ReplEngine`]. On exit the session is saved, the environment torn
//! down and the exit hooks run.

mod bootstrap;
mod hooks;
mod repl;
mod script;

pub use bootstrap::{ConsoleOptions, ConsoleSession};
pub use hooks::{ExitHook, ExitHooks};
pub use repl::{write_history, LineRepl, ReplEngine};
pub use script::ConfigScriptRunner;
