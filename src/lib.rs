//! # packet-console
//!
//! Interactive console for a packet-manipulation toolkit.
//!
//! The console loads the toolkit's extensions into an explicit
//! [`Environment`], runs user configuration scripts, restores a persistent
//! session and hands control to a line-editing REPL with context-aware tab
//! completion. Sessions are stored as gzip-compressed binary images that
//! keep shared and cyclic packet references intact.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::rc::Rc;
//! use packet_console::{Conf, ConsoleOptions, ConsoleSession, ExtensionRegistry, LineRepl};
//!
//! fn main() -> packet_console::Result<()> {
//!     packet_console::logging::try_init("info").ok();
//!
//!     let options = ConsoleOptions {
//!         session_path: Some("capture.pks".into()),
//!         ..ConsoleOptions::default()
//!     };
//!     let mut console = ConsoleSession::new(
//!         Conf::default().into_ref(),
//!         Rc::new(ExtensionRegistry::with_builtins()),
//!         options,
//!     );
//!     console.bootstrap();
//!     console.run(LineRepl::new())
//! }
//! ```

pub mod cli;
pub mod completion;
pub mod config;
pub mod console;
pub mod error;
pub mod extension;
pub mod interp;
pub mod logging;
pub mod namespace;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use completion::{CompletionEngine, CompletionMode};
pub use config::{Conf, ConfRef};
pub use console::{ConfigScriptRunner, ConsoleOptions, ConsoleSession, LineRepl, ReplEngine};
pub use error::{ConsoleError, EvalError, Result};
pub use extension::{Extension, ExtensionKind, ExtensionLoader, ExtensionRegistry};
pub use namespace::{Environment, Namespace, Value};
pub use session::{Session, SessionStore};
