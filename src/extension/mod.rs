//! Extensions contributing symbols to the global namespace.
//!
//! Every extension is identified by a dotted path (`layers.inet`,
//! `modules.console`, `contrib.cdp`) and produces a namespace fragment.
//! Built-in extensions are registered up front; contrib scripts are
//! resolved from `conf.contrib_dir` on demand.

pub mod discovery;
pub mod layers;
mod loader;
mod registry;
mod script;
mod toolkit;

pub use discovery::{list_contrib, normalize_pattern, ContribInfo};
pub use loader::ExtensionLoader;
pub use registry::{Extension, ExtensionKind, ExtensionRegistry, StaticExtension};
pub use script::ScriptExtension;
