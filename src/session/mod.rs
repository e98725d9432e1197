//! Session management module.
//!
//! This module provides the live session container, the rules deciding
//! which entries persist, the on-disk image format and the store that
//! saves and restores session files.

pub mod filter;
mod image;
mod live;
mod store;

pub use image::{SessionImage, Skipped, StoredValue, FORMAT_VERSION, MAGIC, MAX_NESTING};
pub use live::{Session, CONF_KEY};
pub use store::{backup_path, SessionStore};
