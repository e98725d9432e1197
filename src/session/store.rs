//! Session persistence.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;

use super::filter;
use super::image::SessionImage;
use super::Session;
use crate::config::ConfRef;
use crate::error::ConsoleError;
use crate::namespace::Namespace;
use crate::Result;

/// Upper bound on the decoded size of a session image.
const MAX_IMAGE_SIZE: u64 = 256 * 1024 * 1024;

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_IMAGE_SIZE)
}

/// Sibling path that receives the previous session file on save.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Reads and writes session files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    compress: bool,
}

impl SessionStore {
    /// Create a store writing gzip-compressed images.
    pub fn new() -> Self {
        Self { compress: true }
    }

    /// Create a store writing plain images.
    pub fn uncompressed() -> Self {
        Self { compress: false }
    }

    /// Encode the persistable part of `namespace`.
    pub fn encode(&self, namespace: &Namespace) -> Result<Vec<u8>> {
        let (image, skipped) = SessionImage::capture(&filter::retained(namespace));
        for entry in &skipped {
            tracing::info!(
                target: "packet_console::interactive",
                "[{}] ({}) can't be saved.",
                entry.name,
                entry.type_name
            );
        }

        let raw = codec().serialize(&image)?;
        if !self.compress {
            return Ok(raw);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    /// Decode an image read from `path`, compressed or not.
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Namespace> {
        let mut inflated = Vec::new();
        let raw = match GzDecoder::new(bytes).read_to_end(&mut inflated) {
            Ok(_) => &inflated[..],
            Err(e) => {
                tracing::debug!(
                    target: "packet_console::loading",
                    error = %e,
                    "session file is not compressed"
                );
                bytes
            }
        };

        let corrupt = |reason: String| ConsoleError::SessionCorrupt {
            path: path.to_path_buf(),
            reason,
        };
        let image: SessionImage = codec()
            .deserialize(raw)
            .map_err(|e| corrupt(e.to_string()))?;
        image.restore().map_err(corrupt)
    }

    /// Write the persistable entries of `session` to `path`.
    ///
    /// An existing file at `path` is first renamed to `path.bak`.
    pub fn save(&self, path: &Path, session: &Session) -> Result<()> {
        let bytes = self.encode(session.namespace())?;

        let backup = backup_path(path);
        match fs::rename(path, &backup) {
            Ok(()) => tracing::debug!(
                target: "packet_console::interactive",
                backup = %backup.display(),
                "previous session kept"
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                target: "packet_console::interactive",
                error = %e,
                "cannot keep a backup of {}",
                path.display()
            ),
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.persist(path).map_err(|e| e.error)?;

        tracing::debug!(
            target: "packet_console::interactive",
            path = %path.display(),
            entries = session.len(),
            "session saved"
        );
        Ok(())
    }

    /// Read the session stored at `path`.
    pub fn load(&self, path: &Path) -> Result<Namespace> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConsoleError::SessionNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        self.decode(path, &bytes)
    }

    /// Replace the contents of `session` with the file at `path`.
    pub fn restore_into(&self, path: &Path, session: &mut Session, conf: &ConfRef) -> Result<()> {
        let loaded = self.load(path)?;
        session.replace_with(loaded);
        session.adopt_config(conf);
        Ok(())
    }

    /// Merge the file at `path` into `session`.
    pub fn update_into(&self, path: &Path, session: &mut Session, conf: &ConfRef) -> Result<()> {
        let loaded = self.load(path)?;
        session.update_with(loaded);
        session.adopt_config(conf);
        Ok(())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
