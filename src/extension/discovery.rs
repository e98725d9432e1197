//! Best-effort listing of contrib scripts.
//!
//! Metadata is scraped from marker lines such as
//! `pkt.contrib.description = Cisco Discovery Protocol`. Files without
//! markers, malformed lines and unreadable files never fail the listing.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// File suffix of contrib scripts.
pub const CONTRIB_SUFFIX: &str = ".pcs";

/// Pattern used when none is given.
pub const DEFAULT_PATTERN: &str = "*.pcs";

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pkt\.contrib\.(\w+)\s*=\s*(.*)$").expect("valid regex"));

/// One row of the contrib listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContribInfo {
    pub name: String,
    pub description: String,
    pub status: String,
}

impl ContribInfo {
    /// Row with placeholder metadata.
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: "-".to_string(),
            status: "?".to_string(),
        }
    }

    /// Apply the marker lines found in `text`.
    pub fn scan(&mut self, text: &str) {
        for line in text.lines() {
            let Some(caps) = MARKER.captures(line) else {
                continue;
            };
            let value = caps[2].trim().to_string();
            match &caps[1] {
                "name" => self.name = value,
                "description" => self.description = value,
                "status" => self.status = value,
                _ => {}
            }
        }
    }
}

impl fmt::Display for ContribInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<20}: {:<40} status={}",
            self.name, self.description, self.status
        )
    }
}

/// Turn a user pattern into a file glob.
///
/// `None` lists everything; a bare name gets the contrib suffix.
pub fn normalize_pattern(pattern: Option<&str>) -> String {
    match pattern {
        None => DEFAULT_PATTERN.to_string(),
        Some(p) if p.contains('*') || p.contains('?') || p.ends_with(CONTRIB_SUFFIX) => {
            p.to_string()
        }
        Some(p) => format!("{}{}", p, CONTRIB_SUFFIX),
    }
}

/// Read the metadata of one contrib file.
pub fn read_info(path: &Path) -> Option<ContribInfo> {
    let file_name = path.file_name()?.to_string_lossy();
    if file_name.starts_with("__") {
        return None;
    }
    let stem = file_name
        .strip_suffix(CONTRIB_SUFFIX)
        .unwrap_or(&file_name)
        .to_string();

    let mut info = ContribInfo::placeholder(&stem);
    match fs::read_to_string(path) {
        Ok(text) => info.scan(&text),
        Err(e) => tracing::debug!(
            target: "packet_console::interactive",
            path = %path.display(),
            error = %e,
            "cannot read contrib file"
        ),
    }
    Some(info)
}

/// List contrib files in `dir` matching `pattern`, sorted by path.
pub fn list_contrib(dir: &Path, pattern: Option<&str>) -> Vec<ContribInfo> {
    let full = dir.join(normalize_pattern(pattern));
    let entries: Vec<PathBuf> = match glob::glob(&full.to_string_lossy()) {
        Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
        Err(e) => {
            tracing::warn!(
                target: "packet_console::interactive",
                error = %e,
                "invalid contrib pattern"
            );
            return Vec::new();
        }
    };
    entries.iter().filter_map(|p| read_info(p)).collect()
}
