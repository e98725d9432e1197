//! Console configuration.
//!
//! The active configuration object (`conf` at the prompt) is loaded with the
//! following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON, from `PKT_CONSOLE_CONFIG`)
//! 4. Default values
//!
//! A restored session may carry a configuration snapshot; see
//! [`Conf::configure`] for what it is allowed to change.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::EvalError;
use crate::logging;
use crate::namespace::Value;

/// Shared handle to the live configuration.
pub type ConfRef = Rc<RefCell<Conf>>;

/// Default pre-startup script in the home directory.
pub const DEFAULT_PRESTART_FILE: &str = ".pkt_console_prestart";

/// Default startup script in the home directory.
pub const DEFAULT_STARTUP_FILE: &str = ".pkt_console_startup";

/// Default history file in the home directory.
pub const DEFAULT_HISTORY_FILE: &str = ".pkt_console_history";

/// Attribute names visible at the prompt.
pub const CONF_ATTRS: &[&str] = &[
    "color_theme",
    "contrib_dir",
    "histfile",
    "interactive",
    "log_level",
    "prompt",
    "session",
    "temp_files",
    "verbosity",
    "version",
];

/// The active configuration object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
    /// Toolkit version string.
    pub version: String,
    /// Session file saved on exit.
    pub session: Option<PathBuf>,
    /// Command history file.
    pub histfile: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: String,
    /// Whether a prompt is attached.
    pub interactive: bool,
    /// Prompt string.
    pub prompt: String,
    /// Color theme name.
    pub color_theme: String,
    /// Directory scanned for contrib scripts.
    pub contrib_dir: Option<PathBuf>,
    /// Temporary files removed at exit.
    pub temp_files: Vec<PathBuf>,
    /// Verbosity of toolkit functions.
    pub verbosity: i64,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            session: None,
            histfile: home_file(DEFAULT_HISTORY_FILE),
            log_level: "info".to_string(),
            interactive: false,
            prompt: ">>> ".to_string(),
            color_theme: "default".to_string(),
            contrib_dir: None,
            temp_files: Vec::new(),
            verbosity: 2,
        }
    }
}

impl Conf {
    /// Wrap into a shared handle.
    pub fn into_ref(self) -> ConfRef {
        Rc::new(RefCell::new(self))
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(histfile) = std::env::var("PKT_CONSOLE_HISTFILE") {
            self.histfile = if histfile.is_empty() {
                None
            } else {
                Some(PathBuf::from(histfile))
            };
        }

        if let Ok(level) = std::env::var("PKT_CONSOLE_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref session) = args.session {
            self.session = Some(session.clone());
        }

        if args.debug > 0 {
            self.log_level = logging::lower_level(&self.log_level, args.debug).to_string();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os("PKT_CONSOLE_CONFIG") {
            Some(path) => Conf::from_file(Path::new(&path))?,
            None => Conf::default(),
        };

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.log_level
    }

    /// Reconfigure from a snapshot restored with a session.
    ///
    /// Only user preferences are taken over; `session`, `temp_files`,
    /// `interactive` and `version` describe the current run and are kept.
    pub fn configure(&mut self, saved: &Conf) {
        self.histfile = saved.histfile.clone();
        self.prompt = saved.prompt.clone();
        self.color_theme = saved.color_theme.clone();
        self.verbosity = saved.verbosity;
        if saved.contrib_dir.is_some() {
            self.contrib_dir = saved.contrib_dir.clone();
        }
    }

    /// Read an attribute by name.
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        let value = match name {
            "color_theme" => Value::Str(self.color_theme.clone()),
            "contrib_dir" => path_value(self.contrib_dir.as_deref()),
            "histfile" => path_value(self.histfile.as_deref()),
            "interactive" => Value::Bool(self.interactive),
            "log_level" => Value::Str(self.log_level.clone()),
            "prompt" => Value::Str(self.prompt.clone()),
            "session" => path_value(self.session.as_deref()),
            "temp_files" => Value::List(
                self.temp_files
                    .iter()
                    .map(|p| Value::Str(p.display().to_string()))
                    .collect(),
            ),
            "verbosity" => Value::Int(self.verbosity),
            "version" => Value::Str(self.version.clone()),
            _ => return None,
        };
        Some(value)
    }

    /// Assign an attribute by name.
    pub fn set_attr(&mut self, name: &str, value: &Value) -> Result<(), EvalError> {
        match name {
            "color_theme" => self.color_theme = expect_str(name, value)?,
            "contrib_dir" => self.contrib_dir = expect_path(name, value)?,
            "histfile" => self.histfile = expect_path(name, value)?,
            "interactive" => self.interactive = value.is_truthy(),
            "log_level" => self.log_level = expect_str(name, value)?,
            "prompt" => self.prompt = expect_str(name, value)?,
            "session" => self.session = expect_path(name, value)?,
            "verbosity" => match value {
                Value::Int(v) => self.verbosity = *v,
                other => {
                    return Err(EvalError::Type(format!(
                        "conf.verbosity must be an int, not '{}'",
                        other.type_name()
                    )))
                }
            },
            "temp_files" | "version" => {
                return Err(EvalError::Type(format!("conf.{} is read-only", name)))
            }
            _ => return Err(EvalError::attribute("Conf", name)),
        }
        Ok(())
    }
}

impl std::fmt::Display for Conf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for name in CONF_ATTRS {
            if let Some(value) = self.get_attr(name) {
                if !first {
                    writeln!(f)?;
                }
                first = false;
                write!(f, "{:<12} = {}", name, value)?;
            }
        }
        Ok(())
    }
}

fn path_value(path: Option<&Path>) -> Value {
    match path {
        Some(p) => Value::Str(p.display().to_string()),
        None => Value::None,
    }
}

fn expect_str(name: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError::Type(format!(
            "conf.{} must be a str, not '{}'",
            name,
            other.type_name()
        ))),
    }
}

fn expect_path(name: &str, value: &Value) -> Result<Option<PathBuf>, EvalError> {
    match value {
        Value::None => Ok(None),
        Value::Str(s) if s.is_empty() => Ok(None),
        Value::Str(s) => Ok(Some(PathBuf::from(s))),
        other => Err(EvalError::Type(format!(
            "conf.{} must be a path string or None, not '{}'",
            name,
            other.type_name()
        ))),
    }
}

/// Path of `name` inside the home directory.
pub fn home_file(name: &str) -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(name))
}

/// Path of `name` inside the home directory, only if the file exists.
pub fn probe_home_file(name: &str) -> Option<PathBuf> {
    home_file(name).filter(|path| std::fs::metadata(path).is_ok())
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let conf = Conf::default();
        assert_eq!(conf.version, env!("CARGO_PKG_VERSION"));
        assert!(conf.session.is_none());
        assert_eq!(conf.log_level, "info");
        assert_eq!(conf.prompt, ">>> ");
        assert!(conf.temp_files.is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "prompt": "pkt> ",
            "log_level": "warn",
            "contrib_dir": "/opt/pkt/contrib"
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let conf = Conf::from_file(file.path()).unwrap();
        assert_eq!(conf.prompt, "pkt> ");
        assert_eq!(conf.log_level, "warn");
        assert_eq!(conf.contrib_dir, Some(PathBuf::from("/opt/pkt/contrib")));
        assert_eq!(conf.color_theme, "default");
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let err = Conf::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_apply_args() {
        let mut conf = Conf::default();
        let args = Args {
            session: Some(PathBuf::from("/tmp/s1")),
            debug: 1,
            ..Args::default()
        };

        conf.apply_args(&args);

        assert_eq!(conf.session, Some(PathBuf::from("/tmp/s1")));
        assert_eq!(conf.log_level, "debug");
    }

    #[test]
    fn test_configure_keeps_run_state() {
        let mut live = Conf {
            session: Some(PathBuf::from("/tmp/live")),
            temp_files: vec![PathBuf::from("/tmp/t1")],
            ..Conf::default()
        };
        let saved = Conf {
            session: Some(PathBuf::from("/tmp/old")),
            prompt: "saved> ".to_string(),
            verbosity: 0,
            ..Conf::default()
        };

        live.configure(&saved);

        assert_eq!(live.prompt, "saved> ");
        assert_eq!(live.verbosity, 0);
        assert_eq!(live.session, Some(PathBuf::from("/tmp/live")));
        assert_eq!(live.temp_files, vec![PathBuf::from("/tmp/t1")]);
    }

    #[test]
    fn test_configure_contrib_dir_only_when_saved() {
        let mut live = Conf {
            contrib_dir: Some(PathBuf::from("/opt/live")),
            ..Conf::default()
        };
        live.configure(&Conf::default());
        assert_eq!(live.contrib_dir, Some(PathBuf::from("/opt/live")));

        let saved = Conf {
            contrib_dir: Some(PathBuf::from("/opt/saved")),
            ..Conf::default()
        };
        live.configure(&saved);
        assert_eq!(live.contrib_dir, Some(PathBuf::from("/opt/saved")));
    }

    #[test]
    fn test_attr_access() {
        let mut conf = Conf::default();
        conf.set_attr("prompt", &Value::Str("$ ".into())).unwrap();
        assert_eq!(conf.get_attr("prompt"), Some(Value::Str("$ ".into())));

        conf.set_attr("session", &Value::None).unwrap();
        assert_eq!(conf.get_attr("session"), Some(Value::None));

        assert!(conf.set_attr("verbosity", &Value::Str("x".into())).is_err());
        assert!(conf.set_attr("version", &Value::Str("9".into())).is_err());
        assert!(conf.set_attr("nope", &Value::Int(1)).is_err());
        assert!(conf.get_attr("nope").is_none());
    }

    #[test]
    fn test_every_listed_attr_is_readable() {
        let conf = Conf::default();
        for name in CONF_ATTRS {
            assert!(conf.get_attr(name).is_some(), "missing attr {}", name);
        }
    }

    #[test]
    fn test_config_serialization() {
        let conf = Conf::default();
        let json = serde_json::to_string_pretty(&conf).unwrap();
        assert!(json.contains("\"prompt\""));
        assert!(json.contains("\"histfile\""));
    }
}
