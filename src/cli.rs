//! Command-line interface for packet-console.
//!
//! Uses lexopt for minimal binary size overhead. The flag set mirrors the
//! classic getopt string `hs:Cc:Pp:d`.

use std::ffi::OsString;
use std::path::PathBuf;

/// Which startup (or prestart) script to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScriptChoice {
    /// Use the default file in the home directory, if it exists.
    #[default]
    Default,
    /// Use the given file.
    Path(PathBuf),
    /// Do not run any script.
    Disabled,
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Session file to restore from and save to.
    pub session: Option<PathBuf>,
    /// Startup script selection (`-c` / `-C`).
    pub startup: ScriptChoice,
    /// Prestart script selection (`-p` / `-P`).
    pub prestart: ScriptChoice,
    /// Number of `-d` flags; each lowers the log threshold one level.
    pub debug: u8,
    /// Show usage and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);
    let mut extra = Vec::new();

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') => {
                result.help = true;
            }
            Short('s') => {
                result.session = Some(parser.value()?.into());
            }
            Short('c') => {
                result.startup = ScriptChoice::Path(parser.value()?.into());
            }
            Short('C') => {
                result.startup = ScriptChoice::Disabled;
            }
            Short('p') => {
                result.prestart = ScriptChoice::Path(parser.value()?.into());
            }
            Short('P') => {
                result.prestart = ScriptChoice::Disabled;
            }
            Short('d') => {
                result.debug = result.debug.saturating_add(1);
            }
            Value(val) => {
                extra.push(val.to_string_lossy().into_owned());
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if !extra.is_empty() {
        return Err(ArgsError::TooManyParameters(extra.join(" ")));
    }

    Ok(result)
}

/// Print usage message.
pub fn print_usage() {
    println!(
        r#"Usage: packet-console [-s sessionfile] [-c new_startup_file] [-p new_prestart_file] [-C] [-P] [-d]
    -s: restore the session from this file and save it there on exit
    -c: read this startup file instead of ~/.pkt_console_startup
    -p: read this pre-startup file instead of ~/.pkt_console_prestart
    -C: do not read startup file
    -P: do not read pre-startup file
    -d: lower the logging threshold (repeatable)
    -h: print this help

ENVIRONMENT VARIABLES:
    PKT_CONSOLE_CONFIG      JSON configuration file
    PKT_CONSOLE_HISTFILE    History file (overrides config)
    PKT_CONSOLE_LOG_LEVEL   Log level (overrides config)
    RUST_LOG                Alternative log filter"#
    );
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Positional arguments are not accepted.
    TooManyParameters(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::TooManyParameters(rest) => {
                write!(f, "Too many parameters : [{}]", rest)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("packet-console")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.session.is_none());
        assert_eq!(result.startup, ScriptChoice::Default);
        assert_eq!(result.prestart, ScriptChoice::Default);
        assert_eq!(result.debug, 0);
        assert!(!result.help);
    }

    #[test]
    fn test_session_file() {
        let result = parse_args_from(args(&["-s", "/tmp/work.session"])).unwrap();
        assert_eq!(result.session, Some(PathBuf::from("/tmp/work.session")));
    }

    #[test]
    fn test_script_overrides() {
        let result = parse_args_from(args(&["-c", "start.pcs", "-p", "pre.pcs"])).unwrap();
        assert_eq!(result.startup, ScriptChoice::Path(PathBuf::from("start.pcs")));
        assert_eq!(result.prestart, ScriptChoice::Path(PathBuf::from("pre.pcs")));
    }

    #[test]
    fn test_disable_scripts() {
        let result = parse_args_from(args(&["-C", "-P"])).unwrap();
        assert_eq!(result.startup, ScriptChoice::Disabled);
        assert_eq!(result.prestart, ScriptChoice::Disabled);
    }

    #[test]
    fn test_last_script_flag_wins() {
        let result = parse_args_from(args(&["-C", "-c", "start.pcs"])).unwrap();
        assert_eq!(result.startup, ScriptChoice::Path(PathBuf::from("start.pcs")));

        let result = parse_args_from(args(&["-c", "start.pcs", "-C"])).unwrap();
        assert_eq!(result.startup, ScriptChoice::Disabled);
    }

    #[test]
    fn test_debug_repeatable() {
        let result = parse_args_from(args(&["-d", "-d"])).unwrap();
        assert_eq!(result.debug, 2);

        let result = parse_args_from(args(&["-dd"])).unwrap();
        assert_eq!(result.debug, 2);
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_trailing_arguments_rejected() {
        let err = parse_args_from(args(&["-d", "extra", "more"])).unwrap_err();
        assert!(matches!(err, ArgsError::TooManyParameters(_)));
        assert!(err.to_string().contains("extra more"));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(parse_args_from(args(&["-x"])).is_err());
        assert!(parse_args_from(args(&["--host", "0.0.0.0"])).is_err());
    }

    #[test]
    fn test_missing_value() {
        assert!(parse_args_from(args(&["-s"])).is_err());
    }
}
