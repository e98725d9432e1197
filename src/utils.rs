//! Temporary file helpers.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::ConfRef;

/// Create a temporary file and return its path.
///
/// Unless `keep` is set the file is registered in `conf.temp_files` and
/// removed by [`delete_temp_files`] at exit.
pub fn get_temp_file(conf: &ConfRef, keep: bool) -> io::Result<PathBuf> {
    let file = tempfile::Builder::new().prefix("pkt_console").tempfile()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    if !keep {
        conf.borrow_mut().temp_files.push(path.clone());
    }
    Ok(path)
}

/// Remove every registered temporary file. Returns how many were removed.
pub fn delete_temp_files(conf: &ConfRef) -> usize {
    let files = std::mem::take(&mut conf.borrow_mut().temp_files);
    files
        .iter()
        .filter(|path| match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "temp file not removed");
                false
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Conf;

    #[test]
    fn test_temp_files_registered_and_deleted() {
        let conf = Conf::default().into_ref();
        let transient = get_temp_file(&conf, false).unwrap();
        let kept = get_temp_file(&conf, true).unwrap();

        assert!(transient.exists());
        assert_eq!(conf.borrow().temp_files, vec![transient.clone()]);

        assert_eq!(delete_temp_files(&conf), 1);
        assert!(!transient.exists());
        assert!(kept.exists());
        assert!(conf.borrow().temp_files.is_empty());

        fs::remove_file(kept).unwrap();
    }

    #[test]
    fn test_delete_tolerates_missing_files() {
        let conf = Conf::default().into_ref();
        let path = get_temp_file(&conf, false).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(delete_temp_files(&conf), 0);
    }
}
