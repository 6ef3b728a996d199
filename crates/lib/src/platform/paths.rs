//! Per-user directory resolution.
//!
//! Mirrors the usual conventions: XDG base directories on Unix,
//! `%LOCALAPPDATA%` on Windows.

use std::path::PathBuf;

use crate::consts::{APP_NAME, MANIFEST_FILENAME, MANIFEST_INI_FILENAME};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_default()
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the directory containing the running executable, if it can be determined.
pub fn exe_dir() -> Option<PathBuf> {
  let exe = std::env::current_exe().ok()?;
  exe.parent().map(|p| p.to_path_buf())
}

/// Candidate manifest locations, in lookup order.
///
/// The per-user data directory wins over the executable's directory, and JSON
/// wins over INI within the same directory.
pub fn manifest_candidates() -> Vec<PathBuf> {
  let mut dirs = vec![data_dir()];
  if let Some(dir) = exe_dir() {
    dirs.push(dir);
  }

  dirs
    .into_iter()
    .flat_map(|dir| [dir.join(MANIFEST_FILENAME), dir.join(MANIFEST_INI_FILENAME)])
    .collect()
}

/// Returns the first existing manifest candidate, or the JSON path in the
/// data directory when none exists (so error messages name a sensible path).
pub fn default_manifest_path() -> PathBuf {
  manifest_candidates()
    .into_iter()
    .find(|p| p.is_file())
    .unwrap_or_else(|| data_dir().join(MANIFEST_FILENAME))
}
