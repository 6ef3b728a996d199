//! Additive, timestamp-driven folder synchronization.
//!
//! Files are copied when missing from the target or when the source's
//! modification time is strictly newer. Copied files get the source's mtime so
//! the next run sees them as current. Files that exist only in the target are
//! never deleted: the sync only adds and updates.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::skip::SkipPatterns;
use super::types::SyncResult;

/// Error during folder synchronization.
#[derive(Debug, Error)]
pub enum FolderSyncError {
  #[error("source folder does not exist: {}", .0.display())]
  SourceMissing(PathBuf),

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to traverse directory {}: {source}", path.display())]
  Walk {
    path: PathBuf,
    #[source]
    source: walkdir::Error,
  },

  #[error("failed to read metadata for {}: {source}", path.display())]
  Metadata {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to copy {} to {}: {source}", from.display(), to.display())]
  Copy {
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to set modification time on {}: {source}", path.display())]
  SetModified {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Folder-to-folder sync capability, injectable into the orchestrator.
pub trait FolderSynchronizer {
  /// Mirror `source` into `target`, additively.
  ///
  /// Never panics and never returns an error: failures are reported through
  /// `SyncResult::success` / `error_message`, with counts gathered so far.
  fn sync_folder(&self, source: &Path, target: &Path, skip: &SkipPatterns) -> SyncResult;
}

/// The filesystem implementation of [`FolderSynchronizer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSynchronizer;

impl FileSynchronizer {
  pub fn new() -> Self {
    Self
  }

  fn sync_tree(
    &self,
    source: &Path,
    target: &Path,
    skip: &SkipPatterns,
    result: &mut SyncResult,
  ) -> Result<(), FolderSyncError> {
    if !source.is_dir() {
      return Err(FolderSyncError::SourceMissing(source.to_path_buf()));
    }

    create_dir(target)?;

    // Pre-order walk: every directory is visited before its contents, so the
    // mirrored target directory exists by the time its files are copied.
    let walker = WalkDir::new(source).min_depth(1).follow_links(true).sort_by_file_name();

    for entry in walker {
      let entry = entry.map_err(|e| FolderSyncError::Walk {
        path: source.to_path_buf(),
        source: e,
      })?;

      // Every yielded path lives under `source`.
      let Ok(relative) = entry.path().strip_prefix(source) else {
        continue;
      };
      let target_path = target.join(relative);

      if entry.file_type().is_dir() {
        create_dir(&target_path)?;
        continue;
      }

      let file_name = entry.file_name().to_string_lossy();
      if skip.matches(&file_name) {
        debug!(path = %relative.display(), "skipped by pattern");
        result.files_skipped += 1;
        continue;
      }

      if copy_if_newer(entry.path(), &target_path)? {
        debug!(path = %relative.display(), "updated");
        result.files_updated += 1;
      } else {
        result.files_skipped += 1;
      }
    }

    Ok(())
  }
}

impl FolderSynchronizer for FileSynchronizer {
  fn sync_folder(&self, source: &Path, target: &Path, skip: &SkipPatterns) -> SyncResult {
    let mut result = SyncResult::new();

    if let Err(e) = self.sync_tree(source, target, skip, &mut result) {
      result.fail(e.to_string());
      return result;
    }

    info!(
      source = %source.display(),
      target = %target.display(),
      updated = result.files_updated,
      skipped = result.files_skipped,
      "folder synced"
    );
    result
  }
}

fn create_dir(path: &Path) -> Result<(), FolderSyncError> {
  fs::create_dir_all(path).map_err(|e| FolderSyncError::CreateDir {
    path: path.to_path_buf(),
    source: e,
  })
}

fn modified(path: &Path) -> Result<Option<SystemTime>, FolderSyncError> {
  match fs::metadata(path) {
    Ok(meta) => meta.modified().map(Some).map_err(|e| FolderSyncError::Metadata {
      path: path.to_path_buf(),
      source: e,
    }),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(e) => Err(FolderSyncError::Metadata {
      path: path.to_path_buf(),
      source: e,
    }),
  }
}

/// Copy `source` over `target` when the target is missing or strictly older.
///
/// Returns whether a copy happened. The target's mtime is set to the source's
/// so that an unchanged source is skipped next time. `fs::copy` carries the
/// source's permission bits over, so the target may be read-only.
pub(crate) fn copy_if_newer(source: &Path, target: &Path) -> Result<bool, FolderSyncError> {
  let source_mtime = modified(source)?.ok_or_else(|| FolderSyncError::Metadata {
    path: source.to_path_buf(),
    source: io::Error::from(io::ErrorKind::NotFound),
  })?;

  if let Some(target_mtime) = modified(target)? {
    if source_mtime <= target_mtime {
      return Ok(false);
    }
    // A read-only copy from an earlier run cannot be truncated in place.
    make_writable(target).map_err(|e| FolderSyncError::Copy {
      from: source.to_path_buf(),
      to: target.to_path_buf(),
      source: e,
    })?;
  }

  fs::copy(source, target).map_err(|e| FolderSyncError::Copy {
    from: source.to_path_buf(),
    to: target.to_path_buf(),
    source: e,
  })?;

  set_file_mtime(target, source_mtime).map_err(|e| FolderSyncError::SetModified {
    path: target.to_path_buf(),
    source: e,
  })?;

  Ok(true)
}

#[cfg(unix)]
fn make_writable(path: &Path) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;

  let mut perms = fs::metadata(path)?.permissions();
  let mode = perms.mode();
  if mode & 0o200 == 0 {
    perms.set_mode(mode | 0o200);
    fs::set_permissions(path, perms)?;
  }
  Ok(())
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> io::Result<()> {
  let mut perms = fs::metadata(path)?.permissions();
  if perms.readonly() {
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(path, perms)?;
  }
  Ok(())
}

// futimens only needs ownership of the file, so a read-only handle is enough.
#[cfg(unix)]
fn set_file_mtime(path: &Path, mtime: SystemTime) -> io::Result<()> {
  File::open(path)?.set_modified(mtime)
}

// FILE_WRITE_ATTRIBUTES is granted even when the read-only attribute is set.
#[cfg(windows)]
fn set_file_mtime(path: &Path, mtime: SystemTime) -> io::Result<()> {
  use std::os::windows::fs::OpenOptionsExt;

  const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
  File::options().access_mode(FILE_WRITE_ATTRIBUTES).open(path)?.set_modified(mtime)
}

#[cfg(not(any(unix, windows)))]
fn set_file_mtime(path: &Path, mtime: SystemTime) -> io::Result<()> {
  File::options().write(true).open(path)?.set_modified(mtime)
}
