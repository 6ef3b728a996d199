//! Full-replace archive extraction with a path-traversal guard.
//!
//! Supports:
//! - `.tar.gz` / `.tgz`
//! - `.tar`
//! - zip (every other file name)
//!
//! Every entry's destination is resolved lexically against the canonical
//! target directory and must stay inside it; the parent directory is then
//! canonicalized again so a symlink planted by an earlier entry cannot
//! redirect later writes. The first offending entry aborts the extraction.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use flate2::read::GzDecoder;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::decide::{ArchiveSyncDecider, SyncStrategy};
use super::marker::{ExtractionMarker, FsMarkerStore, MarkerRead, MarkerStore};

/// Why an extraction failed. Each category gets its own message prefix.
#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("archive file not found: {}", .0.display())]
  ArchiveMissing(PathBuf),

  #[error("archive is corrupted: {0}")]
  Corrupt(String),

  #[error("I/O error during extraction: {0}")]
  Io(#[source] io::Error),

  #[error("access denied during extraction: {0}")]
  PermissionDenied(#[source] io::Error),

  #[error("archive entry resolves outside the target directory: {0}")]
  PathTraversal(String),

  #[error("unexpected error during extraction: {0}")]
  Unexpected(String),
}

impl From<io::Error> for ExtractError {
  fn from(e: io::Error) -> Self {
    match e.kind() {
      io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied(e),
      io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
        ExtractError::Corrupt(e.to_string())
      }
      _ => ExtractError::Io(e),
    }
  }
}

impl From<zip::result::ZipError> for ExtractError {
  fn from(e: zip::result::ZipError) -> Self {
    use zip::result::ZipError;

    match e {
      ZipError::Io(io) => io.into(),
      ZipError::InvalidArchive(msg) => ExtractError::Corrupt(msg.to_string()),
      ZipError::UnsupportedArchive(msg) => ExtractError::Corrupt(msg.to_string()),
      other => ExtractError::Unexpected(other.to_string()),
    }
  }
}

/// Outcome of [`ArchiveExtractor::extract_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  pub files_extracted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
  Zip,
  Tar,
  TarGz,
}

impl ArchiveFormat {
  fn detect(path: &Path) -> Self {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_lowercase())
      .unwrap_or_default();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      ArchiveFormat::TarGz
    } else if name.ends_with(".tar") {
      ArchiveFormat::Tar
    } else {
      ArchiveFormat::Zip
    }
  }
}

/// Extracts archives into target directories and maintains their markers.
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor<M = FsMarkerStore> {
  decider: ArchiveSyncDecider<M>,
}

impl ArchiveExtractor<FsMarkerStore> {
  pub fn new() -> Self {
    Self {
      decider: ArchiveSyncDecider::new(),
    }
  }
}

impl<M: MarkerStore> ArchiveExtractor<M> {
  pub fn with_marker_store(markers: M) -> Self {
    Self {
      decider: ArchiveSyncDecider::with_marker_store(markers),
    }
  }

  pub fn decider(&self) -> &ArchiveSyncDecider<M> {
    &self.decider
  }

  /// Extract `archive_path` into `target_dir`.
  ///
  /// An existing target is deleted first when `force` is set or when the
  /// marker shows an older archive version. Never panics; failures land in
  /// the result's `error_message`.
  pub fn extract_if_needed(&self, archive_path: &Path, target_dir: &Path, force: bool) -> ExtractionResult {
    match self.extract(archive_path, target_dir, force) {
      Ok(files_extracted) => ExtractionResult {
        success: true,
        error_message: None,
        files_extracted,
      },
      Err(e) => {
        warn!(archive = %archive_path.display(), error = %e, "extraction failed");
        ExtractionResult {
          success: false,
          error_message: Some(e.to_string()),
          files_extracted: 0,
        }
      }
    }
  }

  fn needs_re_extraction(&self, archive_path: &Path, target_dir: &Path) -> bool {
    if matches!(self.decider.marker_store().read(target_dir), MarkerRead::Missing) {
      return false;
    }
    self.decider.determine_strategy(archive_path, target_dir).strategy == SyncStrategy::ReExtraction
  }

  fn extract(&self, archive_path: &Path, target_dir: &Path, force: bool) -> Result<u64, ExtractError> {
    if !archive_path.is_file() {
      return Err(ExtractError::ArchiveMissing(archive_path.to_path_buf()));
    }

    if target_dir.exists() && (force || self.needs_re_extraction(archive_path, target_dir)) {
      info!(target = %target_dir.display(), "removing previous extraction");
      fs::remove_dir_all(target_dir)?;
    }

    fs::create_dir_all(target_dir)?;
    let root = dunce::canonicalize(target_dir)?;
    let archive_mtime = fs::metadata(archive_path)?.modified()?;

    info!(archive = %archive_path.display(), target = %root.display(), "extracting archive");

    let files_extracted = match ArchiveFormat::detect(archive_path) {
      ArchiveFormat::Zip => unpack_zip(archive_path, &root)?,
      ArchiveFormat::Tar => unpack_tar(BufReader::new(File::open(archive_path)?), &root)?,
      ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(BufReader::new(File::open(archive_path)?)), &root)?,
    };

    let file_name = archive_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    let marker = ExtractionMarker::new(file_name, archive_mtime, Utc::now());
    self.decider.marker_store().write(&root, &marker)?;

    info!(files = files_extracted, target = %root.display(), "archive extracted");
    Ok(files_extracted)
  }
}

/// Lexically resolve `name` against `base` and require the result to stay
/// within `root` (equal to it, or below it component-wise).
fn resolve_within(root: &Path, base: &Path, name: &str) -> Result<PathBuf, ExtractError> {
  let normalized = name.replace('\\', "/");
  let mut resolved = base.to_path_buf();

  for component in Path::new(&normalized).components() {
    match component {
      Component::Normal(part) => resolved.push(part),
      Component::CurDir => {}
      Component::ParentDir => {
        resolved.pop();
      }
      Component::RootDir | Component::Prefix(_) => return Err(ExtractError::PathTraversal(name.to_string())),
    }
  }

  if resolved.starts_with(root) {
    Ok(resolved)
  } else {
    Err(ExtractError::PathTraversal(name.to_string()))
  }
}

/// Create `dest`'s parent, re-check it canonically, and clear any non-directory
/// already at `dest` so the write cannot follow a stale symlink.
fn prepare_destination(root: &Path, dest: &Path, name: &str) -> Result<(), ExtractError> {
  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent)?;
    if !dunce::canonicalize(parent)?.starts_with(root) {
      return Err(ExtractError::PathTraversal(name.to_string()));
    }
  }

  if let Ok(meta) = fs::symlink_metadata(dest) {
    if !meta.is_dir() {
      fs::remove_file(dest)?;
    }
  }

  Ok(())
}

fn create_directory_entry(root: &Path, dest: &Path, name: &str) -> Result<(), ExtractError> {
  fs::create_dir_all(dest)?;
  if !dunce::canonicalize(dest)?.starts_with(root) {
    return Err(ExtractError::PathTraversal(name.to_string()));
  }
  Ok(())
}

fn unpack_zip(archive_path: &Path, root: &Path) -> Result<u64, ExtractError> {
  let file = File::open(archive_path)?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
  let mut count = 0;

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i)?;
    let name = entry.name().to_string();
    let dest = resolve_within(root, root, &name)?;

    if name.ends_with('/') || name.ends_with('\\') {
      create_directory_entry(root, &dest, &name)?;
      continue;
    }

    prepare_destination(root, &dest, &name)?;
    let mut outfile = File::create(&dest)?;
    io::copy(&mut entry, &mut outfile)?;
    debug!(entry = %name, "extracted");

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode().filter(|m| m & 0o777 != 0) {
        fs::set_permissions(&dest, fs::Permissions::from_mode(mode & 0o7777))?;
      }
    }

    count += 1;
  }

  Ok(count)
}

fn unpack_tar<R: Read>(reader: R, root: &Path) -> Result<u64, ExtractError> {
  let mut archive = tar::Archive::new(reader);
  let mut count = 0;

  for entry in archive.entries()? {
    let mut entry = entry?;
    let name = entry.path()?.to_string_lossy().into_owned();
    let dest = resolve_within(root, root, &name)?;
    let kind = entry.header().entry_type();

    if kind.is_dir() {
      create_directory_entry(root, &dest, &name)?;
      continue;
    }

    if kind.is_symlink() {
      let link = entry
        .link_name()?
        .ok_or_else(|| ExtractError::Corrupt(format!("symlink without target: {}", name)))?;
      let base = dest.parent().unwrap_or(root);
      resolve_within(root, base, &link.to_string_lossy())?;
    } else if !kind.is_file() {
      debug!(entry = %name, "skipping unsupported tar entry type");
      continue;
    }

    prepare_destination(root, &dest, &name)?;
    entry.unpack(&dest)?;
    debug!(entry = %name, "extracted");
    count += 1;
  }

  Ok(count)
}
