//! Strategy selection for archive-mode units.
//!
//! # Decision Table
//!
//! Evaluated in order:
//!
//! | Condition                                   | Strategy            |
//! |---------------------------------------------|---------------------|
//! | archive file missing                        | `NotApplicable`     |
//! | marker missing                              | `InitialExtraction` |
//! | marker unreadable / no or bad timestamp     | `InitialExtraction` |
//! | archive mtime > marker timestamp            | `ReExtraction`      |
//! | archive mtime == marker timestamp           | `FolderSync`        |
//! | archive mtime < marker timestamp            | `Skip`              |
//!
//! Both timestamps are compared as whole Unix seconds so that filesystems with
//! coarser or finer mtime resolution do not cause spurious re-extractions.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::marker::{FsMarkerStore, MarkerRead, MarkerStore};

/// What to do with an archive-mode unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStrategy {
  NotApplicable,
  InitialExtraction,
  ReExtraction,
  FolderSync,
  Skip,
}

impl SyncStrategy {
  pub fn as_str(&self) -> &'static str {
    match self {
      SyncStrategy::NotApplicable => "not-applicable",
      SyncStrategy::InitialExtraction => "initial-extraction",
      SyncStrategy::ReExtraction => "re-extraction",
      SyncStrategy::FolderSync => "folder-sync",
      SyncStrategy::Skip => "skip",
    }
  }

  /// Whether this strategy replaces the target directory with the archive contents.
  pub fn extracts(&self) -> bool {
    matches!(self, SyncStrategy::InitialExtraction | SyncStrategy::ReExtraction)
  }
}

impl fmt::Display for SyncStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A strategy together with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncDecision {
  pub strategy: SyncStrategy,
  pub reason: String,
}

impl SyncDecision {
  fn new(strategy: SyncStrategy, reason: impl Into<String>) -> Self {
    Self {
      strategy,
      reason: reason.into(),
    }
  }
}

/// Apply the decision table to an existing archive's mtime and its marker.
///
/// `archive_mtime` is `None` when the archive exists but its mtime could not be
/// read; the unit is then extracted afresh and the extractor reports whatever
/// I/O problem is behind it.
pub fn decide(archive_mtime: Option<DateTime<Utc>>, marker: MarkerRead) -> SyncDecision {
  let marker = match marker {
    MarkerRead::Missing => {
      return SyncDecision::new(SyncStrategy::InitialExtraction, "no extraction marker, extracting for the first time");
    }
    MarkerRead::Corrupt(e) => {
      return SyncDecision::new(
        SyncStrategy::InitialExtraction,
        format!("extraction marker is unusable ({}), extracting again", e),
      );
    }
    MarkerRead::Present(marker) => marker,
  };

  let Some(archive_mtime) = archive_mtime else {
    return SyncDecision::new(
      SyncStrategy::InitialExtraction,
      "archive modification time is unreadable, extracting again",
    );
  };

  let archive_secs = archive_mtime.timestamp();
  let marker_secs = marker.archive_timestamp.timestamp();

  match archive_secs.cmp(&marker_secs) {
    std::cmp::Ordering::Greater => SyncDecision::new(
      SyncStrategy::ReExtraction,
      format!(
        "archive was updated (archive: {}, marker: {})",
        archive_mtime.format("%Y-%m-%d %H:%M:%S"),
        marker.archive_timestamp.format("%Y-%m-%d %H:%M:%S")
      ),
    ),
    std::cmp::Ordering::Equal => SyncDecision::new(
      SyncStrategy::FolderSync,
      "archive unchanged, syncing loose files on top of the extracted tree",
    ),
    std::cmp::Ordering::Less => SyncDecision::new(SyncStrategy::Skip, "marker is newer than the archive, nothing to do"),
  }
}

/// Reads the archive mtime and the target's marker, then applies [`decide`].
#[derive(Debug, Clone, Default)]
pub struct ArchiveSyncDecider<M = FsMarkerStore> {
  markers: M,
}

impl ArchiveSyncDecider<FsMarkerStore> {
  pub fn new() -> Self {
    Self { markers: FsMarkerStore }
  }
}

impl<M: MarkerStore> ArchiveSyncDecider<M> {
  pub fn with_marker_store(markers: M) -> Self {
    Self { markers }
  }

  pub fn marker_store(&self) -> &M {
    &self.markers
  }

  /// Side-effect free apart from two metadata reads and one marker read.
  pub fn determine_strategy(&self, archive_path: &Path, target_dir: &Path) -> SyncDecision {
    if !archive_path.is_file() {
      return SyncDecision::new(
        SyncStrategy::NotApplicable,
        format!("archive file not found: {}", archive_path.display()),
      );
    }

    let marker = self.markers.read(target_dir);
    let archive_mtime = fs::metadata(archive_path)
      .and_then(|meta| meta.modified())
      .ok()
      .map(DateTime::<Utc>::from);

    decide(archive_mtime, marker)
  }
}
