//! Result and error types shared by the synchronizers and the orchestrator.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use super::folder::FolderSyncError;
use crate::archive::SyncStrategy;
use crate::manifest::UnitKind;

/// Errors raised by the orchestrator itself (as opposed to a unit's own failure).
#[derive(Debug, Error)]
pub enum SyncError {
  #[error("manifest defines no applications")]
  NoApplications,

  #[error("failed to copy manifest file {}: {source}", path.display())]
  ManifestCopy {
    path: PathBuf,
    #[source]
    source: FolderSyncError,
  },

  #[error("archive file not found: {}", .0.display())]
  ArchiveMissing(PathBuf),

  #[error("{unit} relative path {relative_path:?} does not name a directory below the local base")]
  UnsafeTarget { unit: String, relative_path: String },

  #[error("unexpected error during sync: {0}")]
  Unexpected(String),
}

/// Outcome of synchronizing one unit (or one folder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
  pub files_updated: u64,
  pub files_skipped: u64,
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
}

impl Default for SyncResult {
  fn default() -> Self {
    Self::new()
  }
}

impl SyncResult {
  /// A successful result with no files touched yet.
  pub fn new() -> Self {
    Self {
      files_updated: 0,
      files_skipped: 0,
      success: true,
      error_message: None,
    }
  }

  /// A failed result carrying `message`.
  pub fn failed(message: impl Into<String>) -> Self {
    Self {
      success: false,
      error_message: Some(message.into()),
      ..Self::new()
    }
  }

  /// Marks this result failed, keeping the counts gathered so far.
  pub fn fail(&mut self, message: impl Into<String>) {
    self.success = false;
    self.error_message = Some(message.into());
  }
}

/// Per-unit line of the orchestrator summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReport {
  pub name: String,
  pub kind: UnitKind,
  /// Decision taken for archive-mode units; `None` for folder-mode units.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub strategy: Option<SyncStrategy>,
  pub files_updated: u64,
  pub files_skipped: u64,
}

/// Aggregate outcome of a whole `sync_all` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOrchestratorResult {
  pub files_updated: u64,
  pub files_skipped: u64,
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
  /// Units that completed successfully, in sync order.
  pub units: Vec<UnitReport>,
}

impl Default for SyncOrchestratorResult {
  fn default() -> Self {
    Self {
      files_updated: 0,
      files_skipped: 0,
      success: true,
      error_message: None,
      units: Vec::new(),
    }
  }
}

impl SyncOrchestratorResult {
  /// Adds a completed unit's counts to the totals.
  pub fn record(&mut self, report: UnitReport) {
    self.files_updated += report.files_updated;
    self.files_skipped += report.files_skipped;
    self.units.push(report);
  }

  /// Stops the run with `message`; totals gathered so far are kept.
  pub fn fail(&mut self, message: impl Into<String>) {
    self.success = false;
    self.error_message = Some(message.into());
  }
}
