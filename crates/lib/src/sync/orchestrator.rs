//! Sequential, fail-fast synchronization of every unit in a manifest.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::folder::{FileSynchronizer, FolderSyncError, FolderSynchronizer, copy_if_newer};
use super::skip::SkipPatterns;
use super::types::{SyncError, SyncOrchestratorResult, SyncResult, UnitReport};
use crate::archive::{ArchiveExtractor, ExtractionResult, MarkerStore, SyncDecision, SyncStrategy};
use crate::manifest::{SyncManifest, SyncMode, SyncUnit, UnitKind, is_contained_relative_path};

/// Archive decision and extraction, injectable into the orchestrator.
pub trait ArchiveSynchronizer {
  fn determine_strategy(&self, archive_path: &Path, target_dir: &Path) -> SyncDecision;
  fn extract_if_needed(&self, archive_path: &Path, target_dir: &Path, force: bool) -> ExtractionResult;
}

impl<M: MarkerStore> ArchiveSynchronizer for ArchiveExtractor<M> {
  fn determine_strategy(&self, archive_path: &Path, target_dir: &Path) -> SyncDecision {
    self.decider().determine_strategy(archive_path, target_dir)
  }

  fn extract_if_needed(&self, archive_path: &Path, target_dir: &Path, force: bool) -> ExtractionResult {
    ArchiveExtractor::extract_if_needed(self, archive_path, target_dir, force)
  }
}

/// Progress hooks for whoever presents the sync to a user.
///
/// `files_updated` fires only for units that changed something, so a front end
/// can stay quiet on the common nothing-to-do run and surface output otherwise.
pub trait SyncObserver {
  fn unit_started(&self, _unit: &SyncUnit) {}
  fn files_updated(&self, _label: &str, _count: u64) {}
  fn unit_finished(&self, _report: &UnitReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// What `sync_all` would do for one unit, without doing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPlan {
  pub name: String,
  pub kind: UnitKind,
  pub mode: SyncMode,
  pub source: PathBuf,
  pub target: PathBuf,
  /// Archive-mode units only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub decision: Option<SyncDecision>,
}

pub struct SyncOrchestrator {
  folders: Box<dyn FolderSynchronizer>,
  archives: Box<dyn ArchiveSynchronizer>,
  observer: Box<dyn SyncObserver>,
}

impl Default for SyncOrchestrator {
  fn default() -> Self {
    Self::new()
  }
}

impl SyncOrchestrator {
  /// Filesystem synchronizers and no observer.
  pub fn new() -> Self {
    Self {
      folders: Box::new(FileSynchronizer::new()),
      archives: Box::new(ArchiveExtractor::new()),
      observer: Box::new(NoopObserver),
    }
  }

  pub fn with_folder_synchronizer(mut self, folders: impl FolderSynchronizer + 'static) -> Self {
    self.folders = Box::new(folders);
    self
  }

  pub fn with_archive_synchronizer(mut self, archives: impl ArchiveSynchronizer + 'static) -> Self {
    self.archives = Box::new(archives);
    self
  }

  pub fn with_observer(mut self, observer: impl SyncObserver + 'static) -> Self {
    self.observer = Box::new(observer);
    self
  }

  /// Sync the manifest file, the runtime, then every application in order.
  ///
  /// Stops at the first failing unit and reports its message unchanged. Work
  /// done for earlier units is kept. A panic inside a collaborator is turned
  /// into a failed result. Nothing is touched unless every unit's target lies
  /// strictly below the local base.
  pub fn sync_all(&self, manifest: &SyncManifest) -> SyncOrchestratorResult {
    match panic::catch_unwind(AssertUnwindSafe(|| self.run(manifest))) {
      Ok(result) => result,
      Err(payload) => {
        let message = SyncError::Unexpected(panic_message(payload.as_ref())).to_string();
        warn!(error = %message, "sync aborted");
        let mut result = SyncOrchestratorResult::default();
        result.fail(message);
        result
      }
    }
  }

  /// Resolve every unit's paths and, for archive units, the decision that
  /// `sync_all` would act on. Touches nothing.
  pub fn plan(&self, manifest: &SyncManifest) -> Vec<UnitPlan> {
    let source_root = Path::new(&manifest.source_root_path);
    let local_base = Path::new(&manifest.local_base_path);

    manifest
      .sync_units()
      .into_iter()
      .map(|unit| {
        let target = local_base.join(&unit.relative_path);
        let (source, decision) = match &unit.mode {
          SyncMode::Folder => (source_root.join(&unit.relative_path), None),
          SyncMode::Archive { file_name } => {
            let archive = source_root.join(file_name);
            let decision = self.archives.determine_strategy(&archive, &target);
            (archive, Some(decision))
          }
        };

        UnitPlan {
          name: unit.name,
          kind: unit.kind,
          mode: unit.mode,
          source,
          target,
          decision,
        }
      })
      .collect()
  }

  fn run(&self, manifest: &SyncManifest) -> SyncOrchestratorResult {
    let mut result = SyncOrchestratorResult::default();

    if manifest.applications.is_empty() {
      result.fail(SyncError::NoApplications.to_string());
      return result;
    }

    let units = manifest.sync_units();
    if let Some(unit) = units.iter().find(|u| !is_contained_relative_path(&u.relative_path)) {
      let error = SyncError::UnsafeTarget {
        unit: unit.to_string(),
        relative_path: unit.relative_path.clone(),
      };
      warn!(error = %error, "refusing to sync");
      result.fail(error.to_string());
      return result;
    }

    info!(
      source = %manifest.source_root_path,
      target = %manifest.local_base_path,
      "sync started"
    );

    match self.sync_manifest_file(manifest) {
      Ok(true) => {
        result.files_updated += 1;
        self.observer.files_updated(&manifest.manifest_file_name, 1);
      }
      Ok(false) => {}
      Err(e) => {
        warn!(error = %e, "manifest copy failed");
        result.fail(e.to_string());
        return result;
      }
    }

    let skip = SkipPatterns::new(&manifest.sync_options.skip_patterns);

    for unit in units {
      self.observer.unit_started(&unit);

      let (unit_result, strategy) = self.sync_unit(manifest, &unit, &skip);
      if !unit_result.success {
        let message = unit_result
          .error_message
          .unwrap_or_else(|| format!("{} failed to sync", unit));
        warn!(unit = %unit, error = %message, "unit failed, aborting sync");
        result.fail(message);
        return result;
      }

      if unit_result.files_updated > 0 {
        self.observer.files_updated(&unit.to_string(), unit_result.files_updated);
      }

      info!(unit = %unit, updated = unit_result.files_updated, "unit synced");
      let report = UnitReport {
        name: unit.name,
        kind: unit.kind,
        strategy,
        files_updated: unit_result.files_updated,
        files_skipped: unit_result.files_skipped,
      };
      self.observer.unit_finished(&report);
      result.record(report);
    }

    info!(
      updated = result.files_updated,
      skipped = result.files_skipped,
      "sync finished"
    );
    result
  }

  /// Returns whether the manifest file was copied.
  fn sync_manifest_file(&self, manifest: &SyncManifest) -> Result<bool, SyncError> {
    let source = Path::new(&manifest.source_root_path).join(&manifest.manifest_file_name);
    if !source.is_file() {
      debug!(path = %source.display(), "no manifest file at source root");
      return Ok(false);
    }

    let local_base = Path::new(&manifest.local_base_path);
    let target = local_base.join(&manifest.manifest_file_name);
    let copy = || -> Result<bool, FolderSyncError> {
      fs::create_dir_all(local_base).map_err(|e| FolderSyncError::CreateDir {
        path: local_base.to_path_buf(),
        source: e,
      })?;
      copy_if_newer(&source, &target)
    };

    copy().map_err(|e| SyncError::ManifestCopy { path: source.clone(), source: e })
  }

  fn sync_unit(
    &self,
    manifest: &SyncManifest,
    unit: &SyncUnit,
    skip: &SkipPatterns,
  ) -> (SyncResult, Option<SyncStrategy>) {
    let source_root = Path::new(&manifest.source_root_path);
    let target = Path::new(&manifest.local_base_path).join(&unit.relative_path);

    match &unit.mode {
      SyncMode::Folder => {
        let source = source_root.join(&unit.relative_path);
        (self.folders.sync_folder(&source, &target, skip), None)
      }
      SyncMode::Archive { file_name } => {
        let archive = source_root.join(file_name);
        let decision = self.archives.determine_strategy(&archive, &target);
        info!(unit = %unit, strategy = %decision.strategy, reason = %decision.reason, "archive strategy");

        let result = match decision.strategy {
          SyncStrategy::NotApplicable => SyncResult::failed(SyncError::ArchiveMissing(archive).to_string()),
          SyncStrategy::InitialExtraction | SyncStrategy::ReExtraction => {
            let extraction = self.archives.extract_if_needed(&archive, &target, true);
            if extraction.success {
              SyncResult {
                files_updated: extraction.files_extracted,
                ..SyncResult::new()
              }
            } else {
              SyncResult::failed(
                extraction
                  .error_message
                  .unwrap_or_else(|| format!("failed to extract {}", archive.display())),
              )
            }
          }
          SyncStrategy::FolderSync => {
            let source = source_root.join(&unit.relative_path);
            if source.is_dir() {
              self.folders.sync_folder(&source, &target, skip)
            } else {
              debug!(path = %source.display(), "no loose source folder to layer over the archive");
              SyncResult::new()
            }
          }
          SyncStrategy::Skip => SyncResult::new(),
        };

        (result, Some(decision.strategy))
      }
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "panic during sync".to_string()
  }
}
