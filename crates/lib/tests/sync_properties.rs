//! End-to-end properties of the sync pipeline on a real filesystem.

mod common;

use std::fs;

use common::{BASE_SECS, Workspace, at, set_mtime, write_file, write_zip};
use syncbridge_lib::archive::{ArchiveSyncDecider, SyncStrategy};
use syncbridge_lib::consts::MARKER_FILENAME;
use syncbridge_lib::manifest::{ManifestError, load_manifest};
use syncbridge_lib::sync::SyncOrchestrator;

#[test]
fn unchanged_source_second_run_updates_nothing() {
  let ws = Workspace::new();
  write_zip(
    &ws.source().join("runtime.zip"),
    &[("bin/host", "host"), ("lib/core", "core")],
    at(BASE_SECS),
  );
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  write_file(&ws.source().join("apps/editor/res/strings.txt"), "strings");
  let manifest = ws.manifest(Some("runtime.zip"), &["editor"], &[]);
  let orchestrator = SyncOrchestrator::new();

  let first = orchestrator.sync_all(&manifest);
  let second = orchestrator.sync_all(&manifest);

  assert!(first.success, "{:?}", first.error_message);
  assert_eq!(first.files_updated, 4);
  assert_eq!(first.units[0].strategy, Some(SyncStrategy::InitialExtraction));

  assert!(second.success, "{:?}", second.error_message);
  assert_eq!(second.files_updated, 0);
  assert!(second.units.iter().all(|u| u.files_updated == 0));
  assert_eq!(second.units[0].strategy, Some(SyncStrategy::FolderSync));
}

#[test]
fn newer_archive_replaces_the_whole_tree() {
  let ws = Workspace::new();
  let archive = ws.source().join("runtime.zip");
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  let manifest = ws.manifest(Some("runtime.zip"), &["editor"], &[]);
  let orchestrator = SyncOrchestrator::new();

  write_zip(&archive, &[("a.txt", "v1"), ("b.txt", "v1")], at(BASE_SECS));
  assert!(orchestrator.sync_all(&manifest).success);

  write_zip(&archive, &[("a.txt", "v2")], at(BASE_SECS + 60));
  let result = orchestrator.sync_all(&manifest);

  assert!(result.success, "{:?}", result.error_message);
  assert_eq!(result.units[0].strategy, Some(SyncStrategy::ReExtraction));
  let runtime = ws.local().join("runtime");
  assert_eq!(fs::read_to_string(runtime.join("a.txt")).unwrap(), "v2");
  assert!(!runtime.join("b.txt").exists());
  assert!(runtime.join(MARKER_FILENAME).exists());
}

#[test]
fn folder_sync_never_deletes_local_files() {
  let ws = Workspace::new();
  write_file(&ws.source().join("runtime/host.cfg"), "host");
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  write_file(&ws.local().join("apps/editor/user.settings"), "mine");
  write_file(&ws.local().join("runtime/cache/blob.bin"), "cache");
  let manifest = ws.manifest(None, &["editor"], &[]);

  let result = SyncOrchestrator::new().sync_all(&manifest);

  assert!(result.success, "{:?}", result.error_message);
  assert_eq!(
    fs::read_to_string(ws.local().join("apps/editor/user.settings")).unwrap(),
    "mine"
  );
  assert!(ws.local().join("runtime/cache/blob.bin").exists());
}

#[test]
fn skip_patterns_match_suffix_or_exact_name_only() {
  let ws = Workspace::new();
  write_file(&ws.source().join("runtime/host.cfg"), "host");
  let app = ws.source().join("apps/editor");
  for name in ["a.log", "TRACE.LOG", "temp.txt", "mytemp.txt", "editor.dll"] {
    write_file(&app.join(name), name);
  }
  let manifest = ws.manifest(None, &["editor"], &["*.log", "temp.txt"]);

  let result = SyncOrchestrator::new().sync_all(&manifest);

  assert!(result.success);
  let local = ws.local().join("apps/editor");
  assert!(!local.join("a.log").exists());
  assert!(!local.join("TRACE.LOG").exists());
  assert!(!local.join("temp.txt").exists());
  assert!(local.join("mytemp.txt").exists());
  assert!(local.join("editor.dll").exists());
  assert_eq!(result.units[1].files_skipped, 3);
}

#[test]
fn traversal_entry_fails_the_unit_without_escaping() {
  let ws = Workspace::new();
  write_zip(
    &ws.source().join("runtime.zip"),
    &[("ok.txt", "ok"), ("../../evil.txt", "evil")],
    at(BASE_SECS),
  );
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  let manifest = ws.manifest(Some("runtime.zip"), &["editor"], &[]);

  let result = SyncOrchestrator::new().sync_all(&manifest);

  assert!(!result.success);
  assert!(result.error_message.unwrap().contains("outside the target directory"));
  assert!(!ws.temp.path().join("evil.txt").exists());
  assert!(!ws.local().join("evil.txt").exists());
  assert!(!ws.local().join("apps/editor").exists());
}

#[test]
fn decision_table_against_real_markers() {
  let ws = Workspace::new();
  let archive = ws.source().join("runtime.zip");
  let target = ws.local().join("runtime");
  let decider = ArchiveSyncDecider::new();

  assert_eq!(
    decider.determine_strategy(&archive, &target).strategy,
    SyncStrategy::NotApplicable
  );

  write_zip(&archive, &[("a.txt", "a")], at(BASE_SECS));
  assert_eq!(
    decider.determine_strategy(&archive, &target).strategy,
    SyncStrategy::InitialExtraction
  );

  let marker = |stamp: &str| format!("markerVersion=1\narchiveFileName=runtime.zip\narchiveTimestampUtc={}\n", stamp);
  // BASE_SECS is 2023-11-14T22:13:20Z.
  let cases = [
    ("2023-11-14T22:13:19Z", SyncStrategy::ReExtraction),
    ("2023-11-14T22:13:20Z", SyncStrategy::FolderSync),
    ("2023-11-14T22:13:21Z", SyncStrategy::Skip),
    ("not a timestamp", SyncStrategy::InitialExtraction),
  ];
  for (stamp, expected) in cases {
    write_file(&target.join(MARKER_FILENAME), &marker(stamp));
    assert_eq!(
      decider.determine_strategy(&archive, &target).strategy,
      expected,
      "marker {}",
      stamp
    );
  }
}

#[test]
fn failing_runtime_stops_before_applications() {
  let ws = Workspace::new();
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  let manifest = ws.manifest(Some("runtime.zip"), &["editor"], &[]);

  let result = SyncOrchestrator::new().sync_all(&manifest);

  assert!(!result.success);
  let message = result.error_message.unwrap();
  assert!(message.starts_with("archive file not found"), "{}", message);
  assert!(message.contains("runtime.zip"));
  assert!(result.units.is_empty());
  assert!(!ws.local().join("apps/editor").exists());
}

#[test]
fn loose_files_are_layered_over_an_unchanged_archive() {
  let ws = Workspace::new();
  write_zip(&ws.source().join("runtime.zip"), &[("host", "v1")], at(BASE_SECS));
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  let manifest = ws.manifest(Some("runtime.zip"), &["editor"], &[]);
  let orchestrator = SyncOrchestrator::new();
  assert!(orchestrator.sync_all(&manifest).success);

  let hotfix = ws.source().join("runtime/hotfix.cfg");
  write_file(&hotfix, "patched");
  set_mtime(&hotfix, at(BASE_SECS + 5));
  let result = orchestrator.sync_all(&manifest);

  assert!(result.success, "{:?}", result.error_message);
  assert_eq!(result.units[0].strategy, Some(SyncStrategy::FolderSync));
  assert_eq!(result.units[0].files_updated, 1);
  assert_eq!(
    fs::read_to_string(ws.local().join("runtime/hotfix.cfg")).unwrap(),
    "patched"
  );
  assert!(ws.local().join("runtime/host").exists());
}

#[test]
fn runtime_archive_without_relative_path_never_wipes_the_local_base() {
  let ws = Workspace::new();
  write_zip(&ws.source().join("runtime.zip"), &[("host", "v1")], at(BASE_SECS));
  write_file(&ws.source().join("apps/editor/editor.dll"), "editor");
  write_file(&ws.local().join("apps/editor/user.settings"), "mine");
  write_file(&ws.local().join("manifest.json"), "{}");

  let ini = format!(
    "[Manifest]\nSourceRootPath={}\nLocalBasePath={}\n\n[Runtime]\nArchiveFileName=runtime.zip\n\n\
     [App.Editor]\nRelativePath=apps/editor\nEntryModule=editor.dll\n",
    ws.source().display(),
    ws.local().display()
  );
  let ini_path = ws.temp.path().join("manifest.ini");
  write_file(&ini_path, &ini);
  let err = load_manifest(&ini_path).unwrap_err();
  assert!(matches!(err, ManifestError::MissingField(ref f) if f == "runtime.relativePath"), "{}", err);

  // A manifest assembled in code skips the loader's checks.
  let mut manifest = ws.manifest(Some("runtime.zip"), &["editor"], &[]);
  manifest.runtime.relative_path = String::new();
  let result = SyncOrchestrator::new().sync_all(&manifest);

  assert!(!result.success);
  assert!(result.units.is_empty());
  assert_eq!(
    fs::read_to_string(ws.local().join("apps/editor/user.settings")).unwrap(),
    "mine"
  );
  assert_eq!(fs::read_to_string(ws.local().join("manifest.json")).unwrap(), "{}");
  assert!(!ws.local().join("host").exists());
  assert!(!ws.local().join(MARKER_FILENAME).exists());
}
