//! Shared fixtures for the library integration tests.

#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use syncbridge_lib::manifest::{AppConfig, RuntimeConfig, SyncManifest, SyncOptions};

pub const BASE_SECS: u64 = 1_700_000_000;

pub fn at(secs: u64) -> SystemTime {
  SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn write_file(path: &Path, content: &str) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

pub fn set_mtime(path: &Path, time: SystemTime) {
  File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
}

/// Write a zip with the given `(name, content)` file entries and stamp its mtime.
pub fn write_zip(path: &Path, entries: &[(&str, &str)], mtime: SystemTime) {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
  for (name, content) in entries {
    zip.start_file(*name, SimpleFileOptions::default()).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
  }
  zip.finish().unwrap();
  set_mtime(path, mtime);
}

/// A source root and a local base inside one temp directory.
pub struct Workspace {
  pub temp: TempDir,
}

impl Workspace {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn source(&self) -> PathBuf {
    self.temp.path().join("source")
  }

  pub fn local(&self) -> PathBuf {
    self.temp.path().join("local")
  }

  /// Manifest with a runtime (archive mode when `runtime_archive` is set) and
  /// one folder-mode application per id, each under `apps/<id>`.
  pub fn manifest(&self, runtime_archive: Option<&str>, apps: &[&str], skip: &[&str]) -> SyncManifest {
    SyncManifest {
      version: Some("1.0".to_string()),
      source_root_path: self.source().to_string_lossy().into_owned(),
      local_base_path: self.local().to_string_lossy().into_owned(),
      manifest_file_name: "manifest.json".to_string(),
      runtime: RuntimeConfig {
        relative_path: "runtime".to_string(),
        archive_file_name: runtime_archive.map(str::to_string),
        ..Default::default()
      },
      applications: apps
        .iter()
        .map(|id| AppConfig {
          app_id: id.to_string(),
          relative_path: format!("apps/{}", id),
          entry_module: format!("{}.dll", id),
          ..Default::default()
        })
        .collect(),
      sync_options: SyncOptions {
        skip_patterns: skip.iter().map(|s| s.to_string()).collect(),
      },
    }
  }
}
