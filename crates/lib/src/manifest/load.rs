//! Manifest loading from JSON or INI files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::expand::expand_env_vars;
use super::ini::{IniDocument, IniSection};
use super::types::{AppConfig, RuntimeConfig, SyncManifest, SyncOptions, app_ids_match, is_contained_relative_path};
use crate::consts::MANIFEST_FILENAME;

/// Section prefix for application sections in INI manifests (`[App.Editor]`).
const INI_APP_PREFIX: &str = "App.";

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("manifest file not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid JSON manifest: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid INI manifest at line {line}: {message}")]
  Ini { line: usize, message: String },

  #[error("manifest is missing required field: {0}")]
  MissingField(String),

  #[error("duplicate application id: {0}")]
  DuplicateAppId(String),

  #[error("{field} must be a relative path below the local base, got {path:?}")]
  InvalidRelativePath { field: String, path: String },
}

/// Load a manifest file, choosing the format from the extension.
///
/// `.ini` files are parsed as INI, everything else as JSON. Root paths are
/// environment-expanded and the result is validated.
pub fn load_manifest(path: &Path) -> Result<SyncManifest, ManifestError> {
  let content = fs::read_to_string(path).map_err(|e| {
    if e.kind() == io::ErrorKind::NotFound {
      ManifestError::NotFound(path.to_path_buf())
    } else {
      ManifestError::Read {
        path: path.to_path_buf(),
        source: e,
      }
    }
  })?;

  let is_ini = path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"));

  debug!(path = %path.display(), format = if is_ini { "ini" } else { "json" }, "loading manifest");

  let manifest = if is_ini { parse_ini(&content)? } else { parse_json(&content)? };

  info!(
    source = %manifest.source_root_path,
    local = %manifest.local_base_path,
    applications = manifest.applications.len(),
    "manifest loaded"
  );

  Ok(manifest)
}

/// Parse a JSON manifest.
pub fn parse_json(content: &str) -> Result<SyncManifest, ManifestError> {
  let manifest: SyncManifest = serde_json::from_str(content.trim_start_matches('\u{feff}'))?;
  finalize(manifest)
}

/// Parse an INI manifest.
pub fn parse_ini(content: &str) -> Result<SyncManifest, ManifestError> {
  let doc = IniDocument::parse(content)?;

  let header = doc.section("Manifest");
  let header_value = |key: &str| header.and_then(|s| s.get_non_empty(key)).map(str::to_string);

  let runtime = doc.section("Runtime").map(runtime_from_ini).unwrap_or_default();

  let skip_patterns = doc
    .section("SyncOptions")
    .and_then(|s| s.get("SkipPatterns"))
    .map(|value| {
      value
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default();

  let applications = doc
    .sections()
    .filter_map(|section| {
      let app_id = section.name.get(..INI_APP_PREFIX.len())?;
      if !app_id.eq_ignore_ascii_case(INI_APP_PREFIX) {
        return None;
      }
      Some(app_from_ini(&section.name[INI_APP_PREFIX.len()..], section))
    })
    .collect();

  let manifest = SyncManifest {
    version: header_value("Version"),
    source_root_path: header_value("SourceRootPath").unwrap_or_default(),
    local_base_path: header_value("LocalBasePath").unwrap_or_default(),
    manifest_file_name: header_value("ManifestFileName").unwrap_or_else(|| MANIFEST_FILENAME.to_string()),
    runtime,
    applications,
    sync_options: SyncOptions { skip_patterns },
  };

  finalize(manifest)
}

fn runtime_from_ini(section: &IniSection) -> RuntimeConfig {
  let value = |key: &str| section.get_non_empty(key).map(str::to_string);
  RuntimeConfig {
    version: value("Version"),
    relative_path: value("RelativePath").unwrap_or_default(),
    archive_file_name: value("ArchiveFileName").or_else(|| value("ZipFileName")),
    executable: value("Executable"),
    root_env_var: value("RootEnvVar"),
  }
}

fn app_from_ini(app_id: &str, section: &IniSection) -> AppConfig {
  let value = |key: &str| section.get_non_empty(key).map(str::to_string);
  AppConfig {
    app_id: app_id.trim().to_string(),
    display_name: value("DisplayName"),
    version: value("Version"),
    relative_path: value("RelativePath").unwrap_or_default(),
    entry_module: value("EntryModule").or_else(|| value("EntryDll")).unwrap_or_default(),
    launch_arg_pattern: value("LaunchArgPattern"),
    archive_file_name: value("ArchiveFileName").or_else(|| value("ZipFileName")),
  }
}

/// Expand root paths and check the fields every later stage relies on.
fn finalize(mut manifest: SyncManifest) -> Result<SyncManifest, ManifestError> {
  manifest.source_root_path = expand_env_vars(manifest.source_root_path.trim());
  manifest.local_base_path = expand_env_vars(manifest.local_base_path.trim());

  if manifest.source_root_path.is_empty() {
    return Err(ManifestError::MissingField("sourceRootPath".to_string()));
  }
  if manifest.local_base_path.is_empty() {
    return Err(ManifestError::MissingField("localBasePath".to_string()));
  }

  check_relative_path("runtime.relativePath", &manifest.runtime.relative_path)?;

  for (index, app) in manifest.applications.iter().enumerate() {
    if app.app_id.is_empty() {
      return Err(ManifestError::MissingField(format!("applications[{}].appId", index)));
    }
    if app.entry_module.is_empty() {
      return Err(ManifestError::MissingField(format!("{}.entryModule", app.app_id)));
    }
    check_relative_path(&format!("{}.relativePath", app.app_id), &app.relative_path)?;
    let duplicate = manifest.applications[..index]
      .iter()
      .any(|other| app_ids_match(&other.app_id, &app.app_id));
    if duplicate {
      return Err(ManifestError::DuplicateAppId(app.app_id.clone()));
    }
  }

  Ok(manifest)
}

/// Unit targets are `localBasePath/relativePath` and must sit strictly below
/// the base.
fn check_relative_path(field: &str, path: &str) -> Result<(), ManifestError> {
  if path.trim().is_empty() {
    return Err(ManifestError::MissingField(field.to_string()));
  }
  if !is_contained_relative_path(path) {
    return Err(ManifestError::InvalidRelativePath {
      field: field.to_string(),
      path: path.to_string(),
    });
  }
  Ok(())
}
