//! Manifest types for SyncBridge.
//!
//! The manifest is the declarative description of one deployment: where the
//! source tree lives, where the local copy goes, which runtime to sync and
//! which applications can be launched on top of it.
//!
//! # Example
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "sourceRootPath": "//fileserver/apps",
//!   "localBasePath": "%LOCALAPPDATA%/Company/Apps",
//!   "runtime": { "relativePath": "runtime", "archiveFileName": "runtime.zip" },
//!   "applications": [
//!     { "appId": "Editor", "relativePath": "apps/editor", "entryModule": "Editor.dll" }
//!   ],
//!   "syncOptions": { "skipPatterns": ["*.pdb", "Thumbs.db"] }
//! }
//! ```

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::consts::MANIFEST_FILENAME;

fn default_manifest_file_name() -> String {
  MANIFEST_FILENAME.to_string()
}

/// The complete deployment description.
///
/// Immutable after loading: the orchestrator and launcher only ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncManifest {
  /// Informational manifest version.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  /// Root of the source tree (environment variables already expanded).
  pub source_root_path: String,
  /// Root of the local working copy (environment variables already expanded).
  pub local_base_path: String,
  /// Name of the manifest file copied from the source root to the local base.
  #[serde(default = "default_manifest_file_name")]
  pub manifest_file_name: String,
  pub runtime: RuntimeConfig,
  /// Launchable applications, in declaration order.
  #[serde(default)]
  pub applications: Vec<AppConfig>,
  #[serde(default)]
  pub sync_options: SyncOptions,
}

/// The runtime shared by every application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  /// Location under both the source root and the local base.
  pub relative_path: String,
  /// Archive under the source root; its presence selects archive mode.
  #[serde(default, alias = "zipFileName", skip_serializing_if = "Option::is_none")]
  pub archive_file_name: Option<String>,
  /// Host executable inside the runtime directory used to start applications.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub executable: Option<String>,
  /// Environment variable pointed at the runtime directory when launching.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub root_env_var: Option<String>,
}

/// One launchable application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
  /// Unique key, compared case-insensitively.
  pub app_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  pub relative_path: String,
  /// Entry artifact, relative to the application directory.
  #[serde(alias = "entryDll")]
  pub entry_module: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub launch_arg_pattern: Option<String>,
  #[serde(default, alias = "zipFileName", skip_serializing_if = "Option::is_none")]
  pub archive_file_name: Option<String>,
}

impl AppConfig {
  /// Name shown to users: the display name when set, else the id.
  pub fn display_name(&self) -> &str {
    self.display_name.as_deref().filter(|s| !s.is_empty()).unwrap_or(&self.app_id)
  }
}

/// Options applied uniformly to every folder sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
  /// `*suffix` patterns or exact file names, both case-insensitive.
  #[serde(default)]
  pub skip_patterns: Vec<String>,
}

/// How a unit's source is represented, resolved once per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum SyncMode {
  /// Loose folder under the source root, mirrored with an additive diff.
  Folder,
  /// Versioned archive under the source root, extracted into the target.
  Archive {
    #[serde(rename = "archiveFileName")]
    file_name: String,
  },
}

impl SyncMode {
  fn from_archive_name(archive_file_name: Option<&str>) -> Self {
    match archive_file_name.map(str::trim) {
      Some(name) if !name.is_empty() => SyncMode::Archive {
        file_name: name.to_string(),
      },
      _ => SyncMode::Folder,
    }
  }
}

/// Whether a unit is the runtime or an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
  Runtime,
  Application,
}

/// A single synchronized unit: the runtime or one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUnit {
  /// `runtime` for the runtime, the app id for applications.
  pub name: String,
  pub kind: UnitKind,
  pub relative_path: String,
  #[serde(flatten)]
  pub mode: SyncMode,
}

impl fmt::Display for SyncUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      UnitKind::Runtime => write!(f, "runtime"),
      UnitKind::Application => write!(f, "app:{}", self.name),
    }
  }
}

impl RuntimeConfig {
  pub fn sync_mode(&self) -> SyncMode {
    SyncMode::from_archive_name(self.archive_file_name.as_deref())
  }
}

impl AppConfig {
  pub fn sync_mode(&self) -> SyncMode {
    SyncMode::from_archive_name(self.archive_file_name.as_deref())
  }
}

impl SyncManifest {
  /// All units in sync order: the runtime first, then applications as declared.
  pub fn sync_units(&self) -> Vec<SyncUnit> {
    let runtime = SyncUnit {
      name: "runtime".to_string(),
      kind: UnitKind::Runtime,
      relative_path: self.runtime.relative_path.clone(),
      mode: self.runtime.sync_mode(),
    };

    std::iter::once(runtime)
      .chain(self.applications.iter().map(|app| SyncUnit {
        name: app.app_id.clone(),
        kind: UnitKind::Application,
        relative_path: app.relative_path.clone(),
        mode: app.sync_mode(),
      }))
      .collect()
  }

  /// Finds an application by id, ignoring case.
  pub fn find_app(&self, app_id: &str) -> Option<&AppConfig> {
    self.applications.iter().find(|a| app_ids_match(&a.app_id, app_id))
  }
}

/// Case-insensitive id comparison with full Unicode case mapping.
pub fn app_ids_match(a: &str, b: &str) -> bool {
  a == b || a.to_lowercase() == b.to_lowercase()
}

/// Whether `relative_path` names a location strictly below the directory it
/// is joined to.
///
/// Empty paths, `.`, absolute paths, drive prefixes and any `..` component are
/// rejected. Joining an accepted path to a base can never yield the base
/// itself or anything outside it.
pub fn is_contained_relative_path(relative_path: &str) -> bool {
  let mut below = false;
  for component in Path::new(relative_path.trim()).components() {
    match component {
      Component::Normal(_) => below = true,
      Component::CurDir => {}
      Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
    }
  }
  below
}
