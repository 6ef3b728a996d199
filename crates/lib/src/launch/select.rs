use tracing::warn;

use super::LaunchError;
use crate::manifest::{AppConfig, SyncManifest};

/// Pick the application to launch.
///
/// `requested` is matched case-insensitively against app ids. An unknown id
/// falls back to the first application with a warning, as does no request.
pub fn select_app<'a>(manifest: &'a SyncManifest, requested: Option<&str>) -> Result<&'a AppConfig, LaunchError> {
  let first = manifest.applications.first().ok_or(LaunchError::NoApplications)?;

  match requested.map(str::trim).filter(|id| !id.is_empty()) {
    None => Ok(first),
    Some(id) => match manifest.find_app(id) {
      Some(app) => Ok(app),
      None => {
        warn!(requested = %id, fallback = %first.app_id, "application not found, using the first one");
        Ok(first)
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::{RuntimeConfig, SyncOptions};
  use tracing_test::traced_test;

  fn manifest(ids: &[&str]) -> SyncManifest {
    SyncManifest {
      version: None,
      source_root_path: "/src".to_string(),
      local_base_path: "/local".to_string(),
      manifest_file_name: "manifest.json".to_string(),
      runtime: RuntimeConfig {
        relative_path: "runtime".to_string(),
        ..Default::default()
      },
      applications: ids
        .iter()
        .map(|id| AppConfig {
          app_id: id.to_string(),
          relative_path: id.to_lowercase(),
          entry_module: format!("{}.dll", id),
          ..Default::default()
        })
        .collect(),
      sync_options: SyncOptions::default(),
    }
  }

  #[test]
  fn no_request_selects_first() {
    let m = manifest(&["Editor", "Viewer"]);
    assert_eq!(select_app(&m, None).unwrap().app_id, "Editor");
    assert_eq!(select_app(&m, Some("  ")).unwrap().app_id, "Editor");
  }

  #[test]
  fn request_matches_ignoring_case() {
    let m = manifest(&["Editor", "Viewer"]);
    assert_eq!(select_app(&m, Some("viewer")).unwrap().app_id, "Viewer");
  }

  #[test]
  #[traced_test]
  fn unknown_request_falls_back_with_warning() {
    let m = manifest(&["Editor", "Viewer"]);
    assert_eq!(select_app(&m, Some("Paint")).unwrap().app_id, "Editor");
    assert!(logs_contain("application not found"));
  }

  #[test]
  fn empty_manifest_is_an_error() {
    let m = manifest(&[]);
    assert!(matches!(select_app(&m, Some("Editor")), Err(LaunchError::NoApplications)));
  }
}
