mod plan;
mod run;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use syncbridge_lib::manifest::{SyncManifest, load_manifest};
use syncbridge_lib::platform::paths::default_manifest_path;

pub use plan::cmd_plan;
pub use run::cmd_run;

/// Command-line choices shared by every command.
pub struct RunOptions<'a> {
  pub manifest: Option<&'a Path>,
  pub app: Option<&'a str>,
  pub sync_only: bool,
  pub random_delay: Option<u64>,
  pub console: bool,
  pub json: bool,
  pub app_args: &'a [String],
}

/// Load the manifest given on the command line, or the discovered default.
fn resolve_manifest(path: Option<&Path>) -> Result<SyncManifest> {
  let path = match path {
    Some(p) => p.to_path_buf(),
    None => default_manifest_path(),
  };
  debug!(path = %path.display(), "loading manifest");

  load_manifest(&path).with_context(|| format!("Failed to load manifest: {}", path.display()))
}
