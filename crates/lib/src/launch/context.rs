use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::info;

use super::LaunchError;
use crate::manifest::{AppConfig, SyncManifest};

const TOKEN_ENTRY: &str = "{entry}";
const TOKEN_ARGS: &str = "{args}";
const TOKEN_APP_ID: &str = "{appId}";

/// Everything needed to start one application from the local working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchContext {
  pub app_id: String,
  pub display_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  pub runtime_dir: PathBuf,
  pub app_dir: PathBuf,
  pub entry_path: PathBuf,
  pub working_dir: PathBuf,
  /// The runtime's host executable, or the entry itself when there is none.
  pub program: PathBuf,
  pub args: Vec<String>,
  /// Set to `runtime_dir` in the child's environment.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub root_env_var: Option<String>,
}

impl LaunchContext {
  pub fn new(manifest: &SyncManifest, app: &AppConfig, forwarded: &[String]) -> Self {
    let local_base = Path::new(&manifest.local_base_path);
    let runtime_dir = local_base.join(&manifest.runtime.relative_path);
    let app_dir = local_base.join(&app.relative_path);
    let entry_path = app_dir.join(&app.entry_module);

    let executable = manifest
      .runtime
      .executable
      .as_deref()
      .map(str::trim)
      .filter(|e| !e.is_empty());

    let (program, default_pattern) = match executable {
      Some(exe) => (runtime_dir.join(exe), "{entry} {args}"),
      None => (entry_path.clone(), "{args}"),
    };

    let pattern = app
      .launch_arg_pattern
      .as_deref()
      .filter(|p| !p.trim().is_empty())
      .unwrap_or(default_pattern);
    let args = expand_pattern(pattern, &entry_path.to_string_lossy(), &app.app_id, forwarded);

    Self {
      app_id: app.app_id.clone(),
      display_name: app.display_name().to_string(),
      version: app.version.clone(),
      working_dir: app_dir.clone(),
      runtime_dir,
      app_dir,
      entry_path,
      program,
      args,
      root_env_var: manifest
        .runtime
        .root_env_var
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string),
    }
  }
}

/// Split `pattern` on whitespace and substitute tokens.
///
/// A token that is exactly `{args}` becomes one argument per forwarded value
/// (possibly none); `{args}` inside a longer token is replaced by the values
/// joined with spaces.
fn expand_pattern(pattern: &str, entry: &str, app_id: &str, forwarded: &[String]) -> Vec<String> {
  let mut args = Vec::new();

  for token in pattern.split_whitespace() {
    if token == TOKEN_ARGS {
      args.extend(forwarded.iter().cloned());
      continue;
    }

    let expanded = token
      .replace(TOKEN_ENTRY, entry)
      .replace(TOKEN_APP_ID, app_id)
      .replace(TOKEN_ARGS, &forwarded.join(" "));
    args.push(expanded);
  }

  args
}

/// Start the application without waiting for it; returns the child's pid.
pub fn launch(ctx: &LaunchContext) -> Result<u32, LaunchError> {
  if !ctx.program.is_file() {
    return Err(LaunchError::ProgramNotFound(ctx.program.clone()));
  }
  if !ctx.entry_path.is_file() {
    return Err(LaunchError::EntryNotFound(ctx.entry_path.clone()));
  }

  info!(
    app = %ctx.display_name,
    version = ctx.version.as_deref().unwrap_or("-"),
    program = %ctx.program.display(),
    "launching application"
  );

  let mut command = Command::new(&ctx.program);
  command.args(&ctx.args).current_dir(&ctx.working_dir);
  if let Some(var) = &ctx.root_env_var {
    command.env(var, &ctx.runtime_dir);
  }

  let child = command.spawn().map_err(|e| LaunchError::Spawn {
    program: ctx.program.clone(),
    source: e,
  })?;

  Ok(child.id())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::{RuntimeConfig, SyncOptions};
  use std::fs;
  use tempfile::TempDir;

  fn manifest(base: &Path, executable: Option<&str>) -> SyncManifest {
    SyncManifest {
      version: None,
      source_root_path: "/src".to_string(),
      local_base_path: base.to_string_lossy().into_owned(),
      manifest_file_name: "manifest.json".to_string(),
      runtime: RuntimeConfig {
        relative_path: "runtime".to_string(),
        executable: executable.map(str::to_string),
        root_env_var: Some("SB_RUNTIME_ROOT".to_string()),
        ..Default::default()
      },
      applications: vec![AppConfig {
        app_id: "Editor".to_string(),
        display_name: Some("Text Editor".to_string()),
        version: Some("2.1".to_string()),
        relative_path: "apps/editor".to_string(),
        entry_module: "editor.dll".to_string(),
        ..Default::default()
      }],
      sync_options: SyncOptions::default(),
    }
  }

  fn forwarded(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn context_with_runtime_executable_passes_entry_first() {
    let base = Path::new("/opt/local");
    let m = manifest(base, Some("host"));
    let ctx = LaunchContext::new(&m, &m.applications[0], &forwarded(&["--file", "a.txt"]));

    let entry = base.join("apps/editor").join("editor.dll");
    assert_eq!(ctx.program, base.join("runtime").join("host"));
    assert_eq!(ctx.entry_path, entry);
    assert_eq!(ctx.working_dir, base.join("apps/editor"));
    assert_eq!(ctx.display_name, "Text Editor");
    assert_eq!(
      ctx.args,
      [entry.to_string_lossy().into_owned(), "--file".to_string(), "a.txt".to_string()]
    );
  }

  #[test]
  fn context_without_executable_runs_entry_directly() {
    let base = Path::new("/opt/local");
    let m = manifest(base, None);
    let ctx = LaunchContext::new(&m, &m.applications[0], &forwarded(&["-x"]));

    assert_eq!(ctx.program, ctx.entry_path);
    assert_eq!(ctx.args, ["-x"]);
  }

  #[test]
  fn custom_pattern_expands_every_token() {
    let args = expand_pattern(
      "--app={appId} run {entry} {args} --tail={args}",
      "/e.dll",
      "Editor",
      &forwarded(&["a", "b"]),
    );
    assert_eq!(args, ["--app=Editor", "run", "/e.dll", "a", "b", "--tail=a b"]);
  }

  #[test]
  fn standalone_args_token_with_nothing_forwarded_adds_nothing() {
    assert!(expand_pattern("{args}", "/e", "id", &[]).is_empty());
  }

  #[test]
  fn launch_reports_missing_program_and_entry() {
    let temp = TempDir::new().unwrap();
    let m = manifest(temp.path(), Some("host"));
    let ctx = LaunchContext::new(&m, &m.applications[0], &[]);

    assert!(matches!(launch(&ctx), Err(LaunchError::ProgramNotFound(_))));

    fs::create_dir_all(&ctx.runtime_dir).unwrap();
    fs::write(&ctx.program, "").unwrap();
    assert!(matches!(launch(&ctx), Err(LaunchError::EntryNotFound(_))));
  }

  #[cfg(unix)]
  #[test]
  fn launch_spawns_with_runtime_root_in_environment() {
    use std::time::{Duration, Instant};

    let temp = TempDir::new().unwrap();
    let m = manifest(temp.path(), Some("sh"));
    let ctx = LaunchContext::new(&m, &m.applications[0], &[]);
    fs::create_dir_all(&ctx.runtime_dir).unwrap();
    fs::create_dir_all(&ctx.app_dir).unwrap();
    std::os::unix::fs::symlink("/bin/sh", &ctx.program).unwrap();
    fs::write(&ctx.entry_path, "printf '%s' \"$SB_RUNTIME_ROOT\" > out.tmp && mv out.tmp out.txt\n").unwrap();

    let pid = launch(&ctx).unwrap();
    assert!(pid > 0);

    let out = ctx.app_dir.join("out.txt");
    let deadline = Instant::now() + Duration::from_secs(10);
    while !out.exists() && Instant::now() < deadline {
      std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(fs::read_to_string(out).unwrap(), ctx.runtime_dir.to_string_lossy());
  }
}
