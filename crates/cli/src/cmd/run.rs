//! The default command: sync everything, then launch the selected application.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::Rng;
use tracing::info;

use syncbridge_lib::launch::{LaunchContext, launch, select_app};
use syncbridge_lib::manifest::SyncUnit;
use syncbridge_lib::sync::{SyncObserver, SyncOrchestrator, UnitReport};

use super::{RunOptions, resolve_manifest};
use crate::output::{format_duration, plural, print_info, print_json, print_stat, print_success};

/// Prints per-unit progress on stdout.
///
/// Quiet by default: only units that changed files are reported, which keeps
/// the common up-to-date start silent. `always` reports every unit.
struct ConsoleObserver {
  always: bool,
  quiet: bool,
}

impl SyncObserver for ConsoleObserver {
  fn unit_started(&self, unit: &SyncUnit) {
    if self.always && !self.quiet {
      print_info(&format!("Syncing {}", unit));
    }
  }

  fn files_updated(&self, label: &str, count: u64) {
    if !self.always && !self.quiet {
      print_info(&format!("{}: {} updated", label, plural(count, "file")));
    }
  }

  fn unit_finished(&self, report: &UnitReport) {
    if self.always && !self.quiet {
      let strategy = report.strategy.map(|s| format!(" ({})", s)).unwrap_or_default();
      print_stat(
        &report.name,
        &format!(
          "{} updated, {} skipped{}",
          plural(report.files_updated, "file"),
          report.files_skipped,
          strategy
        ),
      );
    }
  }
}

fn random_delay(max_secs: u64) {
  if max_secs == 0 {
    return;
  }
  let delay = Duration::from_secs(rand::thread_rng().gen_range(0..=max_secs));
  info!(delay = %format_duration(delay), "waiting before sync");
  thread::sleep(delay);
}

pub fn cmd_run(opts: &RunOptions) -> Result<()> {
  let manifest = resolve_manifest(opts.manifest)?;

  if let Some(max_secs) = opts.random_delay {
    random_delay(max_secs);
  }

  let observer = ConsoleObserver {
    always: opts.console,
    quiet: opts.json,
  };
  let result = SyncOrchestrator::new().with_observer(observer).sync_all(&manifest);

  if opts.json {
    print_json(&result)?;
  }

  if !result.success {
    bail!(
      "Sync failed: {}",
      result.error_message.as_deref().unwrap_or("unknown error")
    );
  }

  if !opts.json {
    print_success("Sync complete");
    print_stat("Updated", &result.files_updated.to_string());
    print_stat("Skipped", &result.files_skipped.to_string());
  }

  if opts.sync_only {
    return Ok(());
  }

  let app = select_app(&manifest, opts.app)?;
  let ctx = LaunchContext::new(&manifest, app, opts.app_args);
  let pid = launch(&ctx).with_context(|| format!("Failed to launch {}", ctx.display_name))?;

  if !opts.json {
    print_success(&format!("Launched {} (pid {})", ctx.display_name, pid));
  }

  Ok(())
}
