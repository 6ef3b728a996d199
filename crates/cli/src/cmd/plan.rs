//! Dry run: show where every unit comes from, where it goes, what the archive
//! decision would be, and how the selected application would be started.

use anyhow::Result;

use syncbridge_lib::archive::SyncStrategy;
use syncbridge_lib::launch::{LaunchContext, select_app};
use syncbridge_lib::sync::SyncOrchestrator;

use super::{RunOptions, resolve_manifest};
use crate::output::{self, print_info, print_json, print_stat, print_warning};

pub fn cmd_plan(opts: &RunOptions) -> Result<()> {
  let manifest = resolve_manifest(opts.manifest)?;
  let units = SyncOrchestrator::new().plan(&manifest);

  let launch = match select_app(&manifest, opts.app) {
    Ok(app) => Some(LaunchContext::new(&manifest, app, opts.app_args)),
    Err(e) => {
      if !opts.json {
        print_warning(&e.to_string());
      }
      None
    }
  };

  if opts.json {
    return print_json(&serde_json::json!({ "units": units, "launch": launch }));
  }

  for unit in &units {
    print_info(&format!(
      "{} {} {}",
      unit.name,
      output::symbols::ARROW,
      unit.target.display()
    ));
    print_stat("Source", &unit.source.display().to_string());

    match &unit.decision {
      Some(decision) if decision.strategy == SyncStrategy::NotApplicable => print_warning(&decision.reason),
      Some(decision) => print_stat("Strategy", &format!("{} ({})", decision.strategy, decision.reason)),
      None => print_stat("Strategy", "folder sync"),
    }
  }

  if let Some(ctx) = launch {
    println!();
    print_info(&format!("Launch {}", ctx.display_name));
    print_stat("Program", &ctx.program.display().to_string());
    print_stat("Arguments", &ctx.args.join(" "));
    print_stat("Working dir", &ctx.working_dir.display().to_string());
  }

  Ok(())
}
