//! syncbridge: bring the local copy of a runtime and its applications up to
//! date from a source root, then launch one of the applications.

mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use syncbridge_lib::consts::MANIFEST_ENV_VAR;
use tracing_subscriber::EnvFilter;

use crate::cmd::RunOptions;
use crate::output::print_error;

#[derive(Parser)]
#[command(name = "syncbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Manifest file, JSON or INI (default: per-user data dir, then next to the executable)
  #[arg(short, long, env = MANIFEST_ENV_VAR)]
  manifest: Option<PathBuf>,

  /// Application to launch (default: the first one in the manifest)
  #[arg(short, long)]
  app: Option<String>,

  /// Sync, then exit without launching
  #[arg(long)]
  sync_only: bool,

  /// Show what would be synced and launched, without changing anything
  #[arg(long, conflicts_with = "sync_only")]
  plan: bool,

  /// Wait a random 0..=SECS seconds before syncing
  #[arg(long, value_name = "SECS")]
  random_delay: Option<u64>,

  /// Print progress for every unit, not only for units that changed
  #[arg(long)]
  console: bool,

  /// Enable debug logging
  #[arg(short, long)]
  verbose: bool,

  /// Print results as JSON
  #[arg(long)]
  json: bool,

  /// Arguments forwarded to the application
  #[arg(last = true, value_name = "APP_ARGS")]
  app_args: Vec<String>,
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let opts = RunOptions {
    manifest: cli.manifest.as_deref(),
    app: cli.app.as_deref(),
    sync_only: cli.sync_only,
    random_delay: cli.random_delay,
    console: cli.console,
    json: cli.json,
    app_args: &cli.app_args,
  };

  let result = if cli.plan { cmd::cmd_plan(&opts) } else { cmd::cmd_run(&opts) };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
