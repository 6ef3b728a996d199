//! Application selection and process launch on top of the synced tree.

mod context;
mod select;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use context::{LaunchContext, launch};
pub use select::select_app;

/// Error raised while picking or starting an application.
#[derive(Debug, Error)]
pub enum LaunchError {
  #[error("manifest defines no applications")]
  NoApplications,

  #[error("launch program not found: {}", .0.display())]
  ProgramNotFound(PathBuf),

  #[error("application entry not found: {}", .0.display())]
  EntryNotFound(PathBuf),

  #[error("failed to start {}: {source}", program.display())]
  Spawn {
    program: PathBuf,
    #[source]
    source: io::Error,
  },
}
