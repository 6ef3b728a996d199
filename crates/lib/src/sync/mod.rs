//! Synchronization: the additive folder diff and the orchestration pipeline.
//!
//! # Pipeline
//!
//! ```text
//! SyncOrchestrator::sync_all
//!   ├── manifest file copy (source root -> local base)
//!   ├── runtime  ── Folder  ──> FileSynchronizer
//!   │            └─ Archive ──> ArchiveSyncDecider -> ArchiveExtractor [-> FileSynchronizer]
//!   └── each application, same as the runtime
//! ```
//!
//! The pipeline is strictly sequential and stops at the first failing unit.

mod folder;
mod orchestrator;
mod skip;
mod types;

pub use folder::{FileSynchronizer, FolderSyncError, FolderSynchronizer};
pub use orchestrator::{ArchiveSynchronizer, NoopObserver, SyncObserver, SyncOrchestrator, UnitPlan};
pub use skip::{SkipPattern, SkipPatterns};
pub use types::{SyncError, SyncOrchestratorResult, SyncResult, UnitReport};
