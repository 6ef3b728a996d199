//! Archive-mode synchronization.
//!
//! An archive-mode unit keeps a marker file (`.archive-extracted`) in its
//! target directory recording which archive version was extracted there. The
//! decider compares that marker with the archive's mtime to choose a
//! [`SyncStrategy`]; the extractor performs full-replace extractions and
//! writes the marker back.

mod decide;
mod extract;
mod marker;

pub use decide::{ArchiveSyncDecider, SyncDecision, SyncStrategy};
pub use extract::{ArchiveExtractor, ExtractError, ExtractionResult};
pub use marker::{ExtractionMarker, FsMarkerStore, MarkerError, MarkerRead, MarkerStore};
