//! Extraction marker persistence.
//!
//! # File Format
//!
//! ```text
//! markerVersion=1
//! archiveFileName=runtime.zip
//! archiveTimestampUtc=2024-05-01T09:30:00Z
//! extractedAtUtc=2024-05-02T07:00:12Z
//! ```
//!
//! Plain `key=value` lines; unknown keys are ignored. A marker that cannot be
//! read or parsed is reported as [`MarkerRead::Corrupt`], which the decider
//! treats exactly like a missing marker (forcing a fresh extraction).

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::consts::{MARKER_FILENAME, MARKER_TIMESTAMP_FORMAT, MARKER_VERSION};

const KEY_VERSION: &str = "markerVersion";
const KEY_ARCHIVE_FILE_NAME: &str = "archiveFileName";
const KEY_ARCHIVE_TIMESTAMP: &str = "archiveTimestampUtc";
const KEY_EXTRACTED_AT: &str = "extractedAtUtc";

/// Why a marker could not be used.
#[derive(Debug, Error)]
pub enum MarkerError {
  #[error("failed to read marker: {0}")]
  Read(#[source] io::Error),

  #[error("marker has no archiveTimestampUtc entry")]
  MissingTimestamp,

  #[error("invalid marker timestamp: {0}")]
  InvalidTimestamp(String),

  #[error("invalid marker version: {0}")]
  InvalidVersion(String),

  #[error("unsupported marker version {0} (expected at most {max})", max = MARKER_VERSION)]
  UnsupportedVersion(u32),
}

/// Record of which archive version was extracted into a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMarker {
  pub version: u32,
  pub archive_file_name: String,
  /// Archive mtime, truncated to whole seconds.
  pub archive_timestamp: DateTime<Utc>,
  /// When the extraction happened; informational only.
  pub extracted_at: Option<DateTime<Utc>>,
}

/// Outcome of looking for a marker in a directory.
#[derive(Debug)]
pub enum MarkerRead {
  Missing,
  Corrupt(MarkerError),
  Present(ExtractionMarker),
}

/// Drops sub-second precision.
pub(crate) fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
  DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(value, MARKER_TIMESTAMP_FORMAT)
    .map(|naive| naive.and_utc())
    .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)))
    .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc()))
    .ok()
}

fn format_timestamp(time: &DateTime<Utc>) -> String {
  time.format(MARKER_TIMESTAMP_FORMAT).to_string()
}

impl ExtractionMarker {
  pub fn new(archive_file_name: impl Into<String>, archive_mtime: SystemTime, extracted_at: DateTime<Utc>) -> Self {
    Self {
      version: MARKER_VERSION,
      archive_file_name: archive_file_name.into(),
      archive_timestamp: truncate_to_seconds(DateTime::<Utc>::from(archive_mtime)),
      extracted_at: Some(truncate_to_seconds(extracted_at)),
    }
  }

  /// Parse marker file content.
  ///
  /// Only the archive timestamp is mandatory. A missing version line reads as
  /// version 1; an unparseable `extractedAtUtc` is dropped rather than
  /// rejected since nothing decides on it.
  pub fn parse(content: &str) -> Result<Self, MarkerError> {
    let mut version = None;
    let mut archive_file_name = String::new();
    let mut archive_timestamp = None;
    let mut extracted_at = None;

    for line in content.lines() {
      let Some((key, value)) = line.split_once('=') else {
        continue;
      };
      let value = value.trim();

      match key.trim() {
        KEY_VERSION => version = Some(value.to_string()),
        KEY_ARCHIVE_FILE_NAME => archive_file_name = value.to_string(),
        KEY_ARCHIVE_TIMESTAMP => archive_timestamp = Some(value.to_string()),
        KEY_EXTRACTED_AT => extracted_at = parse_timestamp(value),
        _ => {}
      }
    }

    let version = match version {
      None => 1,
      Some(v) => v.parse::<u32>().map_err(|_| MarkerError::InvalidVersion(v))?,
    };
    if version > MARKER_VERSION {
      return Err(MarkerError::UnsupportedVersion(version));
    }

    let raw = archive_timestamp
      .filter(|v| !v.is_empty())
      .ok_or(MarkerError::MissingTimestamp)?;
    let archive_timestamp = parse_timestamp(&raw).ok_or(MarkerError::InvalidTimestamp(raw))?;

    Ok(Self {
      version,
      archive_file_name,
      archive_timestamp: truncate_to_seconds(archive_timestamp),
      extracted_at,
    })
  }

  /// Serialize to the on-disk format.
  pub fn render(&self) -> String {
    let mut out = format!(
      "{}={}\n{}={}\n{}={}\n",
      KEY_VERSION,
      self.version,
      KEY_ARCHIVE_FILE_NAME,
      self.archive_file_name,
      KEY_ARCHIVE_TIMESTAMP,
      format_timestamp(&self.archive_timestamp),
    );
    if let Some(extracted_at) = &self.extracted_at {
      out.push_str(&format!("{}={}\n", KEY_EXTRACTED_AT, format_timestamp(extracted_at)));
    }
    out
  }
}

/// Reader/writer for markers, injectable so the decision rules can be tested
/// without a filesystem.
pub trait MarkerStore {
  fn read(&self, target_dir: &Path) -> MarkerRead;
  fn write(&self, target_dir: &Path, marker: &ExtractionMarker) -> io::Result<()>;
}

/// Stores markers as `.archive-extracted` inside the target directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMarkerStore;

impl MarkerStore for FsMarkerStore {
  fn read(&self, target_dir: &Path) -> MarkerRead {
    let path = target_dir.join(MARKER_FILENAME);
    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return MarkerRead::Missing,
      Err(e) => return MarkerRead::Corrupt(MarkerError::Read(e)),
    };

    match ExtractionMarker::parse(&content) {
      Ok(marker) => MarkerRead::Present(marker),
      Err(e) => MarkerRead::Corrupt(e),
    }
  }

  /// Written via a temp file and rename so a crash never leaves a half marker.
  fn write(&self, target_dir: &Path, marker: &ExtractionMarker) -> io::Result<()> {
    let path = target_dir.join(MARKER_FILENAME);
    let temp_path = target_dir.join(format!("{}.tmp", MARKER_FILENAME));
    fs::write(&temp_path, marker.render())?;
    fs::rename(&temp_path, &path)
  }
}
