/// Application name, used for per-user directories.
pub const APP_NAME: &str = "syncbridge";

/// Marker file written into every archive-extracted directory.
pub const MARKER_FILENAME: &str = ".archive-extracted";

/// Current version of the marker file format.
pub const MARKER_VERSION: u32 = 1;

/// Timestamp format used in marker files (UTC, second precision).
pub const MARKER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Default manifest file name, both for discovery and for the source-to-local copy.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// INI flavour of the manifest, tried after the JSON one.
pub const MANIFEST_INI_FILENAME: &str = "manifest.ini";

/// Environment variable overriding the manifest location.
pub const MANIFEST_ENV_VAR: &str = "SYNCBRIDGE_MANIFEST";
