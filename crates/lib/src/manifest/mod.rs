//! Manifest model and loaders.
//!
//! The manifest is produced once per run, from either a JSON or an INI file,
//! and is read-only afterwards.

mod expand;
mod ini;
mod load;
mod types;

pub use expand::{expand_env_vars, expand_with};
pub use ini::{IniDocument, IniSection};
pub use load::{ManifestError, load_manifest, parse_ini, parse_json};
pub use types::*;
