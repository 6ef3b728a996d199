//! Platform-specific helpers.

pub mod paths;
