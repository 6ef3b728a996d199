//! syncbridge-lib: Core types and logic for SyncBridge
//!
//! This crate brings a local working copy of a runtime and its applications up
//! to date from a source root, then hands the synced tree to the launcher:
//! - `manifest`: the declarative description of what to sync and launch
//! - `sync`: additive folder sync and the orchestration pipeline
//! - `archive`: strategy decisions, extraction markers and safe extraction
//! - `launch`: application selection and process launch

pub mod archive;
pub mod consts;
pub mod launch;
pub mod manifest;
pub mod platform;
pub mod sync;
