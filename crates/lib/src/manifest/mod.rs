//! Built-image manifest.
//!
//! The manifest is the one durable record a run leaves behind for the
//! publish step: a JSON array with one `name:version` entry per image that
//! was actually built. Cached recipes never appear in it.
//!
//! Only a run that completes writes a manifest, and each write replaces the
//! previous file rather than merging with it.

mod storage;
mod types;

pub use types::*;
