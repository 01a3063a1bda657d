//! imgcache-lib: content-addressed container image builds.
//!
//! The crate turns a directory of environment recipes into container images,
//! rebuilding only what the remote registry does not already have:
//! - `collect`: enumerate recipes, scripts and config files
//! - `version`: derive one content hash based version per recipe
//! - `registry`: ask the registry which versions are already published
//! - `build`: materialize a definition and drive the external builder
//! - `manifest`: record what a run actually built
//! - `run`: the sequential pipeline tying these together

pub mod build;
pub mod collect;
pub mod config;
pub mod consts;
pub mod manifest;
pub mod registry;
pub mod run;
pub mod util;
pub mod version;
