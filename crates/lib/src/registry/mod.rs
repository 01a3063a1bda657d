//! Remote registry lookups.
//!
//! Before building, every recipe's computed version is checked against the
//! tags already published for its image. Only absent versions are built.
//!
//! # Submodules
//!
//! - [`client`] - HTTP client for the package-versions endpoint
//! - [`types`] - Response parsing and lookup results

pub mod client;
mod types;

pub use client::{RegistryClient, image_name};
pub use types::*;
