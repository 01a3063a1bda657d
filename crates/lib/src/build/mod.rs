//! Image builds.
//!
//! A build turns one recipe at one version into a tagged image exported to
//! the output directory. Only recipes whose version is missing from the
//! registry ever reach this module.
//!
//! # Submodules
//!
//! - [`backend`] - Builder conventions (Docker, Apptainer)
//! - [`execute`] - External command execution
//! - [`orchestrator`] - Temporary definition, build and export of one image

pub mod backend;
pub mod execute;
pub mod orchestrator;
mod types;

pub use backend::{ApptainerBackend, BuildBackend, DockerBackend, backend_for};
pub use orchestrator::Orchestrator;
pub use types::*;
