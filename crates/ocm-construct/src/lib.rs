//! The OCM construction engine: resolves a constructor document's component
//! reference graph, schedules bounded-concurrency builds of each component
//! version, and persists the resulting descriptors to a target repository.
//!
//! `ocm-construct` has no knowledge of any concrete provider (filesystem,
//! OCI registry, git, environment variables, ...) — it only talks to the
//! trait objects in [`providers`]. Reference provider implementations live
//! in the `ocm-cli` crate.

mod cancel;
mod dag;
mod digest;
mod discover;
mod engine;
pub mod error;
mod options;
mod processor;
pub mod providers;
mod scheduler;

pub use engine::construct;
pub use error::{ConstructError, ConstructResult, NotFoundError, ProviderError};
pub use options::{
    Callbacks, ConflictPolicy, ConstructOptions, ConstructOptionsBuilder, ExternalCopyPolicy,
};
