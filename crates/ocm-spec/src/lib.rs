//! The in-memory specification and descriptor model for OCM component versions.
//!
//! This crate is pure data: identity computation, the constructor (input) types,
//! the descriptor (output) types and their wire-format (de)serialization. It
//! performs no I/O and knows nothing about DAGs, scheduling or providers — those
//! live in `ocm-construct`.

mod access;
mod constructor;
mod descriptor;
pub mod error;
mod identity;
mod wire;

pub use access::{Access, Input, TypedValue, DEFAULT_LOCAL_BLOB_MEDIA_TYPE, LOCAL_BLOB_KIND};
pub use constructor::{
    AccessOrInputElement, Component, CopyPolicy, ElementMeta, Label, Reference, Relation,
    Resource, Source,
};
pub use descriptor::{ComponentDescriptor, Digest, ReferenceDescriptor, ResourceDescriptor, SourceDescriptor};
pub use error::InvalidSpec;
pub use identity::{Identity, NAME_KEY, VERSION_KEY};
pub use wire::ComponentConstructor;
