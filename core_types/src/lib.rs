//! # Core Types
//!
//! This crate defines the fundamental types shared by the policy and thing
//! cores.
//!
//! ## Philosophy
//!
//! - **Validated at construction**: ids and pointers cannot hold malformed values.
//! - **No ambient clock**: timestamps are always passed in by the host.
//! - **One error type**: every failure is a [`DomainError`] with structured context.
//!
//! ## Key Types
//!
//! - [`PolicyId`], [`ThingId`]: namespaced entity identifiers
//! - [`Revision`], [`Lifecycle`], [`Timestamp`]: aggregate bookkeeping
//! - [`JsonPointer`]: paths into JSON documents and resource trees
//! - [`Headers`], [`EntityTag`], [`EntityTagMatchers`]: command headers and conditional requests
//! - [`StatusCode`]: response status taxonomy
//! - [`DomainError`], [`ErrorKind`]: the error taxonomy

pub mod error;
pub mod headers;
pub mod ids;
pub mod pointer;
pub mod revision;
pub mod status;

pub use error::{DomainError, ErrorKind};
pub use headers::{EntityTag, EntityTagMatcher, EntityTagMatchers, Headers};
pub use ids::{NamespacedId, PolicyId, ThingId, MAX_ID_LENGTH};
pub use pointer::JsonPointer;
pub use revision::{Lifecycle, Revision, Timestamp};
pub use status::StatusCode;
