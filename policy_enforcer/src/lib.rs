//! # Policy Enforcer
//!
//! This crate decides whether an authorization context may access a
//! resource under a policy.
//!
//! ## Philosophy
//!
//! - **Build once, decide often**: a policy is indexed into per-subject path trees
//! - **Path specificity wins**: the deepest grant or revoke on the path decides
//! - **Revoke wins ties**: a grant and a revoke at the same depth deny
//! - **No I/O, no blocking**: decisions are pure reads of an immutable index
//!
//! ## Core Concepts
//!
//! - `PolicyEnforcer`: The index and the decision functions
//! - `EnforcerCache`: Enforcers shared across requests, rebuilt on revision change
//!   or once an indexed subject expires
//! - `PoliciesValidator`: Checks that a policy keeps a permanent administrator

mod cache;
mod config;
mod enforcer;
mod tree;
mod validator;
mod view;

pub use cache::EnforcerCache;
pub use config::{EnforcerCacheConfig, ValidatorConfig};
pub use enforcer::PolicyEnforcer;
pub use validator::PoliciesValidator;
