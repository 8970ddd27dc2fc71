//! # Policy Service
//!
//! This crate implements the policy aggregate: its commands, the strategies
//! deciding them, the application of its events and the authorization of
//! commands against the policy itself.
//!
//! ## Philosophy
//!
//! - **One command, one event**: a successful modification yields exactly one event
//! - **Invariants before events**: size, expiry and the permanent-administrator rule are checked first
//! - **The policy guards itself**: commands are authorized by the `policy:` resources they touch
//!
//! ## Example
//!
//! ```ignore
//! use event_sourcing::{AggregateRoot, Command, Context};
//! use services_policies::{PolicyCommand, PolicyCommandStrategies, PolicyEventStrategies};
//!
//! let strategies = PolicyCommandStrategies::default();
//! let mut root = AggregateRoot::new(policy_id.clone());
//! let outcome = root.handle(
//!     &strategies,
//!     &PolicyEventStrategies,
//!     &Context::at(now),
//!     Command::new(policy_id, PolicyCommand::CreatePolicy { policy }),
//! );
//! ```

mod commands;
mod config;
mod enforcement;
mod events;
mod strategies;

pub use commands::{PolicyCommand, PolicyCommandEnvelope};
pub use config::{PolicyConfig, DEFAULT_MAX_POLICY_SIZE_BYTES};
pub use enforcement::{resource_key, PolicyCommandEnforcement};
pub use events::PolicyEventStrategies;
pub use strategies::PolicyCommandStrategies;
