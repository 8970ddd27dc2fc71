//! # Thing Service
//!
//! This crate implements the thing aggregate: its commands, the strategies
//! deciding them, the application of its events and the authorization of
//! commands against the governing policy.
//!
//! ## Philosophy
//!
//! - **Parts are addressed by path**: every command names one location in the thing document
//! - **Existence decides the event**: writing a missing part creates it, writing an existing one modifies it
//! - **Reads are filtered**: a partially readable thing only shows the granted fields
//!
//! ## Example
//!
//! ```ignore
//! use event_sourcing::{AggregateRoot, Command, Context};
//! use services_things::{ThingCommand, ThingCommandStrategies, ThingEventStrategies};
//!
//! let mut root = AggregateRoot::new(thing_id.clone());
//! let outcome = root.handle(
//!     &ThingCommandStrategies::default(),
//!     &ThingEventStrategies,
//!     &Context::at(now),
//!     Command::new(thing_id, ThingCommand::ModifyAttribute { pointer, value }),
//! );
//! ```

mod commands;
mod config;
mod enforcement;
mod events;
mod strategies;

pub use commands::{ThingCommand, ThingCommandEnvelope};
pub use config::{ThingConfig, DEFAULT_MAX_THING_SIZE_BYTES};
pub use enforcement::{resource_key, ThingCommandEnforcement};
pub use events::ThingEventStrategies;
pub use strategies::ThingCommandStrategies;
