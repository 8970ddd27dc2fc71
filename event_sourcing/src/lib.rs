//! # Event Sourcing
//!
//! This crate provides the command/event machinery shared by the policy and
//! thing aggregates.
//!
//! ## Philosophy
//!
//! - **Strategies are pure**: same state, revision, context and command give the same result
//! - **Events are facts**: created once per successful mutation, never mutated
//! - **State is disposable**: it is rebuilt by replaying the journal
//! - **The host owns time and storage**: timestamps come in through [`Context`]
//!
//! ## Core Concepts
//!
//! - `Command`, `Event`, `CommandResponse`: the envelopes crossing the boundary
//! - `StrategyResult`, `CommandOutcome`: what a command strategy produces
//! - `CommandStrategy`, `EventStrategy`: the per-aggregate business logic
//! - `execute`: runs a command strategy with conditional header checks
//! - `SizeGuard`: rejects modifications that would make an entity too large
//! - `AggregateRoot`: an in-memory journaled aggregate, the reference host
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - An actor runtime or a persistence driver
//! - A snapshot store

mod aggregate;
mod envelope;
mod response;
mod result;
mod root;
mod size;
mod strategy;

#[cfg(test)]
mod test_support;

pub use aggregate::{Aggregate, EventPayload};
pub use envelope::{Command, Event, JournalRecord};
pub use response::{CommandResponse, ErrorResponse};
pub use result::{CommandOutcome, StrategyResult};
pub use root::AggregateRoot;
pub use size::SizeGuard;
pub use strategy::{
    execute, next_revision, only_active, CommandStrategy, Context, EventOf, EventStrategy,
};
