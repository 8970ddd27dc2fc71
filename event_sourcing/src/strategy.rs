//! Command and event strategies
//!
//! A command strategy turns a command and the current entity into a
//! [`StrategyResult`]. An event strategy applies a persisted event to the
//! entity. [`execute`] wires both together with the conditional header
//! checks every command goes through.

use crate::{Aggregate, Command, CommandOutcome, CommandResponse, Event, EventPayload, StrategyResult};
use core_types::{DomainError, EntityTag, ErrorKind, Revision, Timestamp};
use tracing::{debug, error};

/// Event type of an aggregate
pub type EventOf<A> = Event<<A as Aggregate>::Id, <A as Aggregate>::Event>;

/// Host-supplied facts a strategy may depend on
///
/// Strategies never read the clock; the host passes the current time here,
/// which keeps them replay-deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub timestamp: Timestamp,
}

impl Context {
    pub fn at(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }
}

/// Business logic of the commands of one aggregate type
pub trait CommandStrategy<A: Aggregate> {
    /// Command payload, usually an enum of all commands
    type Payload;

    /// Validates the command against the entity and builds the result
    ///
    /// `entity` is `None` when the aggregate does not exist yet. A deleted
    /// entity is passed as is; strategies treat it as nonexistent.
    fn apply(
        &self,
        context: &Context,
        entity: Option<&A>,
        next_revision: Revision,
        command: &Command<A::Id, Self::Payload>,
    ) -> StrategyResult<EventOf<A>>;

    /// Tag of the addressed (sub-)entity before the command
    fn previous_entity_tag(
        &self,
        command: &Command<A::Id, Self::Payload>,
        previous: Option<&A>,
    ) -> Option<EntityTag>;

    /// Tag of the addressed (sub-)entity after the command
    fn next_entity_tag(
        &self,
        command: &Command<A::Id, Self::Payload>,
        next: Option<&A>,
    ) -> Option<EntityTag>;

    /// Queries never produce events
    fn is_query(&self, command: &Command<A::Id, Self::Payload>) -> bool;

    /// Response type used for `304 Not Modified` answers
    fn response_type(&self, command: &Command<A::Id, Self::Payload>) -> String;
}

/// Applies the events of one aggregate type
///
/// Implementors provide [`create`](Self::create) and
/// [`modify`](Self::modify); [`handle`](Self::handle) enforces the
/// lifecycle: creation events are only applicable to nonexistent or deleted
/// aggregates, all other events only to active ones.
pub trait EventStrategy<A: Aggregate> {
    /// Builds the entity from a creation event
    fn create(&self, event: &EventOf<A>) -> Result<A, DomainError>;

    /// Applies a non-creation event to an active entity
    fn modify(&self, event: &EventOf<A>, entity: &A) -> Result<A, DomainError>;

    fn handle(&self, event: &EventOf<A>, entity: Option<A>) -> Result<Option<A>, DomainError> {
        let not_applicable = |reason: &str| DomainError::EventNotApplicable {
            event_type: event.payload.event_type(),
            entity_id: event.entity_id.to_string(),
            reason: reason.to_string(),
        };

        if let Some(current) = &entity {
            if current.id() != &event.entity_id {
                return Err(not_applicable("the event addresses another entity"));
            }
        }

        let active = entity.filter(|e| e.lifecycle().is_active());
        let next = if event.payload.is_creation() {
            if active.is_some() {
                return Err(not_applicable("the entity already exists"));
            }
            self.create(event)?.with_created(event.timestamp)
        } else {
            let current = active
                .ok_or_else(|| not_applicable("the entity does not exist or is deleted"))?;
            self.modify(event, &current)?
        };

        Ok(Some(
            next.with_revision(event.revision)
                .with_modified(event.timestamp),
        ))
    }
}

/// Revision the next event of the entity is applied at
pub fn next_revision<A: Aggregate>(entity: Option<&A>) -> Revision {
    entity.map_or(Revision::initial(), A::revision).next()
}

/// The entity when it exists and is not deleted
pub fn only_active<A: Aggregate>(entity: Option<&A>) -> Option<&A> {
    entity.filter(|e| e.lifecycle().is_active())
}

/// Runs a command through conditional header checks and its strategy
///
/// `If-Match` must match the previous entity tag strongly, otherwise the
/// command fails with `PreconditionFailed`. A weakly matching
/// `If-None-Match` answers queries with `304 Not Modified` and fails
/// modifications with `PreconditionFailed`. Successful responses carry the
/// next entity tag as `ETag`.
pub fn execute<A, S, E>(
    strategy: &S,
    events: &E,
    context: &Context,
    entity: Option<&A>,
    command: Command<A::Id, S::Payload>,
) -> CommandOutcome<Command<A::Id, S::Payload>, EventOf<A>>
where
    A: Aggregate,
    S: CommandStrategy<A>,
    E: EventStrategy<A>,
{
    let result = match check_preconditions(strategy, entity, &command) {
        Some(result) => result,
        None => {
            let result = strategy.apply(context, entity, next_revision(entity), &command);
            with_entity_tag(strategy, events, entity, &command, result)
        }
    };

    match &result {
        StrategyResult::Mutation { event, .. } => debug!(
            entity_id = %command.entity_id,
            event_type = %event.payload.event_type(),
            revision = %event.revision,
            "Command produced event"
        ),
        StrategyResult::Query { response } => debug!(
            entity_id = %command.entity_id,
            status = %response.status,
            "Command answered"
        ),
        StrategyResult::Error { error: err } if err.kind() == ErrorKind::Programming => error!(
            entity_id = %command.entity_id,
            error = %err,
            "Command failed with a programming error"
        ),
        StrategyResult::Error { error: err } => debug!(
            entity_id = %command.entity_id,
            code = err.error_code(),
            "Command rejected"
        ),
    }

    CommandOutcome::new(command, result)
}

fn check_preconditions<A, S>(
    strategy: &S,
    entity: Option<&A>,
    command: &Command<A::Id, S::Payload>,
) -> Option<StrategyResult<EventOf<A>>>
where
    A: Aggregate,
    S: CommandStrategy<A>,
{
    let headers = &command.headers;
    if headers.if_match.is_none() && headers.if_none_match.is_none() {
        return None;
    }
    let previous = strategy.previous_entity_tag(command, only_active(entity));

    if let Some(if_match) = &headers.if_match {
        if !if_match.matches_strongly(previous.as_ref()) {
            return Some(StrategyResult::error(DomainError::PreconditionFailed {
                header: "if-match".to_string(),
                matcher: if_match.to_string(),
            }));
        }
    }

    if let Some(if_none_match) = &headers.if_none_match {
        if if_none_match.matches_weakly(previous.as_ref()) {
            if strategy.is_query(command) {
                let response = CommandResponse::not_modified(
                    command.entity_id.to_string(),
                    strategy.response_type(command),
                    headers.for_response(),
                )
                .with_etag(previous);
                return Some(StrategyResult::query(response));
            }
            return Some(StrategyResult::error(DomainError::PreconditionFailed {
                header: "if-none-match".to_string(),
                matcher: if_none_match.to_string(),
            }));
        }
    }

    None
}

fn with_entity_tag<A, S, E>(
    strategy: &S,
    events: &E,
    entity: Option<&A>,
    command: &Command<A::Id, S::Payload>,
    result: StrategyResult<EventOf<A>>,
) -> StrategyResult<EventOf<A>>
where
    A: Aggregate,
    S: CommandStrategy<A>,
    E: EventStrategy<A>,
{
    match result {
        StrategyResult::Mutation {
            event,
            response,
            entity_created,
            entity_deleted,
        } => match events.handle(&event, entity.cloned()) {
            Ok(next) => {
                let tag = strategy.next_entity_tag(command, next.as_ref().and_then(|n| only_active(Some(n))));
                StrategyResult::Mutation {
                    event,
                    response: response.with_etag(tag),
                    entity_created,
                    entity_deleted,
                }
            }
            Err(err) => StrategyResult::error(err),
        },
        StrategyResult::Query { response } => {
            let tag = strategy.next_entity_tag(command, only_active(entity));
            StrategyResult::query(response.with_etag(tag))
        }
        error @ StrategyResult::Error { .. } => error,
    }
}
