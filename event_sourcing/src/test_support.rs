//! A minimal counter aggregate exercising the machinery in tests

use crate::{
    only_active, Aggregate, Command, CommandResponse, CommandStrategy, Context, Event, EventOf,
    EventPayload, EventStrategy, StrategyResult,
};
use core_types::{DomainError, EntityTag, Lifecycle, Revision, StatusCode, ThingId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub type CounterId = ThingId;

#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub id: CounterId,
    pub value: u64,
    pub lifecycle: Lifecycle,
    pub revision: Revision,
    pub created: Option<Timestamp>,
    pub modified: Option<Timestamp>,
}

impl Counter {
    pub fn new(id: CounterId) -> Self {
        Self {
            id,
            value: 0,
            lifecycle: Lifecycle::Active,
            revision: Revision::initial(),
            created: None,
            modified: None,
        }
    }
}

impl Aggregate for Counter {
    type Id = CounterId;
    type Event = CounterEvent;

    const TYPE: &'static str = "counter";

    fn id(&self) -> &CounterId {
        &self.id
    }

    fn revision(&self) -> Revision {
        self.revision
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn with_revision(&self, revision: Revision) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }

    fn with_created(&self, timestamp: Timestamp) -> Self {
        Self {
            created: Some(timestamp),
            ..self.clone()
        }
    }

    fn with_modified(&self, timestamp: Timestamp) -> Self {
        Self {
            modified: Some(timestamp),
            ..self.clone()
        }
    }

    fn to_json(&self) -> Value {
        json!({"counterId": self.id.to_string(), "value": self.value})
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CounterEvent {
    Created {},
    Incremented { by: u64 },
    Deleted {},
}

impl EventPayload for CounterEvent {
    const NAMESPACE: &'static str = "counters.events";
    const NAMES: &'static [&'static str] = &["created", "incremented", "deleted"];

    fn name(&self) -> &'static str {
        match self {
            Self::Created {} => "created",
            Self::Incremented { .. } => "incremented",
            Self::Deleted {} => "deleted",
        }
    }

    fn is_creation(&self) -> bool {
        matches!(self, Self::Created {})
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterCommand {
    Create,
    Increment { by: u64 },
    Delete,
    Retrieve,
}

impl CounterCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Increment { .. } => "increment",
            Self::Delete => "delete",
            Self::Retrieve => "retrieve",
        }
    }
}

pub struct CounterStrategy;

impl CommandStrategy<Counter> for CounterStrategy {
    type Payload = CounterCommand;

    fn apply(
        &self,
        context: &Context,
        entity: Option<&Counter>,
        next_revision: Revision,
        command: &Command<CounterId, CounterCommand>,
    ) -> StrategyResult<EventOf<Counter>> {
        let id = &command.entity_id;
        let event = |payload: CounterEvent| Event::for_command(command, next_revision, context.timestamp, payload);
        let response = |status: StatusCode, entity: Option<Value>| {
            CommandResponse::new(
                id.to_string(),
                self.response_type(command),
                status,
                entity,
                command.headers.for_response(),
            )
        };

        match (&command.payload, only_active(entity)) {
            (CounterCommand::Create, Some(_)) => StrategyResult::error(DomainError::ThingConflict {
                thing_id: id.clone(),
            }),
            (CounterCommand::Create, None) => StrategyResult::created(
                event(CounterEvent::Created {}),
                response(StatusCode::Created, Some(Counter::new(id.clone()).to_json())),
            ),
            (_, None) => StrategyResult::error(DomainError::ThingNotAccessible {
                thing_id: id.clone(),
            }),
            (CounterCommand::Increment { by }, Some(_)) => StrategyResult::mutation(
                event(CounterEvent::Incremented { by: *by }),
                response(StatusCode::NoContent, None),
            ),
            (CounterCommand::Delete, Some(_)) => StrategyResult::deleted(
                event(CounterEvent::Deleted {}),
                response(StatusCode::NoContent, None),
            ),
            (CounterCommand::Retrieve, Some(counter)) => {
                StrategyResult::query(response(StatusCode::Ok, Some(counter.to_json())))
            }
        }
    }

    fn previous_entity_tag(
        &self,
        _command: &Command<CounterId, CounterCommand>,
        previous: Option<&Counter>,
    ) -> Option<EntityTag> {
        previous.map(|c| EntityTag::from_revision(c.revision))
    }

    fn next_entity_tag(
        &self,
        _command: &Command<CounterId, CounterCommand>,
        next: Option<&Counter>,
    ) -> Option<EntityTag> {
        next.map(|c| EntityTag::from_revision(c.revision))
    }

    fn is_query(&self, command: &Command<CounterId, CounterCommand>) -> bool {
        command.payload == CounterCommand::Retrieve
    }

    fn response_type(&self, command: &Command<CounterId, CounterCommand>) -> String {
        format!("counters.responses:{}", command.payload.name())
    }
}

pub struct CounterEventStrategy;

impl EventStrategy<Counter> for CounterEventStrategy {
    fn create(&self, event: &EventOf<Counter>) -> Result<Counter, DomainError> {
        Ok(Counter::new(event.entity_id.clone()))
    }

    fn modify(&self, event: &EventOf<Counter>, entity: &Counter) -> Result<Counter, DomainError> {
        match &event.payload {
            CounterEvent::Incremented { by } => Ok(Counter {
                value: entity.value + by,
                ..entity.clone()
            }),
            CounterEvent::Deleted {} => Ok(Counter {
                lifecycle: Lifecycle::Deleted,
                ..entity.clone()
            }),
            CounterEvent::Created {} => Err(DomainError::EventNotApplicable {
                event_type: event.payload.event_type(),
                entity_id: event.entity_id.to_string(),
                reason: "creation events are not modifications".to_string(),
            }),
        }
    }
}
