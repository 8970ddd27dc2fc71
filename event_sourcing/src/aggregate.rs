//! Traits tying an aggregate to its events

use core_types::{DomainError, Lifecycle, Revision, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// An event-sourced entity
pub trait Aggregate: Clone + PartialEq + fmt::Debug {
    /// Identifier type; round-trips through its string form
    type Id: Clone
        + PartialEq
        + fmt::Debug
        + fmt::Display
        + TryFrom<String, Error = DomainError>
        + Into<String>;
    /// Payload of the events of this aggregate
    type Event: EventPayload;

    /// Short aggregate type name, e.g. `policy`
    const TYPE: &'static str;

    fn id(&self) -> &Self::Id;
    fn revision(&self) -> Revision;
    fn lifecycle(&self) -> Lifecycle;
    fn with_revision(&self, revision: Revision) -> Self;
    fn with_created(&self, timestamp: Timestamp) -> Self;
    fn with_modified(&self, timestamp: Timestamp) -> Self;
    /// The entity document, as measured by size guards and returned to callers
    fn to_json(&self) -> Value;
}

/// The closed set of event payloads of one aggregate type
///
/// Payloads are externally tagged serde enums: a variant `policyCreated`
/// serialises as `{"policyCreated": {...}}`. In the journal the tag becomes
/// part of the event type (`policies.events:policyCreated`) and the inner
/// object is stored as payload.
pub trait EventPayload: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {
    /// Journal namespace of the event types, e.g. `policies.events`
    const NAMESPACE: &'static str;
    /// Every variant name of the enum
    const NAMES: &'static [&'static str];

    /// Variant name of this payload
    fn name(&self) -> &'static str;

    /// Creation events bring an aggregate (back) to life
    fn is_creation(&self) -> bool;

    /// Full journal type, e.g. `policies.events:policyCreated`
    fn event_type(&self) -> String {
        format!("{}:{}", Self::NAMESPACE, self.name())
    }

    /// The inner object stored in the journal
    fn to_journal_payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut tagged)) => tagged.remove(self.name()).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    /// Decodes a journal payload
    ///
    /// Unknown event types are a programming error; a known type with a
    /// malformed payload is invalid JSON.
    fn from_journal(event_type: &str, aggregate: &str, payload: Value) -> Result<Self, DomainError> {
        let name = event_type
            .strip_prefix(Self::NAMESPACE)
            .and_then(|rest| rest.strip_prefix(':'))
            .filter(|name| Self::NAMES.contains(name))
            .ok_or_else(|| DomainError::UnhandledEventType {
                event_type: event_type.to_string(),
                aggregate: aggregate.to_string(),
            })?;
        let mut tagged = Map::new();
        tagged.insert(name.to_string(), payload);
        serde_json::from_value(Value::Object(tagged)).map_err(|err| DomainError::JsonInvalid {
            reason: format!("payload of '{}': {}", event_type, err),
        })
    }
}
