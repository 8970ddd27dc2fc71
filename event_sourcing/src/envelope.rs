//! Command and event envelopes, and their journal form

use crate::{Aggregate, EventPayload};
use core_types::{DomainError, Headers, Revision, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An intent to change or read an aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command<I, P> {
    pub entity_id: I,
    #[serde(default)]
    pub headers: Headers,
    pub payload: P,
}

impl<I, P> Command<I, P> {
    pub fn new(entity_id: I, payload: P) -> Self {
        Self {
            entity_id,
            headers: Headers::default(),
            payload,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}

/// A fact about an aggregate, applied at a revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<I, P> {
    pub entity_id: I,
    pub revision: Revision,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub payload: P,
}

impl<I: Clone, P> Event<I, P> {
    /// Creates the event for a command, carrying over correlation id and metadata
    pub fn for_command<C>(
        command: &Command<I, C>,
        revision: Revision,
        timestamp: Timestamp,
        payload: P,
    ) -> Self {
        Self {
            entity_id: command.entity_id.clone(),
            revision,
            timestamp,
            correlation_id: command.headers.correlation_id.clone(),
            metadata: command.headers.metadata.clone(),
            payload,
        }
    }
}

impl<I, P> Event<I, P>
where
    I: Clone + Into<String> + TryFrom<String, Error = DomainError>,
    P: EventPayload,
{
    pub fn event_type(&self) -> String {
        self.payload.event_type()
    }

    pub fn to_journal_record(&self) -> JournalRecord {
        JournalRecord {
            entity_id: self.entity_id.clone().into(),
            revision: self.revision,
            event_type: self.payload.event_type(),
            timestamp: self.timestamp,
            correlation_id: self.correlation_id.clone(),
            metadata: self.metadata.clone(),
            payload: self.payload.to_journal_payload(),
        }
    }

    /// Decodes a journal record of the aggregate `A`
    pub fn from_journal_record<A>(record: &JournalRecord) -> Result<Self, DomainError>
    where
        A: Aggregate<Id = I, Event = P>,
    {
        Ok(Self {
            entity_id: I::try_from(record.entity_id.clone())?,
            revision: record.revision,
            timestamp: record.timestamp,
            correlation_id: record.correlation_id.clone(),
            metadata: record.metadata.clone(),
            payload: P::from_journal(&record.event_type, A::TYPE, record.payload.clone())?,
        })
    }
}

/// An event as stored by a journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub entity_id: String,
    pub revision: Revision,
    pub event_type: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub payload: Value,
}
