//! Responses returned to callers

use core_types::{DomainError, EntityTag, Headers, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful outcome of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub entity_id: String,
    /// e.g. `policies.responses:modifySubject`
    pub response_type: String,
    pub status: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,
    #[serde(default)]
    pub headers: Headers,
}

impl CommandResponse {
    pub fn new(
        entity_id: impl Into<String>,
        response_type: impl Into<String>,
        status: StatusCode,
        entity: Option<Value>,
        headers: Headers,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            response_type: response_type.into(),
            status,
            entity,
            headers,
        }
    }

    /// The `304 Not Modified` answer to a query whose If-None-Match matched
    pub fn not_modified(
        entity_id: impl Into<String>,
        response_type: impl Into<String>,
        headers: Headers,
    ) -> Self {
        Self::new(entity_id, response_type, StatusCode::NotModified, None, headers)
    }

    pub fn with_etag(mut self, etag: Option<EntityTag>) -> Self {
        self.headers.etag = etag;
        self
    }

    pub fn with_entity(mut self, entity: Option<Value>) -> Self {
        self.entity = entity;
        self
    }
}

/// Failed outcome of a command, as handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub entity_id: String,
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    pub description: String,
    #[serde(default)]
    pub headers: Headers,
}

impl ErrorResponse {
    pub fn new(entity_id: impl Into<String>, error: &DomainError, headers: &Headers) -> Self {
        Self {
            entity_id: entity_id.into(),
            status: error.status(),
            error: error.error_code().to_string(),
            message: error.to_string(),
            description: error.description().to_string(),
            headers: headers.for_response(),
        }
    }
}
