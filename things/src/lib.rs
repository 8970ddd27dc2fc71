//! # Things
//!
//! This crate provides the digital twin model: a thing with attributes,
//! a definition and features.
//!
//! ## Core Concepts
//!
//! - `Thing`: The aggregate value, governed by a policy
//! - `Feature`: A named facet with reported and desired properties
//! - `ThingDefinition`, `DefinitionIdentifier`: `namespace:name:version` model references
//! - `ThingEvent`: The journaled facts of the thing aggregate
//!
//! Attributes and properties are free-form JSON objects addressed by
//! [`JsonPointer`](core_types::JsonPointer)s.

mod events;
mod feature;
mod thing;

pub use events::ThingEvent;
pub use feature::{Feature, FeatureDefinition, FeatureId, Features};
pub use thing::Thing;

use core_types::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A JSON object, as used for attributes and properties
pub type JsonObject = Map<String, Value>;

/// A `namespace:name:version` reference to a model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DefinitionIdentifier(String);

impl DefinitionIdentifier {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let parts: Vec<&str> = raw.split(':').collect();
        let valid = parts.len() == 3
            && parts
                .iter()
                .all(|part| !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || c == '/'));
        if valid {
            Ok(Self(raw))
        } else {
            Err(DomainError::JsonInvalid {
                reason: format!(
                    "definition '{}' must have the form 'namespace:name:version'",
                    raw
                ),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefinitionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DefinitionIdentifier {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DefinitionIdentifier> for String {
    fn from(id: DefinitionIdentifier) -> Self {
        id.0
    }
}

/// The definition of a whole thing
pub type ThingDefinition = DefinitionIdentifier;
