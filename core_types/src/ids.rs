//! Namespaced identifiers for event-sourced entities
//!
//! Every aggregate is addressed by a `"<namespace>:<name>"` identifier. The
//! namespace is empty or a dot-separated sequence of segments that each
//! start with a letter or underscore. The name is non-empty and must not
//! contain a slash, because identifiers appear inside resource paths.

use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a namespaced id, namespace and name included
pub const MAX_ID_LENGTH: usize = 256;

/// A validated `namespace:name` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedId {
    raw: String,
    separator: usize,
}

impl NamespacedId {
    /// Parses and validates a namespaced id
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let invalid = |reason: &str| DomainError::EntityIdInvalid {
            id: raw.clone(),
            reason: reason.to_string(),
        };

        if raw.len() > MAX_ID_LENGTH {
            return Err(invalid("id exceeds the maximum length of 256 characters"));
        }
        let separator = raw
            .find(':')
            .ok_or_else(|| invalid("id must contain a ':' separating namespace and name"))?;

        let namespace = &raw[..separator];
        let name = &raw[separator + 1..];

        if !namespace.is_empty() && !namespace.split('.').all(is_valid_namespace_segment) {
            return Err(invalid("namespace must consist of dot-separated identifiers"));
        }
        if name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if name.contains('/') || name.chars().any(char::is_control) {
            return Err(invalid("name must not contain '/' or control characters"));
        }

        Ok(Self { raw, separator })
    }

    /// Returns the namespace part (may be empty)
    pub fn namespace(&self) -> &str {
        &self.raw[..self.separator]
    }

    /// Returns the name part
    pub fn name(&self) -> &str {
        &self.raw[self.separator + 1..]
    }

    /// Returns the full id
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn is_valid_namespace_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl fmt::Display for NamespacedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(NamespacedId);

        impl $name {
            /// Parses and validates the id
            pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
                NamespacedId::parse(raw).map(Self)
            }

            /// Returns the namespace part (may be empty)
            pub fn namespace(&self) -> &str {
                self.0.namespace()
            }

            /// Returns the name part
            pub fn name(&self) -> &str {
                self.0.name()
            }

            /// Returns the full id
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.raw
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(
    /// Identifier of a Policy aggregate
    PolicyId
);

entity_id!(
    /// Identifier of a Thing aggregate
    ThingId
);

impl ThingId {
    /// Returns the policy id sharing this thing's namespace and name
    ///
    /// Things created without an explicit policy get a policy of the same id.
    pub fn to_policy_id(&self) -> PolicyId {
        PolicyId(self.0.clone())
    }
}
