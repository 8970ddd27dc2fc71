//! Command and response headers, entity tags and conditional matchers

use crate::{DomainError, Revision};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// An entity tag as used by `ETag`, `If-Match` and `If-None-Match`
///
/// Whole aggregates are tagged by revision (`"rev:3"`). Sub-entities such as
/// a single subject or attribute are tagged by a hash of their JSON content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityTag {
    weak: bool,
    opaque: String,
}

impl EntityTag {
    /// Creates a strong tag
    pub fn strong(opaque: impl Into<String>) -> Self {
        Self {
            weak: false,
            opaque: opaque.into(),
        }
    }

    /// Creates a weak tag
    pub fn weak(opaque: impl Into<String>) -> Self {
        Self {
            weak: true,
            opaque: opaque.into(),
        }
    }

    /// Tag of a whole aggregate at the given revision
    pub fn from_revision(revision: Revision) -> Self {
        Self::strong(format!("rev:{}", revision.value()))
    }

    /// Tag of a sub-entity, derived from its JSON content
    pub fn from_json(value: &Value) -> Self {
        // serde_json orders object keys, so equal documents serialise equally
        let digest = Sha256::digest(value.to_string().as_bytes());
        let hash: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        Self::strong(format!("hash:{}", hash))
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    /// Strong comparison: both tags strong and equal
    pub fn strong_matches(&self, other: &EntityTag) -> bool {
        !self.weak && !other.weak && self.opaque == other.opaque
    }

    /// Weak comparison: opaque values equal, weakness ignored
    pub fn weak_matches(&self, other: &EntityTag) -> bool {
        self.opaque == other.opaque
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/\"{}\"", self.opaque)
        } else {
            write!(f, "\"{}\"", self.opaque)
        }
    }
}

impl FromStr for EntityTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (weak, rest) = match trimmed.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let opaque = rest
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .unwrap_or(rest);
        if opaque.is_empty() || opaque.contains('"') {
            return Err(DomainError::HeaderInvalid {
                header: "etag".to_string(),
                value: s.to_string(),
            });
        }
        Ok(Self {
            weak,
            opaque: opaque.to_string(),
        })
    }
}

impl TryFrom<String> for EntityTag {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityTag> for String {
    fn from(tag: EntityTag) -> Self {
        tag.to_string()
    }
}

/// One element of an `If-Match` / `If-None-Match` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityTagMatcher {
    /// `*`, matches any existing entity
    Asterisk,
    /// A concrete tag
    Tag(EntityTag),
}

/// The parsed value of an `If-Match` / `If-None-Match` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityTagMatchers(Vec<EntityTagMatcher>);

impl EntityTagMatchers {
    pub fn new(matchers: Vec<EntityTagMatcher>) -> Self {
        Self(matchers)
    }

    /// `*`
    pub fn asterisk() -> Self {
        Self(vec![EntityTagMatcher::Asterisk])
    }

    /// A single concrete tag
    pub fn tag(tag: EntityTag) -> Self {
        Self(vec![EntityTagMatcher::Tag(tag)])
    }

    pub fn matchers(&self) -> &[EntityTagMatcher] {
        &self.0
    }

    /// Evaluates `If-Match` semantics against the current entity tag
    ///
    /// `None` means the entity does not exist, which never matches.
    pub fn matches_strongly(&self, current: Option<&EntityTag>) -> bool {
        let Some(current) = current else {
            return false;
        };
        self.0.iter().any(|matcher| match matcher {
            EntityTagMatcher::Asterisk => true,
            EntityTagMatcher::Tag(tag) => tag.strong_matches(current),
        })
    }

    /// Evaluates `If-None-Match` semantics against the current entity tag
    ///
    /// Returns `true` when one of the matchers hits, i.e. when the request
    /// precondition fails.
    pub fn matches_weakly(&self, current: Option<&EntityTag>) -> bool {
        let Some(current) = current else {
            return false;
        };
        self.0.iter().any(|matcher| match matcher {
            EntityTagMatcher::Asterisk => true,
            EntityTagMatcher::Tag(tag) => tag.weak_matches(current),
        })
    }
}

impl fmt::Display for EntityTagMatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|matcher| match matcher {
                EntityTagMatcher::Asterisk => "*".to_string(),
                EntityTagMatcher::Tag(tag) => tag.to_string(),
            })
            .collect();
        f.write_str(&rendered.join(","))
    }
}

impl FromStr for EntityTagMatchers {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let matchers = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                if part == "*" {
                    Ok(EntityTagMatcher::Asterisk)
                } else {
                    part.parse().map(EntityTagMatcher::Tag)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if matchers.is_empty() {
            return Err(DomainError::HeaderInvalid {
                header: "if-match".to_string(),
                value: s.to_string(),
            });
        }
        Ok(Self(matchers))
    }
}

impl TryFrom<String> for EntityTagMatchers {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityTagMatchers> for String {
    fn from(matchers: EntityTagMatchers) -> Self {
        matchers.to_string()
    }
}

/// Headers travelling with commands, events and responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    /// Correlates a command with its event and response
    #[serde(
        rename = "correlation-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<String>,
    /// Conditional request: only apply if the current entity tag matches
    #[serde(rename = "if-match", default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<EntityTagMatchers>,
    /// Conditional request: only apply if the current entity tag does not match
    #[serde(
        rename = "if-none-match",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub if_none_match: Option<EntityTagMatchers>,
    /// Entity tag of the entity after the command was applied
    #[serde(rename = "etag", default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<EntityTag>,
    /// Metadata to attach to the emitted event
    #[serde(rename = "put-metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the correlation id (builder pattern)
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Sets a freshly generated correlation id (builder pattern)
    pub fn with_generated_correlation_id(self) -> Self {
        self.with_correlation_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_if_match(mut self, matchers: EntityTagMatchers) -> Self {
        self.if_match = Some(matchers);
        self
    }

    pub fn with_if_none_match(mut self, matchers: EntityTagMatchers) -> Self {
        self.if_none_match = Some(matchers);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_etag(mut self, etag: EntityTag) -> Self {
        self.etag = Some(etag);
        self
    }

    /// Headers to answer with: correlation id only, no preconditions
    pub fn for_response(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            ..Self::default()
        }
    }
}
