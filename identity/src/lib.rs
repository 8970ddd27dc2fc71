//! # Identity
//!
//! This crate provides the subject primitives that policies grant
//! permissions to.
//!
//! ## Philosophy
//!
//! - **Identity is explicit and contextual, not global**
//! - **Subjects do not grant authority by themselves**; only policy entries do
//! - **Order never matters**: an authorization context is a set
//!
//! ## Core Concepts
//!
//! - `SubjectId`: Authenticated principal, usually `issuer:subject`
//! - `Subject`: Type annotation plus an optional expiry
//! - `SubjectExpiry`: Point in time after which the subject is dropped
//! - `AuthorizationContext`: The subject ids presented by a caller
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - Authentication or token validation
//! - Subject announcements or expiry notifications

use core_types::{DomainError, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum length of a subject id
pub const MAX_SUBJECT_ID_LENGTH: usize = 256;

/// Identifier of an authenticated principal
///
/// Subject ids are opaque to the enforcer. By convention they have the form
/// `issuer:subject` (e.g. `google:alice`), but an issuer is not required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Parses and validates a subject id
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let reason = if raw.is_empty() {
            Some("subject id must not be empty")
        } else if raw.len() > MAX_SUBJECT_ID_LENGTH {
            Some("subject id exceeds the maximum length of 256 characters")
        } else if raw.chars().any(char::is_control) {
            Some("subject id must not contain control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DomainError::SubjectIdInvalid {
                subject_id: raw,
                reason: reason.to_string(),
            }),
            None => Ok(Self(raw)),
        }
    }

    /// Returns the issuer part, if the id has one
    pub fn issuer(&self) -> Option<&str> {
        self.0.split_once(':').map(|(issuer, _)| issuer)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

/// Point in time after which a subject is no longer part of its entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectExpiry(Timestamp);

impl SubjectExpiry {
    pub fn new(timestamp: Timestamp) -> Self {
        Self(timestamp)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.0
    }

    /// A subject expires at the exact instant of its expiry
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.0 <= now
    }

    /// Rounds the expiry up to the configured granularity
    pub fn rounded_up(&self, granularity_ms: u64) -> Self {
        Self(self.0.round_up(granularity_ms))
    }
}

impl fmt::Display for SubjectExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Type of a subject, e.g. `generated` or `jwt`
///
/// The type is informational only and never evaluated by the enforcer.
pub const DEFAULT_SUBJECT_TYPE: &str = "generated";

/// A subject of a policy entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<SubjectExpiry>,
}

impl Subject {
    /// Creates a permanent subject of the given type
    pub fn new(subject_type: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            expiry: None,
        }
    }

    /// Sets an expiry (builder pattern)
    pub fn with_expiry(mut self, expiry: SubjectExpiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Subjects without an expiry never expire
    pub fn is_permanent(&self) -> bool {
        self.expiry.is_none()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiry.is_some_and(|expiry| expiry.is_expired(now))
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT_TYPE)
    }
}

/// The set of subject ids a caller authenticated as
///
/// Duplicates are dropped and order is irrelevant, so two contexts with the
/// same ids always lead to the same decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationContext {
    subject_ids: BTreeSet<SubjectId>,
}

impl AuthorizationContext {
    pub fn new<I>(subject_ids: I) -> Self
    where
        I: IntoIterator<Item = SubjectId>,
    {
        Self {
            subject_ids: subject_ids.into_iter().collect(),
        }
    }

    /// Parses each raw id; fails on the first invalid one
    pub fn parse<I, S>(raw_ids: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subject_ids = raw_ids
            .into_iter()
            .map(SubjectId::parse)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { subject_ids })
    }

    pub fn subject_ids(&self) -> impl Iterator<Item = &SubjectId> {
        self.subject_ids.iter()
    }

    pub fn contains(&self, subject_id: &SubjectId) -> bool {
        self.subject_ids.contains(subject_id)
    }

    pub fn is_empty(&self) -> bool {
        self.subject_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subject_ids.len()
    }
}
