//! # Policy Model
//!
//! This crate provides the resource tree model of access-control policies.
//!
//! ## Philosophy
//!
//! - **Values, not objects**: every modification returns a new value
//! - **Fail fast**: labels, resource keys and permissions are validated on construction
//! - **Path specificity, not insertion order**: the model keeps no ordering semantics
//!
//! ## Core Concepts
//!
//! - `Policy`: Labeled entries plus lifecycle and revision
//! - `PolicyEntry`: Subjects and the resources they are granted or revoked
//! - `ResourceKey`: A type tag plus a slash-delimited path (`thing:/attributes`)
//! - `EffectedPermissions`: The granted and revoked permissions on one resource
//! - `PolicyEvent`: The journaled facts of the policy aggregate
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - The decision algorithm (see `policy_enforcer`)
//! - Policy imports from other policies

mod document;
mod entry;
mod events;

pub use document::Policy;
pub use entry::{PolicyEntry, Resources, Subjects};
pub use events::PolicyEvent;

use core_types::{DomainError, JsonPointer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Labels
// ============================================================================

/// Maximum length of a policy entry label
pub const MAX_LABEL_LENGTH: usize = 256;

/// Unique name of a policy entry within its policy
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let reason = if raw.is_empty() {
            Some("label must not be empty")
        } else if raw.len() > MAX_LABEL_LENGTH {
            Some("label exceeds the maximum length of 256 characters")
        } else if raw.contains('/') || raw.chars().any(char::is_control) {
            Some("label must not contain '/' or control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(DomainError::LabelInvalid {
                label: raw,
                reason: reason.to_string(),
            }),
            None => Ok(Self(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Label {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Permission to read a resource
pub const READ: &str = "READ";
/// Permission to modify a resource
pub const WRITE: &str = "WRITE";

/// A set of permission names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates each permission name
    pub fn parse<I, S>(names: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.into();
                if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
                    Err(DomainError::PermissionInvalid {
                        permission: name,
                        reason: "permission must be a non-empty word".to_string(),
                    })
                } else {
                    Ok(name)
                }
            })
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn read() -> Self {
        Self::single(READ)
    }

    pub fn write() -> Self {
        Self::single(WRITE)
    }

    pub fn read_write() -> Self {
        Self([READ, WRITE].iter().map(|p| p.to_string()).collect())
    }

    fn single(name: &str) -> Self {
        Self(std::iter::once(name.to_string()).collect())
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    pub fn contains_all(&self, other: &Permissions) -> bool {
        other.0.is_subset(&self.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn union(&self, other: &Permissions) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }
}

impl TryFrom<Vec<String>> for Permissions {
    type Error = DomainError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Permissions> for Vec<String> {
    fn from(permissions: Permissions) -> Self {
        permissions.0.into_iter().collect()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", names.join(", "))
    }
}

// ============================================================================
// Resource keys
// ============================================================================

/// Resource type of thing resources
pub const THING_RESOURCE: &str = "thing";
/// Resource type of policy resources
pub const POLICY_RESOURCE: &str = "policy";
/// Resource type of message resources
pub const MESSAGE_RESOURCE: &str = "message";

/// A type-tagged path into the protected resource tree
///
/// The textual form is `<type>:<path>`, e.g. `thing:/attributes/location`.
/// The path is normalised, so `thing:attributes` and `thing:/attributes/`
/// denote the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    resource_type: String,
    path: JsonPointer,
}

impl ResourceKey {
    /// Creates a key from its parts, validating the type
    pub fn new(resource_type: impl Into<String>, path: JsonPointer) -> Result<Self, DomainError> {
        let resource_type = resource_type.into();
        if !is_valid_resource_type(&resource_type) {
            return Err(DomainError::ResourceKeyInvalid {
                key: format!("{}:{}", resource_type, path),
                reason: "resource type must be a non-empty lower-case word".to_string(),
            });
        }
        Ok(Self {
            resource_type,
            path,
        })
    }

    /// Parses `<type>:<path>`
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let (resource_type, path) =
            raw.split_once(':')
                .ok_or_else(|| DomainError::ResourceKeyInvalid {
                    key: raw.to_string(),
                    reason: "resource key must contain a ':' after the resource type".to_string(),
                })?;
        let path = JsonPointer::parse(path).map_err(|err| DomainError::ResourceKeyInvalid {
            key: raw.to_string(),
            reason: err.to_string(),
        })?;
        if !is_valid_resource_type(resource_type) {
            return Err(DomainError::ResourceKeyInvalid {
                key: raw.to_string(),
                reason: "resource type must be a non-empty lower-case word".to_string(),
            });
        }
        Ok(Self {
            resource_type: resource_type.to_string(),
            path,
        })
    }

    /// `thing:<path>`
    pub fn thing(path: JsonPointer) -> Self {
        Self {
            resource_type: THING_RESOURCE.to_string(),
            path,
        }
    }

    /// `policy:<path>`
    pub fn policy(path: JsonPointer) -> Self {
        Self {
            resource_type: POLICY_RESOURCE.to_string(),
            path,
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn path(&self) -> &JsonPointer {
        &self.path
    }

    /// Returns a key of the same type with `segment` appended to the path
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            path: self.path.append(segment),
        }
    }
}

fn is_valid_resource_type(resource_type: &str) -> bool {
    !resource_type.is_empty()
        && resource_type
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.path)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.to_string()
    }
}

// ============================================================================
// Effected permissions
// ============================================================================

/// The granted and revoked permissions on one resource of one entry
///
/// Both sets are disjoint by convention only. When a permission is in both,
/// the revoke wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectedPermissions {
    #[serde(default)]
    pub grant: Permissions,
    #[serde(default)]
    pub revoke: Permissions,
}

impl EffectedPermissions {
    pub fn new(grant: Permissions, revoke: Permissions) -> Self {
        Self { grant, revoke }
    }

    pub fn granting(grant: Permissions) -> Self {
        Self::new(grant, Permissions::new())
    }

    pub fn revoking(revoke: Permissions) -> Self {
        Self::new(Permissions::new(), revoke)
    }

    pub fn grants(&self, permission: &str) -> bool {
        self.grant.contains(permission)
    }

    pub fn revokes(&self, permission: &str) -> bool {
        self.revoke.contains(permission)
    }

    /// Neither grants nor revokes anything
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }
}
