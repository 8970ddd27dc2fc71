//! Domain error taxonomy
//!
//! All failures of the policy and thing cores are values of [`DomainError`].
//! Each variant carries the ids, labels and pointers needed to build a
//! response, and maps onto an [`ErrorKind`], a platform error code and a
//! response status.

use crate::{JsonPointer, PolicyId, StatusCode, ThingId, Timestamp};
use thiserror::Error;

/// Coarse classification of a [`DomainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; fails at construction time
    Structural,
    /// The addressed entity is missing, already exists, or a header
    /// precondition failed
    Precondition,
    /// The requester lacks the permission to modify
    Authorization,
    /// The operation would break an aggregate invariant
    InvariantViolation,
    /// Registry or version skew; never retried
    Programming,
}

/// Errors produced by the policy and thing cores
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    // Structural
    #[error("The entity ID '{id}' is not valid: {reason}")]
    EntityIdInvalid { id: String, reason: String },

    #[error("The JSON pointer '{pointer}' is not valid: {reason}")]
    JsonPointerInvalid { pointer: String, reason: String },

    #[error("The resource key '{key}' is not valid: {reason}")]
    ResourceKeyInvalid { key: String, reason: String },

    #[error("The Policy Label '{label}' is not valid: {reason}")]
    LabelInvalid { label: String, reason: String },

    #[error("The Subject ID '{subject_id}' is not valid: {reason}")]
    SubjectIdInvalid { subject_id: String, reason: String },

    #[error("The permission '{permission}' is not valid: {reason}")]
    PermissionInvalid { permission: String, reason: String },

    #[error("The header '{header}' has the invalid value '{value}'")]
    HeaderInvalid { header: String, value: String },

    #[error("The Label '{label}' is used by more than one PolicyEntry")]
    DuplicateLabel { label: String },

    #[error("The Policy structure is invalid: {reason}")]
    InvalidPolicyStructure { reason: String },

    #[error("The JSON content is invalid: {reason}")]
    JsonInvalid { reason: String },

    #[error("The entity ID '{actual}' in the payload does not match the addressed entity '{expected}'")]
    EntityIdMismatch { expected: String, actual: String },

    // Precondition
    #[error("The Policy with ID '{policy_id}' could not be found or requester had insufficient permissions to access it.")]
    PolicyNotAccessible { policy_id: PolicyId },

    #[error("The Policy with ID '{policy_id}' already exists")]
    PolicyConflict { policy_id: PolicyId },

    #[error("The PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be found or requester had insufficient permissions to access it.")]
    PolicyEntryNotAccessible { policy_id: PolicyId, label: String },

    #[error("The Subject with ID '{subject_id}' of the PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be found or requester had insufficient permissions to access it.")]
    SubjectNotAccessible {
        policy_id: PolicyId,
        label: String,
        subject_id: String,
    },

    #[error("The Resource with key '{resource_key}' of the PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be found or requester had insufficient permissions to access it.")]
    ResourceNotAccessible {
        policy_id: PolicyId,
        label: String,
        resource_key: String,
    },

    #[error("The Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access it.")]
    ThingNotAccessible { thing_id: ThingId },

    #[error("The Thing with ID '{thing_id}' already exists")]
    ThingConflict { thing_id: ThingId },

    #[error("The Attributes of the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access them.")]
    AttributesNotAccessible { thing_id: ThingId },

    #[error("The Attribute with key '{pointer}' of the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access it.")]
    AttributeNotAccessible {
        thing_id: ThingId,
        pointer: JsonPointer,
    },

    #[error("The Definition of the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access it.")]
    DefinitionNotAccessible { thing_id: ThingId },

    #[error("The Features of the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access them.")]
    FeaturesNotAccessible { thing_id: ThingId },

    #[error("The Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access it.")]
    FeatureNotAccessible {
        thing_id: ThingId,
        feature_id: String,
    },

    #[error("The Properties of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access them.")]
    FeaturePropertiesNotAccessible {
        thing_id: ThingId,
        feature_id: String,
    },

    #[error("The Property with JSON Pointer '{pointer}' of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access it.")]
    FeaturePropertyNotAccessible {
        thing_id: ThingId,
        feature_id: String,
        pointer: JsonPointer,
    },

    #[error("The desired Properties of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access them.")]
    FeatureDesiredPropertiesNotAccessible {
        thing_id: ThingId,
        feature_id: String,
    },

    #[error("The desired Property with JSON Pointer '{pointer}' of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be found or requester had insufficient permissions to access it.")]
    FeatureDesiredPropertyNotAccessible {
        thing_id: ThingId,
        feature_id: String,
        pointer: JsonPointer,
    },

    #[error("The comparison of precondition header '{header}' for the requested entity evaluated to false. Expected: '{matcher}'.")]
    PreconditionFailed { header: String, matcher: String },

    #[error("The expiry of the Subject with ID '{subject_id}' must not be in the past (expiry {expiry}).")]
    SubjectExpiryInvalid {
        subject_id: String,
        expiry: Timestamp,
    },

    // Authorization
    #[error("The Policy with ID '{policy_id}' could not be modified as the requester had insufficient permissions.")]
    PolicyNotModifiable { policy_id: PolicyId },

    #[error("The PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be modified as the requester had insufficient permissions.")]
    PolicyEntryNotModifiable { policy_id: PolicyId, label: String },

    #[error("The Subjects of the PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be modified as the requester had insufficient permissions.")]
    SubjectsNotModifiable { policy_id: PolicyId, label: String },

    #[error("The Subject with ID '{subject_id}' of the PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be modified as the requester had insufficient permissions.")]
    SubjectNotModifiable {
        policy_id: PolicyId,
        label: String,
        subject_id: String,
    },

    #[error("The Resources of the PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be modified as the requester had insufficient permissions.")]
    ResourcesNotModifiable { policy_id: PolicyId, label: String },

    #[error("The Resource with key '{resource_key}' of the PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' could not be modified as the requester had insufficient permissions.")]
    ResourceNotModifiable {
        policy_id: PolicyId,
        label: String,
        resource_key: String,
    },

    #[error("The Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    ThingNotModifiable { thing_id: ThingId },

    #[error("The Policy ID of the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    PolicyIdNotModifiable { thing_id: ThingId },

    #[error("The Definition of the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    DefinitionNotModifiable { thing_id: ThingId },

    #[error("The Attributes of the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    AttributesNotModifiable { thing_id: ThingId },

    #[error("The Attribute with key '{pointer}' of the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    AttributeNotModifiable {
        thing_id: ThingId,
        pointer: JsonPointer,
    },

    #[error("The Features of the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    FeaturesNotModifiable { thing_id: ThingId },

    #[error("The Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    FeatureNotModifiable {
        thing_id: ThingId,
        feature_id: String,
    },

    #[error("The Properties of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    FeaturePropertiesNotModifiable {
        thing_id: ThingId,
        feature_id: String,
    },

    #[error("The Property with JSON Pointer '{pointer}' of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    FeaturePropertyNotModifiable {
        thing_id: ThingId,
        feature_id: String,
        pointer: JsonPointer,
    },

    #[error("The desired Properties of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    FeatureDesiredPropertiesNotModifiable {
        thing_id: ThingId,
        feature_id: String,
    },

    #[error("The desired Property with JSON Pointer '{pointer}' of the Feature with ID '{feature_id}' on the Thing with ID '{thing_id}' could not be modified as the requester had insufficient permissions.")]
    FeatureDesiredPropertyNotModifiable {
        thing_id: ThingId,
        feature_id: String,
        pointer: JsonPointer,
    },

    // Invariant violations
    #[error("The PolicyEntry with Label '{label}' on the Policy with ID '{policy_id}' is invalid: {reason}")]
    PolicyEntryInvalid {
        policy_id: PolicyId,
        label: String,
        reason: String,
    },

    #[error("The Policy with ID '{policy_id}' could not be modified as the resulting Policy would be invalid: {reason}")]
    PolicyModificationInvalid { policy_id: PolicyId, reason: String },

    #[error("The Policy with ID '{policy_id}' is invalid: {reason}")]
    PolicyInvalid { policy_id: PolicyId, reason: String },

    #[error("The size of '{actual}' bytes exceeds the maximal allowed Policy size of '{max}' bytes.")]
    PolicyTooLarge { actual: usize, max: usize },

    #[error("The size of '{actual}' bytes exceeds the maximal allowed Thing size of '{max}' bytes.")]
    ThingTooLarge { actual: usize, max: usize },

    #[error("The event '{event_type}' cannot be applied to entity '{entity_id}': {reason}")]
    EventNotApplicable {
        event_type: String,
        entity_id: String,
        reason: String,
    },

    // Programming
    #[error("The event type '{event_type}' is not handled for aggregates of type '{aggregate}'")]
    UnhandledEventType { event_type: String, aggregate: String },
}

impl DomainError {
    /// Returns the coarse classification of this error
    pub fn kind(&self) -> ErrorKind {
        use DomainError::*;
        match self {
            EntityIdInvalid { .. }
            | JsonPointerInvalid { .. }
            | ResourceKeyInvalid { .. }
            | LabelInvalid { .. }
            | SubjectIdInvalid { .. }
            | PermissionInvalid { .. }
            | HeaderInvalid { .. }
            | DuplicateLabel { .. }
            | InvalidPolicyStructure { .. }
            | JsonInvalid { .. }
            | EntityIdMismatch { .. } => ErrorKind::Structural,

            PolicyNotAccessible { .. }
            | PolicyConflict { .. }
            | PolicyEntryNotAccessible { .. }
            | SubjectNotAccessible { .. }
            | ResourceNotAccessible { .. }
            | ThingNotAccessible { .. }
            | ThingConflict { .. }
            | AttributesNotAccessible { .. }
            | AttributeNotAccessible { .. }
            | DefinitionNotAccessible { .. }
            | FeaturesNotAccessible { .. }
            | FeatureNotAccessible { .. }
            | FeaturePropertiesNotAccessible { .. }
            | FeaturePropertyNotAccessible { .. }
            | FeatureDesiredPropertiesNotAccessible { .. }
            | FeatureDesiredPropertyNotAccessible { .. }
            | PreconditionFailed { .. }
            | SubjectExpiryInvalid { .. } => ErrorKind::Precondition,

            PolicyNotModifiable { .. }
            | PolicyEntryNotModifiable { .. }
            | SubjectsNotModifiable { .. }
            | SubjectNotModifiable { .. }
            | ResourcesNotModifiable { .. }
            | ResourceNotModifiable { .. }
            | ThingNotModifiable { .. }
            | PolicyIdNotModifiable { .. }
            | DefinitionNotModifiable { .. }
            | AttributesNotModifiable { .. }
            | AttributeNotModifiable { .. }
            | FeaturesNotModifiable { .. }
            | FeatureNotModifiable { .. }
            | FeaturePropertiesNotModifiable { .. }
            | FeaturePropertyNotModifiable { .. }
            | FeatureDesiredPropertiesNotModifiable { .. }
            | FeatureDesiredPropertyNotModifiable { .. } => ErrorKind::Authorization,

            PolicyEntryInvalid { .. }
            | PolicyModificationInvalid { .. }
            | PolicyInvalid { .. }
            | PolicyTooLarge { .. }
            | ThingTooLarge { .. }
            | EventNotApplicable { .. } => ErrorKind::InvariantViolation,

            UnhandledEventType { .. } => ErrorKind::Programming,
        }
    }

    /// Returns the platform error code, e.g. `policies:subject.notmodifiable`
    pub fn error_code(&self) -> &'static str {
        use DomainError::*;
        match self {
            EntityIdInvalid { .. } => "entity:id.invalid",
            JsonPointerInvalid { .. } => "json.pointer.invalid",
            ResourceKeyInvalid { .. } => "policies:resource.key.invalid",
            LabelInvalid { .. } => "policies:label.invalid",
            SubjectIdInvalid { .. } => "policies:subject.id.invalid",
            PermissionInvalid { .. } => "policies:permission.invalid",
            HeaderInvalid { .. } => "header.invalid",
            DuplicateLabel { .. } => "policies:entry.label.duplicate",
            InvalidPolicyStructure { .. } => "policies:policy.structure.invalid",
            JsonInvalid { .. } => "json.invalid",
            EntityIdMismatch { .. } => "entity:id.mismatch",

            PolicyNotAccessible { .. } => "policies:policy.notfound",
            PolicyConflict { .. } => "policies:policy.conflict",
            PolicyEntryNotAccessible { .. } => "policies:policyentry.notfound",
            SubjectNotAccessible { .. } => "policies:subject.notfound",
            ResourceNotAccessible { .. } => "policies:resource.notfound",
            ThingNotAccessible { .. } => "things:thing.notfound",
            ThingConflict { .. } => "things:thing.conflict",
            AttributesNotAccessible { .. } => "things:attributes.notfound",
            AttributeNotAccessible { .. } => "things:attribute.notfound",
            DefinitionNotAccessible { .. } => "things:definition.notfound",
            FeaturesNotAccessible { .. } => "things:features.notfound",
            FeatureNotAccessible { .. } => "things:feature.notfound",
            FeaturePropertiesNotAccessible { .. } => "things:feature.properties.notfound",
            FeaturePropertyNotAccessible { .. } => "things:feature.property.notfound",
            FeatureDesiredPropertiesNotAccessible { .. } => {
                "things:feature.desiredProperties.notfound"
            }
            FeatureDesiredPropertyNotAccessible { .. } => {
                "things:feature.desiredProperty.notfound"
            }
            PreconditionFailed { .. } => "precondition.failed",
            SubjectExpiryInvalid { .. } => "policies:subject.expiry.invalid",

            PolicyNotModifiable { .. } => "policies:policy.notmodifiable",
            PolicyEntryNotModifiable { .. } => "policies:policyentry.notmodifiable",
            SubjectsNotModifiable { .. } => "policies:subjects.notmodifiable",
            SubjectNotModifiable { .. } => "policies:subject.notmodifiable",
            ResourcesNotModifiable { .. } => "policies:resources.notmodifiable",
            ResourceNotModifiable { .. } => "policies:resource.notmodifiable",
            ThingNotModifiable { .. } => "things:thing.notmodifiable",
            PolicyIdNotModifiable { .. } => "things:policyId.notmodifiable",
            DefinitionNotModifiable { .. } => "things:definition.notmodifiable",
            AttributesNotModifiable { .. } => "things:attributes.notmodifiable",
            AttributeNotModifiable { .. } => "things:attribute.notmodifiable",
            FeaturesNotModifiable { .. } => "things:features.notmodifiable",
            FeatureNotModifiable { .. } => "things:feature.notmodifiable",
            FeaturePropertiesNotModifiable { .. } => "things:feature.properties.notmodifiable",
            FeaturePropertyNotModifiable { .. } => "things:feature.property.notmodifiable",
            FeatureDesiredPropertiesNotModifiable { .. } => {
                "things:feature.desiredProperties.notmodifiable"
            }
            FeatureDesiredPropertyNotModifiable { .. } => {
                "things:feature.desiredProperty.notmodifiable"
            }

            PolicyEntryInvalid { .. } => "policies:policyentry.invalid",
            PolicyModificationInvalid { .. } => "policies:policy.modificationinvalid",
            PolicyInvalid { .. } => "policies:policy.invalid",
            PolicyTooLarge { .. } => "policies:policy.toolarge",
            ThingTooLarge { .. } => "things:thing.toolarge",
            EventNotApplicable { .. } => "events:event.notapplicable",
            UnhandledEventType { .. } => "events:event.type.unhandled",
        }
    }

    /// Returns the response status for this error
    pub fn status(&self) -> StatusCode {
        use DomainError::*;
        match self {
            PolicyConflict { .. } | ThingConflict { .. } => StatusCode::Conflict,
            PreconditionFailed { .. } => StatusCode::PreconditionFailed,
            SubjectExpiryInvalid { .. } => StatusCode::BadRequest,
            PolicyModificationInvalid { .. } => StatusCode::Forbidden,
            PolicyEntryInvalid { .. } | PolicyInvalid { .. } => StatusCode::BadRequest,
            PolicyTooLarge { .. } | ThingTooLarge { .. } => StatusCode::PayloadTooLarge,
            EventNotApplicable { .. } | UnhandledEventType { .. } => {
                StatusCode::InternalServerError
            }
            _ => match self.kind() {
                ErrorKind::Structural => StatusCode::BadRequest,
                ErrorKind::Precondition => StatusCode::NotFound,
                ErrorKind::Authorization => StatusCode::Forbidden,
                ErrorKind::InvariantViolation => StatusCode::BadRequest,
                ErrorKind::Programming => StatusCode::InternalServerError,
            },
        }
    }

    /// Returns a hint on how to resolve the error
    pub fn description(&self) -> &'static str {
        use DomainError::*;
        match self.kind() {
            ErrorKind::Structural => match self {
                EntityIdInvalid { .. } => {
                    "It must conform to the namespaced entity ID notation 'namespace:name'."
                }
                ResourceKeyInvalid { .. } => {
                    "A resource key has the form '<type>:/<path>', e.g. 'thing:/attributes'."
                }
                DuplicateLabel { .. } => "Each PolicyEntry of a Policy needs a unique Label.",
                _ => "Check the request for malformed content.",
            },
            ErrorKind::Precondition => match self {
                PolicyConflict { .. } | ThingConflict { .. } => {
                    "Choose another ID or delete the existing entity first."
                }
                PreconditionFailed { .. } => {
                    "Check the precondition headers If-Match and If-None-Match of your request."
                }
                SubjectExpiryInvalid { .. } => "Provide an expiry which lies in the future.",
                _ => "Check if the ID was correct and you have sufficient permissions.",
            },
            ErrorKind::Authorization => "Check if you have sufficient permissions.",
            ErrorKind::InvariantViolation => match self {
                PolicyTooLarge { .. } | ThingTooLarge { .. } => {
                    "Reduce the size of the entity or the content of the request."
                }
                EventNotApplicable { .. } => {
                    "The journal contains an event sequence that the aggregate cannot follow."
                }
                _ => "It must contain at least one permanent Subject with WRITE permission on the root resource.",
            },
            ErrorKind::Programming => {
                "The event registry and the persisted journal are out of sync."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_id() -> PolicyId {
        PolicyId::parse("org.example:policy").unwrap()
    }

    #[test]
    fn test_subject_not_modifiable() {
        let err = DomainError::SubjectNotModifiable {
            policy_id: policy_id(),
            label: "owner".to_string(),
            subject_id: "issuer:alice".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(err.error_code(), "policies:subject.notmodifiable");
        assert_eq!(err.status(), StatusCode::Forbidden);
        assert_eq!(
            err.to_string(),
            "The Subject with ID 'issuer:alice' of the PolicyEntry with Label 'owner' on the \
             Policy with ID 'org.example:policy' could not be modified as the requester had \
             insufficient permissions."
        );
    }

    #[test]
    fn test_statuses() {
        assert_eq!(
            DomainError::PolicyNotAccessible {
                policy_id: policy_id()
            }
            .status(),
            StatusCode::NotFound
        );
        assert_eq!(
            DomainError::PolicyConflict {
                policy_id: policy_id()
            }
            .status(),
            StatusCode::Conflict
        );
        assert_eq!(
            DomainError::PolicyTooLarge {
                actual: 200,
                max: 100
            }
            .status(),
            StatusCode::PayloadTooLarge
        );
        assert_eq!(
            DomainError::PreconditionFailed {
                header: "if-match".to_string(),
                matcher: "\"rev:1\"".to_string()
            }
            .status(),
            StatusCode::PreconditionFailed
        );
        assert_eq!(
            DomainError::PolicyModificationInvalid {
                policy_id: policy_id(),
                reason: "no owner".to_string()
            }
            .status(),
            StatusCode::Forbidden
        );
    }

    #[test]
    fn test_programming_errors() {
        let err = DomainError::UnhandledEventType {
            event_type: "policies.events:unknown".to_string(),
            aggregate: "policy".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(err.status(), StatusCode::InternalServerError);
        assert!(!err.description().is_empty());
    }

    #[test]
    fn test_feature_desired_property_code() {
        let err = DomainError::FeatureDesiredPropertyNotModifiable {
            thing_id: ThingId::parse("org.example:lamp").unwrap(),
            feature_id: "light".to_string(),
            pointer: JsonPointer::parse("/on").unwrap(),
        };
        assert_eq!(
            err.error_code(),
            "things:feature.desiredProperty.notmodifiable"
        );
        assert!(err.to_string().contains("'/on'"));
    }
}
