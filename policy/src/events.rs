//! Events of the policy aggregate

use crate::{EffectedPermissions, Label, Policy, PolicyEntry, ResourceKey, Resources, Subjects};
use core_types::{Lifecycle, PolicyId, Revision, Timestamp};
use event_sourcing::{Aggregate, EventPayload};
use identity::{Subject, SubjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything that can happen to a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PolicyEvent {
    PolicyCreated {
        policy: Policy,
    },
    PolicyModified {
        policy: Policy,
    },
    PolicyDeleted {},
    PolicyEntriesModified {
        entries: Vec<PolicyEntry>,
    },
    PolicyEntryCreated {
        entry: PolicyEntry,
    },
    PolicyEntryModified {
        entry: PolicyEntry,
    },
    PolicyEntryDeleted {
        label: Label,
    },
    SubjectsModified {
        label: Label,
        subjects: Subjects,
    },
    SubjectCreated {
        label: Label,
        subject_id: SubjectId,
        subject: Subject,
    },
    SubjectModified {
        label: Label,
        subject_id: SubjectId,
        subject: Subject,
    },
    SubjectDeleted {
        label: Label,
        subject_id: SubjectId,
    },
    ResourcesModified {
        label: Label,
        resources: Resources,
    },
    ResourceCreated {
        label: Label,
        resource_key: ResourceKey,
        resource: EffectedPermissions,
    },
    ResourceModified {
        label: Label,
        resource_key: ResourceKey,
        resource: EffectedPermissions,
    },
    ResourceDeleted {
        label: Label,
        resource_key: ResourceKey,
    },
}

impl EventPayload for PolicyEvent {
    const NAMESPACE: &'static str = "policies.events";
    const NAMES: &'static [&'static str] = &[
        "policyCreated",
        "policyModified",
        "policyDeleted",
        "policyEntriesModified",
        "policyEntryCreated",
        "policyEntryModified",
        "policyEntryDeleted",
        "subjectsModified",
        "subjectCreated",
        "subjectModified",
        "subjectDeleted",
        "resourcesModified",
        "resourceCreated",
        "resourceModified",
        "resourceDeleted",
    ];

    fn name(&self) -> &'static str {
        match self {
            Self::PolicyCreated { .. } => "policyCreated",
            Self::PolicyModified { .. } => "policyModified",
            Self::PolicyDeleted {} => "policyDeleted",
            Self::PolicyEntriesModified { .. } => "policyEntriesModified",
            Self::PolicyEntryCreated { .. } => "policyEntryCreated",
            Self::PolicyEntryModified { .. } => "policyEntryModified",
            Self::PolicyEntryDeleted { .. } => "policyEntryDeleted",
            Self::SubjectsModified { .. } => "subjectsModified",
            Self::SubjectCreated { .. } => "subjectCreated",
            Self::SubjectModified { .. } => "subjectModified",
            Self::SubjectDeleted { .. } => "subjectDeleted",
            Self::ResourcesModified { .. } => "resourcesModified",
            Self::ResourceCreated { .. } => "resourceCreated",
            Self::ResourceModified { .. } => "resourceModified",
            Self::ResourceDeleted { .. } => "resourceDeleted",
        }
    }

    fn is_creation(&self) -> bool {
        matches!(self, Self::PolicyCreated { .. })
    }
}

impl Aggregate for Policy {
    type Id = PolicyId;
    type Event = PolicyEvent;

    const TYPE: &'static str = "policy";

    fn id(&self) -> &PolicyId {
        Policy::id(self)
    }

    fn revision(&self) -> Revision {
        Policy::revision(self)
    }

    fn lifecycle(&self) -> Lifecycle {
        Policy::lifecycle(self)
    }

    fn with_revision(&self, revision: Revision) -> Self {
        Policy::with_revision(self, revision)
    }

    fn with_created(&self, timestamp: Timestamp) -> Self {
        Policy::with_created(self, timestamp)
    }

    fn with_modified(&self, timestamp: Timestamp) -> Self {
        Policy::with_modified(self, timestamp)
    }

    fn to_json(&self) -> Value {
        Policy::to_json(self)
    }
}
