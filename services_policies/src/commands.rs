//! Commands of the policy aggregate

use core_types::PolicyId;
use event_sourcing::Command;
use identity::{Subject, SubjectId};
use policy::{EffectedPermissions, Label, Policy, PolicyEntry, ResourceKey, Resources, Subjects};
use serde::{Deserialize, Serialize};

/// A command addressed to one policy
pub type PolicyCommandEnvelope = Command<PolicyId, PolicyCommand>;

/// Everything that can be asked of a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PolicyCommand {
    CreatePolicy {
        policy: Policy,
    },
    /// Replaces the policy; creates it when it does not exist
    ModifyPolicy {
        policy: Policy,
    },
    DeletePolicy,
    RetrievePolicy,
    ModifyPolicyEntries {
        entries: Vec<PolicyEntry>,
    },
    RetrievePolicyEntries,
    ModifyPolicyEntry {
        entry: PolicyEntry,
    },
    DeletePolicyEntry {
        label: Label,
    },
    RetrievePolicyEntry {
        label: Label,
    },
    ModifySubjects {
        label: Label,
        subjects: Subjects,
    },
    ModifySubject {
        label: Label,
        subject_id: SubjectId,
        subject: Subject,
    },
    DeleteSubject {
        label: Label,
        subject_id: SubjectId,
    },
    RetrieveSubjects {
        label: Label,
    },
    RetrieveSubject {
        label: Label,
        subject_id: SubjectId,
    },
    ModifyResources {
        label: Label,
        resources: Resources,
    },
    ModifyResource {
        label: Label,
        resource_key: ResourceKey,
        resource: EffectedPermissions,
    },
    DeleteResource {
        label: Label,
        resource_key: ResourceKey,
    },
    RetrieveResources {
        label: Label,
    },
    RetrieveResource {
        label: Label,
        resource_key: ResourceKey,
    },
}

impl PolicyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreatePolicy { .. } => "createPolicy",
            Self::ModifyPolicy { .. } => "modifyPolicy",
            Self::DeletePolicy => "deletePolicy",
            Self::RetrievePolicy => "retrievePolicy",
            Self::ModifyPolicyEntries { .. } => "modifyPolicyEntries",
            Self::RetrievePolicyEntries => "retrievePolicyEntries",
            Self::ModifyPolicyEntry { .. } => "modifyPolicyEntry",
            Self::DeletePolicyEntry { .. } => "deletePolicyEntry",
            Self::RetrievePolicyEntry { .. } => "retrievePolicyEntry",
            Self::ModifySubjects { .. } => "modifySubjects",
            Self::ModifySubject { .. } => "modifySubject",
            Self::DeleteSubject { .. } => "deleteSubject",
            Self::RetrieveSubjects { .. } => "retrieveSubjects",
            Self::RetrieveSubject { .. } => "retrieveSubject",
            Self::ModifyResources { .. } => "modifyResources",
            Self::ModifyResource { .. } => "modifyResource",
            Self::DeleteResource { .. } => "deleteResource",
            Self::RetrieveResources { .. } => "retrieveResources",
            Self::RetrieveResource { .. } => "retrieveResource",
        }
    }

    /// e.g. `policies.responses:modifySubject`
    pub fn response_type(&self) -> String {
        format!("policies.responses:{}", self.name())
    }

    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::RetrievePolicy
                | Self::RetrievePolicyEntries
                | Self::RetrievePolicyEntry { .. }
                | Self::RetrieveSubjects { .. }
                | Self::RetrieveSubject { .. }
                | Self::RetrieveResources { .. }
                | Self::RetrieveResource { .. }
        )
    }

    /// Label of the addressed entry, for entry-level commands
    pub fn label(&self) -> Option<&Label> {
        match self {
            Self::ModifyPolicyEntry { entry } => Some(&entry.label),
            Self::DeletePolicyEntry { label }
            | Self::RetrievePolicyEntry { label }
            | Self::ModifySubjects { label, .. }
            | Self::ModifySubject { label, .. }
            | Self::DeleteSubject { label, .. }
            | Self::RetrieveSubjects { label }
            | Self::RetrieveSubject { label, .. }
            | Self::ModifyResources { label, .. }
            | Self::ModifyResource { label, .. }
            | Self::DeleteResource { label, .. }
            | Self::RetrieveResources { label }
            | Self::RetrieveResource { label, .. } => Some(label),
            _ => None,
        }
    }
}
