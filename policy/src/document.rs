//! The policy aggregate value

use crate::{EffectedPermissions, Label, PolicyEntry, ResourceKey, Resources, Subjects};
use core_types::{DomainError, Lifecycle, PolicyId, Revision, Timestamp};
use identity::{Subject, SubjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An access-control policy
///
/// Entries are keyed by label; every modification returns a new policy and
/// leaves `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyDocument", into = "PolicyDocument")]
pub struct Policy {
    id: PolicyId,
    lifecycle: Lifecycle,
    revision: Revision,
    created: Option<Timestamp>,
    modified: Option<Timestamp>,
    entries: BTreeMap<Label, PolicyEntry>,
}

impl Policy {
    /// An active policy without entries at revision 0
    pub fn new(id: PolicyId) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::Active,
            revision: Revision::initial(),
            created: None,
            modified: None,
            entries: BTreeMap::new(),
        }
    }

    /// Builds a policy from entries; labels must be unique
    pub fn from_entries<I>(id: PolicyId, entries: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = PolicyEntry>,
    {
        Ok(Self {
            entries: index_entries(entries)?,
            ..Self::new(id)
        })
    }

    pub fn id(&self) -> &PolicyId {
        &self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn created(&self) -> Option<Timestamp> {
        self.created
    }

    pub fn modified(&self) -> Option<Timestamp> {
        self.modified
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
    }

    pub fn entries(&self) -> impl Iterator<Item = &PolicyEntry> {
        self.entries.values()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_for(&self, label: &Label) -> Option<&PolicyEntry> {
        self.entries.get(label)
    }

    pub fn contains_entry(&self, label: &Label) -> bool {
        self.entries.contains_key(label)
    }

    pub fn subject_for(&self, label: &Label, subject_id: &SubjectId) -> Option<&Subject> {
        self.entry_for(label)?.subjects.get(subject_id)
    }

    pub fn resource_for(&self, label: &Label, key: &ResourceKey) -> Option<&EffectedPermissions> {
        self.entry_for(label)?.resources.get(key)
    }

    /// Permissions the entry effects for the subject on exactly this resource
    ///
    /// `None` when the entry is missing, does not name the subject, or has no
    /// permissions on the resource.
    pub fn effected_permissions_for(
        &self,
        label: &Label,
        subject_id: &SubjectId,
        key: &ResourceKey,
    ) -> Option<EffectedPermissions> {
        let entry = self.entry_for(label)?;
        if !entry.subjects.contains(subject_id) {
            return None;
        }
        entry.resources.get(key).cloned()
    }

    /// Returns a copy with the entry added or replaced
    pub fn set_entry(&self, entry: PolicyEntry) -> Self {
        let mut policy = self.clone();
        policy.entries.insert(entry.label.clone(), entry);
        policy
    }

    /// Returns a copy whose entries are exactly `entries`
    pub fn set_entries<I>(&self, entries: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = PolicyEntry>,
    {
        Ok(Self {
            entries: index_entries(entries)?,
            ..self.clone()
        })
    }

    pub fn remove_entry(&self, label: &Label) -> Self {
        let mut policy = self.clone();
        policy.entries.remove(label);
        policy
    }

    /// Returns a copy with the subject set on the labeled entry
    ///
    /// A missing entry is created with no resources.
    pub fn set_subject_for(&self, label: &Label, subject_id: SubjectId, subject: Subject) -> Self {
        let entry = self.entry_or_empty(label);
        let subjects = entry.subjects.with_subject(subject_id, subject);
        self.set_entry(entry.with_subjects(subjects))
    }

    pub fn set_subjects_for(&self, label: &Label, subjects: Subjects) -> Self {
        self.set_entry(self.entry_or_empty(label).with_subjects(subjects))
    }

    pub fn remove_subject_for(&self, label: &Label, subject_id: &SubjectId) -> Self {
        match self.entry_for(label) {
            Some(entry) => {
                self.set_entry(entry.with_subjects(entry.subjects.without_subject(subject_id)))
            }
            None => self.clone(),
        }
    }

    /// Returns a copy with the resource set on the labeled entry
    ///
    /// A missing entry is created with no subjects.
    pub fn set_resource_for(
        &self,
        label: &Label,
        key: ResourceKey,
        permissions: EffectedPermissions,
    ) -> Self {
        let entry = self.entry_or_empty(label);
        let resources = entry.resources.with_resource(key, permissions);
        self.set_entry(entry.with_resources(resources))
    }

    pub fn set_resources_for(&self, label: &Label, resources: Resources) -> Self {
        self.set_entry(self.entry_or_empty(label).with_resources(resources))
    }

    pub fn remove_resource_for(&self, label: &Label, key: &ResourceKey) -> Self {
        match self.entry_for(label) {
            Some(entry) => {
                self.set_entry(entry.with_resources(entry.resources.without_resource(key)))
            }
            None => self.clone(),
        }
    }

    /// Returns a copy without subjects that are expired at `now`
    pub fn remove_expired_subjects(&self, now: Timestamp) -> Self {
        let mut policy = self.clone();
        for entry in policy.entries.values_mut() {
            entry.subjects = entry.subjects.without_expired(now);
        }
        policy
    }

    pub fn with_lifecycle(&self, lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            ..self.clone()
        }
    }

    pub fn with_revision(&self, revision: Revision) -> Self {
        Self {
            revision,
            ..self.clone()
        }
    }

    pub fn with_created(&self, created: Timestamp) -> Self {
        Self {
            created: Some(created),
            ..self.clone()
        }
    }

    pub fn with_modified(&self, modified: Timestamp) -> Self {
        Self {
            modified: Some(modified),
            ..self.clone()
        }
    }

    /// The policy document as exchanged with hosts
    pub fn to_json(&self) -> Value {
        serde_json::to_value(PolicyDocument::from(self.clone())).unwrap_or(Value::Null)
    }

    /// The `entries` object of the policy document
    pub fn entries_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(label, entry)| (label.to_string(), entry.to_json()))
                .collect(),
        )
    }

    fn entry_or_empty(&self, label: &Label) -> PolicyEntry {
        self.entry_for(label)
            .cloned()
            .unwrap_or_else(|| PolicyEntry::empty(label.clone()))
    }
}

fn index_entries<I>(entries: I) -> Result<BTreeMap<Label, PolicyEntry>, DomainError>
where
    I: IntoIterator<Item = PolicyEntry>,
{
    let mut indexed = BTreeMap::new();
    for entry in entries {
        let label = entry.label.clone();
        if indexed.insert(label.clone(), entry).is_some() {
            return Err(DomainError::DuplicateLabel {
                label: label.to_string(),
            });
        }
    }
    Ok(indexed)
}

/// Wire layout of a policy
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PolicyDocument {
    #[serde(rename = "policyId")]
    policy_id: PolicyId,
    #[serde(rename = "_lifecycle", default = "active")]
    lifecycle: Lifecycle,
    #[serde(rename = "_revision", default)]
    revision: Revision,
    #[serde(rename = "_created", default, skip_serializing_if = "Option::is_none")]
    created: Option<Timestamp>,
    #[serde(rename = "_modified", default, skip_serializing_if = "Option::is_none")]
    modified: Option<Timestamp>,
    #[serde(default)]
    entries: BTreeMap<Label, EntryBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryBody {
    #[serde(default)]
    subjects: Subjects,
    #[serde(default)]
    resources: Resources,
}

fn active() -> Lifecycle {
    Lifecycle::Active
}

impl From<Policy> for PolicyDocument {
    fn from(policy: Policy) -> Self {
        Self {
            policy_id: policy.id,
            lifecycle: policy.lifecycle,
            revision: policy.revision,
            created: policy.created,
            modified: policy.modified,
            entries: policy
                .entries
                .into_iter()
                .map(|(label, entry)| {
                    (
                        label,
                        EntryBody {
                            subjects: entry.subjects,
                            resources: entry.resources,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl TryFrom<PolicyDocument> for Policy {
    type Error = DomainError;

    fn try_from(document: PolicyDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document.policy_id,
            lifecycle: document.lifecycle,
            revision: document.revision,
            created: document.created,
            modified: document.modified,
            entries: document
                .entries
                .into_iter()
                .map(|(label, body)| {
                    let entry = PolicyEntry::new(label.clone(), body.subjects, body.resources);
                    (label, entry)
                })
                .collect(),
        })
    }
}
