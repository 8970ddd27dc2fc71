//! Applying policy events

use core_types::{DomainError, Lifecycle};
use event_sourcing::{EventOf, EventPayload, EventStrategy};
use policy::{Policy, PolicyEvent};

/// Applies persisted policy events to the policy they belong to
///
/// Subject and resource events addressing a missing entry create it, so
/// replaying a journal never depends on the order entries were created in.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEventStrategies;

impl EventStrategy<Policy> for PolicyEventStrategies {
    fn create(&self, event: &EventOf<Policy>) -> Result<Policy, DomainError> {
        match &event.payload {
            PolicyEvent::PolicyCreated { policy } => Ok(policy.with_lifecycle(Lifecycle::Active)),
            other => Err(DomainError::EventNotApplicable {
                event_type: other.event_type(),
                entity_id: event.entity_id.to_string(),
                reason: "not a creation event".to_string(),
            }),
        }
    }

    fn modify(&self, event: &EventOf<Policy>, policy: &Policy) -> Result<Policy, DomainError> {
        let next = match &event.payload {
            PolicyEvent::PolicyCreated { .. } => {
                return Err(DomainError::EventNotApplicable {
                    event_type: event.payload.event_type(),
                    entity_id: event.entity_id.to_string(),
                    reason: "the policy already exists".to_string(),
                })
            }
            PolicyEvent::PolicyModified { policy: replacement } => {
                let replacement = replacement.with_lifecycle(Lifecycle::Active);
                match policy.created() {
                    Some(created) => replacement.with_created(created),
                    None => replacement,
                }
            }
            PolicyEvent::PolicyDeleted {} => policy.with_lifecycle(Lifecycle::Deleted),
            PolicyEvent::PolicyEntriesModified { entries } => {
                policy.set_entries(entries.iter().cloned())?
            }
            PolicyEvent::PolicyEntryCreated { entry } | PolicyEvent::PolicyEntryModified { entry } => {
                policy.set_entry(entry.clone())
            }
            PolicyEvent::PolicyEntryDeleted { label } => policy.remove_entry(label),
            PolicyEvent::SubjectsModified { label, subjects } => {
                policy.set_subjects_for(label, subjects.clone())
            }
            PolicyEvent::SubjectCreated {
                label,
                subject_id,
                subject,
            }
            | PolicyEvent::SubjectModified {
                label,
                subject_id,
                subject,
            } => policy.set_subject_for(label, subject_id.clone(), subject.clone()),
            PolicyEvent::SubjectDeleted { label, subject_id } => {
                policy.remove_subject_for(label, subject_id)
            }
            PolicyEvent::ResourcesModified { label, resources } => {
                policy.set_resources_for(label, resources.clone())
            }
            PolicyEvent::ResourceCreated {
                label,
                resource_key,
                resource,
            }
            | PolicyEvent::ResourceModified {
                label,
                resource_key,
                resource,
            } => policy.set_resource_for(label, resource_key.clone(), resource.clone()),
            PolicyEvent::ResourceDeleted {
                label,
                resource_key,
            } => policy.remove_resource_for(label, resource_key),
        };
        Ok(next)
    }
}
