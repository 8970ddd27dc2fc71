//! Command strategies of the policy aggregate
//!
//! Every command is validated against the current policy and either turns
//! into exactly one event, a query response, or an error. Modifications are
//! checked against the size limit, the subject expiry rules and the
//! minimum-permission invariant before an event is produced.

use crate::{PolicyCommand, PolicyCommandEnvelope, PolicyConfig};
use core_types::{DomainError, EntityTag, JsonPointer, Lifecycle, PolicyId, Revision, StatusCode};
use event_sourcing::{
    only_active, CommandResponse, CommandStrategy, Context, Event, EventOf, SizeGuard,
    StrategyResult,
};
use identity::{Subject, SubjectId};
use policy::{
    EffectedPermissions, Label, Policy, PolicyEntry, PolicyEvent, ResourceKey, Resources, Subjects,
};
use policy_enforcer::PoliciesValidator;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

type PolicyResult = Result<StrategyResult<EventOf<Policy>>, DomainError>;

/// All policy command strategies, dispatched by command
#[derive(Debug, Clone)]
pub struct PolicyCommandStrategies {
    config: PolicyConfig,
    size_guard: SizeGuard,
}

impl PolicyCommandStrategies {
    pub fn new(config: PolicyConfig) -> Self {
        let size_guard = SizeGuard::policies(config.max_policy_size_bytes);
        Self { config, size_guard }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

impl Default for PolicyCommandStrategies {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

impl CommandStrategy<Policy> for PolicyCommandStrategies {
    type Payload = PolicyCommand;

    fn apply(
        &self,
        context: &Context,
        entity: Option<&Policy>,
        next_revision: Revision,
        command: &PolicyCommandEnvelope,
    ) -> StrategyResult<EventOf<Policy>> {
        let step = Step {
            strategies: self,
            context,
            command,
            next_revision,
        };
        let current = only_active(entity);
        let result = match (&command.payload, current) {
            (PolicyCommand::CreatePolicy { .. }, Some(_)) => Err(DomainError::PolicyConflict {
                policy_id: command.entity_id.clone(),
            }),
            (PolicyCommand::CreatePolicy { policy }, None)
            | (PolicyCommand::ModifyPolicy { policy }, None) => step.create_policy(policy),
            (_, None) => Err(DomainError::PolicyNotAccessible {
                policy_id: command.entity_id.clone(),
            }),
            (payload, Some(current)) => step.on_existing(current, payload),
        };
        result.into()
    }

    fn previous_entity_tag(
        &self,
        command: &PolicyCommandEnvelope,
        previous: Option<&Policy>,
    ) -> Option<EntityTag> {
        entity_tag(&command.payload, previous)
    }

    fn next_entity_tag(
        &self,
        command: &PolicyCommandEnvelope,
        next: Option<&Policy>,
    ) -> Option<EntityTag> {
        entity_tag(&command.payload, next)
    }

    fn is_query(&self, command: &PolicyCommandEnvelope) -> bool {
        command.payload.is_query()
    }

    fn response_type(&self, command: &PolicyCommandEnvelope) -> String {
        command.payload.response_type()
    }
}

/// Tag of the (sub-)entity a command addresses
///
/// The whole policy is tagged by revision, everything below it by content.
fn entity_tag(command: &PolicyCommand, policy: Option<&Policy>) -> Option<EntityTag> {
    let policy = policy?;
    match command {
        PolicyCommand::CreatePolicy { .. }
        | PolicyCommand::ModifyPolicy { .. }
        | PolicyCommand::DeletePolicy
        | PolicyCommand::RetrievePolicy => Some(EntityTag::from_revision(policy.revision())),
        PolicyCommand::ModifyPolicyEntries { .. } | PolicyCommand::RetrievePolicyEntries => {
            Some(EntityTag::from_json(&policy.entries_json()))
        }
        PolicyCommand::ModifySubject { label, subject_id, .. }
        | PolicyCommand::DeleteSubject { label, subject_id }
        | PolicyCommand::RetrieveSubject { label, subject_id } => policy
            .subject_for(label, subject_id)
            .map(|subject| EntityTag::from_json(&to_json(subject))),
        PolicyCommand::ModifySubjects { label, .. } | PolicyCommand::RetrieveSubjects { label } => {
            policy
                .entry_for(label)
                .map(|entry| EntityTag::from_json(&to_json(&entry.subjects)))
        }
        PolicyCommand::ModifyResource { label, resource_key, .. }
        | PolicyCommand::DeleteResource { label, resource_key }
        | PolicyCommand::RetrieveResource { label, resource_key } => policy
            .resource_for(label, resource_key)
            .map(|resource| EntityTag::from_json(&to_json(resource))),
        PolicyCommand::ModifyResources { label, .. }
        | PolicyCommand::RetrieveResources { label } => policy
            .entry_for(label)
            .map(|entry| EntityTag::from_json(&to_json(&entry.resources))),
        PolicyCommand::ModifyPolicyEntry { entry } => policy
            .entry_for(&entry.label)
            .map(|entry| EntityTag::from_json(&entry.to_json())),
        PolicyCommand::DeletePolicyEntry { label } | PolicyCommand::RetrievePolicyEntry { label } => {
            policy
                .entry_for(label)
                .map(|entry| EntityTag::from_json(&entry.to_json()))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn entries_pointer() -> JsonPointer {
    JsonPointer::from_segments(["entries"])
}

fn entry_pointer(label: &Label) -> JsonPointer {
    entries_pointer().append(label.as_str())
}

/// One command being applied
struct Step<'a> {
    strategies: &'a PolicyCommandStrategies,
    context: &'a Context,
    command: &'a PolicyCommandEnvelope,
    next_revision: Revision,
}

impl Step<'_> {
    fn policy_id(&self) -> &PolicyId {
        &self.command.entity_id
    }

    fn event(&self, payload: PolicyEvent) -> EventOf<Policy> {
        Event::for_command(self.command, self.next_revision, self.context.timestamp, payload)
    }

    fn response(&self, status: StatusCode, entity: Option<Value>) -> CommandResponse {
        CommandResponse::new(
            self.policy_id().to_string(),
            self.command.payload.response_type(),
            status,
            entity,
            self.command.headers.for_response(),
        )
    }

    fn no_content(&self) -> CommandResponse {
        self.response(StatusCode::NoContent, None)
    }

    fn mutation(&self, payload: PolicyEvent) -> PolicyResult {
        Ok(StrategyResult::mutation(self.event(payload), self.no_content()))
    }

    fn ensure_size(&self, current: &Policy, pointer: &JsonPointer, value: &Value) -> Result<(), DomainError> {
        self.strategies.size_guard.ensure_valid_size(
            &current.to_json(),
            Some((pointer, value)),
            &self.command.headers,
        )
    }

    fn validate(
        &self,
        policy: &Policy,
        invalid: impl FnOnce(String) -> DomainError,
    ) -> Result<(), DomainError> {
        let validator = PoliciesValidator::new(policy, &self.strategies.config.validator);
        match validator.reason() {
            None => Ok(()),
            Some(reason) => Err(invalid(reason.to_string())),
        }
    }

    fn entry_invalid(&self, label: &Label) -> impl FnOnce(String) -> DomainError {
        let policy_id = self.policy_id().clone();
        let label = label.to_string();
        move |reason| DomainError::PolicyEntryInvalid {
            policy_id,
            label,
            reason,
        }
    }

    fn modification_invalid(&self) -> impl FnOnce(String) -> DomainError {
        let policy_id = self.policy_id().clone();
        move |reason| DomainError::PolicyModificationInvalid { policy_id, reason }
    }

    fn existing_entry<'p>(&self, current: &'p Policy, label: &Label) -> Result<&'p PolicyEntry, DomainError> {
        current
            .entry_for(label)
            .ok_or_else(|| DomainError::PolicyEntryNotAccessible {
                policy_id: self.policy_id().clone(),
                label: label.to_string(),
            })
    }

    /// Rounds the expiry up to the configured granularity and rejects
    /// subjects that would already be expired
    fn adjust_subject(&self, subject_id: &SubjectId, subject: &Subject) -> Result<Subject, DomainError> {
        let Some(expiry) = subject.expiry else {
            return Ok(subject.clone());
        };
        let expiry = expiry.rounded_up(self.strategies.config.subject_expiry_granularity_ms);
        if expiry.is_expired(self.context.timestamp) {
            return Err(DomainError::SubjectExpiryInvalid {
                subject_id: subject_id.to_string(),
                expiry: expiry.timestamp(),
            });
        }
        Ok(subject.clone().with_expiry(expiry))
    }

    fn adjust_subjects(&self, subjects: &Subjects) -> Result<Subjects, DomainError> {
        subjects
            .iter()
            .map(|(id, subject)| Ok((id.clone(), self.adjust_subject(id, subject)?)))
            .collect()
    }

    fn adjust_entry(&self, entry: &PolicyEntry) -> Result<PolicyEntry, DomainError> {
        Ok(entry.with_subjects(self.adjust_subjects(&entry.subjects)?))
    }

    fn adjust_entries<'e>(
        &self,
        entries: impl IntoIterator<Item = &'e PolicyEntry>,
    ) -> Result<Vec<PolicyEntry>, DomainError> {
        entries.into_iter().map(|entry| self.adjust_entry(entry)).collect()
    }

    fn adjust_policy(&self, proposed: &Policy) -> Result<Policy, DomainError> {
        if proposed.id() != self.policy_id() {
            return Err(DomainError::EntityIdMismatch {
                expected: self.policy_id().to_string(),
                actual: proposed.id().to_string(),
            });
        }
        proposed
            .set_entries(self.adjust_entries(proposed.entries())?)
            .map(|policy| policy.with_lifecycle(Lifecycle::Active))
    }

    fn create_policy(&self, proposed: &Policy) -> PolicyResult {
        let policy = self.adjust_policy(proposed)?;
        self.strategies
            .size_guard
            .ensure_valid_size(&policy.to_json(), None, &self.command.headers)?;
        let policy_id = self.policy_id().clone();
        self.validate(&policy, move |reason| DomainError::PolicyInvalid { policy_id, reason })?;

        let entity = policy.with_revision(self.next_revision).to_json();
        Ok(StrategyResult::created(
            self.event(PolicyEvent::PolicyCreated { policy }),
            self.response(StatusCode::Created, Some(entity)),
        ))
    }

    fn on_existing(&self, current: &Policy, payload: &PolicyCommand) -> PolicyResult {
        match payload {
            PolicyCommand::CreatePolicy { .. } => Err(DomainError::PolicyConflict {
                policy_id: self.policy_id().clone(),
            }),
            PolicyCommand::ModifyPolicy { policy } => self.modify_policy(policy),
            PolicyCommand::DeletePolicy => self.delete_policy(),
            PolicyCommand::RetrievePolicy => self.query(current.to_json()),
            PolicyCommand::ModifyPolicyEntries { entries } => self.modify_entries(current, entries),
            PolicyCommand::RetrievePolicyEntries => self.query(current.entries_json()),
            PolicyCommand::ModifyPolicyEntry { entry } => self.modify_entry(current, entry),
            PolicyCommand::DeletePolicyEntry { label } => self.delete_entry(current, label),
            PolicyCommand::RetrievePolicyEntry { label } => {
                self.query(self.existing_entry(current, label)?.to_json())
            }
            PolicyCommand::ModifySubjects { label, subjects } => {
                self.modify_subjects(current, label, subjects)
            }
            PolicyCommand::ModifySubject {
                label,
                subject_id,
                subject,
            } => self.modify_subject(current, label, subject_id, subject),
            PolicyCommand::DeleteSubject { label, subject_id } => {
                self.delete_subject(current, label, subject_id)
            }
            PolicyCommand::RetrieveSubjects { label } => {
                self.query(to_json(&self.existing_entry(current, label)?.subjects))
            }
            PolicyCommand::RetrieveSubject { label, subject_id } => {
                let subjects = &self.existing_entry(current, label)?.subjects;
                let subject = subjects
                    .get(subject_id)
                    .ok_or_else(|| self.subject_not_accessible(label, subject_id))?;
                self.query(to_json(subject))
            }
            PolicyCommand::ModifyResources { label, resources } => {
                self.modify_resources(current, label, resources)
            }
            PolicyCommand::ModifyResource {
                label,
                resource_key,
                resource,
            } => self.modify_resource(current, label, resource_key, resource),
            PolicyCommand::DeleteResource {
                label,
                resource_key,
            } => self.delete_resource(current, label, resource_key),
            PolicyCommand::RetrieveResources { label } => {
                self.query(to_json(&self.existing_entry(current, label)?.resources))
            }
            PolicyCommand::RetrieveResource {
                label,
                resource_key,
            } => {
                let resources = &self.existing_entry(current, label)?.resources;
                let resource = resources
                    .get(resource_key)
                    .ok_or_else(|| self.resource_not_accessible(label, resource_key))?;
                self.query(to_json(resource))
            }
        }
    }

    fn query(&self, entity: Value) -> PolicyResult {
        Ok(StrategyResult::query(self.response(StatusCode::Ok, Some(entity))))
    }

    fn subject_not_accessible(&self, label: &Label, subject_id: &SubjectId) -> DomainError {
        DomainError::SubjectNotAccessible {
            policy_id: self.policy_id().clone(),
            label: label.to_string(),
            subject_id: subject_id.to_string(),
        }
    }

    fn resource_not_accessible(&self, label: &Label, resource_key: &ResourceKey) -> DomainError {
        DomainError::ResourceNotAccessible {
            policy_id: self.policy_id().clone(),
            label: label.to_string(),
            resource_key: resource_key.to_string(),
        }
    }

    fn modify_policy(&self, proposed: &Policy) -> PolicyResult {
        let policy = self.adjust_policy(proposed)?;
        self.strategies
            .size_guard
            .ensure_valid_size(&policy.to_json(), None, &self.command.headers)?;
        self.validate(&policy, self.modification_invalid())?;
        self.mutation(PolicyEvent::PolicyModified { policy })
    }

    fn delete_policy(&self) -> PolicyResult {
        info!(policy_id = %self.policy_id(), "Deleted Policy with ID");
        Ok(StrategyResult::deleted(
            self.event(PolicyEvent::PolicyDeleted {}),
            self.no_content(),
        ))
    }

    fn modify_entries(&self, current: &Policy, entries: &[PolicyEntry]) -> PolicyResult {
        let entries = self.adjust_entries(entries)?;
        let next = current.set_entries(entries.iter().cloned())?;
        self.ensure_size(current, &entries_pointer(), &next.entries_json())?;
        self.validate(&next, self.modification_invalid())?;
        self.mutation(PolicyEvent::PolicyEntriesModified { entries })
    }

    fn modify_entry(&self, current: &Policy, entry: &PolicyEntry) -> PolicyResult {
        let entry = self.adjust_entry(entry)?;
        let label = entry.label.clone();
        self.ensure_size(current, &entry_pointer(&label), &entry.to_json())?;
        self.validate(&current.set_entry(entry.clone()), self.entry_invalid(&label))?;

        if current.contains_entry(&label) {
            return self.mutation(PolicyEvent::PolicyEntryModified { entry });
        }
        let body = entry.to_json();
        Ok(StrategyResult::mutation(
            self.event(PolicyEvent::PolicyEntryCreated { entry }),
            self.response(StatusCode::Created, Some(body)),
        ))
    }

    fn delete_entry(&self, current: &Policy, label: &Label) -> PolicyResult {
        self.existing_entry(current, label)?;
        self.validate(&current.remove_entry(label), self.modification_invalid())?;
        self.mutation(PolicyEvent::PolicyEntryDeleted {
            label: label.clone(),
        })
    }

    fn modify_subjects(&self, current: &Policy, label: &Label, subjects: &Subjects) -> PolicyResult {
        self.existing_entry(current, label)?;
        let subjects = self.adjust_subjects(subjects)?;
        let pointer = entry_pointer(label).append("subjects");
        self.ensure_size(current, &pointer, &to_json(&subjects))?;
        self.validate(
            &current.set_subjects_for(label, subjects.clone()),
            self.entry_invalid(label),
        )?;
        self.mutation(PolicyEvent::SubjectsModified {
            label: label.clone(),
            subjects,
        })
    }

    fn modify_subject(
        &self,
        current: &Policy,
        label: &Label,
        subject_id: &SubjectId,
        subject: &Subject,
    ) -> PolicyResult {
        let entry = self.existing_entry(current, label)?;
        let pointer = entry_pointer(label)
            .append("subjects")
            .append(subject_id.as_str());
        self.ensure_size(current, &pointer, &to_json(subject))?;
        let subject = self.adjust_subject(subject_id, subject)?;
        self.validate(
            &current.set_subject_for(label, subject_id.clone(), subject.clone()),
            self.entry_invalid(label),
        )?;

        let label = label.clone();
        let subject_id = subject_id.clone();
        if entry.subjects.contains(&subject_id) {
            return self.mutation(PolicyEvent::SubjectModified {
                label,
                subject_id,
                subject,
            });
        }
        let body = to_json(&subject);
        Ok(StrategyResult::mutation(
            self.event(PolicyEvent::SubjectCreated {
                label,
                subject_id,
                subject,
            }),
            self.response(StatusCode::Created, Some(body)),
        ))
    }

    fn delete_subject(&self, current: &Policy, label: &Label, subject_id: &SubjectId) -> PolicyResult {
        let entry = self.existing_entry(current, label)?;
        if !entry.subjects.contains(subject_id) {
            return Err(self.subject_not_accessible(label, subject_id));
        }
        self.validate(
            &current.remove_subject_for(label, subject_id),
            self.entry_invalid(label),
        )?;
        self.mutation(PolicyEvent::SubjectDeleted {
            label: label.clone(),
            subject_id: subject_id.clone(),
        })
    }

    fn modify_resources(
        &self,
        current: &Policy,
        label: &Label,
        resources: &Resources,
    ) -> PolicyResult {
        self.existing_entry(current, label)?;
        let pointer = entry_pointer(label).append("resources");
        self.ensure_size(current, &pointer, &to_json(resources))?;
        self.validate(
            &current.set_resources_for(label, resources.clone()),
            self.entry_invalid(label),
        )?;
        self.mutation(PolicyEvent::ResourcesModified {
            label: label.clone(),
            resources: resources.clone(),
        })
    }

    fn modify_resource(
        &self,
        current: &Policy,
        label: &Label,
        resource_key: &ResourceKey,
        resource: &EffectedPermissions,
    ) -> PolicyResult {
        let entry = self.existing_entry(current, label)?;
        let pointer = entry_pointer(label)
            .append("resources")
            .append(resource_key.to_string());
        self.ensure_size(current, &pointer, &to_json(resource))?;
        self.validate(
            &current.set_resource_for(label, resource_key.clone(), resource.clone()),
            self.entry_invalid(label),
        )?;

        let label = label.clone();
        let resource_key = resource_key.clone();
        let resource = resource.clone();
        if entry.resources.contains(&resource_key) {
            return self.mutation(PolicyEvent::ResourceModified {
                label,
                resource_key,
                resource,
            });
        }
        let body = to_json(&resource);
        Ok(StrategyResult::mutation(
            self.event(PolicyEvent::ResourceCreated {
                label,
                resource_key,
                resource,
            }),
            self.response(StatusCode::Created, Some(body)),
        ))
    }

    fn delete_resource(
        &self,
        current: &Policy,
        label: &Label,
        resource_key: &ResourceKey,
    ) -> PolicyResult {
        let entry = self.existing_entry(current, label)?;
        if !entry.resources.contains(resource_key) {
            return Err(self.resource_not_accessible(label, resource_key));
        }
        self.validate(
            &current.remove_resource_for(label, resource_key),
            self.entry_invalid(label),
        )?;
        self.mutation(PolicyEvent::ResourceDeleted {
            label: label.clone(),
            resource_key: resource_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyEventStrategies;
    use core_types::{EntityTagMatchers, Headers, Timestamp};
    use event_sourcing::{execute, Command, EventStrategy};
    use identity::SubjectExpiry;
    use policy::Permissions;

    const NOW: u64 = 1_000;

    fn policy_id() -> PolicyId {
        PolicyId::parse("org.example:p").unwrap()
    }

    fn label(raw: &str) -> Label {
        Label::parse(raw).unwrap()
    }

    fn subject_id(raw: &str) -> SubjectId {
        SubjectId::parse(raw).unwrap()
    }

    fn owner_policy() -> Policy {
        Policy::new(policy_id())
            .set_subject_for(&label("owner"), subject_id("s:owner"), Subject::default())
            .set_resource_for(
                &label("owner"),
                ResourceKey::parse("policy:/").unwrap(),
                EffectedPermissions::granting(Permissions::read_write()),
            )
            .set_resource_for(
                &label("owner"),
                ResourceKey::parse("thing:/").unwrap(),
                EffectedPermissions::granting(Permissions::read_write()),
            )
    }

    /// The owner policy as persisted at revision 1
    fn existing() -> Policy {
        owner_policy().with_revision(Revision::new(1))
    }

    fn context() -> Context {
        Context::at(Timestamp::from_millis(NOW))
    }

    fn apply(entity: Option<&Policy>, payload: PolicyCommand) -> StrategyResult<EventOf<Policy>> {
        let strategies = PolicyCommandStrategies::default();
        let next = event_sourcing::next_revision(entity);
        strategies.apply(&context(), entity, next, &Command::new(policy_id(), payload))
    }

    fn error_of(result: StrategyResult<EventOf<Policy>>) -> DomainError {
        result.error_ref().cloned().unwrap()
    }

    #[test]
    fn test_create_policy() {
        let result = apply(None, PolicyCommand::CreatePolicy { policy: owner_policy() });
        let StrategyResult::Mutation {
            event,
            response,
            entity_created,
            ..
        } = result
        else {
            panic!("expected a mutation");
        };
        assert!(entity_created);
        assert_eq!(event.revision, Revision::new(1));
        assert_eq!(event.timestamp, Timestamp::from_millis(NOW));
        assert_eq!(response.status, StatusCode::Created);
        assert_eq!(response.entity.unwrap()["_revision"], 1);
    }

    #[test]
    fn test_create_existing_policy_conflicts() {
        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::CreatePolicy { policy: owner_policy() },
        ));
        assert!(matches!(err, DomainError::PolicyConflict { .. }));
        assert_eq!(err.status(), StatusCode::Conflict);
    }

    #[test]
    fn test_modify_policy_creates_missing_policy() {
        let result = apply(None, PolicyCommand::ModifyPolicy { policy: owner_policy() });
        assert!(matches!(
            result.event().map(|e| &e.payload),
            Some(PolicyEvent::PolicyCreated { .. })
        ));
    }

    #[test]
    fn test_policy_without_permanent_admin_is_invalid() {
        let orphan = Policy::new(policy_id()).set_subject_for(
            &label("owner"),
            subject_id("s:owner"),
            Subject::default(),
        );
        let err = error_of(apply(None, PolicyCommand::CreatePolicy { policy: orphan }));
        assert!(matches!(err, DomainError::PolicyInvalid { .. }));
        assert!(err.to_string().contains("permanent Subject"));
    }

    #[test]
    fn test_create_policy_with_other_id_is_rejected() {
        let other = Policy::new(PolicyId::parse("org.example:other").unwrap());
        let err = error_of(apply(None, PolicyCommand::CreatePolicy { policy: other }));
        assert!(matches!(err, DomainError::EntityIdMismatch { .. }));
    }

    #[test]
    fn test_commands_on_deleted_policy_are_not_accessible() {
        let deleted = existing().with_lifecycle(Lifecycle::Deleted);
        let err = error_of(apply(Some(&deleted), PolicyCommand::RetrievePolicy));
        assert!(matches!(err, DomainError::PolicyNotAccessible { .. }));

        // but the policy can be created again
        let recreated = apply(Some(&deleted), PolicyCommand::CreatePolicy { policy: owner_policy() });
        assert_eq!(recreated.event().unwrap().revision, Revision::new(2));
    }

    #[test]
    fn test_modify_subject_created_then_modified() {
        let command = PolicyCommand::ModifySubject {
            label: label("owner"),
            subject_id: subject_id("s:alice"),
            subject: Subject::default(),
        };
        let created = apply(Some(&existing()), command.clone());
        assert_eq!(created.response().unwrap().status, StatusCode::Created);
        assert!(matches!(
            created.event().map(|e| &e.payload),
            Some(PolicyEvent::SubjectCreated { .. })
        ));

        let next = PolicyEventStrategies
            .handle(created.event().unwrap(), Some(existing()))
            .unwrap();
        let modified = apply(next.as_ref(), command);
        assert_eq!(modified.response().unwrap().status, StatusCode::NoContent);
        assert!(matches!(
            modified.event().map(|e| &e.payload),
            Some(PolicyEvent::SubjectModified { .. })
        ));
    }

    #[test]
    fn test_modify_subject_of_missing_entry() {
        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::ModifySubject {
                label: label("missing"),
                subject_id: subject_id("s:alice"),
                subject: Subject::default(),
            },
        ));
        assert!(matches!(err, DomainError::PolicyEntryNotAccessible { .. }));
    }

    #[test]
    fn test_expired_subject_is_rejected() {
        let expired = Subject::default().with_expiry(SubjectExpiry::new(Timestamp::from_millis(NOW)));
        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::ModifySubject {
                label: label("owner"),
                subject_id: subject_id("s:alice"),
                subject: expired,
            },
        ));
        assert!(matches!(err, DomainError::SubjectExpiryInvalid { .. }));
        assert_eq!(err.status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_subject_expiry_is_rounded_up() {
        let strategies = PolicyCommandStrategies::new(PolicyConfig {
            subject_expiry_granularity_ms: 60_000,
            ..PolicyConfig::default()
        });
        let subject = Subject::default().with_expiry(SubjectExpiry::new(Timestamp::from_millis(61_000)));
        let command = Command::new(
            policy_id(),
            PolicyCommand::ModifySubject {
                label: label("owner"),
                subject_id: subject_id("s:alice"),
                subject,
            },
        );
        let result = strategies.apply(&context(), Some(&existing()), Revision::new(2), &command);
        let Some(PolicyEvent::SubjectCreated { subject, .. }) = result.event().map(|e| &e.payload) else {
            panic!("expected a created subject");
        };
        assert_eq!(
            subject.expiry,
            Some(SubjectExpiry::new(Timestamp::from_millis(120_000)))
        );
    }

    #[test]
    fn test_deleting_last_admin_is_invalid() {
        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::DeleteSubject {
                label: label("owner"),
                subject_id: subject_id("s:owner"),
            },
        ));
        assert!(matches!(err, DomainError::PolicyEntryInvalid { .. }));

        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::DeletePolicyEntry { label: label("owner") },
        ));
        assert!(matches!(err, DomainError::PolicyModificationInvalid { .. }));
        assert_eq!(err.status(), StatusCode::Forbidden);
    }

    #[test]
    fn test_missing_sub_entities_are_not_accessible() {
        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::DeleteResource {
                label: label("owner"),
                resource_key: ResourceKey::parse("thing:/attributes").unwrap(),
            },
        ));
        assert!(matches!(err, DomainError::ResourceNotAccessible { .. }));

        let err = error_of(apply(
            Some(&existing()),
            PolicyCommand::RetrieveSubject {
                label: label("owner"),
                subject_id: subject_id("s:nobody"),
            },
        ));
        assert!(matches!(err, DomainError::SubjectNotAccessible { .. }));
    }

    #[test]
    fn test_policy_too_large() {
        let strategies = PolicyCommandStrategies::new(PolicyConfig {
            max_policy_size_bytes: 256,
            ..PolicyConfig::default()
        });
        let command = Command::new(
            policy_id(),
            PolicyCommand::ModifySubject {
                label: label("owner"),
                subject_id: subject_id(&format!("s:{}", "x".repeat(200))),
                subject: Subject::default(),
            },
        );
        let result = strategies.apply(&context(), Some(&existing()), Revision::new(2), &command);
        let err = result.error_ref().unwrap();
        assert!(matches!(err, DomainError::PolicyTooLarge { max: 256, .. }));
        assert_eq!(err.status(), StatusCode::PayloadTooLarge);
    }

    #[test]
    fn test_retrieve_resources() {
        let result = apply(
            Some(&existing()),
            PolicyCommand::RetrieveResources { label: label("owner") },
        );
        let entity = result.response().unwrap().entity.clone().unwrap();
        assert_eq!(entity["policy:/"]["grant"], serde_json::json!(["READ", "WRITE"]));
    }

    #[test]
    fn test_strategies_are_deterministic() {
        let command = PolicyCommand::ModifyResource {
            label: label("owner"),
            resource_key: ResourceKey::parse("message:/").unwrap(),
            resource: EffectedPermissions::granting(Permissions::write()),
        };
        assert_eq!(
            apply(Some(&existing()), command.clone()),
            apply(Some(&existing()), command)
        );
    }

    #[test]
    fn test_delete_policy_tags() {
        let outcome = execute(
            &PolicyCommandStrategies::default(),
            &PolicyEventStrategies,
            &context(),
            Some(&existing()),
            Command::new(policy_id(), PolicyCommand::DeletePolicy).with_headers(
                Headers::new().with_if_match(EntityTagMatchers::tag(EntityTag::strong("rev:1"))),
            ),
        );
        assert!(matches!(
            outcome.result,
            StrategyResult::Mutation {
                entity_deleted: true,
                ..
            }
        ));
        assert_eq!(outcome.result.response().unwrap().headers.etag, None);
    }

    #[test]
    fn test_subject_tag_is_content_based() {
        let retrieve = Command::new(
            policy_id(),
            PolicyCommand::RetrieveSubject {
                label: label("owner"),
                subject_id: subject_id("s:owner"),
            },
        );
        let outcome = execute(
            &PolicyCommandStrategies::default(),
            &PolicyEventStrategies,
            &context(),
            Some(&existing()),
            retrieve.clone(),
        );
        let etag = outcome.result.response().unwrap().headers.etag.clone().unwrap();
        assert!(etag.opaque().starts_with("hash:"));

        let conditional = retrieve.with_headers(
            Headers::new().with_if_none_match(EntityTagMatchers::tag(etag)),
        );
        let outcome = execute(
            &PolicyCommandStrategies::default(),
            &PolicyEventStrategies,
            &context(),
            Some(&existing().with_revision(Revision::new(7))),
            conditional,
        );
        assert_eq!(
            outcome.result.response().unwrap().status,
            StatusCode::NotModified
        );
    }
}
