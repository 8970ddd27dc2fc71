//! Authorization of policy commands
//!
//! A policy protects itself: every command is checked against the
//! `policy:` resources of the very policy it addresses.

use crate::{PolicyCommand, PolicyCommandEnvelope};
use core_types::{DomainError, JsonPointer, Timestamp};
use event_sourcing::CommandResponse;
use identity::AuthorizationContext;
use policy::{Label, Permissions, Policy, ResourceKey};
use policy_enforcer::{EnforcerCache, PolicyEnforcer};
use std::sync::Arc;
use tracing::debug;

/// Checks policy commands against the addressed policy
#[derive(Debug, Clone, Copy)]
pub struct PolicyCommandEnforcement<'a> {
    cache: &'a EnforcerCache,
}

impl<'a> PolicyCommandEnforcement<'a> {
    pub fn new(cache: &'a EnforcerCache) -> Self {
        Self { cache }
    }

    /// Authorizes `command` for `context`
    ///
    /// Modifications need unrestricted `WRITE` on the addressed resource,
    /// queries need `READ` on it or anywhere below. A policy that does not
    /// exist yet can only be created, and only by a context the new policy
    /// grants unrestricted `WRITE` on `policy:/`. Subjects expired at `now`
    /// hold no permissions.
    pub fn authorize(
        &self,
        command: &PolicyCommandEnvelope,
        policy: Option<&Policy>,
        context: &AuthorizationContext,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let payload = &command.payload;
        let enforcer = match policy.and_then(|policy| self.cache.get_or_build(policy, now)) {
            Some(enforcer) => enforcer,
            None => match payload {
                PolicyCommand::CreatePolicy { policy: proposed }
                | PolicyCommand::ModifyPolicy { policy: proposed } => {
                    Arc::new(PolicyEnforcer::at(proposed, now))
                }
                _ => {
                    return Err(DomainError::PolicyNotAccessible {
                        policy_id: command.entity_id.clone(),
                    })
                }
            },
        };

        let key = resource_key(payload);
        let granted = if payload.is_query() {
            enforcer.has_permission_on_resource_or_any_subresource(context, &key, &Permissions::read())
        } else {
            enforcer.has_unrestricted_permission(context, &key, &Permissions::write())
        };
        if granted {
            return Ok(());
        }

        debug!(
            policy_id = %command.entity_id,
            command = payload.name(),
            resource = %key,
            "Policy command denied"
        );
        Err(denial(command))
    }

    /// Reduces a query response to the parts the context may read
    pub fn filter_response(
        &self,
        command: &PolicyCommandEnvelope,
        response: CommandResponse,
        policy: &Policy,
        context: &AuthorizationContext,
        now: Timestamp,
    ) -> CommandResponse {
        let Some(entity) = &response.entity else {
            return response;
        };
        let Some(enforcer) = self.cache.get_or_build(policy, now) else {
            return response.with_entity(None);
        };
        let view = enforcer.build_json_view_at(
            &resource_key(&command.payload),
            entity,
            context,
            &Permissions::read(),
        );
        response.with_entity(view)
    }
}

/// The `policy:` resource a command addresses
pub fn resource_key(command: &PolicyCommand) -> ResourceKey {
    let entries = JsonPointer::from_segments(["entries"]);
    let entry = |label: &Label| entries.append(label.as_str());
    let path = match command {
        PolicyCommand::CreatePolicy { .. }
        | PolicyCommand::ModifyPolicy { .. }
        | PolicyCommand::DeletePolicy
        | PolicyCommand::RetrievePolicy => JsonPointer::root(),
        PolicyCommand::ModifyPolicyEntries { .. } | PolicyCommand::RetrievePolicyEntries => {
            entries.clone()
        }
        PolicyCommand::ModifyPolicyEntry { entry: policy_entry } => entry(&policy_entry.label),
        PolicyCommand::DeletePolicyEntry { label } | PolicyCommand::RetrievePolicyEntry { label } => {
            entry(label)
        }
        PolicyCommand::ModifySubjects { label, .. } | PolicyCommand::RetrieveSubjects { label } => {
            entry(label).append("subjects")
        }
        PolicyCommand::ModifySubject { label, subject_id, .. }
        | PolicyCommand::DeleteSubject { label, subject_id }
        | PolicyCommand::RetrieveSubject { label, subject_id } => entry(label)
            .append("subjects")
            .append(subject_id.as_str()),
        PolicyCommand::ModifyResources { label, .. }
        | PolicyCommand::RetrieveResources { label } => entry(label).append("resources"),
        PolicyCommand::ModifyResource {
            label,
            resource_key,
            ..
        }
        | PolicyCommand::DeleteResource {
            label,
            resource_key,
        }
        | PolicyCommand::RetrieveResource {
            label,
            resource_key,
        } => entry(label)
            .append("resources")
            .append(format!("{}:", resource_key.resource_type()))
            .join(resource_key.path()),
    };
    ResourceKey::policy(path)
}

fn denial(command: &PolicyCommandEnvelope) -> DomainError {
    let policy_id = command.entity_id.clone();
    match &command.payload {
        PolicyCommand::CreatePolicy { .. }
        | PolicyCommand::ModifyPolicy { .. }
        | PolicyCommand::DeletePolicy
        | PolicyCommand::ModifyPolicyEntries { .. } => DomainError::PolicyNotModifiable { policy_id },
        PolicyCommand::RetrievePolicy | PolicyCommand::RetrievePolicyEntries => {
            DomainError::PolicyNotAccessible { policy_id }
        }
        PolicyCommand::ModifyPolicyEntry { entry } => DomainError::PolicyEntryNotModifiable {
            policy_id,
            label: entry.label.to_string(),
        },
        PolicyCommand::DeletePolicyEntry { label } => DomainError::PolicyEntryNotModifiable {
            policy_id,
            label: label.to_string(),
        },
        PolicyCommand::RetrievePolicyEntry { label }
        | PolicyCommand::RetrieveSubjects { label }
        | PolicyCommand::RetrieveResources { label } => DomainError::PolicyEntryNotAccessible {
            policy_id,
            label: label.to_string(),
        },
        PolicyCommand::ModifySubjects { label, .. } => DomainError::SubjectsNotModifiable {
            policy_id,
            label: label.to_string(),
        },
        PolicyCommand::ModifySubject {
            label, subject_id, ..
        }
        | PolicyCommand::DeleteSubject { label, subject_id } => DomainError::SubjectNotModifiable {
            policy_id,
            label: label.to_string(),
            subject_id: subject_id.to_string(),
        },
        PolicyCommand::RetrieveSubject { label, subject_id } => DomainError::SubjectNotAccessible {
            policy_id,
            label: label.to_string(),
            subject_id: subject_id.to_string(),
        },
        PolicyCommand::ModifyResources { label, .. } => DomainError::ResourcesNotModifiable {
            policy_id,
            label: label.to_string(),
        },
        PolicyCommand::ModifyResource {
            label,
            resource_key,
            ..
        }
        | PolicyCommand::DeleteResource {
            label,
            resource_key,
        } => DomainError::ResourceNotModifiable {
            policy_id,
            label: label.to_string(),
            resource_key: resource_key.to_string(),
        },
        PolicyCommand::RetrieveResource {
            label,
            resource_key,
        } => DomainError::ResourceNotAccessible {
            policy_id,
            label: label.to_string(),
            resource_key: resource_key.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{PolicyId, StatusCode};
    use identity::SubjectExpiry;
    use event_sourcing::Command;
    use identity::{Subject, SubjectId};
    use policy::EffectedPermissions;
    use serde_json::json;

    const NOW: Timestamp = Timestamp::from_millis(1_000);

    fn policy_id() -> PolicyId {
        PolicyId::parse("org.example:p").unwrap()
    }

    fn label(raw: &str) -> Label {
        Label::parse(raw).unwrap()
    }

    fn key(raw: &str) -> ResourceKey {
        ResourceKey::parse(raw).unwrap()
    }

    /// `owner` may do anything; `support` may only manage subjects of `support`
    fn policy() -> Policy {
        Policy::new(policy_id())
            .set_subject_for(&label("owner"), SubjectId::parse("s:owner").unwrap(), Subject::default())
            .set_resource_for(
                &label("owner"),
                key("policy:/"),
                EffectedPermissions::granting(Permissions::read_write()),
            )
            .set_subject_for(&label("support"), SubjectId::parse("s:support").unwrap(), Subject::default())
            .set_resource_for(
                &label("support"),
                key("policy:/entries/support/subjects"),
                EffectedPermissions::granting(Permissions::read_write()),
            )
    }

    fn context(subject: &str) -> AuthorizationContext {
        AuthorizationContext::parse([subject]).unwrap()
    }

    fn modify_subject(entry: &str) -> PolicyCommandEnvelope {
        Command::new(
            policy_id(),
            PolicyCommand::ModifySubject {
                label: label(entry),
                subject_id: SubjectId::parse("s:alice").unwrap(),
                subject: Subject::default(),
            },
        )
    }

    #[test]
    fn test_resource_keys() {
        let command = PolicyCommand::DeleteResource {
            label: label("owner"),
            resource_key: key("thing:/attributes"),
        };
        assert_eq!(
            resource_key(&command).to_string(),
            "policy:/entries/owner/resources/thing:/attributes"
        );
        assert_eq!(resource_key(&PolicyCommand::RetrievePolicy).to_string(), "policy:/");
    }

    #[test]
    fn test_support_may_only_modify_own_subjects() {
        let cache = EnforcerCache::default();
        let enforcement = PolicyCommandEnforcement::new(&cache);
        let policy = policy();

        assert!(enforcement
            .authorize(&modify_subject("support"), Some(&policy), &context("s:support"), NOW)
            .is_ok());
        assert!(matches!(
            enforcement.authorize(&modify_subject("owner"), Some(&policy), &context("s:support"), NOW),
            Err(DomainError::SubjectNotModifiable { .. })
        ));
        assert!(enforcement
            .authorize(&modify_subject("owner"), Some(&policy), &context("s:owner"), NOW)
            .is_ok());
    }

    #[test]
    fn test_queries_need_partial_read() {
        let cache = EnforcerCache::default();
        let enforcement = PolicyCommandEnforcement::new(&cache);
        let retrieve = Command::new(policy_id(), PolicyCommand::RetrievePolicy);

        assert!(enforcement
            .authorize(&retrieve, Some(&policy()), &context("s:support"), NOW)
            .is_ok());
        let denied = enforcement
            .authorize(&retrieve, Some(&policy()), &context("s:stranger"), NOW)
            .unwrap_err();
        assert_eq!(denied.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_filter_response_hides_unreadable_entries() {
        let cache = EnforcerCache::default();
        let enforcement = PolicyCommandEnforcement::new(&cache);
        let policy = policy();
        let retrieve = Command::new(policy_id(), PolicyCommand::RetrievePolicyEntries);
        let response = CommandResponse::new(
            policy_id().to_string(),
            "policies.responses:retrievePolicyEntries",
            StatusCode::Ok,
            Some(policy.entries_json()),
            Default::default(),
        );
        let filtered = enforcement.filter_response(&retrieve, response, &policy, &context("s:support"), NOW);
        assert_eq!(
            filtered.entity,
            Some(json!({"support": {"subjects": {"s:support": {"type": "generated"}}}}))
        );
    }

    #[test]
    fn test_creation_is_authorized_by_the_new_policy() {
        let cache = EnforcerCache::default();
        let enforcement = PolicyCommandEnforcement::new(&cache);
        let create = Command::new(policy_id(), PolicyCommand::CreatePolicy { policy: policy() });

        assert!(enforcement.authorize(&create, None, &context("s:owner"), NOW).is_ok());
        assert!(matches!(
            enforcement.authorize(&create, None, &context("s:support"), NOW),
            Err(DomainError::PolicyNotModifiable { .. })
        ));

        let delete = Command::new(policy_id(), PolicyCommand::DeletePolicy);
        assert!(matches!(
            enforcement.authorize(&delete, None, &context("s:owner"), NOW),
            Err(DomainError::PolicyNotAccessible { .. })
        ));
    }

    #[test]
    fn test_expired_subject_is_denied() {
        let cache = EnforcerCache::default();
        let enforcement = PolicyCommandEnforcement::new(&cache);
        let policy = policy().set_subject_for(
            &label("support"),
            SubjectId::parse("s:support").unwrap(),
            Subject::default().with_expiry(SubjectExpiry::new(Timestamp::from_millis(2_000))),
        );
        let command = modify_subject("support");

        assert!(enforcement
            .authorize(&command, Some(&policy), &context("s:support"), NOW)
            .is_ok());
        assert!(matches!(
            enforcement.authorize(
                &command,
                Some(&policy),
                &context("s:support"),
                Timestamp::from_millis(2_000)
            ),
            Err(DomainError::SubjectNotModifiable { .. })
        ));
    }

    #[test]
    fn test_subject_ids_with_slash_are_escaped_in_resource_keys() {
        let cache = EnforcerCache::default();
        let enforcement = PolicyCommandEnforcement::new(&cache);
        let federated = SubjectId::parse("google:user/1").unwrap();
        let command = Command::new(
            policy_id(),
            PolicyCommand::DeleteSubject {
                label: label("support"),
                subject_id: federated,
            },
        );
        assert_eq!(
            resource_key(&command.payload).to_string(),
            "policy:/entries/support/subjects/google:user~11"
        );

        let policy = policy()
            .set_subject_for(&label("delegate"), SubjectId::parse("s:delegate").unwrap(), Subject::default())
            .set_resource_for(
                &label("delegate"),
                key("policy:/entries/support/subjects/google:user~11"),
                EffectedPermissions::granting(Permissions::write()),
            );
        assert!(enforcement
            .authorize(&command, Some(&policy), &context("s:delegate"), NOW)
            .is_ok());

        let other = Command::new(
            policy_id(),
            PolicyCommand::DeleteSubject {
                label: label("support"),
                subject_id: SubjectId::parse("google:user").unwrap(),
            },
        );
        assert!(enforcement
            .authorize(&other, Some(&policy), &context("s:delegate"), NOW)
            .is_err());
    }
}
