//! Authorization of thing commands
//!
//! A thing is governed by the policy its `policyId` names. Every command is
//! checked against the `thing:` resource of the part it addresses.

use crate::{ThingCommand, ThingCommandEnvelope};
use core_types::{DomainError, Timestamp};
use event_sourcing::CommandResponse;
use identity::AuthorizationContext;
use policy::{Permissions, Policy, ResourceKey};
use policy_enforcer::EnforcerCache;
use serde_json::Value;
use things::FeatureId;
use tracing::debug;

/// Checks thing commands against the policy of the thing
#[derive(Debug, Clone, Copy)]
pub struct ThingCommandEnforcement<'a> {
    cache: &'a EnforcerCache,
}

impl<'a> ThingCommandEnforcement<'a> {
    pub fn new(cache: &'a EnforcerCache) -> Self {
        Self { cache }
    }

    /// Authorizes `command` for `context` against the governing `policy`
    ///
    /// Modifications need unrestricted `WRITE` on the addressed resource,
    /// queries need `READ` on it or anywhere below. Without a usable policy
    /// nothing is authorized, and subjects expired at `now` hold no
    /// permissions.
    pub fn authorize(
        &self,
        command: &ThingCommandEnvelope,
        policy: Option<&Policy>,
        context: &AuthorizationContext,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let payload = &command.payload;
        let key = resource_key(payload);
        let granted = policy
            .and_then(|policy| self.cache.get_or_build(policy, now))
            .is_some_and(|enforcer| {
                if payload.is_query() {
                    enforcer.has_permission_on_resource_or_any_subresource(
                        context,
                        &key,
                        &Permissions::read(),
                    )
                } else {
                    enforcer.has_unrestricted_permission(context, &key, &Permissions::write())
                }
            });
        if granted {
            return Ok(());
        }

        debug!(
            thing_id = %command.entity_id,
            command = payload.name(),
            resource = %key,
            "Thing command denied"
        );
        Err(denial(command))
    }

    /// Reduces a query response to the parts the context may read
    ///
    /// A retrieved thing always keeps its `thingId` once any part of it is
    /// readable.
    pub fn filter_response(
        &self,
        command: &ThingCommandEnvelope,
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
        let view = match (view, &command.payload) {
            (Some(Value::Object(mut fields)), ThingCommand::RetrieveThing) => {
                fields.insert(
                    "thingId".to_string(),
                    Value::String(command.entity_id.to_string()),
                );
                Some(Value::Object(fields))
            }
            (view, _) => view,
        };
        response.with_entity(view)
    }
}

/// The `thing:` resource a command addresses
pub fn resource_key(command: &ThingCommand) -> ResourceKey {
    ResourceKey::thing(command.path())
}

fn denial(command: &ThingCommandEnvelope) -> DomainError {
    let thing_id = command.entity_id.clone();
    let feature_id = |id: &FeatureId| id.to_string();
    match &command.payload {
        ThingCommand::CreateThing { .. }
        | ThingCommand::ModifyThing { .. }
        | ThingCommand::DeleteThing => DomainError::ThingNotModifiable { thing_id },
        ThingCommand::RetrieveThing => DomainError::ThingNotAccessible { thing_id },
        ThingCommand::ModifyPolicyId { .. } => DomainError::PolicyIdNotModifiable { thing_id },
        ThingCommand::ModifyDefinition { .. } | ThingCommand::DeleteDefinition => {
            DomainError::DefinitionNotModifiable { thing_id }
        }
        ThingCommand::ModifyAttributes { .. } | ThingCommand::DeleteAttributes => {
            DomainError::AttributesNotModifiable { thing_id }
        }
        ThingCommand::RetrieveAttributes => DomainError::AttributesNotAccessible { thing_id },
        ThingCommand::ModifyAttribute { pointer, .. } | ThingCommand::DeleteAttribute { pointer } => {
            DomainError::AttributeNotModifiable {
                thing_id,
                pointer: pointer.clone(),
            }
        }
        ThingCommand::RetrieveAttribute { pointer } => DomainError::AttributeNotAccessible {
            thing_id,
            pointer: pointer.clone(),
        },
        ThingCommand::ModifyFeatures { .. } | ThingCommand::DeleteFeatures => {
            DomainError::FeaturesNotModifiable { thing_id }
        }
        ThingCommand::ModifyFeature { feature_id: id, .. }
        | ThingCommand::DeleteFeature { feature_id: id } => DomainError::FeatureNotModifiable {
            thing_id,
            feature_id: feature_id(id),
        },
        ThingCommand::RetrieveFeature { feature_id: id } => DomainError::FeatureNotAccessible {
            thing_id,
            feature_id: feature_id(id),
        },
        ThingCommand::ModifyFeatureProperties { feature_id: id, .. }
        | ThingCommand::DeleteFeatureProperties { feature_id: id } => {
            DomainError::FeaturePropertiesNotModifiable {
                thing_id,
                feature_id: feature_id(id),
            }
        }
        ThingCommand::ModifyFeatureProperty {
            feature_id: id,
            pointer,
            ..
        }
        | ThingCommand::DeleteFeatureProperty {
            feature_id: id,
            pointer,
        } => DomainError::FeaturePropertyNotModifiable {
            thing_id,
            feature_id: feature_id(id),
            pointer: pointer.clone(),
        },
        ThingCommand::RetrieveFeatureProperty {
            feature_id: id,
            pointer,
        } => DomainError::FeaturePropertyNotAccessible {
            thing_id,
            feature_id: feature_id(id),
            pointer: pointer.clone(),
        },
        ThingCommand::ModifyFeatureDesiredProperties { feature_id: id, .. }
        | ThingCommand::DeleteFeatureDesiredProperties { feature_id: id } => {
            DomainError::FeatureDesiredPropertiesNotModifiable {
                thing_id,
                feature_id: feature_id(id),
            }
        }
        ThingCommand::ModifyFeatureDesiredProperty {
            feature_id: id,
            pointer,
            ..
        }
        | ThingCommand::DeleteFeatureDesiredProperty {
            feature_id: id,
            pointer,
        } => DomainError::FeatureDesiredPropertyNotModifiable {
            thing_id,
            feature_id: feature_id(id),
            pointer: pointer.clone(),
        },
        ThingCommand::RetrieveFeatureDesiredProperty {
            feature_id: id,
            pointer,
        } => DomainError::FeatureDesiredPropertyNotAccessible {
            thing_id,
            feature_id: feature_id(id),
            pointer: pointer.clone(),
        },
    }
}
