//! Command strategies of the thing aggregate
//!
//! Modifications of a part of the thing emit a `...Created` event when the
//! part did not exist before and a `...Modified` event otherwise. Creations
//! answer with `201 Created` and the new part, modifications and deletions
//! with `204 No Content`.

use crate::{ThingCommand, ThingCommandEnvelope, ThingConfig};
use core_types::{DomainError, EntityTag, JsonPointer, Lifecycle, PolicyId, Revision, StatusCode, ThingId};
use event_sourcing::{
    only_active, CommandResponse, CommandStrategy, Context, Event, EventOf, SizeGuard,
    StrategyResult,
};
use serde::Serialize;
use serde_json::Value;
use things::{Feature, FeatureId, Features, JsonObject, Thing, ThingDefinition, ThingEvent};
use tracing::info;

type ThingResult = Result<StrategyResult<EventOf<Thing>>, DomainError>;

/// All thing command strategies, dispatched by command
#[derive(Debug, Clone)]
pub struct ThingCommandStrategies {
    config: ThingConfig,
    size_guard: SizeGuard,
}

impl ThingCommandStrategies {
    pub fn new(config: ThingConfig) -> Self {
        let size_guard = SizeGuard::things(config.max_thing_size_bytes);
        Self { config, size_guard }
    }

    pub fn config(&self) -> &ThingConfig {
        &self.config
    }
}

impl Default for ThingCommandStrategies {
    fn default() -> Self {
        Self::new(ThingConfig::default())
    }
}

impl CommandStrategy<Thing> for ThingCommandStrategies {
    type Payload = ThingCommand;

    fn apply(
        &self,
        context: &Context,
        entity: Option<&Thing>,
        next_revision: Revision,
        command: &ThingCommandEnvelope,
    ) -> StrategyResult<EventOf<Thing>> {
        let step = Step {
            strategies: self,
            context,
            command,
            next_revision,
        };
        let result = match (&command.payload, only_active(entity)) {
            (ThingCommand::CreateThing { .. }, Some(_)) => Err(DomainError::ThingConflict {
                thing_id: command.entity_id.clone(),
            }),
            (ThingCommand::CreateThing { thing }, None)
            | (ThingCommand::ModifyThing { thing }, None) => step.create_thing(thing),
            (_, None) => Err(DomainError::ThingNotAccessible {
                thing_id: command.entity_id.clone(),
            }),
            (payload, Some(current)) => step.on_existing(current, payload),
        };
        result.into()
    }

    fn previous_entity_tag(
        &self,
        command: &ThingCommandEnvelope,
        previous: Option<&Thing>,
    ) -> Option<EntityTag> {
        entity_tag(&command.payload, previous)
    }

    fn next_entity_tag(&self, command: &ThingCommandEnvelope, next: Option<&Thing>) -> Option<EntityTag> {
        entity_tag(&command.payload, next)
    }

    fn is_query(&self, command: &ThingCommandEnvelope) -> bool {
        command.payload.is_query()
    }

    fn response_type(&self, command: &ThingCommandEnvelope) -> String {
        command.payload.response_type()
    }
}

/// Tag of the (sub-)entity a command addresses
///
/// The whole thing is tagged by revision, everything below it by content.
fn entity_tag(command: &ThingCommand, thing: Option<&Thing>) -> Option<EntityTag> {
    let thing = thing?;
    if command.is_thing_level() {
        return Some(EntityTag::from_revision(thing.revision()));
    }
    command.path().get(&thing.to_json()).map(EntityTag::from_json)
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// One command being applied
struct Step<'a> {
    strategies: &'a ThingCommandStrategies,
    context: &'a Context,
    command: &'a ThingCommandEnvelope,
    next_revision: Revision,
}

impl Step<'_> {
    fn thing_id(&self) -> &ThingId {
        &self.command.entity_id
    }

    fn event(&self, payload: ThingEvent) -> EventOf<Thing> {
        Event::for_command(self.command, self.next_revision, self.context.timestamp, payload)
    }

    fn response(&self, status: StatusCode, entity: Option<Value>) -> CommandResponse {
        CommandResponse::new(
            self.thing_id().to_string(),
            self.command.payload.response_type(),
            status,
            entity,
            self.command.headers.for_response(),
        )
    }

    fn query(&self, entity: Value) -> ThingResult {
        Ok(StrategyResult::query(self.response(StatusCode::Ok, Some(entity))))
    }

    fn mutation(&self, payload: ThingEvent) -> ThingResult {
        Ok(StrategyResult::mutation(
            self.event(payload),
            self.response(StatusCode::NoContent, None),
        ))
    }

    /// `201` with `body` for a new part, `204` for a replaced one
    fn upsert(&self, existed: bool, payload: ThingEvent, body: Value) -> ThingResult {
        if existed {
            return self.mutation(payload);
        }
        Ok(StrategyResult::mutation(
            self.event(payload),
            self.response(StatusCode::Created, Some(body)),
        ))
    }

    /// Checks the thing with `value` placed at the addressed path
    fn ensure_size(&self, current: &Thing, value: &Value) -> Result<(), DomainError> {
        let path = self.command.payload.path();
        self.strategies.size_guard.ensure_valid_size(
            &current.to_json(),
            Some((&path, value)),
            &self.command.headers,
        )
    }

    fn ensure_not_root(&self, pointer: &JsonPointer) -> Result<(), DomainError> {
        if pointer.is_root() {
            return Err(DomainError::JsonPointerInvalid {
                pointer: pointer.to_string(),
                reason: "it must address a field below the root".to_string(),
            });
        }
        Ok(())
    }

    fn existing_feature<'t>(&self, current: &'t Thing, feature_id: &FeatureId) -> Result<&'t Feature, DomainError> {
        current
            .feature(feature_id)
            .ok_or_else(|| DomainError::FeatureNotAccessible {
                thing_id: self.thing_id().clone(),
                feature_id: feature_id.to_string(),
            })
    }

    /// Checks the id and fills in what the stored thing needs
    fn adjust_thing(&self, proposed: &Thing, fallback_policy: PolicyId) -> Result<Thing, DomainError> {
        if proposed.id() != self.thing_id() {
            return Err(DomainError::EntityIdMismatch {
                expected: self.thing_id().to_string(),
                actual: proposed.id().to_string(),
            });
        }
        let thing = proposed.with_lifecycle(Lifecycle::Active);
        let thing = match thing.policy_id() {
            Some(_) => thing,
            None => thing.with_policy_id(fallback_policy),
        };
        self.strategies
            .size_guard
            .ensure_valid_size(&thing.to_json(), None, &self.command.headers)?;
        Ok(thing)
    }

    fn create_thing(&self, proposed: &Thing) -> ThingResult {
        let thing = self.adjust_thing(proposed, self.thing_id().to_policy_id())?;
        let entity = thing.with_revision(self.next_revision).to_json();
        Ok(StrategyResult::created(
            self.event(ThingEvent::ThingCreated { thing }),
            self.response(StatusCode::Created, Some(entity)),
        ))
    }

    fn on_existing(&self, current: &Thing, payload: &ThingCommand) -> ThingResult {
        match payload {
            ThingCommand::CreateThing { .. } => Err(DomainError::ThingConflict {
                thing_id: self.thing_id().clone(),
            }),
            ThingCommand::ModifyThing { thing } => self.modify_thing(current, thing),
            ThingCommand::DeleteThing => self.delete_thing(),
            ThingCommand::RetrieveThing => self.query(current.to_json()),
            ThingCommand::ModifyPolicyId { policy_id } => self.modify_policy_id(current, policy_id),
            ThingCommand::ModifyDefinition { definition } => {
                self.modify_definition(current, definition)
            }
            ThingCommand::DeleteDefinition => self.delete_definition(current),
            ThingCommand::ModifyAttributes { attributes } => {
                self.modify_attributes(current, attributes)
            }
            ThingCommand::DeleteAttributes => self.delete_attributes(current),
            ThingCommand::ModifyAttribute { pointer, value } => {
                self.modify_attribute(current, pointer, value)
            }
            ThingCommand::DeleteAttribute { pointer } => self.delete_attribute(current, pointer),
            ThingCommand::RetrieveAttributes => {
                let attributes = current.attributes().ok_or_else(|| self.attributes_not_accessible())?;
                self.query(Value::Object(attributes.clone()))
            }
            ThingCommand::RetrieveAttribute { pointer } => {
                let value = current
                    .attribute(pointer)
                    .ok_or_else(|| self.attribute_not_accessible(pointer))?;
                self.query(value.clone())
            }
            ThingCommand::ModifyFeatures { features } => self.modify_features(current, features),
            ThingCommand::DeleteFeatures => self.delete_features(current),
            ThingCommand::ModifyFeature {
                feature_id,
                feature,
            } => self.modify_feature(current, feature_id, feature),
            ThingCommand::DeleteFeature { feature_id } => {
                self.existing_feature(current, feature_id)?;
                self.mutation(ThingEvent::FeatureDeleted {
                    feature_id: feature_id.clone(),
                })
            }
            ThingCommand::RetrieveFeature { feature_id } => {
                self.query(self.existing_feature(current, feature_id)?.to_json())
            }
            ThingCommand::ModifyFeatureProperties {
                feature_id,
                properties,
            } => self.modify_properties(current, feature_id, properties),
            ThingCommand::DeleteFeatureProperties { feature_id } => {
                self.delete_properties(current, feature_id)
            }
            ThingCommand::ModifyFeatureProperty {
                feature_id,
                pointer,
                value,
            } => self.modify_property(current, feature_id, pointer, value),
            ThingCommand::DeleteFeatureProperty {
                feature_id,
                pointer,
            } => self.delete_property(current, feature_id, pointer),
            ThingCommand::RetrieveFeatureProperty {
                feature_id,
                pointer,
            } => {
                let feature = self.existing_feature(current, feature_id)?;
                let value = feature
                    .property(pointer)
                    .ok_or_else(|| self.property_not_accessible(feature_id, pointer))?;
                self.query(value.clone())
            }
            ThingCommand::ModifyFeatureDesiredProperties {
                feature_id,
                desired_properties,
            } => self.modify_desired_properties(current, feature_id, desired_properties),
            ThingCommand::DeleteFeatureDesiredProperties { feature_id } => {
                self.delete_desired_properties(current, feature_id)
            }
            ThingCommand::ModifyFeatureDesiredProperty {
                feature_id,
                pointer,
                value,
            } => self.modify_desired_property(current, feature_id, pointer, value),
            ThingCommand::DeleteFeatureDesiredProperty {
                feature_id,
                pointer,
            } => self.delete_desired_property(current, feature_id, pointer),
            ThingCommand::RetrieveFeatureDesiredProperty {
                feature_id,
                pointer,
            } => {
                let feature = self.existing_feature(current, feature_id)?;
                let value = feature
                    .desired_property(pointer)
                    .ok_or_else(|| self.desired_property_not_accessible(feature_id, pointer))?;
                self.query(value.clone())
            }
        }
    }

    fn attributes_not_accessible(&self) -> DomainError {
        DomainError::AttributesNotAccessible {
            thing_id: self.thing_id().clone(),
        }
    }

    fn attribute_not_accessible(&self, pointer: &JsonPointer) -> DomainError {
        DomainError::AttributeNotAccessible {
            thing_id: self.thing_id().clone(),
            pointer: pointer.clone(),
        }
    }

    fn property_not_accessible(&self, feature_id: &FeatureId, pointer: &JsonPointer) -> DomainError {
        DomainError::FeaturePropertyNotAccessible {
            thing_id: self.thing_id().clone(),
            feature_id: feature_id.to_string(),
            pointer: pointer.clone(),
        }
    }

    fn desired_property_not_accessible(&self, feature_id: &FeatureId, pointer: &JsonPointer) -> DomainError {
        DomainError::FeatureDesiredPropertyNotAccessible {
            thing_id: self.thing_id().clone(),
            feature_id: feature_id.to_string(),
            pointer: pointer.clone(),
        }
    }

    fn modify_thing(&self, current: &Thing, proposed: &Thing) -> ThingResult {
        // a replacement without policy keeps the current one
        let fallback = current
            .policy_id()
            .cloned()
            .unwrap_or_else(|| self.thing_id().to_policy_id());
        let thing = self.adjust_thing(proposed, fallback)?;
        self.mutation(ThingEvent::ThingModified { thing })
    }

    fn delete_thing(&self) -> ThingResult {
        info!(thing_id = %self.thing_id(), "Deleted Thing with ID");
        Ok(StrategyResult::deleted(
            self.event(ThingEvent::ThingDeleted {}),
            self.response(StatusCode::NoContent, None),
        ))
    }

    fn modify_policy_id(&self, current: &Thing, policy_id: &PolicyId) -> ThingResult {
        self.ensure_size(current, &to_json(policy_id))?;
        self.mutation(ThingEvent::PolicyIdModified {
            policy_id: policy_id.clone(),
        })
    }

    fn modify_definition(&self, current: &Thing, definition: &ThingDefinition) -> ThingResult {
        let body = to_json(definition);
        self.ensure_size(current, &body)?;
        let definition = definition.clone();
        let existed = current.definition().is_some();
        let payload = if existed {
            ThingEvent::DefinitionModified { definition }
        } else {
            ThingEvent::DefinitionCreated { definition }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_definition(&self, current: &Thing) -> ThingResult {
        if current.definition().is_none() {
            return Err(DomainError::DefinitionNotAccessible {
                thing_id: self.thing_id().clone(),
            });
        }
        self.mutation(ThingEvent::DefinitionDeleted {})
    }

    fn modify_attributes(&self, current: &Thing, attributes: &JsonObject) -> ThingResult {
        let body = Value::Object(attributes.clone());
        self.ensure_size(current, &body)?;
        let attributes = attributes.clone();
        let existed = current.attributes().is_some();
        let payload = if existed {
            ThingEvent::AttributesModified { attributes }
        } else {
            ThingEvent::AttributesCreated { attributes }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_attributes(&self, current: &Thing) -> ThingResult {
        if current.attributes().is_none() {
            return Err(self.attributes_not_accessible());
        }
        self.mutation(ThingEvent::AttributesDeleted {})
    }

    fn modify_attribute(&self, current: &Thing, pointer: &JsonPointer, value: &Value) -> ThingResult {
        self.ensure_not_root(pointer)?;
        self.ensure_size(current, value)?;
        let existed = current.attribute(pointer).is_some();
        let (pointer, value) = (pointer.clone(), value.clone());
        let body = value.clone();
        let payload = if existed {
            ThingEvent::AttributeModified { pointer, value }
        } else {
            ThingEvent::AttributeCreated { pointer, value }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_attribute(&self, current: &Thing, pointer: &JsonPointer) -> ThingResult {
        self.ensure_not_root(pointer)?;
        if current.attribute(pointer).is_none() {
            return Err(self.attribute_not_accessible(pointer));
        }
        self.mutation(ThingEvent::AttributeDeleted {
            pointer: pointer.clone(),
        })
    }

    fn modify_features(&self, current: &Thing, features: &Features) -> ThingResult {
        let body = to_json(features);
        self.ensure_size(current, &body)?;
        let features = features.clone();
        let existed = current.features().is_some();
        let payload = if existed {
            ThingEvent::FeaturesModified { features }
        } else {
            ThingEvent::FeaturesCreated { features }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_features(&self, current: &Thing) -> ThingResult {
        if current.features().is_none() {
            return Err(DomainError::FeaturesNotAccessible {
                thing_id: self.thing_id().clone(),
            });
        }
        self.mutation(ThingEvent::FeaturesDeleted {})
    }

    fn modify_feature(&self, current: &Thing, feature_id: &FeatureId, feature: &Feature) -> ThingResult {
        let body = feature.to_json();
        self.ensure_size(current, &body)?;
        let (feature_id, feature) = (feature_id.clone(), feature.clone());
        let existed = current.feature(&feature_id).is_some();
        let payload = if existed {
            ThingEvent::FeatureModified { feature_id, feature }
        } else {
            ThingEvent::FeatureCreated { feature_id, feature }
        };
        self.upsert(existed, payload, body)
    }

    fn modify_properties(
        &self,
        current: &Thing,
        feature_id: &FeatureId,
        properties: &JsonObject,
    ) -> ThingResult {
        let existed = self.existing_feature(current, feature_id)?.properties.is_some();
        let body = Value::Object(properties.clone());
        self.ensure_size(current, &body)?;
        let (feature_id, properties) = (feature_id.clone(), properties.clone());
        let payload = if existed {
            ThingEvent::FeaturePropertiesModified {
                feature_id,
                properties,
            }
        } else {
            ThingEvent::FeaturePropertiesCreated {
                feature_id,
                properties,
            }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_properties(&self, current: &Thing, feature_id: &FeatureId) -> ThingResult {
        if self.existing_feature(current, feature_id)?.properties.is_none() {
            return Err(DomainError::FeaturePropertiesNotAccessible {
                thing_id: self.thing_id().clone(),
                feature_id: feature_id.to_string(),
            });
        }
        self.mutation(ThingEvent::FeaturePropertiesDeleted {
            feature_id: feature_id.clone(),
        })
    }

    fn modify_property(
        &self,
        current: &Thing,
        feature_id: &FeatureId,
        pointer: &JsonPointer,
        value: &Value,
    ) -> ThingResult {
        self.ensure_not_root(pointer)?;
        let existed = self
            .existing_feature(current, feature_id)?
            .property(pointer)
            .is_some();
        self.ensure_size(current, value)?;
        let (feature_id, pointer, value) = (feature_id.clone(), pointer.clone(), value.clone());
        let body = value.clone();
        let payload = if existed {
            ThingEvent::FeaturePropertyModified {
                feature_id,
                pointer,
                value,
            }
        } else {
            ThingEvent::FeaturePropertyCreated {
                feature_id,
                pointer,
                value,
            }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_property(&self, current: &Thing, feature_id: &FeatureId, pointer: &JsonPointer) -> ThingResult {
        self.ensure_not_root(pointer)?;
        let feature = self.existing_feature(current, feature_id)?;
        if feature.property(pointer).is_none() {
            return Err(self.property_not_accessible(feature_id, pointer));
        }
        self.mutation(ThingEvent::FeaturePropertyDeleted {
            feature_id: feature_id.clone(),
            pointer: pointer.clone(),
        })
    }

    fn modify_desired_properties(
        &self,
        current: &Thing,
        feature_id: &FeatureId,
        desired_properties: &JsonObject,
    ) -> ThingResult {
        let existed = self
            .existing_feature(current, feature_id)?
            .desired_properties
            .is_some();
        let body = Value::Object(desired_properties.clone());
        self.ensure_size(current, &body)?;
        let (feature_id, desired_properties) = (feature_id.clone(), desired_properties.clone());
        let payload = if existed {
            ThingEvent::FeatureDesiredPropertiesModified {
                feature_id,
                desired_properties,
            }
        } else {
            ThingEvent::FeatureDesiredPropertiesCreated {
                feature_id,
                desired_properties,
            }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_desired_properties(&self, current: &Thing, feature_id: &FeatureId) -> ThingResult {
        if self
            .existing_feature(current, feature_id)?
            .desired_properties
            .is_none()
        {
            return Err(DomainError::FeatureDesiredPropertiesNotAccessible {
                thing_id: self.thing_id().clone(),
                feature_id: feature_id.to_string(),
            });
        }
        self.mutation(ThingEvent::FeatureDesiredPropertiesDeleted {
            feature_id: feature_id.clone(),
        })
    }

    fn modify_desired_property(
        &self,
        current: &Thing,
        feature_id: &FeatureId,
        pointer: &JsonPointer,
        value: &Value,
    ) -> ThingResult {
        self.ensure_not_root(pointer)?;
        let existed = self
            .existing_feature(current, feature_id)?
            .desired_property(pointer)
            .is_some();
        self.ensure_size(current, value)?;
        let (feature_id, pointer, value) = (feature_id.clone(), pointer.clone(), value.clone());
        let body = value.clone();
        let payload = if existed {
            ThingEvent::FeatureDesiredPropertyModified {
                feature_id,
                pointer,
                value,
            }
        } else {
            ThingEvent::FeatureDesiredPropertyCreated {
                feature_id,
                pointer,
                value,
            }
        };
        self.upsert(existed, payload, body)
    }

    fn delete_desired_property(
        &self,
        current: &Thing,
        feature_id: &FeatureId,
        pointer: &JsonPointer,
    ) -> ThingResult {
        self.ensure_not_root(pointer)?;
        let feature = self.existing_feature(current, feature_id)?;
        if feature.desired_property(pointer).is_none() {
            return Err(self.desired_property_not_accessible(feature_id, pointer));
        }
        self.mutation(ThingEvent::FeatureDesiredPropertyDeleted {
            feature_id: feature_id.clone(),
            pointer: pointer.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThingEventStrategies;
    use core_types::{EntityTagMatchers, Headers, Timestamp};
    use event_sourcing::{execute, Command, EventStrategy};
    use serde_json::json;

    fn thing_id() -> ThingId {
        ThingId::parse("org.example:lamp").unwrap()
    }

    fn lamp() -> FeatureId {
        FeatureId::parse("lamp").unwrap()
    }

    fn pointer(raw: &str) -> JsonPointer {
        JsonPointer::parse(raw).unwrap()
    }

    fn context() -> Context {
        Context::at(Timestamp::from_millis(1_000))
    }

    /// A thing at revision 1 with one attribute and a `lamp` feature
    fn existing() -> Thing {
        Thing::new(thing_id())
            .with_policy_id(thing_id().to_policy_id())
            .set_attribute(&pointer("/location"), json!("kitchen"))
            .set_feature(lamp(), Feature::new().set_property(&pointer("/on"), json!(false)))
            .with_revision(Revision::new(1))
    }

    fn apply(entity: Option<&Thing>, payload: ThingCommand) -> StrategyResult<EventOf<Thing>> {
        let next = event_sourcing::next_revision(entity);
        ThingCommandStrategies::default().apply(&context(), entity, next, &Command::new(thing_id(), payload))
    }

    fn error_of(result: StrategyResult<EventOf<Thing>>) -> DomainError {
        result.error_ref().cloned().unwrap()
    }

    #[test]
    fn test_create_thing_defaults_policy_id() {
        let result = apply(
            None,
            ThingCommand::CreateThing {
                thing: Thing::new(thing_id()),
            },
        );
        let Some(ThingEvent::ThingCreated { thing }) = result.event().map(|e| &e.payload) else {
            panic!("expected a created thing");
        };
        assert_eq!(thing.policy_id(), Some(&thing_id().to_policy_id()));
        let response = result.response().unwrap();
        assert_eq!(response.status, StatusCode::Created);
        assert_eq!(response.entity.as_ref().unwrap()["_revision"], 1);
    }

    #[test]
    fn test_create_existing_thing_conflicts() {
        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::CreateThing {
                thing: Thing::new(thing_id()),
            },
        ));
        assert!(matches!(err, DomainError::ThingConflict { .. }));
        assert_eq!(err.status(), StatusCode::Conflict);
    }

    #[test]
    fn test_modify_thing_keeps_policy_id() {
        let policy_id = PolicyId::parse("org.example:shared").unwrap();
        let current = existing().with_policy_id(policy_id.clone());
        let result = apply(
            Some(&current),
            ThingCommand::ModifyThing {
                thing: Thing::new(thing_id()),
            },
        );
        let Some(ThingEvent::ThingModified { thing }) = result.event().map(|e| &e.payload) else {
            panic!("expected a modified thing");
        };
        assert_eq!(thing.policy_id(), Some(&policy_id));
        assert_eq!(result.response().unwrap().status, StatusCode::NoContent);
    }

    #[test]
    fn test_modify_thing_creates_missing_thing() {
        let result = apply(
            None,
            ThingCommand::ModifyThing {
                thing: Thing::new(thing_id()),
            },
        );
        assert!(matches!(
            result,
            StrategyResult::Mutation {
                entity_created: true,
                ..
            }
        ));
    }

    #[test]
    fn test_commands_on_missing_thing_are_not_accessible() {
        let deleted = existing().with_lifecycle(Lifecycle::Deleted);
        let err = error_of(apply(Some(&deleted), ThingCommand::RetrieveAttributes));
        assert!(matches!(err, DomainError::ThingNotAccessible { .. }));
        assert_eq!(err.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_modify_attribute_created_then_modified() {
        let command = ThingCommand::ModifyAttribute {
            pointer: pointer("/manufacturer/name"),
            value: json!("ACME"),
        };
        let created = apply(Some(&existing()), command.clone());
        assert!(matches!(
            created.event().map(|e| &e.payload),
            Some(ThingEvent::AttributeCreated { .. })
        ));
        assert_eq!(created.response().unwrap().entity, Some(json!("ACME")));

        let next = ThingEventStrategies
            .handle(created.event().unwrap(), Some(existing()))
            .unwrap();
        let modified = apply(next.as_ref(), command);
        assert!(matches!(
            modified.event().map(|e| &e.payload),
            Some(ThingEvent::AttributeModified { .. })
        ));
        assert_eq!(modified.response().unwrap().status, StatusCode::NoContent);
    }

    #[test]
    fn test_root_pointer_is_rejected() {
        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::DeleteAttribute {
                pointer: JsonPointer::root(),
            },
        ));
        assert!(matches!(err, DomainError::JsonPointerInvalid { .. }));
    }

    #[test]
    fn test_missing_parts_are_not_accessible() {
        let err = error_of(apply(Some(&existing()), ThingCommand::DeleteDefinition));
        assert!(matches!(err, DomainError::DefinitionNotAccessible { .. }));

        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::RetrieveAttribute {
                pointer: pointer("/missing"),
            },
        ));
        assert!(matches!(err, DomainError::AttributeNotAccessible { .. }));

        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::DeleteFeatureProperties {
                feature_id: FeatureId::parse("missing").unwrap(),
            },
        ));
        assert!(matches!(err, DomainError::FeatureNotAccessible { .. }));
    }

    #[test]
    fn test_delete_desired_property_preconditions() {
        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::DeleteFeatureDesiredProperty {
                feature_id: FeatureId::parse("missing").unwrap(),
                pointer: pointer("/on"),
            },
        ));
        assert!(matches!(err, DomainError::FeatureNotAccessible { .. }));

        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::DeleteFeatureDesiredProperty {
                feature_id: lamp(),
                pointer: pointer("/on"),
            },
        ));
        assert!(matches!(
            err,
            DomainError::FeatureDesiredPropertyNotAccessible { .. }
        ));
    }

    #[test]
    fn test_modify_property_of_missing_feature() {
        let err = error_of(apply(
            Some(&existing()),
            ThingCommand::ModifyFeatureProperty {
                feature_id: FeatureId::parse("missing").unwrap(),
                pointer: pointer("/on"),
                value: json!(true),
            },
        ));
        assert!(matches!(err, DomainError::FeatureNotAccessible { .. }));
    }

    #[test]
    fn test_thing_too_large() {
        let strategies = ThingCommandStrategies::new(ThingConfig {
            max_thing_size_bytes: 512,
        });
        let command = Command::new(
            thing_id(),
            ThingCommand::ModifyAttribute {
                pointer: pointer("/blob"),
                value: json!("x".repeat(600)),
            },
        );
        let result = strategies.apply(&context(), Some(&existing()), Revision::new(2), &command);
        let err = result.error_ref().unwrap();
        assert!(matches!(err, DomainError::ThingTooLarge { max: 512, .. }));
        assert_eq!(err.status(), StatusCode::PayloadTooLarge);
    }

    #[test]
    fn test_retrieve_feature_property() {
        let result = apply(
            Some(&existing()),
            ThingCommand::RetrieveFeatureProperty {
                feature_id: lamp(),
                pointer: pointer("/on"),
            },
        );
        let response = result.response().unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.entity, Some(json!(false)));
    }

    #[test]
    fn test_property_tag_follows_content() {
        let retrieve = Command::new(
            thing_id(),
            ThingCommand::RetrieveFeatureProperty {
                feature_id: lamp(),
                pointer: pointer("/on"),
            },
        );
        let outcome = execute(
            &ThingCommandStrategies::default(),
            &ThingEventStrategies,
            &context(),
            Some(&existing()),
            retrieve.clone(),
        );
        let etag = outcome.result.response().unwrap().headers.etag.clone().unwrap();
        assert!(etag.opaque().starts_with("hash:"));

        // an unrelated change keeps the tag of the property
        let changed = existing()
            .set_attribute(&pointer("/location"), json!("hall"))
            .with_revision(Revision::new(2));
        let outcome = execute(
            &ThingCommandStrategies::default(),
            &ThingEventStrategies,
            &context(),
            Some(&changed),
            retrieve.with_headers(Headers::new().with_if_none_match(EntityTagMatchers::tag(etag))),
        );
        assert_eq!(
            outcome.result.response().unwrap().status,
            StatusCode::NotModified
        );
    }

    #[test]
    fn test_delete_thing_with_stale_revision_fails() {
        let outcome = execute(
            &ThingCommandStrategies::default(),
            &ThingEventStrategies,
            &context(),
            Some(&existing().with_revision(Revision::new(3))),
            Command::new(thing_id(), ThingCommand::DeleteThing).with_headers(
                Headers::new().with_if_match(EntityTagMatchers::tag(EntityTag::strong("rev:1"))),
            ),
        );
        assert_eq!(
            outcome.result.error_ref().map(DomainError::status),
            Some(StatusCode::PreconditionFailed)
        );
    }
}
