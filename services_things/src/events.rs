//! Applying thing events

use core_types::{DomainError, Lifecycle};
use event_sourcing::{EventOf, EventPayload, EventStrategy};
use things::{Feature, Thing, ThingEvent};

/// Applies persisted thing events to the thing they belong to
#[derive(Debug, Clone, Copy, Default)]
pub struct ThingEventStrategies;

impl EventStrategy<Thing> for ThingEventStrategies {
    fn create(&self, event: &EventOf<Thing>) -> Result<Thing, DomainError> {
        match &event.payload {
            ThingEvent::ThingCreated { thing } => Ok(thing.with_lifecycle(Lifecycle::Active)),
            other => Err(DomainError::EventNotApplicable {
                event_type: other.event_type(),
                entity_id: event.entity_id.to_string(),
                reason: "not a creation event".to_string(),
            }),
        }
    }

    fn modify(&self, event: &EventOf<Thing>, thing: &Thing) -> Result<Thing, DomainError> {
        let next = match &event.payload {
            ThingEvent::ThingCreated { .. } => {
                return Err(DomainError::EventNotApplicable {
                    event_type: event.payload.event_type(),
                    entity_id: event.entity_id.to_string(),
                    reason: "the thing already exists".to_string(),
                })
            }
            ThingEvent::ThingModified { thing: replacement } => {
                let replacement = replacement.with_lifecycle(Lifecycle::Active);
                match thing.created() {
                    Some(created) => replacement.with_created(created),
                    None => replacement,
                }
            }
            ThingEvent::ThingDeleted {} => thing.with_lifecycle(Lifecycle::Deleted),
            ThingEvent::PolicyIdModified { policy_id } => thing.with_policy_id(policy_id.clone()),
            ThingEvent::DefinitionCreated { definition }
            | ThingEvent::DefinitionModified { definition } => {
                thing.with_definition(Some(definition.clone()))
            }
            ThingEvent::DefinitionDeleted {} => thing.with_definition(None),
            ThingEvent::AttributesCreated { attributes }
            | ThingEvent::AttributesModified { attributes } => {
                thing.with_attributes(Some(attributes.clone()))
            }
            ThingEvent::AttributesDeleted {} => thing.with_attributes(None),
            ThingEvent::AttributeCreated { pointer, value }
            | ThingEvent::AttributeModified { pointer, value } => {
                thing.set_attribute(pointer, value.clone())
            }
            ThingEvent::AttributeDeleted { pointer } => thing.remove_attribute(pointer),
            ThingEvent::FeaturesCreated { features } | ThingEvent::FeaturesModified { features } => {
                thing.with_features(Some(features.clone()))
            }
            ThingEvent::FeaturesDeleted {} => thing.with_features(None),
            ThingEvent::FeatureCreated {
                feature_id,
                feature,
            }
            | ThingEvent::FeatureModified {
                feature_id,
                feature,
            } => thing.set_feature(feature_id.clone(), feature.clone()),
            ThingEvent::FeatureDeleted { feature_id } => thing.remove_feature(feature_id),
            ThingEvent::FeaturePropertiesCreated {
                feature_id,
                properties,
            }
            | ThingEvent::FeaturePropertiesModified {
                feature_id,
                properties,
            } => thing.update_feature(feature_id, |feature| {
                feature.clone().with_properties(properties.clone())
            }),
            ThingEvent::FeaturePropertiesDeleted { feature_id } => {
                thing.update_feature(feature_id, |feature| Feature {
                    properties: None,
                    ..feature.clone()
                })
            }
            ThingEvent::FeaturePropertyCreated {
                feature_id,
                pointer,
                value,
            }
            | ThingEvent::FeaturePropertyModified {
                feature_id,
                pointer,
                value,
            } => thing.update_feature(feature_id, |feature| {
                feature.set_property(pointer, value.clone())
            }),
            ThingEvent::FeaturePropertyDeleted {
                feature_id,
                pointer,
            } => thing.update_feature(feature_id, |feature| feature.remove_property(pointer)),
            ThingEvent::FeatureDesiredPropertiesCreated {
                feature_id,
                desired_properties,
            }
            | ThingEvent::FeatureDesiredPropertiesModified {
                feature_id,
                desired_properties,
            } => thing.update_feature(feature_id, |feature| {
                feature
                    .clone()
                    .with_desired_properties(desired_properties.clone())
            }),
            ThingEvent::FeatureDesiredPropertiesDeleted { feature_id } => {
                thing.update_feature(feature_id, |feature| Feature {
                    desired_properties: None,
                    ..feature.clone()
                })
            }
            ThingEvent::FeatureDesiredPropertyCreated {
                feature_id,
                pointer,
                value,
            }
            | ThingEvent::FeatureDesiredPropertyModified {
                feature_id,
                pointer,
                value,
            } => thing.update_feature(feature_id, |feature| {
                feature.set_desired_property(pointer, value.clone())
            }),
            ThingEvent::FeatureDesiredPropertyDeleted {
                feature_id,
                pointer,
            } => thing.update_feature(feature_id, |feature| {
                feature.remove_desired_property(pointer)
            }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{JsonPointer, Revision, ThingId, Timestamp};
    use event_sourcing::Event;
    use serde_json::json;
    use things::FeatureId;

    fn thing_id() -> ThingId {
        ThingId::parse("org.example:lamp").unwrap()
    }

    fn event(revision: u64, payload: ThingEvent) -> EventOf<Thing> {
        Event {
            entity_id: thing_id(),
            revision: Revision::new(revision),
            timestamp: Timestamp::from_millis(revision * 10),
            correlation_id: None,
            metadata: None,
            payload,
        }
    }

    fn created() -> Thing {
        let created = event(
            1,
            ThingEvent::ThingCreated {
                thing: Thing::new(thing_id()),
            },
        );
        ThingEventStrategies.handle(&created, None).unwrap().unwrap()
    }

    fn apply(thing: Thing, revision: u64, payload: ThingEvent) -> Thing {
        ThingEventStrategies
            .handle(&event(revision, payload), Some(thing))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_desired_property_lifecycle() {
        let lamp = FeatureId::parse("lamp").unwrap();
        let brightness = JsonPointer::parse("/brightness").unwrap();

        let thing = apply(
            created(),
            2,
            ThingEvent::FeatureDesiredPropertyCreated {
                feature_id: lamp.clone(),
                pointer: brightness.clone(),
                value: json!(80),
            },
        );
        let feature = thing.feature(&lamp).unwrap();
        assert_eq!(feature.desired_property(&brightness), Some(&json!(80)));
        assert!(feature.properties.is_none());

        let thing = apply(
            thing,
            3,
            ThingEvent::FeatureDesiredPropertyDeleted {
                feature_id: lamp.clone(),
                pointer: brightness.clone(),
            },
        );
        assert_eq!(thing.feature(&lamp).unwrap().desired_property(&brightness), None);
        assert_eq!(thing.revision(), Revision::new(3));
        assert_eq!(thing.modified(), Some(Timestamp::from_millis(30)));
    }

    #[test]
    fn test_attributes_deleted() {
        let thing = apply(
            created(),
            2,
            ThingEvent::AttributeCreated {
                pointer: JsonPointer::parse("/a").unwrap(),
                value: json!(1),
            },
        );
        assert!(thing.attributes().is_some());
        let thing = apply(thing, 3, ThingEvent::AttributesDeleted {});
        assert!(thing.attributes().is_none());
    }

    #[test]
    fn test_thing_modified_keeps_created() {
        let thing = apply(
            created(),
            2,
            ThingEvent::ThingModified {
                thing: Thing::new(thing_id()),
            },
        );
        assert_eq!(thing.created(), Some(Timestamp::from_millis(10)));
        assert_eq!(thing.modified(), Some(Timestamp::from_millis(20)));
    }

    #[test]
    fn test_deleted_thing_rejects_modifications() {
        let deleted = apply(created(), 2, ThingEvent::ThingDeleted {});
        assert!(deleted.is_deleted());
        let result = ThingEventStrategies.handle(&event(3, ThingEvent::DefinitionDeleted {}), Some(deleted));
        assert!(matches!(result, Err(DomainError::EventNotApplicable { .. })));
    }
}
