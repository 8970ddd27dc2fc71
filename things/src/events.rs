//! Events of the thing aggregate

use crate::{Feature, FeatureId, Features, JsonObject, Thing, ThingDefinition};
use core_types::{JsonPointer, Lifecycle, PolicyId, Revision, ThingId, Timestamp};
use event_sourcing::{Aggregate, EventPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything that can happen to a thing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ThingEvent {
    ThingCreated {
        thing: Thing,
    },
    ThingModified {
        thing: Thing,
    },
    ThingDeleted {},
    PolicyIdModified {
        policy_id: PolicyId,
    },
    DefinitionCreated {
        definition: ThingDefinition,
    },
    DefinitionModified {
        definition: ThingDefinition,
    },
    DefinitionDeleted {},
    AttributesCreated {
        attributes: JsonObject,
    },
    AttributesModified {
        attributes: JsonObject,
    },
    AttributesDeleted {},
    AttributeCreated {
        pointer: JsonPointer,
        value: Value,
    },
    AttributeModified {
        pointer: JsonPointer,
        value: Value,
    },
    AttributeDeleted {
        pointer: JsonPointer,
    },
    FeaturesCreated {
        features: Features,
    },
    FeaturesModified {
        features: Features,
    },
    FeaturesDeleted {},
    FeatureCreated {
        feature_id: FeatureId,
        feature: Feature,
    },
    FeatureModified {
        feature_id: FeatureId,
        feature: Feature,
    },
    FeatureDeleted {
        feature_id: FeatureId,
    },
    FeaturePropertiesCreated {
        feature_id: FeatureId,
        properties: JsonObject,
    },
    FeaturePropertiesModified {
        feature_id: FeatureId,
        properties: JsonObject,
    },
    FeaturePropertiesDeleted {
        feature_id: FeatureId,
    },
    FeaturePropertyCreated {
        feature_id: FeatureId,
        pointer: JsonPointer,
        value: Value,
    },
    FeaturePropertyModified {
        feature_id: FeatureId,
        pointer: JsonPointer,
        value: Value,
    },
    FeaturePropertyDeleted {
        feature_id: FeatureId,
        pointer: JsonPointer,
    },
    FeatureDesiredPropertiesCreated {
        feature_id: FeatureId,
        desired_properties: JsonObject,
    },
    FeatureDesiredPropertiesModified {
        feature_id: FeatureId,
        desired_properties: JsonObject,
    },
    FeatureDesiredPropertiesDeleted {
        feature_id: FeatureId,
    },
    FeatureDesiredPropertyCreated {
        feature_id: FeatureId,
        pointer: JsonPointer,
        value: Value,
    },
    FeatureDesiredPropertyModified {
        feature_id: FeatureId,
        pointer: JsonPointer,
        value: Value,
    },
    FeatureDesiredPropertyDeleted {
        feature_id: FeatureId,
        pointer: JsonPointer,
    },
}

impl EventPayload for ThingEvent {
    const NAMESPACE: &'static str = "things.events";
    const NAMES: &'static [&'static str] = &[
        "thingCreated",
        "thingModified",
        "thingDeleted",
        "policyIdModified",
        "definitionCreated",
        "definitionModified",
        "definitionDeleted",
        "attributesCreated",
        "attributesModified",
        "attributesDeleted",
        "attributeCreated",
        "attributeModified",
        "attributeDeleted",
        "featuresCreated",
        "featuresModified",
        "featuresDeleted",
        "featureCreated",
        "featureModified",
        "featureDeleted",
        "featurePropertiesCreated",
        "featurePropertiesModified",
        "featurePropertiesDeleted",
        "featurePropertyCreated",
        "featurePropertyModified",
        "featurePropertyDeleted",
        "featureDesiredPropertiesCreated",
        "featureDesiredPropertiesModified",
        "featureDesiredPropertiesDeleted",
        "featureDesiredPropertyCreated",
        "featureDesiredPropertyModified",
        "featureDesiredPropertyDeleted",
    ];

    fn name(&self) -> &'static str {
        match self {
            Self::ThingCreated { .. } => "thingCreated",
            Self::ThingModified { .. } => "thingModified",
            Self::ThingDeleted {} => "thingDeleted",
            Self::PolicyIdModified { .. } => "policyIdModified",
            Self::DefinitionCreated { .. } => "definitionCreated",
            Self::DefinitionModified { .. } => "definitionModified",
            Self::DefinitionDeleted {} => "definitionDeleted",
            Self::AttributesCreated { .. } => "attributesCreated",
            Self::AttributesModified { .. } => "attributesModified",
            Self::AttributesDeleted {} => "attributesDeleted",
            Self::AttributeCreated { .. } => "attributeCreated",
            Self::AttributeModified { .. } => "attributeModified",
            Self::AttributeDeleted { .. } => "attributeDeleted",
            Self::FeaturesCreated { .. } => "featuresCreated",
            Self::FeaturesModified { .. } => "featuresModified",
            Self::FeaturesDeleted {} => "featuresDeleted",
            Self::FeatureCreated { .. } => "featureCreated",
            Self::FeatureModified { .. } => "featureModified",
            Self::FeatureDeleted { .. } => "featureDeleted",
            Self::FeaturePropertiesCreated { .. } => "featurePropertiesCreated",
            Self::FeaturePropertiesModified { .. } => "featurePropertiesModified",
            Self::FeaturePropertiesDeleted { .. } => "featurePropertiesDeleted",
            Self::FeaturePropertyCreated { .. } => "featurePropertyCreated",
            Self::FeaturePropertyModified { .. } => "featurePropertyModified",
            Self::FeaturePropertyDeleted { .. } => "featurePropertyDeleted",
            Self::FeatureDesiredPropertiesCreated { .. } => "featureDesiredPropertiesCreated",
            Self::FeatureDesiredPropertiesModified { .. } => "featureDesiredPropertiesModified",
            Self::FeatureDesiredPropertiesDeleted { .. } => "featureDesiredPropertiesDeleted",
            Self::FeatureDesiredPropertyCreated { .. } => "featureDesiredPropertyCreated",
            Self::FeatureDesiredPropertyModified { .. } => "featureDesiredPropertyModified",
            Self::FeatureDesiredPropertyDeleted { .. } => "featureDesiredPropertyDeleted",
        }
    }

    fn is_creation(&self) -> bool {
        matches!(self, Self::ThingCreated { .. })
    }
}

impl Aggregate for Thing {
    type Id = ThingId;
    type Event = ThingEvent;

    const TYPE: &'static str = "thing";

    fn id(&self) -> &ThingId {
        Thing::id(self)
    }

    fn revision(&self) -> Revision {
        Thing::revision(self)
    }

    fn lifecycle(&self) -> Lifecycle {
        Thing::lifecycle(self)
    }

    fn with_revision(&self, revision: Revision) -> Self {
        Thing::with_revision(self, revision)
    }

    fn with_created(&self, timestamp: Timestamp) -> Self {
        Thing::with_created(self, timestamp)
    }

    fn with_modified(&self, timestamp: Timestamp) -> Self {
        Thing::with_modified(self, timestamp)
    }

    fn to_json(&self) -> Value {
        Thing::to_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DomainError;
    use serde_json::json;

    #[test]
    fn test_names_cover_every_variant() {
        let event = ThingEvent::FeatureDesiredPropertyModified {
            feature_id: FeatureId::parse("lamp").unwrap(),
            pointer: JsonPointer::parse("/on").unwrap(),
            value: json!(true),
        };
        assert_eq!(event.event_type(), "things.events:featureDesiredPropertyModified");
        assert!(ThingEvent::NAMES.contains(&event.name()));
        assert_eq!(
            event.to_journal_payload(),
            json!({"featureId": "lamp", "pointer": "/on", "value": true})
        );
    }

    #[test]
    fn test_attribute_event_from_journal() {
        let event = ThingEvent::from_journal(
            "things.events:attributeCreated",
            "thing",
            json!({"pointer": "/location/lat", "value": 47.1}),
        )
        .unwrap();
        assert_eq!(
            event,
            ThingEvent::AttributeCreated {
                pointer: JsonPointer::parse("/location/lat").unwrap(),
                value: json!(47.1),
            }
        );
    }

    #[test]
    fn test_policy_event_type_is_unhandled() {
        assert!(matches!(
            ThingEvent::from_journal("policies.events:policyCreated", "thing", json!({})),
            Err(DomainError::UnhandledEventType { .. })
        ));
    }
}
