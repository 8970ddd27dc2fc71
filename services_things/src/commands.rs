//! Commands of the thing aggregate

use core_types::{JsonPointer, PolicyId, ThingId};
use event_sourcing::Command;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use things::{Feature, FeatureId, Features, JsonObject, Thing, ThingDefinition};

/// A command addressed to one thing
pub type ThingCommandEnvelope = Command<ThingId, ThingCommand>;

/// Everything that can be asked of a thing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ThingCommand {
    CreateThing {
        thing: Thing,
    },
    /// Replaces the thing; creates it when it does not exist
    ModifyThing {
        thing: Thing,
    },
    DeleteThing,
    RetrieveThing,
    ModifyPolicyId {
        policy_id: PolicyId,
    },
    ModifyDefinition {
        definition: ThingDefinition,
    },
    DeleteDefinition,
    ModifyAttributes {
        attributes: JsonObject,
    },
    DeleteAttributes,
    ModifyAttribute {
        pointer: JsonPointer,
        value: Value,
    },
    DeleteAttribute {
        pointer: JsonPointer,
    },
    RetrieveAttributes,
    RetrieveAttribute {
        pointer: JsonPointer,
    },
    ModifyFeatures {
        features: Features,
    },
    DeleteFeatures,
    ModifyFeature {
        feature_id: FeatureId,
        feature: Feature,
    },
    DeleteFeature {
        feature_id: FeatureId,
    },
    RetrieveFeature {
        feature_id: FeatureId,
    },
    ModifyFeatureProperties {
        feature_id: FeatureId,
        properties: JsonObject,
    },
    DeleteFeatureProperties {
        feature_id: FeatureId,
    },
    ModifyFeatureProperty {
        feature_id: FeatureId,
        pointer: JsonPointer,
        value: Value,
    },
    DeleteFeatureProperty {
        feature_id: FeatureId,
        pointer: JsonPointer,
    },
    RetrieveFeatureProperty {
        feature_id: FeatureId,
        pointer: JsonPointer,
    },
    ModifyFeatureDesiredProperties {
        feature_id: FeatureId,
        desired_properties: JsonObject,
    },
    DeleteFeatureDesiredProperties {
        feature_id: FeatureId,
    },
    ModifyFeatureDesiredProperty {
        feature_id: FeatureId,
        pointer: JsonPointer,
        value: Value,
    },
    DeleteFeatureDesiredProperty {
        feature_id: FeatureId,
        pointer: JsonPointer,
    },
    RetrieveFeatureDesiredProperty {
        feature_id: FeatureId,
        pointer: JsonPointer,
    },
}

impl ThingCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateThing { .. } => "createThing",
            Self::ModifyThing { .. } => "modifyThing",
            Self::DeleteThing => "deleteThing",
            Self::RetrieveThing => "retrieveThing",
            Self::ModifyPolicyId { .. } => "modifyPolicyId",
            Self::ModifyDefinition { .. } => "modifyDefinition",
            Self::DeleteDefinition => "deleteDefinition",
            Self::ModifyAttributes { .. } => "modifyAttributes",
            Self::DeleteAttributes => "deleteAttributes",
            Self::ModifyAttribute { .. } => "modifyAttribute",
            Self::DeleteAttribute { .. } => "deleteAttribute",
            Self::RetrieveAttributes => "retrieveAttributes",
            Self::RetrieveAttribute { .. } => "retrieveAttribute",
            Self::ModifyFeatures { .. } => "modifyFeatures",
            Self::DeleteFeatures => "deleteFeatures",
            Self::ModifyFeature { .. } => "modifyFeature",
            Self::DeleteFeature { .. } => "deleteFeature",
            Self::RetrieveFeature { .. } => "retrieveFeature",
            Self::ModifyFeatureProperties { .. } => "modifyFeatureProperties",
            Self::DeleteFeatureProperties { .. } => "deleteFeatureProperties",
            Self::ModifyFeatureProperty { .. } => "modifyFeatureProperty",
            Self::DeleteFeatureProperty { .. } => "deleteFeatureProperty",
            Self::RetrieveFeatureProperty { .. } => "retrieveFeatureProperty",
            Self::ModifyFeatureDesiredProperties { .. } => "modifyFeatureDesiredProperties",
            Self::DeleteFeatureDesiredProperties { .. } => "deleteFeatureDesiredProperties",
            Self::ModifyFeatureDesiredProperty { .. } => "modifyFeatureDesiredProperty",
            Self::DeleteFeatureDesiredProperty { .. } => "deleteFeatureDesiredProperty",
            Self::RetrieveFeatureDesiredProperty { .. } => "retrieveFeatureDesiredProperty",
        }
    }

    /// e.g. `things.responses:modifyAttribute`
    pub fn response_type(&self) -> String {
        format!("things.responses:{}", self.name())
    }

    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::RetrieveThing
                | Self::RetrieveAttributes
                | Self::RetrieveAttribute { .. }
                | Self::RetrieveFeature { .. }
                | Self::RetrieveFeatureProperty { .. }
                | Self::RetrieveFeatureDesiredProperty { .. }
        )
    }

    /// Addresses the thing as a whole rather than a part of it
    pub fn is_thing_level(&self) -> bool {
        matches!(
            self,
            Self::CreateThing { .. }
                | Self::ModifyThing { .. }
                | Self::DeleteThing
                | Self::RetrieveThing
        )
    }

    pub fn feature_id(&self) -> Option<&FeatureId> {
        match self {
            Self::ModifyFeature { feature_id, .. }
            | Self::DeleteFeature { feature_id }
            | Self::RetrieveFeature { feature_id }
            | Self::ModifyFeatureProperties { feature_id, .. }
            | Self::DeleteFeatureProperties { feature_id }
            | Self::ModifyFeatureProperty { feature_id, .. }
            | Self::DeleteFeatureProperty { feature_id, .. }
            | Self::RetrieveFeatureProperty { feature_id, .. }
            | Self::ModifyFeatureDesiredProperties { feature_id, .. }
            | Self::DeleteFeatureDesiredProperties { feature_id }
            | Self::ModifyFeatureDesiredProperty { feature_id, .. }
            | Self::DeleteFeatureDesiredProperty { feature_id, .. }
            | Self::RetrieveFeatureDesiredProperty { feature_id, .. } => Some(feature_id),
            _ => None,
        }
    }

    /// Location of the addressed part inside the thing document
    ///
    /// ```ignore
    /// ModifyFeatureProperty { feature_id: "lamp", pointer: "/on", .. }
    ///     => /features/lamp/properties/on
    /// ```
    pub fn path(&self) -> JsonPointer {
        let features = || JsonPointer::from_segments(["features"]);
        let feature = |id: &FeatureId| features().append(id.as_str());
        match self {
            Self::CreateThing { .. }
            | Self::ModifyThing { .. }
            | Self::DeleteThing
            | Self::RetrieveThing => JsonPointer::root(),
            Self::ModifyPolicyId { .. } => JsonPointer::from_segments(["policyId"]),
            Self::ModifyDefinition { .. } | Self::DeleteDefinition => {
                JsonPointer::from_segments(["definition"])
            }
            Self::ModifyAttributes { .. } | Self::DeleteAttributes | Self::RetrieveAttributes => {
                JsonPointer::from_segments(["attributes"])
            }
            Self::ModifyAttribute { pointer, .. }
            | Self::DeleteAttribute { pointer }
            | Self::RetrieveAttribute { pointer } => {
                JsonPointer::from_segments(["attributes"]).join(pointer)
            }
            Self::ModifyFeatures { .. } | Self::DeleteFeatures => features(),
            Self::ModifyFeature { feature_id, .. }
            | Self::DeleteFeature { feature_id }
            | Self::RetrieveFeature { feature_id } => feature(feature_id),
            Self::ModifyFeatureProperties { feature_id, .. }
            | Self::DeleteFeatureProperties { feature_id } => {
                feature(feature_id).append("properties")
            }
            Self::ModifyFeatureProperty {
                feature_id,
                pointer,
                ..
            }
            | Self::DeleteFeatureProperty {
                feature_id,
                pointer,
            }
            | Self::RetrieveFeatureProperty {
                feature_id,
                pointer,
            } => feature(feature_id).append("properties").join(pointer),
            Self::ModifyFeatureDesiredProperties { feature_id, .. }
            | Self::DeleteFeatureDesiredProperties { feature_id } => {
                feature(feature_id).append("desiredProperties")
            }
            Self::ModifyFeatureDesiredProperty {
                feature_id,
                pointer,
                ..
            }
            | Self::DeleteFeatureDesiredProperty {
                feature_id,
                pointer,
            }
            | Self::RetrieveFeatureDesiredProperty {
                feature_id,
                pointer,
            } => feature(feature_id).append("desiredProperties").join(pointer),
        }
    }
}
