//! The thing aggregate value

use crate::feature::{get_in, remove_in, set_in};
use crate::{Feature, FeatureId, Features, JsonObject, ThingDefinition};
use core_types::{Lifecycle, JsonPointer, PolicyId, Revision, ThingId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A digital twin
///
/// Like policies, things are values: every modification returns a new thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    #[serde(rename = "thingId")]
    id: ThingId,
    #[serde(rename = "policyId", default, skip_serializing_if = "Option::is_none")]
    policy_id: Option<PolicyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<ThingDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    features: Option<Features>,
    #[serde(rename = "_lifecycle", default = "active")]
    lifecycle: Lifecycle,
    #[serde(rename = "_revision", default)]
    revision: Revision,
    #[serde(rename = "_created", default, skip_serializing_if = "Option::is_none")]
    created: Option<Timestamp>,
    #[serde(rename = "_modified", default, skip_serializing_if = "Option::is_none")]
    modified: Option<Timestamp>,
}

fn active() -> Lifecycle {
    Lifecycle::Active
}

impl Thing {
    /// An active, empty thing at revision 0
    pub fn new(id: ThingId) -> Self {
        Self {
            id,
            policy_id: None,
            definition: None,
            attributes: None,
            features: None,
            lifecycle: Lifecycle::Active,
            revision: Revision::initial(),
            created: None,
            modified: None,
        }
    }

    pub fn id(&self) -> &ThingId {
        &self.id
    }

    pub fn policy_id(&self) -> Option<&PolicyId> {
        self.policy_id.as_ref()
    }

    pub fn definition(&self) -> Option<&ThingDefinition> {
        self.definition.as_ref()
    }

    pub fn attributes(&self) -> Option<&JsonObject> {
        self.attributes.as_ref()
    }

    pub fn attribute(&self, pointer: &JsonPointer) -> Option<&Value> {
        get_in(self.attributes.as_ref(), pointer)
    }

    pub fn features(&self) -> Option<&Features> {
        self.features.as_ref()
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.as_ref()?.get(id)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle.is_deleted()
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

    pub fn with_policy_id(&self, policy_id: PolicyId) -> Self {
        Self {
            policy_id: Some(policy_id),
            ..self.clone()
        }
    }

    pub fn with_definition(&self, definition: Option<ThingDefinition>) -> Self {
        Self {
            definition,
            ..self.clone()
        }
    }

    pub fn with_attributes(&self, attributes: Option<JsonObject>) -> Self {
        Self {
            attributes,
            ..self.clone()
        }
    }

    pub fn set_attribute(&self, pointer: &JsonPointer, value: Value) -> Self {
        self.with_attributes(Some(set_in(self.attributes.as_ref(), pointer, value)))
    }

    pub fn remove_attribute(&self, pointer: &JsonPointer) -> Self {
        self.with_attributes(self.attributes.as_ref().map(|a| remove_in(a, pointer)))
    }

    pub fn with_features(&self, features: Option<Features>) -> Self {
        Self {
            features,
            ..self.clone()
        }
    }

    pub fn set_feature(&self, id: FeatureId, feature: Feature) -> Self {
        let features = self.features.clone().unwrap_or_default();
        self.with_features(Some(features.with_feature(id, feature)))
    }

    pub fn remove_feature(&self, id: &FeatureId) -> Self {
        self.with_features(self.features.as_ref().map(|f| f.without_feature(id)))
    }

    /// Applies `update` to the feature, creating an empty one when missing
    pub fn update_feature(&self, id: &FeatureId, update: impl FnOnce(&Feature) -> Feature) -> Self {
        let current = self.feature(id).cloned().unwrap_or_default();
        self.set_feature(id.clone(), update(&current))
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

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
