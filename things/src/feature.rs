//! Features of a thing

use crate::{DefinitionIdentifier, JsonObject};
use core_types::{DomainError, JsonPointer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a feature, unique within its thing
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureId(String);

impl FeatureId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.is_empty() || raw.contains('/') || raw.chars().any(char::is_control) {
            return Err(DomainError::JsonInvalid {
                reason: format!(
                    "feature id '{}' must be non-empty and must not contain '/'",
                    raw
                ),
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FeatureId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FeatureId> for String {
    fn from(id: FeatureId) -> Self {
        id.0
    }
}

/// Models a feature conforms to; never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DefinitionIdentifier>", into = "Vec<DefinitionIdentifier>")]
pub struct FeatureDefinition(Vec<DefinitionIdentifier>);

impl FeatureDefinition {
    pub fn new(identifiers: Vec<DefinitionIdentifier>) -> Result<Self, DomainError> {
        if identifiers.is_empty() {
            return Err(DomainError::JsonInvalid {
                reason: "feature definition must contain at least one identifier".to_string(),
            });
        }
        Ok(Self(identifiers))
    }

    pub fn identifiers(&self) -> &[DefinitionIdentifier] {
        &self.0
    }
}

impl TryFrom<Vec<DefinitionIdentifier>> for FeatureDefinition {
    type Error = DomainError;

    fn try_from(value: Vec<DefinitionIdentifier>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeatureDefinition> for Vec<DefinitionIdentifier> {
    fn from(definition: FeatureDefinition) -> Self {
        definition.0
    }
}

/// A feature: an optional definition, reported properties and desired
/// properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<FeatureDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonObject>,
    #[serde(
        rename = "desiredProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub desired_properties: Option<JsonObject>,
}

impl Feature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(mut self, properties: JsonObject) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn with_desired_properties(mut self, desired_properties: JsonObject) -> Self {
        self.desired_properties = Some(desired_properties);
        self
    }

    pub fn with_definition(mut self, definition: FeatureDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn property(&self, pointer: &JsonPointer) -> Option<&Value> {
        get_in(self.properties.as_ref(), pointer)
    }

    pub fn desired_property(&self, pointer: &JsonPointer) -> Option<&Value> {
        get_in(self.desired_properties.as_ref(), pointer)
    }

    pub fn set_property(&self, pointer: &JsonPointer, value: Value) -> Self {
        Self {
            properties: Some(set_in(self.properties.as_ref(), pointer, value)),
            ..self.clone()
        }
    }

    pub fn remove_property(&self, pointer: &JsonPointer) -> Self {
        Self {
            properties: self.properties.as_ref().map(|p| remove_in(p, pointer)),
            ..self.clone()
        }
    }

    pub fn set_desired_property(&self, pointer: &JsonPointer, value: Value) -> Self {
        Self {
            desired_properties: Some(set_in(self.desired_properties.as_ref(), pointer, value)),
            ..self.clone()
        }
    }

    pub fn remove_desired_property(&self, pointer: &JsonPointer) -> Self {
        Self {
            desired_properties: self
                .desired_properties
                .as_ref()
                .map(|p| remove_in(p, pointer)),
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Looks up a pointer inside an optional JSON object
pub(crate) fn get_in<'a>(object: Option<&'a JsonObject>, pointer: &JsonPointer) -> Option<&'a Value> {
    let (first, rest) = pointer.segments().split_first()?;
    let value = object?.get(first)?;
    JsonPointer::from_segments(rest.iter().cloned()).get(value)
}

/// Sets a pointer inside an optional JSON object, creating it when absent
///
/// Setting the root pointer replaces the object when the value is one.
pub(crate) fn set_in(object: Option<&JsonObject>, pointer: &JsonPointer, value: Value) -> JsonObject {
    let mut document = Value::Object(object.cloned().unwrap_or_default());
    pointer.set(&mut document, value);
    match document {
        Value::Object(updated) => updated,
        _ => object.cloned().unwrap_or_default(),
    }
}

/// Removes a pointer inside a JSON object
pub(crate) fn remove_in(object: &JsonObject, pointer: &JsonPointer) -> JsonObject {
    let mut document = Value::Object(object.clone());
    pointer.remove(&mut document);
    match document {
        Value::Object(updated) => updated,
        _ => object.clone(),
    }
}

/// Features of a thing, keyed by feature id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(BTreeMap<FeatureId, Feature>);

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.0.contains_key(id)
    }

    pub fn with_feature(&self, id: FeatureId, feature: Feature) -> Self {
        let mut features = self.0.clone();
        features.insert(id, feature);
        Self(features)
    }

    pub fn without_feature(&self, id: &FeatureId) -> Self {
        let mut features = self.0.clone();
        features.remove(id);
        Self(features)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureId, &Feature)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(FeatureId, Feature)> for Features {
    fn from_iter<T: IntoIterator<Item = (FeatureId, Feature)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pointer(raw: &str) -> JsonPointer {
        JsonPointer::parse(raw).unwrap()
    }

    #[test]
    fn test_feature_id_validation() {
        assert!(FeatureId::parse("lamp").is_ok());
        assert!(FeatureId::parse("").is_err());
        assert!(FeatureId::parse("a/b").is_err());
    }

    #[test]
    fn test_feature_properties() {
        let feature = Feature::new()
            .set_property(&pointer("/status/on"), json!(true))
            .set_desired_property(&pointer("/on"), json!(false));
        assert_eq!(feature.property(&pointer("/status/on")), Some(&json!(true)));
        assert_eq!(feature.desired_property(&pointer("/on")), Some(&json!(false)));

        let removed = feature.remove_property(&pointer("/status/on"));
        assert_eq!(removed.property(&pointer("/status/on")), None);
        assert_eq!(removed.properties, Some(json!({"status": {}}).as_object().unwrap().clone()));
    }

    #[test]
    fn test_feature_json() {
        let feature: Feature = serde_json::from_value(json!({
            "definition": ["org.example:lamp:1.0.0"],
            "properties": {"on": true},
            "desiredProperties": {"on": false}
        }))
        .unwrap();
        assert_eq!(feature.definition.as_ref().unwrap().identifiers().len(), 1);
        assert_eq!(
            feature.to_json(),
            json!({
                "definition": ["org.example:lamp:1.0.0"],
                "properties": {"on": true},
                "desiredProperties": {"on": false}
            })
        );
        assert_eq!(Feature::new().to_json(), json!({}));
    }

    #[test]
    fn test_empty_definition_is_rejected() {
        let result: Result<Feature, _> = serde_json::from_value(json!({"definition": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_features_are_values() {
        let id = FeatureId::parse("lamp").unwrap();
        let features = Features::new();
        let with = features.with_feature(id.clone(), Feature::new());
        assert!(features.is_empty());
        assert!(with.contains(&id));
        assert!(with.without_feature(&id).is_empty());
    }
}
