//! Policy entries with their subjects and resources

use crate::{EffectedPermissions, Label, ResourceKey};
use core_types::Timestamp;
use identity::{Subject, SubjectId};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::marker::PhantomData;

/// Subjects of a policy entry, keyed by subject id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Subjects(BTreeMap<SubjectId, Subject>);

impl Subjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, subject_id: &SubjectId) -> Option<&Subject> {
        self.0.get(subject_id)
    }

    pub fn contains(&self, subject_id: &SubjectId) -> bool {
        self.0.contains_key(subject_id)
    }

    /// Returns a copy with the subject added or replaced
    pub fn with_subject(&self, subject_id: SubjectId, subject: Subject) -> Self {
        let mut subjects = self.0.clone();
        subjects.insert(subject_id, subject);
        Self(subjects)
    }

    /// Returns a copy without the subject
    pub fn without_subject(&self, subject_id: &SubjectId) -> Self {
        let mut subjects = self.0.clone();
        subjects.remove(subject_id);
        Self(subjects)
    }

    /// Returns a copy without the subjects expired at `now`
    pub fn without_expired(&self, now: Timestamp) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, subject)| !subject.is_expired(now))
                .map(|(id, subject)| (id.clone(), subject.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubjectId, &Subject)> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &SubjectId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(SubjectId, Subject)> for Subjects {
    fn from_iter<T: IntoIterator<Item = (SubjectId, Subject)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resources of a policy entry, keyed by resource key
///
/// Keys are normalised on parsing, so two spellings of the same key in one
/// document are rejected instead of one silently replacing the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Resources(BTreeMap<ResourceKey, EffectedPermissions>);

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&EffectedPermissions> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.0.contains_key(key)
    }

    /// Returns a copy with the resource added or replaced
    pub fn with_resource(&self, key: ResourceKey, permissions: EffectedPermissions) -> Self {
        let mut resources = self.0.clone();
        resources.insert(key, permissions);
        Self(resources)
    }

    /// Returns a copy without the resource
    pub fn without_resource(&self, key: &ResourceKey) -> Self {
        let mut resources = self.0.clone();
        resources.remove(key);
        Self(resources)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &EffectedPermissions)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ResourceKey, EffectedPermissions)> for Resources {
    fn from_iter<T: IntoIterator<Item = (ResourceKey, EffectedPermissions)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for Subjects {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(UniqueKeys::new("subject id"))
            .map(Self)
    }
}

impl<'de> Deserialize<'de> for Resources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(UniqueKeys::new("resource key"))
            .map(Self)
    }
}

/// Reads a map whose parsed keys must be unique
struct UniqueKeys<K, V> {
    key_name: &'static str,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> UniqueKeys<K, V> {
    fn new(key_name: &'static str) -> Self {
        Self {
            key_name,
            marker: PhantomData,
        }
    }
}

impl<'de, K, V> Visitor<'de> for UniqueKeys<K, V>
where
    K: Deserialize<'de> + Ord + fmt::Display,
    V: Deserialize<'de>,
{
    type Value = BTreeMap<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a map keyed by {}", self.key_name)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            match map.entry(key) {
                Entry::Occupied(occupied) => {
                    return Err(de::Error::custom(format!(
                        "duplicate {} '{}'",
                        self.key_name,
                        occupied.key()
                    )))
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(value);
                }
            }
        }
        Ok(map)
    }
}

/// A labeled bundle of subjects and the resources granted or revoked to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub label: Label,
    #[serde(default)]
    pub subjects: Subjects,
    #[serde(default)]
    pub resources: Resources,
}

impl PolicyEntry {
    pub fn new(label: Label, subjects: Subjects, resources: Resources) -> Self {
        Self {
            label,
            subjects,
            resources,
        }
    }

    /// An entry without subjects and resources
    pub fn empty(label: Label) -> Self {
        Self::new(label, Subjects::new(), Resources::new())
    }

    pub fn with_subjects(&self, subjects: Subjects) -> Self {
        Self::new(self.label.clone(), subjects, self.resources.clone())
    }

    pub fn with_resources(&self, resources: Resources) -> Self {
        Self::new(self.label.clone(), self.subjects.clone(), resources)
    }

    /// Body of the entry as it appears under its label in a policy document
    pub fn to_json(&self) -> Value {
        // string-keyed maps of plain values always serialise
        serde_json::json!({
            "subjects": serde_json::to_value(&self.subjects).unwrap_or(Value::Null),
            "resources": serde_json::to_value(&self.resources).unwrap_or(Value::Null),
        })
    }
}
