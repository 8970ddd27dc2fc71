//! JSON pointers
//!
//! Pointers address fields inside JSON documents (`/attributes/location/lat`)
//! and double as the path part of policy resource keys. `/` is the root.

use crate::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A slash-delimited path into a JSON document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The root pointer `/`
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a pointer
    ///
    /// A missing leading slash is tolerated and empty segments are dropped,
    /// so `a//b`, `/a/b/` and `/a/b` all denote the same path. `~1` and `~0`
    /// are unescaped to `/` and `~`.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let segments = raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| unescape(segment, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Creates a pointer from already unescaped segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|segment: &String| !segment.is_empty())
                .collect(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; the root has level 0
    pub fn level_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns a new pointer with `segment` appended
    pub fn append(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        let segment = segment.into();
        if !segment.is_empty() {
            segments.push(segment);
        }
        Self { segments }
    }

    /// Returns a new pointer with all segments of `other` appended
    pub fn join(&self, other: &JsonPointer) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Returns the parent pointer, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Checks whether `prefix` is an ancestor of, or equal to, this pointer
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Looks up the value this pointer addresses
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| current.as_object()?.get(segment))
    }

    /// Sets the addressed value, creating intermediate objects on the way
    ///
    /// Intermediate values that are not objects are replaced. Setting the root
    /// replaces the whole document.
    pub fn set(&self, target: &mut Value, new_value: Value) {
        let Some((last, parents)) = self.segments.split_last() else {
            *target = new_value;
            return;
        };
        let mut current = target;
        for segment in parents {
            current = ensure_object(current)
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(current).insert(last.clone(), new_value);
    }

    /// Removes the addressed value and returns it
    ///
    /// Removing the root is not supported and returns `None`.
    pub fn remove(&self, target: &mut Value) -> Option<Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = target;
        for segment in parents {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        current.as_object_mut()?.remove(last)
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

fn unescape(segment: &str, raw: &str) -> Result<String, DomainError> {
    if !segment.contains('~') {
        return Ok(segment.to_string());
    }
    let mut result = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => result.push('~'),
                Some('1') => result.push('/'),
                _ => {
                    return Err(DomainError::JsonPointerInvalid {
                        pointer: raw.to_string(),
                        reason: "'~' must be followed by '0' or '1'".to_string(),
                    })
                }
            }
        } else {
            result.push(c);
        }
    }
    Ok(result)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JsonPointer> for String {
    fn from(pointer: JsonPointer) -> Self {
        pointer.to_string()
    }
}
