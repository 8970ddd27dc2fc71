//! Entity size limits

use core_types::{DomainError, Headers, JsonPointer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guarded {
    Policies,
    Things,
}

/// Rejects modifications that would push an entity over its size limit
///
/// The size of an entity is the byte length of its compact JSON form plus
/// the metadata the command attaches to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    guarded: Guarded,
    max_bytes: usize,
}

impl SizeGuard {
    pub fn policies(max_bytes: usize) -> Self {
        Self {
            guarded: Guarded::Policies,
            max_bytes,
        }
    }

    pub fn things(max_bytes: usize) -> Self {
        Self {
            guarded: Guarded::Things,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks `entity` with `proposed` (pointer and new value) applied
    ///
    /// A root pointer replaces the whole document.
    pub fn ensure_valid_size(
        &self,
        entity: &Value,
        proposed: Option<(&JsonPointer, &Value)>,
        headers: &Headers,
    ) -> Result<(), DomainError> {
        let actual = match proposed {
            Some((pointer, value)) => {
                let mut document = entity.clone();
                pointer.set(&mut document, value.clone());
                document.to_string().len()
            }
            None => entity.to_string().len(),
        } + headers
            .metadata
            .as_ref()
            .map_or(0, |metadata| metadata.to_string().len());

        if actual <= self.max_bytes {
            return Ok(());
        }
        let max = self.max_bytes;
        Err(match self.guarded {
            Guarded::Policies => DomainError::PolicyTooLarge { actual, max },
            Guarded::Things => DomainError::ThingTooLarge { actual, max },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_entity_passes() {
        let guard = SizeGuard::things(64);
        assert!(guard
            .ensure_valid_size(&json!({"a": 1}), None, &Headers::new())
            .is_ok());
    }

    #[test]
    fn test_proposed_field_is_measured() {
        let guard = SizeGuard::things(32);
        let entity = json!({"attributes": {}});
        let pointer = JsonPointer::parse("/attributes/blob").unwrap();
        let blob = json!("x".repeat(40));
        let err = guard
            .ensure_valid_size(&entity, Some((&pointer, &blob)), &Headers::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::ThingTooLarge { max: 32, .. }));
        assert_eq!(err.status().as_u16(), 413);
    }

    #[test]
    fn test_root_pointer_replaces_document() {
        let guard = SizeGuard::policies(16);
        let huge = json!({"entries": "x".repeat(100)});
        let small = json!({});
        assert!(guard
            .ensure_valid_size(&huge, Some((&JsonPointer::root(), &small)), &Headers::new())
            .is_ok());
    }

    #[test]
    fn test_metadata_counts() {
        let guard = SizeGuard::policies(20);
        let headers = Headers::new().with_metadata(json!({"note": "x".repeat(20)}));
        assert!(matches!(
            guard.ensure_valid_size(&json!({}), None, &headers),
            Err(DomainError::PolicyTooLarge { .. })
        ));
    }
}
