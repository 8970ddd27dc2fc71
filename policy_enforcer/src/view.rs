//! Filtering JSON documents down to their readable parts

use crate::PolicyEnforcer;
use core_types::JsonPointer;
use identity::AuthorizationContext;
use policy::{Permissions, ResourceKey};
use serde_json::{Map, Value};

impl PolicyEnforcer {
    /// Returns the parts of `document` the context holds `permissions` on
    ///
    /// Every field is addressed as `<resource_type>:<pointer to the field>`.
    /// Leaves (including arrays) are kept when permitted. Objects are kept
    /// when one of their fields survives, or when they are empty and
    /// permitted. A document without any readable part becomes `{}`.
    pub fn build_json_view(
        &self,
        resource_type: &str,
        document: &Value,
        context: &AuthorizationContext,
        permissions: &Permissions,
    ) -> Value {
        let filter = ViewFilter {
            enforcer: self,
            resource_type,
            context,
            permissions,
        };
        filter
            .filter(&JsonPointer::root(), document)
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Like [`build_json_view`](Self::build_json_view) for a value located
    /// at `key` rather than at the root
    ///
    /// Returns `None` when no part of the value is readable.
    pub fn build_json_view_at(
        &self,
        key: &ResourceKey,
        value: &Value,
        context: &AuthorizationContext,
        permissions: &Permissions,
    ) -> Option<Value> {
        let filter = ViewFilter {
            enforcer: self,
            resource_type: key.resource_type(),
            context,
            permissions,
        };
        filter.filter(key.path(), value)
    }
}

struct ViewFilter<'a> {
    enforcer: &'a PolicyEnforcer,
    resource_type: &'a str,
    context: &'a AuthorizationContext,
    permissions: &'a Permissions,
}

impl ViewFilter<'_> {
    fn permitted(&self, pointer: &JsonPointer) -> bool {
        // resource types are validated on key construction; an invalid one
        // cannot be granted
        ResourceKey::new(self.resource_type, pointer.clone()).is_ok_and(|key| {
            self.enforcer
                .has_permission(self.context, &key, self.permissions)
        })
    }

    fn filter(&self, pointer: &JsonPointer, value: &Value) -> Option<Value> {
        match value {
            Value::Object(fields) if !fields.is_empty() => {
                let visible: Map<String, Value> = fields
                    .iter()
                    .filter_map(|(name, child)| {
                        self.filter(&pointer.append(name.as_str()), child)
                            .map(|child| (name.clone(), child))
                    })
                    .collect();
                if visible.is_empty() {
                    None
                } else {
                    Some(Value::Object(visible))
                }
            }
            _ if self.permitted(pointer) => Some(value.clone()),
            _ => None,
        }
    }
}
