//! Enforcer configuration
//!
//! Defaults are baked in; hosts override individual fields through serde.

use core_types::JsonPointer;
use policy::{Permissions, ResourceKey};
use serde::{Deserialize, Serialize};

/// Default capacity of the enforcer cache
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;

/// Settings of [`EnforcerCache`](crate::EnforcerCache)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcerCacheConfig {
    /// Maximum number of cached enforcers; 0 disables caching
    pub max_entries: usize,
}

impl Default for EnforcerCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

/// Settings of [`PoliciesValidator`](crate::PoliciesValidator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// The resource a permanent subject must hold the permissions on
    pub root_resource: ResourceKey,
    /// The permissions that subject must hold
    pub required_permissions: Permissions,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            root_resource: ResourceKey::policy(JsonPointer::root()),
            required_permissions: Permissions::write(),
        }
    }
}
