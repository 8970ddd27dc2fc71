//! Thing service configuration

use serde::{Deserialize, Serialize};

/// Default ceiling of a serialised thing, in bytes
pub const DEFAULT_MAX_THING_SIZE_BYTES: usize = 100 * 1024;

/// Settings of the thing command strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThingConfig {
    pub max_thing_size_bytes: usize,
}

impl Default for ThingConfig {
    fn default() -> Self {
        Self {
            max_thing_size_bytes: DEFAULT_MAX_THING_SIZE_BYTES,
        }
    }
}
