//! Policy service configuration

use policy_enforcer::ValidatorConfig;
use serde::{Deserialize, Serialize};

/// Default ceiling of a serialised policy, in bytes
pub const DEFAULT_MAX_POLICY_SIZE_BYTES: usize = 100 * 1024;

/// Settings of the policy command strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub max_policy_size_bytes: usize,
    /// Subject expiries are rounded up to a multiple of this; 0 keeps them as given
    pub subject_expiry_granularity_ms: u64,
    pub validator: ValidatorConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_policy_size_bytes: DEFAULT_MAX_POLICY_SIZE_BYTES,
            subject_expiry_granularity_ms: 0,
            validator: ValidatorConfig::default(),
        }
    }
}
