//! Minimum-permission invariant of policies

use crate::{PolicyEnforcer, ValidatorConfig};
use policy::Policy;
use tracing::debug;

/// Checks that a policy keeps at least one permanent administrator
///
/// A policy is valid when at least one subject without an expiry holds all
/// required permissions on the root resource. Expiring subjects do not count,
/// since the policy would become unmanageable once they expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoliciesValidator {
    reason: Option<String>,
}

impl PoliciesValidator {
    pub fn new(policy: &Policy, config: &ValidatorConfig) -> Self {
        let enforcer = PolicyEnforcer::permanent_subjects_only(policy);
        let holders =
            enforcer.subjects_with_permission(&config.root_resource, &config.required_permissions);
        if !holders.is_empty() {
            return Self { reason: None };
        }

        debug!(
            policy_id = %policy.id(),
            root = %config.root_resource,
            "Policy lacks a permanent subject with the required permissions"
        );
        Self {
            reason: Some(format!(
                "It must contain at least one permanent Subject with permission(s) {} on resource '{}'.",
                config.required_permissions, config.root_resource
            )),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.reason.is_none()
    }

    /// Why the policy is invalid; `None` for valid policies
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}
