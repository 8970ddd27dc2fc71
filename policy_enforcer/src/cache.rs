//! Revision-keyed enforcer cache

use crate::{EnforcerCacheConfig, PolicyEnforcer};
use core_types::{PolicyId, Revision, Timestamp};
use parking_lot::RwLock;
use policy::Policy;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// Shares built enforcers between requests
///
/// An entry is only served for the exact revision it was built from; any
/// other revision rebuilds. Enforcers leave out subjects expired at the
/// lookup time and are rebuilt once one of their subjects expires. The lock
/// is never held while an enforcer is built. Deleted policies are never
/// cached and yield no enforcer.
#[derive(Debug)]
pub struct EnforcerCache {
    config: EnforcerCacheConfig,
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<PolicyId, CachedEnforcer>,
    insertion_order: VecDeque<PolicyId>,
}

#[derive(Debug)]
struct CachedEnforcer {
    revision: Revision,
    enforcer: Arc<PolicyEnforcer>,
}

impl EnforcerCache {
    pub fn new(config: EnforcerCacheConfig) -> Self {
        Self {
            config,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Returns the enforcer for this policy snapshot at `now`, building it on a miss
    ///
    /// Returns `None` for deleted policies.
    pub fn get_or_build(&self, policy: &Policy, now: Timestamp) -> Option<Arc<PolicyEnforcer>> {
        if policy.is_deleted() {
            self.invalidate(policy.id());
            return None;
        }

        if let Some(cached) = self.state.read().entries.get(policy.id()) {
            if cached.revision == policy.revision() && !cached.enforcer.is_stale(now) {
                trace!(policy_id = %policy.id(), revision = %cached.revision, "Enforcer cache hit");
                return Some(Arc::clone(&cached.enforcer));
            }
        }

        let enforcer = Arc::new(PolicyEnforcer::at(policy, now));
        debug!(
            policy_id = %policy.id(),
            revision = %policy.revision(),
            "Enforcer cache rebuilt"
        );
        self.insert(policy.id().clone(), policy.revision(), Arc::clone(&enforcer));
        Some(enforcer)
    }

    /// Revision of the cached enforcer of a policy, if any
    pub fn cached_revision(&self, policy_id: &PolicyId) -> Option<Revision> {
        self.state
            .read()
            .entries
            .get(policy_id)
            .map(|cached| cached.revision)
    }

    pub fn invalidate(&self, policy_id: &PolicyId) {
        let mut state = self.state.write();
        if state.entries.remove(policy_id).is_some() {
            state.insertion_order.retain(|id| id != policy_id);
            debug!(policy_id = %policy_id, "Enforcer cache entry invalidated");
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, policy_id: PolicyId, revision: Revision, enforcer: Arc<PolicyEnforcer>) {
        if self.config.max_entries == 0 {
            return;
        }
        let mut state = self.state.write();
        if state.entries.contains_key(&policy_id) {
            state.insertion_order.retain(|id| id != &policy_id);
        }
        state.insertion_order.push_back(policy_id.clone());
        state
            .entries
            .insert(policy_id, CachedEnforcer { revision, enforcer });

        while state.entries.len() > self.config.max_entries {
            match state.insertion_order.pop_front() {
                Some(evicted) => {
                    state.entries.remove(&evicted);
                    trace!(policy_id = %evicted, "Enforcer cache entry evicted");
                }
                None => break,
            }
        }
    }
}

impl Default for EnforcerCache {
    fn default() -> Self {
        Self::new(EnforcerCacheConfig::default())
    }
}
