//! Permission decisions over an indexed policy

use crate::tree::{PathNode, Resolution};
use core_types::{DomainError, PolicyId, Revision, Timestamp};
use identity::{AuthorizationContext, Subject, SubjectId};
use policy::{Permissions, Policy, ResourceKey};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Resource trees of one subject, keyed by resource type
type ResourceTrees = BTreeMap<String, PathNode>;

/// Decides permissions for one immutable policy snapshot
///
/// Built once per policy revision. Every entry naming a subject contributes
/// its resources to that subject's trees; decisions then walk the trees of
/// the subjects in the authorization context.
///
/// A request for several permissions is granted when each permission is
/// granted to at least one subject of the context. An empty permission set
/// is never granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEnforcer {
    policy_id: PolicyId,
    revision: Revision,
    subjects: BTreeMap<SubjectId, ResourceTrees>,
    expires_at: Option<Timestamp>,
}

impl PolicyEnforcer {
    /// Indexes all subjects of the policy
    pub fn new(policy: &Policy) -> Self {
        Self::build(policy, |_| true)
    }

    /// Indexes the subjects that are not expired at `now`
    ///
    /// The index goes stale at [`expires_at`](Self::expires_at).
    pub fn at(policy: &Policy, now: Timestamp) -> Self {
        Self::new(&policy.remove_expired_subjects(now))
    }

    /// Indexes only subjects without an expiry
    pub fn permanent_subjects_only(policy: &Policy) -> Self {
        Self::build(policy, Subject::is_permanent)
    }

    /// Builds an enforcer from a resolved policy document
    ///
    /// Any structural defect of the document fails the construction.
    pub fn from_document(document: &Value) -> Result<Self, DomainError> {
        let policy: Policy = serde_json::from_value(document.clone()).map_err(|err| {
            DomainError::InvalidPolicyStructure {
                reason: err.to_string(),
            }
        })?;
        Ok(Self::new(&policy))
    }

    fn build(policy: &Policy, include: impl Fn(&Subject) -> bool) -> Self {
        let mut subjects: BTreeMap<SubjectId, ResourceTrees> = BTreeMap::new();
        let mut expires_at: Option<Timestamp> = None;
        for entry in policy.entries() {
            for (subject_id, subject) in entry.subjects.iter() {
                if !include(subject) {
                    continue;
                }
                if let Some(expiry) = subject.expiry {
                    let expiry = expiry.timestamp();
                    expires_at = Some(expires_at.map_or(expiry, |earliest| earliest.min(expiry)));
                }
                let trees = subjects.entry(subject_id.clone()).or_default();
                for (key, permissions) in entry.resources.iter() {
                    trees
                        .entry(key.resource_type().to_string())
                        .or_default()
                        .insert(key.path(), permissions);
                }
            }
        }

        let node_count: usize = subjects
            .values()
            .flat_map(|trees| trees.values())
            .map(PathNode::node_count)
            .sum();
        debug!(
            policy_id = %policy.id(),
            revision = %policy.revision(),
            subjects = subjects.len(),
            nodes = node_count,
            "Built policy enforcer"
        );

        Self {
            policy_id: policy.id().clone(),
            revision: policy.revision(),
            subjects,
            expires_at,
        }
    }

    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Earliest expiry of an indexed subject, `None` when all are permanent
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Whether an indexed subject has expired at `now`
    pub fn is_stale(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Checks whether the context holds all permissions on the resource
    pub fn has_permission(
        &self,
        context: &AuthorizationContext,
        key: &ResourceKey,
        permissions: &Permissions,
    ) -> bool {
        self.decide(context, permissions, |trees, permission| {
            resolve(trees, key, permission).is_some_and(|r| r.is_granted())
        })
    }

    /// Like [`has_permission`](Self::has_permission), but also succeeds when
    /// some resource below the key is granted
    pub fn has_permission_on_resource_or_any_subresource(
        &self,
        context: &AuthorizationContext,
        key: &ResourceKey,
        permissions: &Permissions,
    ) -> bool {
        self.decide(context, permissions, |trees, permission| {
            granted_on_resource_or_below(trees, key, permission)
        })
    }

    /// Like [`has_permission`](Self::has_permission), but fails when the
    /// granting subject has a revoke anywhere below the key
    pub fn has_unrestricted_permission(
        &self,
        context: &AuthorizationContext,
        key: &ResourceKey,
        permissions: &Permissions,
    ) -> bool {
        self.decide(context, permissions, |trees, permission| {
            granted_unrestricted(trees, key, permission)
        })
    }

    /// Subjects holding all permissions exactly on the key
    pub fn subjects_with_permission(
        &self,
        key: &ResourceKey,
        permissions: &Permissions,
    ) -> BTreeSet<SubjectId> {
        self.subjects_where(permissions, |trees, permission| {
            resolve(trees, key, permission).is_some_and(|r| r.is_granted())
        })
    }

    /// Subjects holding all permissions on the key or somewhere below it
    pub fn subjects_with_partial_permission(
        &self,
        key: &ResourceKey,
        permissions: &Permissions,
    ) -> BTreeSet<SubjectId> {
        self.subjects_where(permissions, |trees, permission| {
            granted_on_resource_or_below(trees, key, permission)
        })
    }

    /// Subjects holding all permissions on the whole subtree of the key
    pub fn subjects_with_unrestricted_permission(
        &self,
        key: &ResourceKey,
        permissions: &Permissions,
    ) -> BTreeSet<SubjectId> {
        self.subjects_where(permissions, |trees, permission| {
            granted_unrestricted(trees, key, permission)
        })
    }

    fn decide(
        &self,
        context: &AuthorizationContext,
        permissions: &Permissions,
        granted: impl Fn(&ResourceTrees, &str) -> bool,
    ) -> bool {
        if permissions.is_empty() {
            return false;
        }
        let trees: Vec<&ResourceTrees> = context
            .subject_ids()
            .filter_map(|id| self.subjects.get(id))
            .collect();
        permissions
            .iter()
            .all(|permission| trees.iter().any(|t| granted(t, permission)))
    }

    fn subjects_where(
        &self,
        permissions: &Permissions,
        granted: impl Fn(&ResourceTrees, &str) -> bool,
    ) -> BTreeSet<SubjectId> {
        if permissions.is_empty() {
            return BTreeSet::new();
        }
        self.subjects
            .iter()
            .filter(|(_, trees)| permissions.iter().all(|p| granted(trees, p)))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn resolve<'a>(
    trees: &'a ResourceTrees,
    key: &ResourceKey,
    permission: &str,
) -> Option<Resolution<'a>> {
    trees
        .get(key.resource_type())
        .map(|root| root.resolve(key.path(), permission))
}

fn granted_on_resource_or_below(trees: &ResourceTrees, key: &ResourceKey, permission: &str) -> bool {
    resolve(trees, key, permission).is_some_and(|resolution| {
        resolution.is_granted()
            || resolution
                .node
                .is_some_and(|node| node.any_granted_below(resolution.effect, permission))
    })
}

fn granted_unrestricted(trees: &ResourceTrees, key: &ResourceKey, permission: &str) -> bool {
    resolve(trees, key, permission).is_some_and(|resolution| {
        resolution.is_granted()
            && !resolution
                .node
                .is_some_and(|node| node.any_revoked_below(permission))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::JsonPointer;
    use policy::{EffectedPermissions, Label, PolicyEntry, Resources, Subjects};
    use serde_json::json;

    fn subject_id(raw: &str) -> SubjectId {
        SubjectId::parse(raw).unwrap()
    }

    fn key(raw: &str) -> ResourceKey {
        ResourceKey::parse(raw).unwrap()
    }

    fn context(ids: &[&str]) -> AuthorizationContext {
        AuthorizationContext::parse(ids.iter().copied()).unwrap()
    }

    fn entry(label: &str, subjects: &[&str], resources: &[(&str, EffectedPermissions)]) -> PolicyEntry {
        PolicyEntry::new(
            Label::parse(label).unwrap(),
            subjects
                .iter()
                .map(|s| (subject_id(s), Subject::default()))
                .collect::<Subjects>(),
            resources
                .iter()
                .map(|(k, p)| (key(k), p.clone()))
                .collect::<Resources>(),
        )
    }

    fn enforcer(entries: Vec<PolicyEntry>) -> PolicyEnforcer {
        let policy = Policy::from_entries(PolicyId::parse("org.example:p").unwrap(), entries).unwrap();
        PolicyEnforcer::new(&policy)
    }

    fn owner_support() -> PolicyEnforcer {
        enforcer(vec![
            entry(
                "owner",
                &["s:alice"],
                &[("thing:/", EffectedPermissions::granting(Permissions::read_write()))],
            ),
            entry(
                "support",
                &["s:alice"],
                &[
                    ("thing:/attributes", EffectedPermissions::revoking(Permissions::write())),
                    (
                        "thing:/attributes/temperature",
                        EffectedPermissions::granting(Permissions::write()),
                    ),
                ],
            ),
        ])
    }

    #[test]
    fn test_owner_support_example() {
        let enforcer = owner_support();
        let alice = context(&["s:alice"]);
        let write = Permissions::write();
        assert!(!enforcer.has_permission(&alice, &key("thing:/attributes"), &write));
        assert!(enforcer.has_permission(&alice, &key("thing:/attributes/temperature"), &write));
        assert!(enforcer.has_permission(&alice, &key("thing:/features"), &write));
        assert!(enforcer.has_permission(&alice, &key("thing:/attributes"), &Permissions::read()));
    }

    #[test]
    fn test_unknown_subject_and_resource_type_are_denied() {
        let enforcer = owner_support();
        assert!(!enforcer.has_permission(
            &context(&["s:bob"]),
            &key("thing:/"),
            &Permissions::read()
        ));
        assert!(!enforcer.has_permission(
            &context(&["s:alice"]),
            &key("policy:/"),
            &Permissions::read()
        ));
        assert!(!enforcer.has_permission(&context(&[]), &key("thing:/"), &Permissions::read()));
    }

    #[test]
    fn test_empty_permissions_are_never_granted() {
        let enforcer = owner_support();
        assert!(!enforcer.has_permission(&context(&["s:alice"]), &key("thing:/"), &Permissions::new()));
        assert!(enforcer
            .subjects_with_permission(&key("thing:/"), &Permissions::new())
            .is_empty());
    }

    #[test]
    fn test_revoke_wins_across_entries_at_same_depth() {
        let enforcer = enforcer(vec![
            entry(
                "grant",
                &["s:alice"],
                &[("thing:/features", EffectedPermissions::granting(Permissions::read()))],
            ),
            entry(
                "revoke",
                &["s:alice"],
                &[("thing:/features", EffectedPermissions::revoking(Permissions::read()))],
            ),
        ]);
        assert!(!enforcer.has_permission(
            &context(&["s:alice"]),
            &key("thing:/features"),
            &Permissions::read()
        ));
    }

    #[test]
    fn test_or_across_subjects() {
        let enforcer = enforcer(vec![
            entry(
                "a",
                &["s:a"],
                &[("thing:/", EffectedPermissions::revoking(Permissions::read()))],
            ),
            entry(
                "b",
                &["s:b"],
                &[("thing:/", EffectedPermissions::granting(Permissions::read()))],
            ),
        ]);
        assert!(enforcer.has_permission(&context(&["s:a", "s:b"]), &key("thing:/x"), &Permissions::read()));
        assert!(!enforcer.has_permission(&context(&["s:a"]), &key("thing:/x"), &Permissions::read()));
    }

    #[test]
    fn test_permissions_may_come_from_different_subjects() {
        let enforcer = enforcer(vec![
            entry(
                "reader",
                &["s:reader"],
                &[("thing:/", EffectedPermissions::granting(Permissions::read()))],
            ),
            entry(
                "writer",
                &["s:writer"],
                &[("thing:/", EffectedPermissions::granting(Permissions::write()))],
            ),
        ]);
        let both = context(&["s:reader", "s:writer"]);
        assert!(enforcer.has_permission(&both, &key("thing:/"), &Permissions::read_write()));
        assert!(enforcer
            .subjects_with_permission(&key("thing:/"), &Permissions::read_write())
            .is_empty());
    }

    #[test]
    fn test_resource_or_any_subresource() {
        let enforcer = enforcer(vec![entry(
            "partial",
            &["s:alice"],
            &[
                ("thing:/attributes", EffectedPermissions::revoking(Permissions::read())),
                (
                    "thing:/attributes/public",
                    EffectedPermissions::granting(Permissions::read()),
                ),
            ],
        )]);
        let alice = context(&["s:alice"]);
        let read = Permissions::read();
        assert!(!enforcer.has_permission(&alice, &key("thing:/"), &read));
        assert!(enforcer.has_permission_on_resource_or_any_subresource(&alice, &key("thing:/"), &read));
        assert!(enforcer.has_permission_on_resource_or_any_subresource(
            &alice,
            &key("thing:/attributes"),
            &read
        ));
        assert!(!enforcer.has_permission_on_resource_or_any_subresource(
            &alice,
            &key("thing:/features"),
            &read
        ));
    }

    #[test]
    fn test_unrestricted_permission() {
        let enforcer = owner_support();
        let alice = context(&["s:alice"]);
        let write = Permissions::write();
        assert!(enforcer.has_permission(&alice, &key("thing:/"), &write));
        assert!(!enforcer.has_unrestricted_permission(&alice, &key("thing:/"), &write));
        assert!(enforcer.has_unrestricted_permission(&alice, &key("thing:/features"), &write));
        assert!(enforcer.has_unrestricted_permission(&alice, &key("thing:/"), &Permissions::read()));
    }

    #[test]
    fn test_subject_sets() {
        let enforcer = enforcer(vec![
            entry(
                "owner",
                &["s:owner"],
                &[("thing:/", EffectedPermissions::granting(Permissions::read_write()))],
            ),
            entry(
                "partial",
                &["s:partial"],
                &[("thing:/attributes/x", EffectedPermissions::granting(Permissions::read()))],
            ),
        ]);
        let root = key("thing:/");
        let read = Permissions::read();
        assert_eq!(
            enforcer.subjects_with_permission(&root, &read),
            BTreeSet::from([subject_id("s:owner")])
        );
        assert_eq!(
            enforcer.subjects_with_partial_permission(&root, &read),
            BTreeSet::from([subject_id("s:owner"), subject_id("s:partial")])
        );
        assert_eq!(
            enforcer.subjects_with_unrestricted_permission(&root, &read),
            BTreeSet::from([subject_id("s:owner")])
        );
    }

    #[test]
    fn test_permanent_subjects_only() {
        use core_types::Timestamp;
        use identity::SubjectExpiry;

        let policy = Policy::new(PolicyId::parse("org.example:p").unwrap())
            .set_subject_for(
                &Label::parse("temp").unwrap(),
                subject_id("s:temp"),
                Subject::new("jwt").with_expiry(SubjectExpiry::new(Timestamp::from_millis(5))),
            )
            .set_resource_for(
                &Label::parse("temp").unwrap(),
                ResourceKey::policy(JsonPointer::root()),
                EffectedPermissions::granting(Permissions::write()),
            );
        let all = PolicyEnforcer::new(&policy);
        let permanent = PolicyEnforcer::permanent_subjects_only(&policy);
        let root = ResourceKey::policy(JsonPointer::root());
        assert_eq!(all.subjects_with_permission(&root, &Permissions::write()).len(), 1);
        assert!(permanent
            .subjects_with_permission(&root, &Permissions::write())
            .is_empty());
    }

    #[test]
    fn test_from_document() {
        let enforcer = PolicyEnforcer::from_document(&json!({
            "policyId": "org.example:p",
            "_revision": 4,
            "entries": {
                "owner": {
                    "subjects": {"s:alice": {"type": "generated"}},
                    "resources": {"thing:/": {"grant": ["READ"], "revoke": []}}
                }
            }
        }))
        .unwrap();
        assert_eq!(enforcer.revision(), Revision::new(4));
        assert!(enforcer.has_permission(&context(&["s:alice"]), &key("thing:/a"), &Permissions::read()));
    }

    #[test]
    fn test_from_document_fails_fast_on_structural_defects() {
        let bad_key = json!({
            "policyId": "org.example:p",
            "entries": {"owner": {"resources": {"missing-colon": {"grant": ["READ"]}}}}
        });
        let bad_label = json!({
            "policyId": "org.example:p",
            "entries": {"": {}}
        });
        let bad_entries = json!({"policyId": "org.example:p", "entries": ["owner"]});
        for document in [bad_key, bad_label, bad_entries] {
            assert!(matches!(
                PolicyEnforcer::from_document(&document),
                Err(DomainError::InvalidPolicyStructure { .. })
            ));
        }
    }

    #[test]
    fn test_from_document_rejects_equivalent_resource_keys() {
        let document = json!({
            "policyId": "org.example:p",
            "entries": {
                "owner": {
                    "subjects": {"s:alice": {"type": "generated"}},
                    "resources": {
                        "thing:/attributes": {"grant": [], "revoke": ["READ"]},
                        "thing:attributes/": {"grant": ["READ"], "revoke": []}
                    }
                }
            }
        });
        let Err(DomainError::InvalidPolicyStructure { reason }) = PolicyEnforcer::from_document(&document) else {
            panic!("equivalent resource keys must not be merged");
        };
        assert!(reason.contains("duplicate resource key"), "{}", reason);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn path() -> impl Strategy<Value = Vec<String>> {
            prop::collection::vec("[a-z]{1,6}", 0..5)
        }

        proptest! {
            #[test]
            fn revoke_at_root_denies_everything_below(segments in path()) {
                let enforcer = enforcer(vec![
                    entry("owner", &["s:alice"], &[("thing:/", EffectedPermissions::revoking(Permissions::write()))]),
                    entry("other", &["s:alice"], &[("thing:/", EffectedPermissions::granting(Permissions::write()))]),
                ]);
                let resource = ResourceKey::thing(JsonPointer::from_segments(segments));
                prop_assert!(!enforcer.has_permission(&context(&["s:alice"]), &resource, &Permissions::write()));
            }

            #[test]
            fn root_grant_without_revoke_is_unrestricted(segments in path()) {
                let enforcer = enforcer(vec![entry(
                    "owner",
                    &["s:alice"],
                    &[("thing:/", EffectedPermissions::granting(Permissions::read()))],
                )]);
                let resource = ResourceKey::thing(JsonPointer::from_segments(segments));
                let alice = context(&["s:alice"]);
                prop_assert!(enforcer.has_permission(&alice, &resource, &Permissions::read()));
                prop_assert!(enforcer.has_unrestricted_permission(&alice, &resource, &Permissions::read()));
            }
        }
    }
}
