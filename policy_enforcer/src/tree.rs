//! Per-subject path trees

use core_types::JsonPointer;
use policy::EffectedPermissions;
use std::collections::{BTreeMap, BTreeSet};

/// What a single node says about one permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    Granted,
    Revoked,
}

/// One path segment of a resource tree
///
/// Grants and revokes of all entries naming the same subject are merged into
/// the same node, so a revoke from one entry and a grant from another at the
/// same depth collapse into a revoke.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PathNode {
    grant: BTreeSet<String>,
    revoke: BTreeSet<String>,
    children: BTreeMap<String, PathNode>,
}

/// Outcome of walking a path for one permission
pub(crate) struct Resolution<'a> {
    /// Deepest effect found on the ancestor-or-self chain
    pub effect: Option<Effect>,
    /// The node at the path, if the tree reaches that deep
    pub node: Option<&'a PathNode>,
}

impl Resolution<'_> {
    pub fn is_granted(&self) -> bool {
        self.effect == Some(Effect::Granted)
    }
}

impl PathNode {
    pub fn insert(&mut self, path: &JsonPointer, permissions: &EffectedPermissions) {
        let node = path
            .segments()
            .iter()
            .fold(self, |node, segment| {
                node.children.entry(segment.clone()).or_default()
            });
        node.grant
            .extend(permissions.grant.iter().map(str::to_string));
        node.revoke
            .extend(permissions.revoke.iter().map(str::to_string));
    }

    fn effect(&self, permission: &str) -> Option<Effect> {
        if self.revoke.contains(permission) {
            Some(Effect::Revoked)
        } else if self.grant.contains(permission) {
            Some(Effect::Granted)
        } else {
            None
        }
    }

    /// Walks from this node (the root) down to `path`
    pub fn resolve(&self, path: &JsonPointer, permission: &str) -> Resolution<'_> {
        let mut effect = self.effect(permission);
        let mut node = Some(self);
        for segment in path.segments() {
            node = node.and_then(|n| n.children.get(segment));
            match node {
                Some(n) => effect = n.effect(permission).or(effect),
                None => break,
            }
        }
        Resolution { effect, node }
    }

    /// Whether some descendant ends up granted, starting from `inherited`
    pub fn any_granted_below(&self, inherited: Option<Effect>, permission: &str) -> bool {
        self.children.values().any(|child| {
            let effect = child.effect(permission).or(inherited);
            effect == Some(Effect::Granted) || child.any_granted_below(effect, permission)
        })
    }

    /// Whether some descendant revokes the permission
    pub fn any_revoked_below(&self, permission: &str) -> bool {
        self.children
            .values()
            .any(|child| child.revoke.contains(permission) || child.any_revoked_below(permission))
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .values()
            .map(PathNode::node_count)
            .sum::<usize>()
    }
}
