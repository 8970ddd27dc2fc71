//! Scenario Test Utilities
//!
//! This crate provides shared fixtures for the cross-crate scenario tests.
//!
//! ## Test Philosophy
//!
//! - **Decisions are scenarios**: every enforcer test states who holds what where, and the expected answer
//! - **Replay is the truth**: state rebuilt from the journal must equal the live state
//! - **Invariants hold after every success**: no accepted command may break a policy

use core_types::{PolicyId, ThingId, Timestamp};
use event_sourcing::Context;
use identity::{AuthorizationContext, Subject, SubjectId};
use policy::{EffectedPermissions, Label, Permissions, Policy, ResourceKey};

pub fn policy_id() -> PolicyId {
    PolicyId::parse("org.example:scenario").unwrap()
}

pub fn thing_id() -> ThingId {
    ThingId::parse("org.example:scenario").unwrap()
}

pub fn label(raw: &str) -> Label {
    Label::parse(raw).unwrap()
}

pub fn subject_id(raw: &str) -> SubjectId {
    SubjectId::parse(raw).unwrap()
}

pub fn key(raw: &str) -> ResourceKey {
    ResourceKey::parse(raw).unwrap()
}

pub fn permissions(names: &[&str]) -> Permissions {
    Permissions::parse(names.iter().copied()).unwrap()
}

/// An authorization context of the given subject ids
pub fn context(subjects: &[&str]) -> AuthorizationContext {
    AuthorizationContext::parse(subjects.iter().copied()).unwrap()
}

pub fn at(millis: u64) -> Context {
    Context::at(Timestamp::from_millis(millis))
}

/// Adds `subject` to the entry and grants/revokes on `resource`
///
/// ```ignore
/// let policy = entry(Policy::new(policy_id()), "owner", "s:alice", "thing:/", &["READ"], &[]);
/// ```
pub fn entry(
    policy: Policy,
    entry_label: &str,
    subject: &str,
    resource: &str,
    grant: &[&str],
    revoke: &[&str],
) -> Policy {
    let entry_label = label(entry_label);
    policy
        .set_subject_for(&entry_label, subject_id(subject), Subject::default())
        .set_resource_for(
            &entry_label,
            key(resource),
            EffectedPermissions::new(permissions(grant), permissions(revoke)),
        )
}

/// A valid policy: `s:admin` holds `READ` and `WRITE` on `policy:/` and `thing:/`
pub fn admin_policy() -> Policy {
    let policy = entry(
        Policy::new(policy_id()),
        "admin",
        "s:admin",
        "policy:/",
        &["READ", "WRITE"],
        &[],
    );
    entry(policy, "admin", "s:admin", "thing:/", &["READ", "WRITE"], &[])
}
