//! Cache key derivation.

use crate::api::EvaluationContext;
use crate::core::hash;

/// Prefix of every derived cache key.
pub const KEY_PREFIX: &str = "flag:";

/// Derive the cache key for a flag check.
///
/// Roles and groups are sorted before hashing so the key does not depend on
/// their order, and a missing user hashes the same as an empty one. Distinct
/// requests may collide on the 32-bit hash; such a false hit is accepted.
pub fn derive_key(name: &str, user: Option<&str>, roles: &[String], groups: &[String]) -> String {
    let mut roles: Vec<&str> = roles.iter().map(String::as_str).collect();
    let mut groups: Vec<&str> = groups.iter().map(String::as_str).collect();
    roles.sort_unstable();
    groups.sort_unstable();

    let roles = roles.join(",");
    let groups = groups.join(",");
    let canonical = [name, user.unwrap_or(""), roles.as_str(), groups.as_str()].join("|");

    format!("{}{}", KEY_PREFIX, hash::hash(&canonical))
}

/// Derive the cache key for a flag name and evaluation context.
pub fn context_key(name: &str, context: &EvaluationContext) -> String {
    derive_key(name, context.user(), &context.roles, &context.groups)
}
