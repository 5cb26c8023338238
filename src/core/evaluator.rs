//! Rule evaluator implementation.

use crate::api::EvaluationContext;
use crate::core::hash;
use crate::flag::Flag;

use serde::{Deserialize, Serialize};

/// Why a flag evaluated the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchReason {
    /// The everyone override decided the result
    Everyone,
    /// The user is on the flag's allow-list
    User,
    /// One of the user's groups matched
    Group,
    /// One of the user's roles matched
    Role,
    /// The rollout percentage was applied to the user's bucket
    Rollout {
        /// Bucket the user landed in
        bucket: u32,
    },
    /// The expiration gate overrode the rules
    Expired,
    /// The flag does not exist
    NotFound,
    /// No rule matched
    Default,
}

/// The outcome of evaluating one flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDecision {
    /// Whether the flag is active
    pub active: bool,
    /// The rule that decided
    pub reason: MatchReason,
}

impl FlagDecision {
    /// Create a decision.
    pub fn new(active: bool, reason: MatchReason) -> Self {
        Self { active, reason }
    }

    /// Decision for a flag that does not exist.
    pub fn not_found() -> Self {
        Self::new(false, MatchReason::NotFound)
    }
}

/// Decides whether a flag is active for a context.
///
/// Rules are checked from most to least specific and the first match wins:
/// everyone override, user allow-list, groups, roles, percentage rollout,
/// then inactive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Create a new evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a flag against the given context.
    pub fn evaluate(&self, flag: &Flag, context: &EvaluationContext) -> bool {
        self.explain(flag, context).active
    }

    /// Evaluate a flag and report which rule decided the result.
    pub fn explain(&self, flag: &Flag, context: &EvaluationContext) -> FlagDecision {
        if let Some(everyone) = flag.everyone {
            return FlagDecision::new(everyone, MatchReason::Everyone);
        }

        if let Some(user) = context.user() {
            if flag.users.iter().any(|u| u == user) {
                return FlagDecision::new(true, MatchReason::User);
            }
        }

        if intersects(&flag.groups, &context.groups) {
            return FlagDecision::new(true, MatchReason::Group);
        }

        if intersects(&flag.roles, &context.roles) {
            return FlagDecision::new(true, MatchReason::Role);
        }

        if let (Some(user), Some(percent)) = (context.user(), flag.percent) {
            if percent > 0.0 {
                let bucket = hash::bucket(user);
                return FlagDecision::new(f64::from(bucket) < percent, MatchReason::Rollout { bucket });
            }
        }

        FlagDecision::new(false, MatchReason::Default)
    }
}

/// Whether two membership lists share at least one entry. Empty never matches.
fn intersects(configured: &[String], held: &[String]) -> bool {
    !configured.is_empty()
        && !held.is_empty()
        && held.iter().any(|h| configured.contains(h))
}
