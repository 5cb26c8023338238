//! Evaluation context definitions.
//!
//! The context describes who is asking about a flag: an optional user
//! identifier plus the roles and groups that user currently holds.

use serde::{Deserialize, Serialize};

/// Caller-supplied context for a single flag check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EvaluationContext {
    /// User identifier, used for allow-lists and rollout bucketing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Roles the user currently holds
    #[serde(default)]
    pub roles: Vec<String>,
    /// Groups the user currently belongs to
    #[serde(default)]
    pub groups: Vec<String>,
}

impl EvaluationContext {
    /// Create an empty evaluation context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context for the given user with no roles or groups.
    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::default()
        }
    }

    /// Create a context builder.
    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::new()
    }

    /// The user identifier, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

/// Builder for creating evaluation contexts.
#[derive(Debug, Default)]
pub struct EvaluationContextBuilder {
    user: Option<String>,
    roles: Vec<String>,
    groups: Vec<String>,
}

impl EvaluationContextBuilder {
    /// Create a new context builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user identifier.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Add a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Add several roles.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add a group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Add several groups.
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Build the evaluation context.
    pub fn build(self) -> EvaluationContext {
        EvaluationContext {
            user: self.user,
            roles: self.roles,
            groups: self.groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let ctx = EvaluationContext::builder()
            .with_user("user-123")
            .with_role("admin")
            .with_groups(["beta", "staff"])
            .build();

        assert_eq!(ctx.user(), Some("user-123"));
        assert_eq!(ctx.roles, vec!["admin"]);
        assert_eq!(ctx.groups, vec!["beta", "staff"]);
    }

    #[test]
    fn test_context_deserialization_defaults() {
        let ctx: EvaluationContext = serde_json::from_str(r#"{"user": "u1"}"#).unwrap();
        assert_eq!(ctx, EvaluationContext::for_user("u1"));

        let anonymous: EvaluationContext = serde_json::from_str("{}").unwrap();
        assert_eq!(anonymous.user(), None);
        assert!(anonymous.roles.is_empty());
    }
}
