//! Flag data structures.
//!
//! A [`Flag`] is owned by a [`FlagStore`](crate::store::FlagStore); the
//! evaluation core only ever reads it.

mod document;

pub use document::FlagDocument;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest rollout percentage a flag may carry.
pub const MAX_PERCENT: f64 = 99.9;

/// A named feature switch with its targeting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    /// Unique flag name
    pub name: String,
    /// Forces the flag on (`Some(true)`) or off (`Some(false)`) for everyone.
    /// `None` defers to the targeting rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub everyone: Option<bool>,
    /// Rollout percentage in `[0, 99.9]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    /// Roles the flag is active for
    #[serde(default)]
    pub roles: Vec<String>,
    /// Groups the flag is active for
    #[serde(default)]
    pub groups: Vec<String>,
    /// Users the flag is explicitly active for
    #[serde(default)]
    pub users: Vec<String>,
    /// Free-form annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Point in time after which the expiration gate is consulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    /// Last modification timestamp
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

impl Flag {
    /// Create a flag with no targeting rules.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            everyone: None,
            percent: None,
            roles: Vec::new(),
            groups: Vec::new(),
            users: Vec::new(),
            note: None,
            expires: None,
            created: now,
            modified: now,
        }
    }

    /// Create a flag builder.
    pub fn builder(name: impl Into<String>) -> FlagBuilder {
        FlagBuilder::new(name)
    }

    /// Whether the flag's expiration time has been reached at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(false, |expires| expires <= now)
    }

    /// Whether the flag has expired as of the current time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check the invariants a store must enforce before persisting a flag.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() {
            return Err(crate::Error::validation_field("Flag name cannot be empty", "name"));
        }

        if let Some(percent) = self.percent {
            if !percent.is_finite() || !(0.0..=MAX_PERCENT).contains(&percent) {
                return Err(crate::Error::validation_field(
                    format!("Percent must be between 0 and {}, got {}", MAX_PERCENT, percent),
                    "percent",
                ));
            }
        }

        Ok(())
    }
}

/// Builder for creating flags.
#[derive(Debug)]
pub struct FlagBuilder {
    flag: Flag,
}

impl FlagBuilder {
    /// Create a new flag builder with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            flag: Flag::new(name),
        }
    }

    /// Set the everyone override.
    pub fn everyone(mut self, everyone: bool) -> Self {
        self.flag.everyone = Some(everyone);
        self
    }

    /// Set the rollout percentage.
    pub fn percent(mut self, percent: f64) -> Self {
        self.flag.percent = Some(percent);
        self
    }

    /// Add a role.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.flag.roles.push(role.into());
        self
    }

    /// Add a group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.flag.groups.push(group.into());
        self
    }

    /// Add a user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.flag.users.push(user.into());
        self
    }

    /// Set the note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.flag.note = Some(note.into());
        self
    }

    /// Set the expiration time.
    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.flag.expires = Some(expires);
        self
    }

    /// Build the flag.
    pub fn build(self) -> Flag {
        self.flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_flag_builder() {
        let flag = Flag::builder("new-checkout")
            .percent(25.5)
            .role("admin")
            .group("beta")
            .user("alice")
            .note("checkout redesign")
            .build();

        assert_eq!(flag.name, "new-checkout");
        assert_eq!(flag.everyone, None);
        assert_eq!(flag.percent, Some(25.5));
        assert_eq!(flag.roles, vec!["admin"]);
        assert_eq!(flag.groups, vec!["beta"]);
        assert_eq!(flag.users, vec!["alice"]);
        assert!(flag.validate().is_ok());
    }

    #[test]
    fn test_flag_validation() {
        assert!(Flag::new("").validate().is_err());
        assert!(Flag::builder("f").percent(99.9).build().validate().is_ok());
        assert!(Flag::builder("f").percent(0.0).build().validate().is_ok());
        assert!(Flag::builder("f").percent(100.0).build().validate().is_err());
        assert!(Flag::builder("f").percent(-1.0).build().validate().is_err());
        assert!(Flag::builder("f").percent(f64::NAN).build().validate().is_err());
    }

    #[test]
    fn test_validation_names_field() {
        match Flag::builder("f").percent(100.0).build().validate() {
            Err(crate::Error::Validation { field, .. }) => {
                assert_eq!(field.as_deref(), Some("percent"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_flag_expiration() {
        let now = Utc::now();
        let flag = Flag::builder("f").expires(now).build();
        assert!(flag.is_expired_at(now));
        assert!(!flag.is_expired_at(now - Duration::seconds(1)));
        assert!(!Flag::new("f").is_expired_at(now));
    }

    #[test]
    fn test_everyone_is_tri_state() {
        let unset: Flag = serde_json::from_str(r#"{"name": "f"}"#).unwrap();
        let off: Flag = serde_json::from_str(r#"{"name": "f", "everyone": false}"#).unwrap();
        let null: Flag = serde_json::from_str(r#"{"name": "f", "everyone": null}"#).unwrap();

        assert_eq!(unset.everyone, None);
        assert_eq!(off.everyone, Some(false));
        assert_eq!(null.everyone, None);
    }

    #[test]
    fn test_membership_order_preserved() {
        let flag: Flag =
            serde_json::from_str(r#"{"name": "f", "roles": ["zeta", "alpha", "mid"]}"#).unwrap();
        assert_eq!(flag.roles, vec!["zeta", "alpha", "mid"]);

        let json = serde_json::to_string(&flag).unwrap();
        assert!(json.contains(r#""roles":["zeta","alpha","mid"]"#));
    }
}
