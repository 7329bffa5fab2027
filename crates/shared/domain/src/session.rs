//! Roles and the externally supplied session they are checked against.
//!
//! The host never authenticates anybody. It receives a [`Session`] from the
//! embedding application through a [`SessionSource`] and hands it to
//! permission predicates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered staff roles, lowest privilege first.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Viewer,
    Staff,
    Manager,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Self; 5] = [Self::Viewer, Self::Staff, Self::Manager, Self::Admin, Self::Owner];

    /// `true` when this role is at least `minimum`.
    #[must_use]
    pub fn satisfies(self, minimum: Self) -> bool {
        self >= minimum
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Staff => "staff",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
///
/// `Display` and `Error` are written by hand: this crate depends only on
/// `serde`, so neither `thiserror` nor `#[opshub_error]` is available here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}

/// The caller's identity as far as permission predicates are concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Option<Role>,
    pub subject: Option<String>,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_role(role: Role) -> Self {
        Self { role: Some(role), subject: None }
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Anonymous sessions satisfy no role requirement.
    #[must_use]
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role.is_some_and(|role| role.satisfies(minimum))
    }
}

/// Supplies the session that permission predicates are evaluated against.
pub trait SessionSource: fmt::Debug + Send + Sync {
    fn current(&self) -> Session;
}

/// A fixed session is its own source.
impl SessionSource for Session {
    fn current(&self) -> Session {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered() {
        assert!(Role::Owner.satisfies(Role::Manager));
        assert!(Role::Staff.satisfies(Role::Staff));
        assert!(!Role::Viewer.satisfies(Role::Staff));
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Manager));
        assert_eq!(" owner ".parse::<Role>(), Ok(Role::Owner));
        assert!("cashier".parse::<Role>().is_err());
    }

    #[test]
    fn unknown_role_is_a_std_error() {
        let err: Box<dyn std::error::Error> = "cashier".parse::<Role>().unwrap_err().into();
        assert_eq!(err.to_string(), "unknown role 'cashier'");
    }

    #[test]
    fn anonymous_session_has_no_role() {
        assert!(!Session::anonymous().has_role(Role::Viewer));
        assert!(Session::with_role(Role::Admin).has_role(Role::Manager));
    }
}
