//! User domain types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Staff permission level inside a tenant.
///
/// Wire format: snake_case string (`"staff"`, `"cashier"`, ...). Ordering follows
/// the privilege hierarchy, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Staff,
    Cashier,
    Manager,
    Admin,
    Owner,
}

/// Error returned when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl UserRole {
    /// Roles a user may pick for themselves at self-registration.
    pub const SELF_REGISTRATION: [UserRole; 2] = [UserRole::Staff, UserRole::Cashier];

    pub fn level(self) -> u8 {
        match self {
            Self::Staff => 0,
            Self::Cashier => 1,
            Self::Manager => 2,
            Self::Admin => 3,
            Self::Owner => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Cashier => "cashier",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Clamp a requested role to the self-registration subset.
    /// Anything outside the subset (or nothing at all) becomes `Staff`.
    pub fn for_self_registration(requested: Option<UserRole>) -> UserRole {
        match requested {
            Some(role) if Self::SELF_REGISTRATION.contains(&role) => role,
            _ => UserRole::Staff,
        }
    }

    /// `true` if this role is at least `min` in the hierarchy.
    pub fn at_least(self, min: UserRole) -> bool {
        self >= min
    }
}

impl PartialOrd for UserRole {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UserRole {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.level().cmp(&other.level())
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(Self::Staff),
            "cashier" => Ok(Self::Cashier),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Account status. Only `Active` accounts may authenticate; any value other
/// than `active`/`inactive` is preserved verbatim and treated as disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Inactive,
    Other(String),
}

impl UserStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for UserStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            other => Self::Other(other.to_owned()),
        }
    }
}
