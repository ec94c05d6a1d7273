//! User directory types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A privilege granted to a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May view statistics, reset the queue and manage users.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A registered staff member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    /// Unique identifier (UUID).
    pub id: String,
    /// Identity as seen by the authenticator.
    pub user_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Profile as listed for administrators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileWithRoles {
    #[serde(flatten)]
    pub profile: Profile,
    pub is_admin: bool,
}

/// Request to register a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: String,
    pub email: String,
}
