use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};

/// Role held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(Error::Decode(format!("unknown role {other:?}"))),
        }
    }
}

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: String,                  // opaque unique id
    pub username: String,            // email for students, free-form for staff
    pub name: String,                // display name
    #[serde(skip_serializing)]
    pub password_hash: String,       // Argon2 PHC string, never exposed
    pub role: Role,
    pub phone: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Registration input for a student account; the email doubles as username.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Input for owner-invoked admin creation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
    pub name: String,
}

/// Partial profile update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
}
