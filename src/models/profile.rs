// src/models/profile.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Role supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    /// Teachers wait for an admin; everyone else is approved on creation.
    pub fn approved_on_creation(&self) -> bool {
        !matches!(self, Role::Teacher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

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
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'profiles' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Profile {
    /// Subject id issued by the identity provider.
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_approved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Values used when a profile is created for the first time.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub role: Role,
    pub is_approved: bool,
}

impl NewProfile {
    pub fn new(id: &str, email: Option<String>, display_name: String, role: Role) -> Self {
        Self {
            id: id.to_string(),
            email,
            display_name,
            role,
            is_approved: role.approved_on_creation(),
        }
    }
}

/// DTO for `POST /api/profile`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EnsureProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be between 1 and 100 characters."))]
    pub display_name: Option<String>,
}

/// DTO for `PUT /api/profile/me`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 1, max = 100, message = "Display name must be between 1 and 100 characters."),
        custom(function = crate::utils::validate::not_blank)
    )]
    pub display_name: String,
}

/// Query parameters for the admin profile list.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileListParams {
    pub role: Option<Role>,
    #[serde(default)]
    pub pending: bool,
}
