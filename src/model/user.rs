use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

#[derive(Debug, Clone)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    pub email: String,
    pub department_id: Option<u64>,
}

/// Public view of a user, without the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Profile {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "jdoe")]
    pub username: String,
    pub role: Role,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<u64>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            full_name: user.full_name,
            email: user.email,
            department_id: user.department_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret-pass", format = "password")]
    pub password: String,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: String,
    /// defaults to employee
    #[serde(default)]
    pub role: Role,
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<u64>,
}

/// Partial update, only the set fields change.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUser {
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: Option<String>,
    pub role: Option<Role>,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    /// new password, hashed before it is stored
    #[schema(format = "password")]
    pub password: Option<String>,
}

impl UpdateUser {
    /// Applies the set fields to `user`, leaving the password hash alone.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if self.department_id.is_some() {
            user.department_id = self.department_id;
        }
    }
}
