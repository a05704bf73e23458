use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role granted to every authenticated user.
pub const ROLE_USER: &str = "user";

/// Role granted to staff accounts; required by the admin endpoints.
pub const ROLE_STAFF: &str = "staff";

/// User entity - an account that can author posts and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a new active, non-staff user with generated ID and timestamp.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            is_staff: false,
            is_active: true,
            date_joined: Utc::now(),
        }
    }

    /// Promote the account to staff.
    pub fn with_staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// Roles carried in this user's access tokens.
    pub fn roles(&self) -> Vec<String> {
        let mut roles = vec![ROLE_USER.to_string()];
        if self.is_staff {
            roles.push(ROLE_STAFF.to_string());
        }
        roles
    }
}
