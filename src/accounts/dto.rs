use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Account;

/// Optional fields accepted at creation. `None` flags fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFields {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Partial profile update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Public part of the account returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicAccount {
    pub public_id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

impl From<&Account> for PublicAccount {
    fn from(a: &Account) -> Self {
        Self {
            public_id: a.public_id(),
            username: a.username.clone(),
            email: a.email.clone(),
            first_name: a.first_name.clone(),
            last_name: a.last_name.clone(),
            name: a.name(),
            is_active: a.is_active(),
            created: a.created(),
        }
    }
}
