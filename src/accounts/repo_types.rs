use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::AccountFields;
use super::principal::{AccessFlags, Credentials};

/// Account row. The email is the login identifier.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub(crate) id: Option<i64>,       // internal key, None until inserted
    public_id: Uuid,                  // external identifier, never reassigned
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(flatten)]
    pub credentials: Credentials,
    #[sqlx(flatten)]
    pub flags: AccessFlags,
    created: OffsetDateTime,
    updated: OffsetDateTime,
}

impl Account {
    /// Unsaved account with a fresh public id and both timestamps set to now.
    pub(crate) fn new(
        email: String,
        username: String,
        credentials: Credentials,
        fields: AccountFields,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let defaults = AccessFlags::default();
        Self {
            id: None,
            public_id: Uuid::new_v4(),
            username,
            email,
            first_name: fields.first_name,
            last_name: fields.last_name,
            credentials,
            flags: AccessFlags {
                is_active: fields.is_active.unwrap_or(defaults.is_active),
                is_staff: fields.is_staff.unwrap_or(defaults.is_staff),
                is_superuser: fields.is_superuser.unwrap_or(defaults.is_superuser),
            },
            created: now,
            updated: now,
        }
    }

    pub fn public_id(&self) -> Uuid {
        self.public_id
    }

    pub fn created(&self) -> OffsetDateTime {
        self.created
    }

    pub fn updated(&self) -> OffsetDateTime {
        self.updated
    }

    /// Full name. Empty parts still contribute their separator.
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.flags.is_active
    }

    pub fn is_staff(&self) -> bool {
        self.flags.is_staff
    }

    pub fn is_superuser(&self) -> bool {
        self.flags.is_superuser
    }

    pub(crate) fn touch(&mut self) {
        let now = OffsetDateTime::now_utc();
        // clock skew must never move updated before created
        self.updated = if now < self.created { self.created } else { now };
    }

    pub(crate) fn set_updated(&mut self, at: OffsetDateTime) {
        self.updated = at;
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(first: &str, last: &str) -> Account {
        Account::new(
            "ada@example.com".into(),
            "ada".into(),
            Credentials::with_password(None).unwrap(),
            AccountFields {
                first_name: first.into(),
                last_name: last.into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn name_joins_with_single_space() {
        assert_eq!(account("Ada", "Lovelace").name(), "Ada Lovelace");
        assert_eq!(account("Ada", "").name(), "Ada ");
        assert_eq!(account("", "Lovelace").name(), " Lovelace");
        assert_eq!(account("", "").name(), " ");
    }

    #[test]
    fn display_is_email() {
        assert_eq!(account("A", "B").to_string(), "ada@example.com");
    }

    #[test]
    fn new_account_defaults() {
        let acc = account("", "");
        assert!(acc.id.is_none());
        assert!(acc.is_active());
        assert!(!acc.is_staff());
        assert!(!acc.is_superuser());
        assert_eq!(acc.created(), acc.updated());
        assert!(acc.credentials.last_login().is_none());
    }

    #[test]
    fn public_ids_are_unique() {
        assert_ne!(account("", "").public_id(), account("", "").public_id());
    }

    #[test]
    fn touch_keeps_created() {
        let mut acc = account("", "");
        let created = acc.created();
        acc.touch();
        assert_eq!(acc.created(), created);
        assert!(acc.updated() >= created);
    }
}
