use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;

use super::password::{hash_password, is_usable, unusable_password, verify_password};

/// Password hash and login bookkeeping embedded in every account.
#[derive(Clone, FromRow)]
pub struct Credentials {
    password: String,                     // Argon2 PHC string or unusable marker
    last_login: Option<OffsetDateTime>,
}

impl Credentials {
    pub fn with_password(raw: Option<&str>) -> anyhow::Result<Self> {
        let mut credentials = Self {
            password: String::new(),
            last_login: None,
        };
        credentials.set_password(raw)?;
        Ok(credentials)
    }

    /// Hash `raw`, or store an unusable marker when there is none.
    pub fn set_password(&mut self, raw: Option<&str>) -> anyhow::Result<()> {
        match raw {
            Some(plain) => self.password = hash_password(plain)?,
            None => self.set_unusable_password(),
        }
        Ok(())
    }

    pub fn set_unusable_password(&mut self) {
        self.password = unusable_password();
    }

    pub fn has_usable_password(&self) -> bool {
        is_usable(&self.password)
    }

    pub fn check_password(&self, raw: &str) -> anyhow::Result<bool> {
        if !self.has_usable_password() {
            return Ok(false);
        }
        verify_password(raw, &self.password)
    }

    pub fn password_hash(&self) -> &str {
        &self.password
    }

    pub fn last_login(&self) -> Option<OffsetDateTime> {
        self.last_login
    }

    pub(crate) fn mark_login(&mut self, at: OffsetDateTime) {
        self.last_login = Some(at);
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"<redacted>")
            .field("last_login", &self.last_login)
            .finish()
    }
}

/// Authorization markers. Evaluating them is left to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct AccessFlags {
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Default for AccessFlags {
    fn default() -> Self {
        Self {
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_password_accepts_only_set_password() {
        let creds = Credentials::with_password(Some("hunter22")).unwrap();
        assert!(creds.has_usable_password());
        assert_ne!(creds.password_hash(), "hunter22");
        assert!(creds.check_password("hunter22").unwrap());
        assert!(!creds.check_password("hunter23").unwrap());
        assert!(!creds.check_password("").unwrap());
    }

    #[test]
    fn missing_password_is_unusable() {
        let creds = Credentials::with_password(None).unwrap();
        assert!(!creds.has_usable_password());
        assert!(!creds.check_password("").unwrap());
        assert!(!creds.check_password(creds.password_hash()).unwrap());
    }

    #[test]
    fn set_unusable_password_revokes() {
        let mut creds = Credentials::with_password(Some("pw")).unwrap();
        creds.set_unusable_password();
        assert!(!creds.check_password("pw").unwrap());
    }

    #[test]
    fn debug_redacts_hash() {
        let creds = Credentials::with_password(Some("secret")).unwrap();
        let out = format!("{creds:?}");
        assert!(out.contains("<redacted>"));
        assert!(!out.contains(creds.password_hash()));
    }

    #[test]
    fn default_flags() {
        let flags = AccessFlags::default();
        assert!(flags.is_active);
        assert!(!flags.is_staff);
        assert!(!flags.is_superuser);
    }
}
