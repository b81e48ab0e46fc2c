use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::accounts::{
    dto::{AccountFields, ProfileUpdate},
    principal::Credentials,
    repo::AccountRepo,
    repo_types::Account,
};
use crate::error::AccountError;
use crate::state::AppState;

pub const MAX_FIELD_LEN: usize = 255;

/// Lowercase the domain part of an address. The local part is case-sensitive
/// and left untouched; values without an `@` are returned as given.
pub fn normalize_email(email: &str) -> String {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), AccountError> {
    if value.is_empty() {
        warn!(field, "required field missing");
        return Err(AccountError::Validation(format!(
            "The {field} field must be set."
        )));
    }
    Ok(())
}

fn check_len(field: &'static str, value: &str) -> Result<(), AccountError> {
    if value.chars().count() > MAX_FIELD_LEN {
        warn!(field, "field too long");
        return Err(AccountError::Validation(format!(
            "The {field} field must be at most {MAX_FIELD_LEN} characters."
        )));
    }
    Ok(())
}

/// Rules every stored account must satisfy, whichever path changed it.
fn validate(account: &mut Account) -> Result<(), AccountError> {
    require("email", &account.email)?;
    require("username", &account.username)?;
    account.email = normalize_email(&account.email);
    for (field, value) in [
        ("email", account.email.as_str()),
        ("username", account.username.as_str()),
        ("first_name", account.first_name.as_str()),
        ("last_name", account.last_name.as_str()),
    ] {
        check_len(field, value)?;
    }
    Ok(())
}

/// Creates, looks up and persists accounts on top of an [`AccountRepo`].
#[derive(Clone)]
pub struct AccountManager {
    repo: Arc<dyn AccountRepo>,
}

impl FromRef<AppState> for AccountManager {
    fn from_ref(state: &AppState) -> Self {
        state.accounts.clone()
    }
}

impl AccountManager {
    pub fn new(repo: Arc<dyn AccountRepo>) -> Self {
        Self { repo }
    }

    /// Validate, normalize, hash and insert a regular account.
    #[instrument(skip(self, password, fields))]
    pub async fn create_account(
        &self,
        email: &str,
        username: &str,
        password: Option<&str>,
        fields: AccountFields,
    ) -> Result<Account, AccountError> {
        require("email", email)?;
        require("username", username)?;

        let email = normalize_email(email);
        for (field, value) in [
            ("email", email.as_str()),
            ("username", username),
            ("first_name", fields.first_name.as_str()),
            ("last_name", fields.last_name.as_str()),
        ] {
            check_len(field, value)?;
        }

        let credentials = Credentials::with_password(password)?;
        let account = Account::new(email, username.to_string(), credentials, fields);

        let account = self.repo.insert(&account).await.map_err(|e| {
            if let AccountError::Conflict(field) = &e {
                warn!(field = *field, "account already exists");
            }
            e
        })?;

        info!(
            public_id = %account.public_id(),
            email = %account.email,
            is_superuser = account.is_superuser(),
            "account created"
        );
        Ok(account)
    }

    /// Same as [`create_account`](Self::create_account), with staff and
    /// superuser defaulting to `true` unless `fields` sets them.
    #[instrument(skip(self, password, fields))]
    pub async fn create_privileged_account(
        &self,
        email: &str,
        username: &str,
        password: Option<&str>,
        mut fields: AccountFields,
    ) -> Result<Account, AccountError> {
        fields.is_staff = fields.is_staff.or(Some(true));
        fields.is_superuser = fields.is_superuser.or(Some(true));
        self.create_account(email, username, password, fields).await
    }

    /// Look up by external identifier. Malformed ids and unknown ids both
    /// yield `NotFound`.
    #[instrument(skip(self))]
    pub async fn find_by_public_id(&self, raw: &str) -> Result<Account, AccountError> {
        let Ok(public_id) = Uuid::parse_str(raw) else {
            debug!("malformed public id");
            return Err(AccountError::NotFound);
        };
        self.get(public_id).await
    }

    pub async fn get(&self, public_id: Uuid) -> Result<Account, AccountError> {
        match self.repo.find_by_public_id(public_id).await? {
            Some(account) => Ok(account),
            None => {
                debug!(%public_id, "no account for public id");
                Err(AccountError::NotFound)
            }
        }
    }

    /// Natural-key lookup on the normalized email.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Account, AccountError> {
        let email = normalize_email(email);
        self.repo
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::NotFound)
    }

    /// Returns the account only if it exists, is active and the password matches.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, AccountError> {
        let account = match self.find_by_email(email).await {
            Ok(account) => account,
            Err(AccountError::NotFound) => {
                // hash anyway so unknown emails cost the same as wrong passwords
                let _ = Credentials::with_password(Some(password))?;
                warn!("authenticate unknown email");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !account.credentials.check_password(password)? {
            warn!(public_id = %account.public_id(), "authenticate invalid password");
            return Ok(None);
        }
        if !account.is_active() {
            warn!(public_id = %account.public_id(), "authenticate inactive account");
            return Ok(None);
        }
        Ok(Some(account))
    }

    /// Check and normalize the identity fields, refresh `updated` and persist
    /// every mutable field. `account` is only replaced once the write succeeds.
    pub async fn save(&self, account: &mut Account) -> Result<(), AccountError> {
        let mut next = account.clone();
        validate(&mut next)?;
        next.touch();
        self.repo.update(&next).await?;
        debug!(public_id = %next.public_id(), "account saved");
        *account = next;
        Ok(())
    }

    #[instrument(skip(self, account, changes), fields(public_id = %account.public_id()))]
    pub async fn update_profile(
        &self,
        account: &mut Account,
        changes: ProfileUpdate,
    ) -> Result<(), AccountError> {
        if let Some(username) = &changes.username {
            require("username", username)?;
            check_len("username", username)?;
        }
        let email = match &changes.email {
            Some(email) => {
                require("email", email)?;
                let email = normalize_email(email);
                check_len("email", &email)?;
                Some(email)
            }
            None => None,
        };
        for (field, value) in [
            ("first_name", changes.first_name.as_deref()),
            ("last_name", changes.last_name.as_deref()),
        ] {
            if let Some(value) = value {
                check_len(field, value)?;
            }
        }

        let mut updated = account.clone();
        if let Some(username) = changes.username {
            updated.username = username;
        }
        if let Some(email) = email {
            updated.email = email;
        }
        if let Some(first_name) = changes.first_name {
            updated.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            updated.last_name = last_name;
        }
        if let Some(is_active) = changes.is_active {
            updated.flags.is_active = is_active;
        }

        self.save(&mut updated).await?;
        *account = updated;
        Ok(())
    }

    /// Rehash, or make unusable when `raw` is `None`, then save.
    #[instrument(skip(self, account, raw), fields(public_id = %account.public_id()))]
    pub async fn change_password(
        &self,
        account: &mut Account,
        raw: Option<&str>,
    ) -> Result<(), AccountError> {
        let mut next = account.clone();
        match raw {
            Some(_) => next.credentials.set_password(raw)?,
            None => next.credentials.set_unusable_password(),
        }
        self.save(&mut next).await?;
        *account = next;
        info!("password changed");
        Ok(())
    }

    pub async fn record_login(&self, account: &mut Account) -> Result<(), AccountError> {
        let mut next = account.clone();
        next.credentials.mark_login(OffsetDateTime::now_utc());
        self.save(&mut next).await?;
        *account = next;
        Ok(())
    }
}
