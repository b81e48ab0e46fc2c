use tracing::info;

use crate::accounts::{Account, AccountFields, AccountManager};
use crate::config::SuperuserConfig;
use crate::error::AccountError;

/// Create the configured superuser unless an account with that email exists.
/// Returns the new account, or `None` when nothing was created.
pub async fn ensure_superuser(
    accounts: &AccountManager,
    cfg: &SuperuserConfig,
) -> Result<Option<Account>, AccountError> {
    match accounts.find_by_email(&cfg.email).await {
        Ok(existing) => {
            info!(public_id = %existing.public_id(), "superuser already present; skipping");
            return Ok(None);
        }
        Err(AccountError::NotFound) => {}
        Err(e) => return Err(e),
    }

    let account = accounts
        .create_privileged_account(
            &cfg.email,
            &cfg.username,
            cfg.password.as_deref(),
            AccountFields::default(),
        )
        .await?;
    Ok(Some(account))
}
