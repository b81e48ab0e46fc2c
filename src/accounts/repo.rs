use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::repo_types::Account;
use crate::error::AccountError;

const ACCOUNT_COLUMNS: &str = "id, public_id, username, email, first_name, last_name, \
     password, last_login, is_active, is_staff, is_superuser, created, updated";

/// Persistence seam for accounts. Implementations enforce uniqueness of
/// `email`, `username` and `public_id`.
#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Insert an unsaved account and return it with its internal id.
    async fn insert(&self, account: &Account) -> Result<Account, AccountError>;
    /// Write every mutable column of a saved account.
    async fn update(&self, account: &Account) -> Result<(), AccountError>;
    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Account>, AccountError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError>;
}

#[derive(Clone)]
pub struct PgAccountRepo {
    db: PgPool,
}

impl PgAccountRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepo for PgAccountRepo {
    async fn insert(&self, account: &Account) -> Result<Account, AccountError> {
        let sql = format!(
            r#"
            INSERT INTO accounts (public_id, username, email, first_name, last_name,
                                  password, last_login, is_active, is_staff, is_superuser,
                                  created, updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(account.public_id())
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(account.credentials.password_hash())
            .bind(account.credentials.last_login())
            .bind(account.flags.is_active)
            .bind(account.flags.is_staff)
            .bind(account.flags.is_superuser)
            .bind(account.created())
            .bind(account.updated())
            .fetch_one(&self.db)
            .await
            .map_err(map_db_error)
    }

    async fn update(&self, account: &Account) -> Result<(), AccountError> {
        let id = account
            .id
            .ok_or_else(|| anyhow::anyhow!("cannot update an account that was never inserted"))?;
        let result = sqlx::query(
            r#"
            UPDATE accounts
               SET username = $2, email = $3, first_name = $4, last_name = $5,
                   password = $6, last_login = $7, is_active = $8, is_staff = $9,
                   is_superuser = $10, updated = $11
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.credentials.password_hash())
        .bind(account.credentials.last_login())
        .bind(account.flags.is_active)
        .bind(account.flags.is_staff)
        .bind(account.flags.is_superuser)
        .bind(account.updated())
        .execute(&self.db)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        Ok(())
    }

    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Account>, AccountError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE public_id = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(public_id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_db_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(map_db_error)
    }
}

/// Turn unique violations into `Conflict`, naming the offending column.
fn map_db_error(e: sqlx::Error) -> AccountError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AccountError::Conflict(conflict_field(db_err.constraint()));
        }
    }
    AccountError::Database(e)
}

fn conflict_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("email") => "email",
        Some(c) if c.contains("username") => "username",
        Some(c) if c.contains("public_id") => "public_id",
        _ => "value",
    }
}
