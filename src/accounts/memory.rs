use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::accounts::repo::AccountRepo;
use crate::accounts::repo_types::Account;
use crate::error::AccountError;

/// In-process store with the same uniqueness rules as the `accounts` table.
#[derive(Default)]
pub struct MemoryAccountRepo {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<Account>,
}

impl Inner {
    fn check_unique(&self, candidate: &Account) -> Result<(), AccountError> {
        for row in self.rows.iter().filter(|r| r.id != candidate.id) {
            if row.public_id() == candidate.public_id() {
                return Err(AccountError::Conflict("public_id"));
            }
            if row.username == candidate.username {
                return Err(AccountError::Conflict("username"));
            }
            if row.email == candidate.email {
                return Err(AccountError::Conflict("email"));
            }
        }
        Ok(())
    }
}

impl MemoryAccountRepo {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl AccountRepo for MemoryAccountRepo {
    async fn insert(&self, account: &Account) -> Result<Account, AccountError> {
        let mut inner = self.inner.write().await;
        let mut row = account.clone();
        row.id = None;
        inner.check_unique(&row)?;
        inner.next_id += 1;
        row.id = Some(inner.next_id);
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, account: &Account) -> Result<(), AccountError> {
        let mut inner = self.inner.write().await;
        if account.id.is_none() {
            return Err(anyhow::anyhow!("cannot update an account that was never inserted").into());
        }
        inner.check_unique(account)?;
        let row = inner
            .rows
            .iter_mut()
            .find(|r| r.id == account.id)
            .ok_or(AccountError::NotFound)?;
        // public_id and created are never rewritten
        row.username = account.username.clone();
        row.email = account.email.clone();
        row.first_name = account.first_name.clone();
        row.last_name = account.last_name.clone();
        row.credentials = account.credentials.clone();
        row.flags = account.flags;
        row.set_updated(account.updated());
        Ok(())
    }

    async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Account>, AccountError> {
        let inner = self.inner.read().await;
        Ok(inner.rows.iter().find(|r| r.public_id() == public_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountError> {
        let inner = self.inner.read().await;
        Ok(inner.rows.iter().find(|r| r.email == email).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::dto::AccountFields;
    use crate::accounts::principal::Credentials;

    fn unsaved(email: &str, username: &str) -> Account {
        Account::new(
            email.into(),
            username.into(),
            Credentials::with_password(None).unwrap(),
            AccountFields::default(),
        )
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let repo = MemoryAccountRepo::new();
        let a = repo.insert(&unsaved("a@x.io", "a")).await.unwrap();
        let b = repo.insert(&unsaved("b@x.io", "b")).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let repo = MemoryAccountRepo::new();
        repo.insert(&unsaved("a@x.io", "a")).await.unwrap();

        let err = repo.insert(&unsaved("a@x.io", "other")).await.unwrap_err();
        assert!(matches!(err, AccountError::Conflict("email")));

        let err = repo.insert(&unsaved("other@x.io", "a")).await.unwrap_err();
        assert!(matches!(err, AccountError::Conflict("username")));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn update_rejects_taking_another_email() {
        let repo = MemoryAccountRepo::new();
        repo.insert(&unsaved("a@x.io", "a")).await.unwrap();
        let mut b = repo.insert(&unsaved("b@x.io", "b")).await.unwrap();
        b.email = "a@x.io".into();
        let err = repo.update(&b).await.unwrap_err();
        assert!(matches!(err, AccountError::Conflict("email")));
    }

    #[tokio::test]
    async fn update_requires_inserted_account() {
        let repo = MemoryAccountRepo::new();
        let err = repo.update(&unsaved("a@x.io", "a")).await.unwrap_err();
        assert!(matches!(err, AccountError::Internal(_)));
    }

    #[tokio::test]
    async fn lookups() {
        let repo = MemoryAccountRepo::new();
        let a = repo.insert(&unsaved("a@x.io", "a")).await.unwrap();
        let found = repo.find_by_public_id(a.public_id()).await.unwrap().unwrap();
        assert_eq!(found.email, "a@x.io");
        assert!(repo.find_by_public_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(repo.find_by_email("a@x.io").await.unwrap().is_some());
        assert!(repo.find_by_email("A@x.io").await.unwrap().is_none());
    }
}
