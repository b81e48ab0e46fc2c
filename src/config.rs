use anyhow::Context;
use serde::Deserialize;

/// Privileged account created on startup when configured.
#[derive(Debug, Clone, Deserialize)]
pub struct SuperuserConfig {
    pub email: String,
    pub username: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub superuser: Option<SuperuserConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => 10,
        };
        let superuser = match (
            var("ACCOUNTS_SUPERUSER_EMAIL"),
            var("ACCOUNTS_SUPERUSER_USERNAME"),
        ) {
            (Some(email), Some(username)) => Some(SuperuserConfig {
                email,
                username,
                password: var("ACCOUNTS_SUPERUSER_PASSWORD"),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            max_connections,
            superuser,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = parse(&[("DATABASE_URL", "postgres://localhost/accounts")]).unwrap();
        assert_eq!(cfg.database_url, "postgres://localhost/accounts");
        assert_eq!(cfg.max_connections, 10);
        assert!(cfg.superuser.is_none());
    }

    #[test]
    fn database_url_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&[("DATABASE_URL", "")]).is_err());
    }

    #[test]
    fn bad_pool_size_is_an_error() {
        let err = parse(&[("DATABASE_URL", "pg"), ("DB_MAX_CONNECTIONS", "lots")]).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }

    #[test]
    fn superuser_needs_email_and_username() {
        let cfg = parse(&[
            ("DATABASE_URL", "pg"),
            ("ACCOUNTS_SUPERUSER_EMAIL", "root@example.com"),
        ])
        .unwrap();
        assert!(cfg.superuser.is_none());

        let cfg = parse(&[
            ("DATABASE_URL", "pg"),
            ("ACCOUNTS_SUPERUSER_EMAIL", "root@example.com"),
            ("ACCOUNTS_SUPERUSER_USERNAME", "root"),
            ("ACCOUNTS_SUPERUSER_PASSWORD", ""),
        ])
        .unwrap();
        let su = cfg.superuser.unwrap();
        assert_eq!(su.username, "root");
        assert!(su.password.is_none());
    }
}
