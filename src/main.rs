use accounts::{bootstrap, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accounts=debug,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    tracing::info!("database ready");

    match &state.config.superuser {
        Some(su) => {
            if let Some(account) = bootstrap::ensure_superuser(&state.accounts, su).await? {
                tracing::info!(public_id = %account.public_id(), "superuser created");
            }
        }
        None => tracing::debug!("no superuser configured"),
    }

    Ok(())
}
