use accounts_api::{
    app::{build_app, serve},
    config::AppConfig,
    state::AppState,
    users::services::ensure_first_superuser,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        let level = config.log_level.to_lowercase();
        format!("accounts_api={level},axum=info,tower_http=info")
    });
    if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!(project = %config.project_name, level = %config.log_level, "starting");

    let app_state = AppState::init(config.clone()).await?;

    if let Some(seed) = &config.first_superuser {
        ensure_first_superuser(&app_state.users, seed).await?;
    }

    let app = build_app(app_state);
    serve(app, &config).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
