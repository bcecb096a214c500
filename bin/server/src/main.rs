use atomlab_server::{app, auth::AppState, config::ServerConfig, users::InMemoryUserDirectory};
use atomlab_telegram_auth::{BotRegistry, ClientDispatcher, SessionTokenService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from atomlab.toml and the environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(bots = config.bots.len(), "Loaded configuration");

    let registry =
        BotRegistry::new(config.bot_descriptors(), &config).expect("failed to build bot registry");
    if registry.resolve(&config.default_bot).is_err() {
        tracing::warn!(
            default_bot = %config.default_bot,
            "default bot is not configured; POST /auth will redirect to a 404"
        );
    }

    let tokens =
        SessionTokenService::new(config.token_config()).expect("invalid access token settings");
    tracing::info!(
        algorithm = %tokens.algorithm(),
        lifetime_seconds = tokens.lifetime_seconds(),
        "Session tokens configured"
    );

    let app_state = Arc::new(AppState::new(
        ClientDispatcher::new(Arc::new(registry)),
        Arc::new(tokens),
        Arc::new(InMemoryUserDirectory::new()),
        config.session.clone(),
        config.default_bot.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app::router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
