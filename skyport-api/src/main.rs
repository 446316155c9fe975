use std::net::SocketAddr;
use std::sync::Arc;

use skyport_api::{app, state::{AppState, AuthConfig, RateLimit}};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyport_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = skyport_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Skyport API on port {}", config.server.port);

    let db = skyport_store::DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = skyport_store::RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");

    let app_state = AppState::new(
        Arc::new(db),
        Arc::new(redis),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            access_seconds: config.auth.access_token_seconds,
            refresh_seconds: config.auth.refresh_token_seconds,
        },
        config.cache.list_ttl_seconds,
        RateLimit {
            requests: config.rate_limit.requests,
            window_seconds: config.rate_limit.window_seconds,
        },
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
