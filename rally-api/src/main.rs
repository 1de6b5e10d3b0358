use anyhow::Context;
use rally_api::{advice::HttpAdvisor, app, state::{AppState, AuthConfig}};
use rally_core::advisor::{Advisor, DisabledAdvisor};
use rally_core::identity::StaticCredentials;
use rally_core::repository::Store;
use rally_session::{ServiceRules, SessionService};
use rally_store::app_config::{Config, StorageBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rally_api=debug,rally_store=info,rally_session=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Rally API on port {}", config.server.port);

    let store = rally_store::open(&config.storage).await.context("Failed to open store")?;

    // Remote data is mirrored into the local JSON cache when one is configured.
    let mirror = match (config.storage.backend, config.storage.data_dir.as_deref()) {
        (StorageBackend::Redis, Some(dir)) => {
            let cache = rally_store::LocalStore::open(dir).await.context("Failed to open local cache")?;
            Some(rally_store::sync::mirror(store.clone(), Arc::new(cache)))
        }
        _ => None,
    };

    let advisor: Arc<dyn Advisor> = if config.advisor.is_enabled() {
        Arc::new(HttpAdvisor::from_config(&config.advisor)?)
    } else {
        tracing::info!("No advisor endpoint configured, advice disabled");
        Arc::new(DisabledAdvisor)
    };

    let rules = ServiceRules {
        grace_period_hours: config.rules.grace_period_hours,
        default_max_participants: config.rules.default_max_participants,
        advice_sample_size: config.rules.advice_sample_size,
    };
    let service = Arc::new(SessionService::new(store.clone(), advisor, rules));
    let watcher = service.watch();

    let auth = &config.auth;
    let app_state = AppState {
        service,
        credentials: Arc::new(StaticCredentials::new(
            auth.admin_login.clone(),
            auth.admin_password.clone(),
            auth.member_login.clone(),
            auth.member_password.clone(),
        )),
        auth: AuthConfig {
            secret: auth.jwt_secret.clone(),
            expiration: auth.jwt_expiration_seconds,
        },
        currency: config.rules.currency.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.context("Failed to bind")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    watcher.abort();
    if let Some(mirror) = mirror {
        mirror.abort();
    }
    store.close().await.context("Failed to close store")?;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
