mod api;
mod discovery;
mod middleware;

use std::sync::Arc;

use dinewise_identity::FirebaseVerifier;
use dinewise_yelp::YelpClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    discovery::{Discovery, PgRestaurantStore},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(dinewise_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dinewise_db::PoolConfig::from_app_config(&config);
    let pool = dinewise_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = dinewise_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let yelp = YelpClient::with_base_url(
        &config.yelp_api_key,
        config.yelp_timeout_secs,
        &config.yelp_base_url,
    )?;
    let verifier = FirebaseVerifier::with_base_url(
        &config.firebase_api_key,
        config.identity_timeout_secs,
        &config.identity_base_url,
    )?;

    let discovery = Discovery::new(
        Arc::new(yelp),
        Arc::new(PgRestaurantStore::new(pool.clone())),
    );
    let auth = AuthState {
        verifier: Arc::new(verifier),
        pool: pool.clone(),
    };
    let app = build_app(AppState { pool, discovery }, auth, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(
        addr = %config.bind_addr,
        env = %config.env,
        "dinewise api listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
