pub mod api;

use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use clap::Args;
use clap_verbosity_flag::Verbosity;
use sea_orm::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_log::AsTrace;

use crate::channels::telegram::{self, ChannelGate, TelegramApi};
use crate::db;
use crate::dispatch::Dispatcher;
use crate::error::{DealdropError, Result};
use crate::settings;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Verbosity
    #[command(flatten)]
    verbose: Verbosity,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

async fn authenticate(
    State(state): State<api::ApiState>,
    req: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    match auth_header {
        Some(auth_header) if auth_header == state.auth => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub fn router(state: api::ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(api::health))
        .route("/api/v1/coupons", get(api::get_coupons))
        .route("/api/v1/coupons/{id}", get(api::get_coupon))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

pub async fn init_server(args: ServeArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();

    let settings = settings::load(args.config.as_deref())?;
    if settings.token.is_empty() {
        return Err(DealdropError::Api(
            "no bot token configured (set DEALDROP_TOKEN or `token` in the config file)".to_owned(),
        ));
    }

    let uri = format!("sqlite://{}?mode=rwc", settings.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;

    let telegram_api = TelegramApi::new(&settings.api_url, &settings.token)?;
    if let Err(err) = telegram_api.delete_webhook().await {
        warn!(%err, "could not delete webhook before polling");
    }

    let gate = ChannelGate::new(telegram_api.clone(), settings.required_channel.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        db.clone(),
        gate,
        settings.claim_quota,
        settings.platforms.clone(),
    ));

    let shutdown = CancellationToken::new();
    let poller = tokio::spawn(telegram::receive_from(
        telegram_api,
        dispatcher,
        shutdown.clone(),
    ));

    let state = api::ApiState {
        db,
        auth: settings.auth,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    info!(bind = %settings.bind, "server is running");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = poller.await;
    Ok(())
}

pub async fn init_migrate(args: MigrateArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(args.verbose.log_level_filter().as_trace())
        .init();

    let settings = settings::load(args.config.as_deref())?;
    let uri = format!("sqlite://{}?mode=rwc", settings.database);
    let db = Database::connect(&uri).await?;
    db::migration::migrate(&db).await?;
    info!(database = %settings.database, "migrations applied");
    Ok(())
}
