use axum::{Extension, Router, middleware, routing::get};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};

use crate::{
    api,
    config::Config,
    error::Result,
    info,
    management::{RateLimiter, ResponseCache, SessionStore},
    salesforce::{OAuthClient, QueryClient, SalesforceApi},
};

const HOUSEKEEPING_PERIOD: Duration = Duration::from_secs(60);

/// Everything a request handler needs, cloned into each request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub oauth: OAuthClient,
    pub salesforce: Arc<dyn SalesforceApi>,
    pub sessions: SessionStore,
    pub cache: ResponseCache,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let salesforce = QueryClient::new(&config)?;
        Self::with_salesforce(config, Arc::new(salesforce))
    }

    /// Builds the state around any [`SalesforceApi`] implementation.
    pub fn with_salesforce(config: Config, salesforce: Arc<dyn SalesforceApi>) -> Result<Self> {
        let cache = ResponseCache::new();
        Ok(Self {
            oauth: OAuthClient::new(config.clone())?,
            sessions: SessionStore::new(config.session_ttl, cache.clone()),
            cache,
            limiter: RateLimiter::new(config.rate_limit),
            salesforce,
            config: Arc::new(config),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/logout", get(api::logout))
        .route("/api/units", get(api::units))
        .route("/api/describe", get(api::describe))
        .route("/api/units/describe", get(api::describe))
        .route("/healthz", get(api::health))
        .layer(middleware::from_fn(api::rate_limit))
        .layer(middleware::from_fn(api::security_headers))
        .layer(Extension(state))
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    Ok(TcpListener::bind(addr).await?)
}

/// Drops expired sessions (and their cached data) and idle rate-limit entries.
pub async fn housekeeping(state: &AppState) {
    let purged = state.sessions.purge_expired().await;
    if purged > 0 {
        info!("Dropped {} expired sessions", purged);
    }
    state.limiter.retain_recent();
}

/// Runs [`housekeeping`] every `period` until the task is aborted.
pub fn spawn_housekeeping(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            housekeeping(&state).await;
        }
    })
}

pub async fn start_api_server(state: AppState, listener: TcpListener) -> Result<()> {
    let sweeper = spawn_housekeeping(state.clone(), HOUSEKEEPING_PERIOD);
    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    sweeper.abort();
    Ok(())
}
