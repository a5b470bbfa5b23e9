//! mwrt-server library - MammalWeb Rule of Thumb v0 analysis service
//!
//! Accepts human and AI species labels for a camera-trap sequence, reconciles
//! them and forwards the agreed species to the MammalWeb analysis API.

use std::sync::Arc;

use axum::Router;
use mwrt_common::config::ServiceConfig;
use mwrt_common::SentinelIds;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::services::{TokenManager, UpstreamForwarder};

const USER_AGENT: &str = concat!("mwrt-server/", env!("CARGO_PKG_VERSION"));

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Pseudo-species IDs validated at startup
    pub sentinels: SentinelIds,
    /// Bearer token shared by all requests
    pub tokens: Arc<TokenManager>,
    pub forwarder: Arc<UpstreamForwarder>,
}

impl AppState {
    /// Create application state from validated configuration
    ///
    /// Both outbound services share one HTTP client bounded by the
    /// configured upstream timeout. No token is fetched here.
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.upstream_timeout)
            .build()?;

        let tokens = Arc::new(TokenManager::new(http_client.clone(), config.auth.clone()));
        let forwarder = Arc::new(UpstreamForwarder::new(
            http_client,
            config.analysis_url(),
            Arc::clone(&tokens),
        ));

        Ok(Self {
            sentinels: config.sentinels,
            tokens,
            forwarder,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    Router::new()
        .route("/rule-of-thumb-v0", post(api::rule_of_thumb))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
