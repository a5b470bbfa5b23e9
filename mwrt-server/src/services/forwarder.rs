//! Forwards reconciled results to the MammalWeb analysis API
//!
//! A 403 answer means the bearer token went stale: the token is refreshed
//! and the POST retried once against the same URL. Any other failure, or a
//! second rejection, is reported to the caller. Upstream bodies are logged
//! here and never travel further.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use mwrt_common::ReconciledResult;

use crate::services::token_manager::TokenManager;

/// Upstream forwarding errors
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("MammalWeb API timed out")]
    Timeout,

    #[error("MammalWeb API returned {status}")]
    ApiError { status: u16, body: String },

    #[error("No MammalWeb API token available")]
    NoToken,
}

/// Authenticated client for the MammalWeb analysis endpoint
pub struct UpstreamForwarder {
    http_client: reqwest::Client,
    analysis_url: String,
    tokens: Arc<TokenManager>,
}

impl UpstreamForwarder {
    pub fn new(http_client: reqwest::Client, analysis_url: String, tokens: Arc<TokenManager>) -> Self {
        Self {
            http_client,
            analysis_url,
            tokens,
        }
    }

    pub fn analysis_url(&self) -> &str {
        &self.analysis_url
    }

    /// POST one result, refreshing the token and retrying once on 403
    pub async fn forward(&self, result: &ReconciledResult) -> Result<(), ForwardError> {
        let mut snapshot = self.tokens.snapshot().await;

        // Startup exchange failed and nothing has succeeded since
        if snapshot.token.is_none() {
            warn!("No MammalWeb API token held, refreshing before forwarding");
            let _ = self.tokens.refresh_after(snapshot.epoch).await;
            snapshot = self.tokens.snapshot().await;
        }
        let Some(token) = snapshot.token.as_deref() else {
            error!(
                sequence_id = %result.sequence_id,
                "No MammalWeb API token available, analysis not forwarded"
            );
            return Err(ForwardError::NoToken);
        };

        let mut response = self.post(result, token).await?;

        if response.status() == StatusCode::FORBIDDEN {
            info!("Refreshing cognito token for MammalWeb API.");
            if self.tokens.refresh_after(snapshot.epoch).await.is_err() {
                warn!("Token refresh failed, retrying with the token currently held");
            }
            let token = self
                .tokens
                .current_token()
                .await
                .ok_or(ForwardError::NoToken)?;
            response = self.post(result, &token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                sequence_id = %result.sequence_id,
                "MammalWeb API rejected analysis: {}",
                body
            );
            return Err(ForwardError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        debug!(sequence_id = %result.sequence_id, "Analysis accepted by MammalWeb API");
        Ok(())
    }

    async fn post(
        &self,
        result: &ReconciledResult,
        token: &str,
    ) -> Result<reqwest::Response, ForwardError> {
        self.http_client
            .post(&self.analysis_url)
            .bearer_auth(token)
            .json(result)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.analysis_url, "MammalWeb API request failed: {}", e);
                if e.is_timeout() {
                    ForwardError::Timeout
                } else {
                    ForwardError::NetworkError(e.to_string())
                }
            })
    }
}
