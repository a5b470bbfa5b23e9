//! Bearer token for the MammalWeb API
//!
//! Tokens come from a Cognito client-credentials exchange. The token is
//! refreshed eagerly at startup and reactively whenever the MammalWeb API
//! answers 403. Refreshes are single-flight: callers that observed the same
//! token wait on one exchange instead of each starting their own.

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use mwrt_common::config::AuthDetails;

/// Token refresh errors
///
/// None of these are fatal; the previous token (if any) stays in place.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Token endpoint returned {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("access_token doesn't exist in token response")]
    MissingAccessToken,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Token value together with the refresh epoch it was read at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub token: Option<String>,
    /// Incremented after every completed refresh attempt, successful or not
    pub epoch: u64,
}

/// Holds and refreshes the MammalWeb bearer token
pub struct TokenManager {
    http_client: reqwest::Client,
    auth: AuthDetails,
    state: RwLock<TokenSnapshot>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Create a manager with no token yet
    pub fn new(http_client: reqwest::Client, auth: AuthDetails) -> Self {
        Self {
            http_client,
            auth,
            state: RwLock::new(TokenSnapshot::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Current token, absent until a refresh has succeeded
    pub async fn current_token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn snapshot(&self) -> TokenSnapshot {
        self.state.read().await.clone()
    }

    /// Exchange client credentials for a new token unconditionally
    pub async fn refresh(&self) -> Result<(), TokenError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh unless another refresh completed after `observed_epoch`
    ///
    /// Concurrent callers holding the same stale snapshot trigger one
    /// exchange between them.
    pub async fn refresh_after(&self, observed_epoch: u64) -> Result<(), TokenError> {
        let _guard = self.refresh_lock.lock().await;

        let current_epoch = self.state.read().await.epoch;
        if current_epoch != observed_epoch {
            debug!(
                observed_epoch,
                current_epoch, "Token already refreshed by a concurrent request"
            );
            return Ok(());
        }

        self.refresh_locked().await
    }

    // Caller must hold refresh_lock
    async fn refresh_locked(&self) -> Result<(), TokenError> {
        info!("Getting MammalWeb API token.");
        let outcome = self.request_token().await;

        let mut state = self.state.write().await;
        state.epoch += 1;
        match outcome {
            Ok(token) => {
                state.token = Some(token);
                info!(epoch = state.epoch, "Successfully obtained MammalWeb API token.");
                Ok(())
            }
            Err(e) => {
                error!(
                    epoch = state.epoch,
                    has_previous_token = state.token.is_some(),
                    "Unable to get MammalWeb token because: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<String, TokenError> {
        let response = self
            .http_client
            .post(&self.auth.cognito_endpoint)
            .basic_auth(&self.auth.client_id, Some(&self.auth.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| TokenError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TokenError::ApiError(status.as_u16(), error_text));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::ParseError(e.to_string()))?;

        token_response
            .access_token
            .ok_or(TokenError::MissingAccessToken)
    }
}
