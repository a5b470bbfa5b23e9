//! Configuration loading and validation
//!
//! Settings are resolved with ENV → TOML priority and validated in a single
//! pass at startup. Every problem found is reported together so a broken
//! deployment can be fixed in one go.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::model::{ClassificationId, SentinelIds};
use crate::{Error, Result};

pub const ENV_NO_AGREEMENT_ID: &str = "CS_AI_NO_AGREEMENT_ID";
pub const ENV_UNCLASSIFIED_ID: &str = "AI_UNCLASSIFIED_ID";
pub const ENV_NOTHING_ID: &str = "NOTHING_ID";
pub const ENV_MAMMALWEB_ENDPOINT: &str = "MAMMALWEB_ENDPOINT";
pub const ENV_AUTH_DETAILS: &str = "AUTH_DETAILS";
pub const ENV_UPSTREAM_TIMEOUT_SECS: &str = "MWRT_UPSTREAM_TIMEOUT_SECS";

/// Outbound request timeout when none is configured
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Optional TOML config file contents
///
/// Every field is optional; environment variables take priority.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub no_agreement_id: Option<ClassificationId>,
    pub unclassified_id: Option<ClassificationId>,
    pub nothing_id: Option<ClassificationId>,
    pub mammalweb_endpoint: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    /// Same keys as the AUTH_DETAILS JSON object
    pub auth: Option<toml::Table>,
}

impl TomlConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        info!("Loaded config file {}", path.display());
        Ok(config)
    }
}

/// Client credentials for the Cognito token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct AuthDetails {
    pub cognito_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
}

// Keeps the secret out of logs
impl fmt::Debug for AuthDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthDetails")
            .field("cognito_endpoint", &self.cognito_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl AuthDetails {
    /// Parse the AUTH_DETAILS JSON object
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|_| Error::Invalid {
            key: ENV_AUTH_DETAILS,
            reason: "not formatted as a json string".to_string(),
        })?;
        let object = value.as_object().ok_or_else(|| Error::Invalid {
            key: ENV_AUTH_DETAILS,
            reason: "expected a json object".to_string(),
        })?;

        Self::from_fields(|field| object.get(field).and_then(Value::as_str).map(str::to_string))
    }

    /// Build from the `[auth]` table of the TOML config
    pub fn from_toml(table: &toml::Table) -> Result<Self> {
        Self::from_fields(|field| {
            table
                .get(field)
                .and_then(toml::Value::as_str)
                .map(str::to_string)
        })
    }

    fn from_fields(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut errors = Vec::new();
        let mut required = |field: &str| {
            let value = lookup(field).filter(|v| !v.trim().is_empty());
            if value.is_none() {
                errors.push(Error::Invalid {
                    key: ENV_AUTH_DETAILS,
                    reason: format!("{} not in AUTH_DETAILS", field),
                });
            }
            value
        };
        let cognito_endpoint = required("cognitoEndPoint");
        let client_id = required("clientId");
        let client_secret = required("clientSecret");

        let cognito_endpoint = cognito_endpoint.and_then(|raw| {
            parse_http_url(ENV_AUTH_DETAILS, "cognitoEndPoint", &raw)
                .map_err(|e| errors.push(e))
                .ok()
        });

        match (cognito_endpoint, client_id, client_secret) {
            (Some(cognito_endpoint), Some(client_id), Some(client_secret)) if errors.is_empty() => {
                Ok(Self {
                    cognito_endpoint: cognito_endpoint.to_string(),
                    client_id,
                    client_secret,
                })
            }
            _ if errors.len() == 1 => Err(errors.remove(0)),
            _ => Err(Error::Multiple(errors)),
        }
    }
}

/// Validated service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub sentinels: SentinelIds,
    /// MammalWeb API base URL without trailing slash
    pub mammalweb_endpoint: String,
    pub auth: AuthDetails,
    /// Bound on every outbound HTTP call
    pub upstream_timeout: Duration,
}

impl ServiceConfig {
    /// Resolve from process environment, falling back to an optional TOML file
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let toml_config = match config_file {
            Some(path) => TomlConfig::load(path)?,
            None => TomlConfig::default(),
        };
        Self::resolve(|key| std::env::var(key).ok(), &toml_config)
    }

    /// Resolve and validate every setting
    ///
    /// `env` looks up an environment variable by name.
    pub fn resolve(env: impl Fn(&str) -> Option<String>, toml_config: &TomlConfig) -> Result<Self> {
        let mut errors = Vec::new();

        let no_agreement = resolve_id(&env, ENV_NO_AGREEMENT_ID, toml_config.no_agreement_id)
            .map_err(|e| errors.push(e))
            .ok();
        let unclassified = resolve_id(&env, ENV_UNCLASSIFIED_ID, toml_config.unclassified_id)
            .map_err(|e| errors.push(e))
            .ok();
        let nothing = resolve_id(&env, ENV_NOTHING_ID, toml_config.nothing_id)
            .map_err(|e| errors.push(e))
            .ok();

        let endpoint = resolve_endpoint(&env, toml_config.mammalweb_endpoint.as_deref())
            .map_err(|e| errors.push(e))
            .ok();

        let auth = resolve_auth(&env, toml_config.auth.as_ref())
            .map_err(|e| match e {
                Error::Multiple(inner) => errors.extend(inner),
                other => errors.push(other),
            })
            .ok();

        let timeout = resolve_timeout(&env, toml_config.upstream_timeout_secs)
            .map_err(|e| errors.push(e))
            .ok();

        match (no_agreement, unclassified, nothing, endpoint, auth, timeout) {
            (Some(no_agreement), Some(unclassified), Some(nothing), Some(endpoint), Some(auth), Some(timeout))
                if errors.is_empty() =>
            {
                Ok(Self {
                    sentinels: SentinelIds {
                        unclassified,
                        nothing,
                        no_agreement,
                    },
                    mammalweb_endpoint: endpoint,
                    auth,
                    upstream_timeout: timeout,
                })
            }
            _ if errors.len() == 1 => Err(errors.remove(0)),
            _ => Err(Error::Multiple(errors)),
        }
    }

    /// Upstream URL that receives reconciled results
    pub fn analysis_url(&self) -> String {
        format!("{}/analysis/ruleofthumb", self.mammalweb_endpoint)
    }
}

/// Parse a sentinel ID given as a string of decimal digits
pub fn parse_sentinel(key: &'static str, raw: &str) -> Result<ClassificationId> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Invalid {
            key,
            reason: "must be an integer passed through as a string".to_string(),
        });
    }
    raw.parse().map_err(|e| Error::Invalid {
        key,
        reason: format!("{}", e),
    })
}

/// Pick the environment value over the TOML value, warning when both are set
fn pick<T>(key: &str, env_value: Option<T>, toml_value: Option<T>) -> Option<T> {
    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and config file. Using environment (highest priority).",
            key
        );
    }
    env_value.or(toml_value)
}

fn resolve_id(
    env: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    toml_value: Option<ClassificationId>,
) -> Result<ClassificationId> {
    let env_value = env(key).map(|raw| parse_sentinel(key, &raw)).transpose()?;
    pick(key, env_value, toml_value).ok_or(Error::Missing(key))
}

fn resolve_endpoint(
    env: &impl Fn(&str) -> Option<String>,
    toml_value: Option<&str>,
) -> Result<String> {
    let raw = pick(ENV_MAMMALWEB_ENDPOINT, env(ENV_MAMMALWEB_ENDPOINT), toml_value.map(str::to_string))
        .ok_or(Error::Missing(ENV_MAMMALWEB_ENDPOINT))?;

    let url = parse_http_url(ENV_MAMMALWEB_ENDPOINT, ENV_MAMMALWEB_ENDPOINT, &raw)?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Parse an absolute http(s) URL with a host
fn parse_http_url(key: &'static str, field: &str, raw: &str) -> Result<Url> {
    let invalid = |detail: String| Error::Invalid {
        key,
        reason: format!("{} must be an http(s) URL, got {:?}: {}", field, raw, detail),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn resolve_auth(
    env: &impl Fn(&str) -> Option<String>,
    toml_table: Option<&toml::Table>,
) -> Result<AuthDetails> {
    match env(ENV_AUTH_DETAILS) {
        Some(raw) => {
            if toml_table.is_some() {
                warn!(
                    "{} found in both environment and config file. Using environment (highest priority).",
                    ENV_AUTH_DETAILS
                );
            }
            AuthDetails::from_json(&raw)
        }
        None => match toml_table {
            Some(table) => AuthDetails::from_toml(table),
            None => Err(Error::Missing(ENV_AUTH_DETAILS)),
        },
    }
}

fn resolve_timeout(
    env: &impl Fn(&str) -> Option<String>,
    toml_value: Option<u64>,
) -> Result<Duration> {
    let env_value = env(ENV_UPSTREAM_TIMEOUT_SECS)
        .map(|raw| parse_sentinel(ENV_UPSTREAM_TIMEOUT_SECS, &raw))
        .transpose()?;
    let secs = pick(ENV_UPSTREAM_TIMEOUT_SECS, env_value, toml_value)
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if secs == 0 {
        return Err(Error::Invalid {
            key: ENV_UPSTREAM_TIMEOUT_SECS,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
