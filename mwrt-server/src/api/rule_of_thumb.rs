//! POST /rule-of-thumb-v0
//!
//! Reconciles the human and AI species for one sequence, forwards the result
//! to MammalWeb and echoes what was sent.

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap},
    Json,
};
use serde_json::{Map, Value};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use mwrt_common::{reconcile, ClassificationId, ReconciledResult};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Media types accepted for the request body
pub const ALLOWED_CONTENT_TYPES: [&str; 2] = ["application/json", "text/plain"];

/// Inbound payload after validation
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceAnalysisRequest {
    pub ai_type: String,
    pub ai_version: String,
    pub sequence_id: Value,
    pub human_species: Vec<ClassificationId>,
    pub ai_species: Vec<ClassificationId>,
}

const REQUIRED_KEYS: [&str; 5] = [
    "ai_type",
    "ai_version",
    "sequence_id",
    "human_species",
    "ai_species",
];

impl SequenceAnalysisRequest {
    /// Parse a raw body
    ///
    /// All required keys are checked for presence before any value is
    /// type-checked, so a missing key is always the reported problem.
    /// Unknown keys are ignored.
    pub fn parse(body: &[u8]) -> ApiResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::Malformed(format!("Body is not valid JSON: {}", e)))?;
        let object = value
            .as_object()
            .ok_or_else(|| ApiError::Malformed("Body must be a JSON object".to_string()))?;

        if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !object.contains_key(**key)) {
            return Err(ApiError::MissingKey(*missing));
        }

        Ok(Self {
            ai_type: string_field(object, "ai_type")?,
            ai_version: string_field(object, "ai_version")?,
            sequence_id: object["sequence_id"].clone(),
            human_species: species_field(object, "human_species")?,
            ai_species: species_field(object, "ai_species")?,
        })
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> ApiResult<String> {
    object[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ApiError::Malformed(format!("'{}' must be a string", key)))
}

fn species_field(object: &Map<String, Value>, key: &str) -> ApiResult<Vec<ClassificationId>> {
    let invalid = || ApiError::Malformed(format!("'{}' must be a list of non-negative integers", key));

    object[key]
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|id| id.as_u64().ok_or_else(invalid))
        .collect()
}

/// Accept the media type essence only; parameters such as charset are ignored
pub fn check_content_type(headers: &HeaderMap) -> ApiResult<()> {
    let essence = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .ok_or(ApiError::UnsupportedMediaType)?;

    if ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType)
    }
}

/// POST /rule-of-thumb-v0
pub async fn rule_of_thumb(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ReconciledResult>> {
    let span = info_span!("rule_of_thumb", request_id = %Uuid::new_v4());

    async move {
        check_content_type(&headers)?;
        let request = SequenceAnalysisRequest::parse(&body)?;

        let species = reconcile(&request.human_species, &request.ai_species, state.sentinels);
        info!(
            sequence_id = %request.sequence_id,
            human = ?request.human_species,
            ai = ?request.ai_species,
            agreed = ?species,
            "Reconciled sequence"
        );

        let result = ReconciledResult::new(
            request.ai_type,
            request.ai_version,
            request.sequence_id,
            species,
        );
        state.forwarder.forward(&result).await?;

        Ok::<_, ApiError>(Json(result))
    }
    .instrument(span)
    .await
}
