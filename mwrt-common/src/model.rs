//! Classification and analysis result types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Species identifier as used by MammalWeb, including sentinel pseudo-species
pub type ClassificationId = u64;

/// Value of the `origin` field on every reconciled result
pub const ORIGIN: &str = "MammalWeb";

/// Value of the `analysis_version` field on every reconciled result
pub const ANALYSIS_VERSION: &str = "Rule of Thumb v0";

/// Configured pseudo-species IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelIds {
    /// AI label meaning "could not classify"
    pub unclassified: ClassificationId,
    /// Label meaning "nothing in the image"
    pub nothing: ClassificationId,
    /// Emitted when human and AI labels share no species
    pub no_agreement: ClassificationId,
}

/// Analysis record forwarded to the MammalWeb ingestion API
///
/// Field order matches the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledResult {
    pub origin: String,
    pub ai_type: String,
    pub ai_version: String,
    pub analysis_version: String,
    /// Opaque to this service; echoed as received
    pub sequence_id: Value,
    /// Never empty
    pub species: Vec<ClassificationId>,
}

impl ReconciledResult {
    /// Build a result with the fixed origin and analysis version
    pub fn new(
        ai_type: String,
        ai_version: String,
        sequence_id: Value,
        species: Vec<ClassificationId>,
    ) -> Self {
        Self {
            origin: ORIGIN.to_string(),
            ai_type,
            ai_version,
            analysis_version: ANALYSIS_VERSION.to_string(),
            sequence_id,
            species,
        }
    }
}
