//! # MammalWeb Rule of Thumb Common Library
//!
//! Shared code for the rule-of-thumb analysis service including:
//! - Configuration loading and validation
//! - Classification and analysis result types
//! - The species reconciliation rule
//! - Configuration error types

pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;

pub use error::{Error, Result};
pub use model::{ClassificationId, ReconciledResult, SentinelIds};
pub use reconcile::reconcile;
