//! Error types for Citeflow
//!
//! Provides the diffusion error taxonomy with:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes
//! - A recoverability flag driving the per-candidate degradation policy
//!
//! The propagation policy is deliberate: no error originating inside a single
//! candidate's fetch, score, or lookup may abort a diffusion stage. Callers
//! recover locally (empty citation list, neutral score, dropped candidate)
//! and log instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using DiffusionError
pub type Result<T> = std::result::Result<T, DiffusionError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Graph errors (1xxx)
    GraphIntegrity,
    CentralityComputation,
    CommunityDetection,

    // External service errors (2xxx)
    ExternalFetch,
    Scoring,
    UnresolvableCandidate,

    // Internal errors (9xxx)
    Configuration,
    Serialization,
    Internal,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Graph (1xxx)
            ErrorCode::GraphIntegrity => 1001,
            ErrorCode::CentralityComputation => 1002,
            ErrorCode::CommunityDetection => 1003,

            // External (2xxx)
            ErrorCode::ExternalFetch => 2001,
            ErrorCode::Scoring => 2002,
            ErrorCode::UnresolvableCandidate => 2003,

            // Internal (9xxx)
            ErrorCode::Configuration => 9001,
            ErrorCode::Serialization => 9002,
            ErrorCode::Internal => 9999,
        }
    }
}

/// Diffusion error types
#[derive(Error, Debug)]
pub enum DiffusionError {
    // Graph errors
    #[error("Graph integrity violation: {message}")]
    GraphIntegrity { message: String },

    #[error("Centrality computation failed: {message}")]
    CentralityComputation { message: String },

    #[error("Community detection failed: {message}")]
    CommunityDetection { message: String },

    // External service errors
    #[error("Citation fetch failed for {doi}: {message}")]
    ExternalFetch { doi: String, message: String },

    #[error("Relevance scoring failed for {doi}: {message}")]
    Scoring { doi: String, message: String },

    #[error("Candidate unresolvable after fallback lookup: {doi}")]
    UnresolvableCandidate { doi: String },

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl DiffusionError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            DiffusionError::GraphIntegrity { .. } => ErrorCode::GraphIntegrity,
            DiffusionError::CentralityComputation { .. } => ErrorCode::CentralityComputation,
            DiffusionError::CommunityDetection { .. } => ErrorCode::CommunityDetection,
            DiffusionError::ExternalFetch { .. } => ErrorCode::ExternalFetch,
            DiffusionError::Scoring { .. } => ErrorCode::Scoring,
            DiffusionError::UnresolvableCandidate { .. } => ErrorCode::UnresolvableCandidate,
            DiffusionError::Configuration { .. } => ErrorCode::Configuration,
            DiffusionError::Serialization(_) => ErrorCode::Serialization,
            DiffusionError::Http(_) => ErrorCode::ExternalFetch,
            DiffusionError::Other(_) => ErrorCode::Internal,
        }
    }

    /// Check if this error is recovered locally during a diffusion stage
    ///
    /// Recoverable errors degrade a single candidate (empty citation list,
    /// neutral score, dropped candidate) and must never abort a stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DiffusionError::ExternalFetch { .. }
                | DiffusionError::Scoring { .. }
                | DiffusionError::UnresolvableCandidate { .. }
                | DiffusionError::CentralityComputation { .. }
                | DiffusionError::CommunityDetection { .. }
                | DiffusionError::Http(_)
        )
    }
}
