//! Citeflow Common Library
//!
//! Shared code for Citeflow components including:
//! - Error types and the diffusion recovery taxonomy
//! - Configuration management
//! - External service seams (citation source, relevance scorer)
//! - DOI normalization
//! - Tracing setup

pub mod config;
pub mod doi;
pub mod errors;
pub mod observability;
pub mod sources;

// Re-export commonly used types
pub use config::{AppConfig, QualitySettings};
pub use doi::normalize_doi;
pub use errors::{DiffusionError, Result};
pub use observability::init_tracing;
pub use sources::{CitationSource, RelevanceScorer, Work};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
