//! Configuration management for Citeflow
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Diffusion quality settings
    #[serde(default)]
    pub quality: QualitySettings,

    /// Citation source (bibliographic API) configuration
    #[serde(default)]
    pub source: CitationSourceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Quality settings governing one diffusion run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QualitySettings {
    /// Maximum number of diffusion stages before forced stop
    #[serde(default = "default_max_stages")]
    pub max_stages: u32,

    /// Maximum corpus size; FINALIZE truncates to this
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,

    /// Coverage-delta floor; two consecutive stages below it saturate the run
    #[serde(default = "default_saturation_threshold")]
    pub saturation_threshold: f64,

    /// Candidates with fewer external citations than this are not scored
    #[serde(default = "default_min_citations_filter")]
    pub min_citations_filter: u32,

    /// Co-citation overlap needed for auto-inclusion
    #[serde(default = "default_cocitation_threshold")]
    pub cocitation_threshold: usize,

    /// Per-paper cap on fetched citations (guards against hub explosion)
    #[serde(default = "default_max_citations_per_paper")]
    pub max_citations_per_paper: usize,

    /// Concurrent citation fetches against the bibliographic API
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Relevance score at or above which a scored candidate is kept
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f64,

    /// Concurrent relevance-scoring calls
    #[serde(default = "default_max_concurrent_scores")]
    pub max_concurrent_scores: usize,

    /// Relevance score assigned to co-citation auto-includes
    #[serde(default = "default_auto_include_score")]
    pub auto_include_score: f64,

    /// Expansion seeds selected per stage after stage 0
    #[serde(default = "default_max_seeds_per_stage")]
    pub max_seeds_per_stage: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CitationSourceConfig {
    /// Base URL of the bibliographic API
    #[serde(default = "default_source_base_url")]
    pub base_url: String,

    /// Contact email sent with requests (polite pool)
    pub mailto: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request
    #[serde(default = "default_source_retries")]
    pub max_retries: u32,

    /// Results per citation query
    #[serde(default = "default_source_page_size")]
    pub page_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_max_stages() -> u32 { 4 }
fn default_max_papers() -> usize { 120 }
fn default_saturation_threshold() -> f64 { 0.1 }
fn default_min_citations_filter() -> u32 { 0 }
fn default_cocitation_threshold() -> usize { 3 }
fn default_max_citations_per_paper() -> usize { 50 }
fn default_max_concurrent_fetches() -> usize { 8 }
fn default_relevance_threshold() -> f64 { 0.5 }
fn default_max_concurrent_scores() -> usize { 4 }
fn default_auto_include_score() -> f64 { 0.8 }
fn default_max_seeds_per_stage() -> usize { 10 }
fn default_source_base_url() -> String { "https://api.openalex.org".to_string() }
fn default_source_timeout() -> u64 { 30 }
fn default_source_retries() -> u32 { 3 }
fn default_source_page_size() -> usize { 200 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "citeflow".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__QUALITY__MAX_STAGES=6
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl CitationSourceConfig {
    /// Get the request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            max_stages: default_max_stages(),
            max_papers: default_max_papers(),
            saturation_threshold: default_saturation_threshold(),
            min_citations_filter: default_min_citations_filter(),
            cocitation_threshold: default_cocitation_threshold(),
            max_citations_per_paper: default_max_citations_per_paper(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            relevance_threshold: default_relevance_threshold(),
            max_concurrent_scores: default_max_concurrent_scores(),
            auto_include_score: default_auto_include_score(),
            max_seeds_per_stage: default_max_seeds_per_stage(),
        }
    }
}

impl Default for CitationSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            mailto: None,
            timeout_secs: default_source_timeout(),
            max_retries: default_source_retries(),
            page_size: default_source_page_size(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quality: QualitySettings::default(),
            source: CitationSourceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.quality.max_stages, 4);
        assert_eq!(config.quality.cocitation_threshold, 3);
        assert_eq!(config.source.base_url, "https://api.openalex.org");
    }

    #[test]
    fn test_auto_include_passes_threshold() {
        // Auto-included candidates must survive the relevance gate
        let config = QualitySettings::default();
        assert!(config.auto_include_score >= config.relevance_threshold);
    }

    #[test]
    fn test_source_timeout_duration() {
        let config = CitationSourceConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
