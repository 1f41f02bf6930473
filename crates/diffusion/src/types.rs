//! Core data model for the diffusion engine

use chrono::{DateTime, Utc};
use citeflow_common::sources::Work;
use citeflow_common::QualitySettings;
use serde::{Deserialize, Serialize};

/// One node per discovered DOI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperNode {
    /// Normalized DOI (unique key)
    pub doi: String,

    /// Paper title
    pub title: String,

    /// Publication year
    pub year: Option<i32>,

    /// External citation count (popularity signal)
    pub cited_by_count: u32,

    /// Count of stored edges with this node as the cited endpoint
    pub in_degree: usize,

    /// Count of stored edges with this node as the citing endpoint
    pub out_degree: usize,

    /// First diffusion stage that discovered this paper
    pub discovery_stage: u32,

    /// Community assignment, None until detection runs
    pub cluster_id: Option<usize>,
}

/// Which expansion direction produced an edge
///
/// Purely informational; does not affect degree math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Forward,
    Backward,
}

/// A directed citation edge; at most one per ordered DOI pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationEdge {
    pub citing_doi: String,
    pub cited_doi: String,
    pub edge_type: EdgeType,
}

/// Full metadata record for a corpus member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub doi: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub cited_by_count: u32,
    pub open_access_url: Option<String>,

    /// Relevance in [0, 1]; None until scored or auto-included.
    /// Once set, never reset to None.
    pub relevance_score: Option<f64>,

    /// Scorer reasoning, for downstream display
    pub relevance_reasoning: Option<String>,

    /// First diffusion stage that discovered this paper
    pub discovery_stage: u32,
}

impl PaperMetadata {
    /// Build metadata from a fetched work record
    pub fn from_work(work: &Work, discovery_stage: u32) -> Self {
        Self {
            doi: work.doi.clone(),
            title: work.title.clone(),
            authors: work.authors.clone(),
            abstract_text: work.abstract_text.clone(),
            venue: work.venue.clone(),
            year: work.year,
            cited_by_count: work.cited_by_count,
            open_access_url: work.open_access_url.clone(),
            relevance_score: None,
            relevance_reasoning: None,
            discovery_stage,
        }
    }
}

/// Record of one diffusion iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionStage {
    pub stage_number: u32,
    pub seed_dois: Vec<String>,
    pub candidate_dois: Vec<String>,
    pub newly_relevant: Vec<String>,
    pub newly_rejected: Vec<String>,

    /// |newly relevant| / |candidates this stage|, 0.0 when no candidates
    pub coverage_delta: f64,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Running state of one diffusion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffusionState {
    pub current_stage: u32,
    pub max_stages: u32,
    pub saturation_threshold: f64,
    pub consecutive_low_coverage: u32,
    pub is_saturated: bool,
    pub total_discovered: usize,
    pub total_relevant: usize,
    pub total_rejected: usize,
}

impl DiffusionState {
    /// Initial state for a run under the given settings
    pub fn new(settings: &QualitySettings) -> Self {
        Self {
            current_stage: 0,
            max_stages: settings.max_stages,
            saturation_threshold: settings.saturation_threshold,
            consecutive_low_coverage: 0,
            is_saturated: false,
            total_discovered: 0,
            total_relevant: 0,
            total_rejected: 0,
        }
    }
}
