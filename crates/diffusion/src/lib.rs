//! Citeflow Diffusion Engine
//!
//! Expands a set of seed papers into a relevant corpus by walking the
//! citation network in stages:
//! - Citation graph with centrality, community, and co-citation analyses
//! - Two-stage relevance filter (co-citation overlap, then scored relevance)
//! - Corpus management with metadata-resolution fallback
//! - Multi-condition saturation detection

pub mod corpus;
pub mod engine;
pub mod graph;
pub mod saturation;
pub mod types;

// Re-export commonly used types
pub use corpus::{AdmittedCandidate, CorpusManager, MergeOutcome};
pub use engine::{DiffusionEngine, DiffusionOutcome};
pub use graph::{CitationGraph, ClusterAlgorithm, SerializedGraph};
pub use saturation::SaturationController;
pub use types::{
    CitationEdge, DiffusionStage, DiffusionState, EdgeType, PaperMetadata, PaperNode,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
