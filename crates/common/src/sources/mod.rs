//! External service abstractions
//!
//! Provides the two collaborator seams the diffusion engine depends on:
//! - [`CitationSource`]: bibliographic lookups (forward/backward citations,
//!   batch DOI resolution)
//! - [`RelevanceScorer`]: per-paper relevance judgment against a research
//!   topic, with a bounded-concurrency batch variant

mod openalex;

pub use openalex::OpenAlexClient;

use crate::errors::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A bibliographic work as returned by the citation source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    /// Normalized DOI
    pub doi: String,

    /// Paper title
    pub title: String,

    /// Publication year
    pub year: Option<i32>,

    /// Author display names
    pub authors: Vec<String>,

    /// Venue (journal or conference) display name
    pub venue: Option<String>,

    /// External citation count (popularity signal)
    pub cited_by_count: u32,

    /// Abstract text, when the source carries one
    pub abstract_text: Option<String>,

    /// Open-access URL, when available
    pub open_access_url: Option<String>,
}

/// Relevance judgment produced by the scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceJudgment {
    /// Relevance score in [0, 1]
    pub score: f64,

    /// Scorer's reasoning, for downstream display
    pub reasoning: String,
}

/// A work paired with its relevance judgment
#[derive(Debug, Clone)]
pub struct ScoredWork {
    pub work: Work,
    pub judgment: RelevanceJudgment,
}

/// Bibliographic API seam
#[async_trait]
pub trait CitationSource: Send + Sync {
    /// Works that cite the given paper
    async fn get_forward_citations(&self, doi: &str) -> Result<Vec<Work>>;

    /// Works the given paper cites (its references)
    async fn get_backward_citations(&self, doi: &str) -> Result<Vec<Work>>;

    /// Batch lookup by DOI, used as the metadata fallback for papers known
    /// only as citation targets
    async fn get_works_by_dois(&self, dois: &[String]) -> Result<Vec<Work>>;
}

/// Relevance scoring seam (an LLM call in production)
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score a single paper against the research topic and questions
    async fn score(
        &self,
        paper: &Work,
        topic: &str,
        research_questions: &[String],
    ) -> Result<RelevanceJudgment>;

    /// Score many papers with bounded concurrency and partition them at the
    /// relevance threshold.
    ///
    /// A failed scoring call is recovered as a neutral judgment at exactly
    /// the threshold, so the candidate is kept rather than silently dropped.
    /// False negatives from transient scorer failures cost more than
    /// temporarily over-including.
    async fn score_batch(
        &self,
        papers: Vec<Work>,
        topic: &str,
        research_questions: &[String],
        threshold: f64,
        max_concurrent: usize,
    ) -> (Vec<ScoredWork>, Vec<ScoredWork>) {
        let scored: Vec<ScoredWork> = stream::iter(papers)
            .map(|work| async move {
                let judgment = match self.score(&work, topic, research_questions).await {
                    Ok(judgment) => judgment,
                    Err(e) => {
                        warn!(
                            doi = %work.doi,
                            error = %e,
                            "Relevance scoring failed, keeping candidate with neutral score"
                        );
                        RelevanceJudgment {
                            score: threshold,
                            reasoning: "Scoring unavailable; kept for review".to_string(),
                        }
                    }
                };
                ScoredWork { work, judgment }
            })
            .buffer_unordered(max_concurrent.max(1))
            .collect()
            .await;

        scored
            .into_iter()
            .partition(|s| s.judgment.score >= threshold)
    }
}
