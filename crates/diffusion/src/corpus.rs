//! Corpus management
//!
//! Merges newly-relevant papers into the running corpus and the citation
//! graph. The corpus manager is the only component that creates graph nodes
//! and edges; all merges happen between stage I/O, so no locking is needed.

use crate::graph::CitationGraph;
use crate::types::{EdgeType, PaperMetadata};
use citeflow_common::normalize_doi;
use citeflow_common::sources::{CitationSource, Work};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// A candidate admitted by the co-citation or relevance filter, ready to merge
#[derive(Debug, Clone)]
pub struct AdmittedCandidate {
    /// Normalized DOI
    pub doi: String,

    /// Full metadata when the citation source returned it; None for papers
    /// known only as citation targets (triggers the batch lookup fallback)
    pub work: Option<Work>,

    /// Score from the relevance filter, or the auto-include default
    pub relevance_score: f64,

    /// Scorer reasoning or auto-include note
    pub relevance_reasoning: Option<String>,

    /// Corpus DOIs this candidate cites (candidate -> corpus edges)
    pub cites: HashSet<String>,

    /// Corpus DOIs citing this candidate (corpus -> candidate edges)
    pub cited_by: HashSet<String>,
}

/// Counts from one corpus update
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Papers merged into the corpus this update
    pub merged: Vec<String>,

    /// Of those, papers whose metadata came from the batch lookup fallback
    pub resolved_by_fallback: usize,

    /// Candidates dropped because the fallback lookup failed too
    pub dropped_unresolvable: Vec<String>,

    /// New citation edges added to the graph
    pub edges_added: usize,
}

/// Running corpus of relevant papers
pub struct CorpusManager {
    papers: HashMap<String, PaperMetadata>,

    /// DOIs in discovery order, the stable tie-break for finalization
    discovery_order: Vec<String>,
}

impl CorpusManager {
    pub fn new() -> Self {
        Self {
            papers: HashMap::new(),
            discovery_order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn contains(&self, doi: &str) -> bool {
        self.papers.contains_key(&normalize_doi(doi))
    }

    pub fn get(&self, doi: &str) -> Option<&PaperMetadata> {
        self.papers.get(&normalize_doi(doi))
    }

    /// Snapshot of all corpus DOIs
    pub fn doi_set(&self) -> HashSet<String> {
        self.papers.keys().cloned().collect()
    }

    /// Consume the manager, yielding the metadata map
    pub fn into_papers(self) -> HashMap<String, PaperMetadata> {
        self.papers
    }

    /// Insert or refresh one paper, mirroring the node into the graph
    ///
    /// An existing record keeps its relevance score when the incoming one
    /// carries none (a score, once set, is never unset) and keeps its first
    /// discovery stage.
    pub fn insert_paper(&mut self, graph: &mut CitationGraph, mut meta: PaperMetadata) {
        meta.doi = normalize_doi(&meta.doi);

        graph.add_paper(
            &meta.doi,
            &meta.title,
            meta.year,
            meta.cited_by_count,
            meta.discovery_stage,
        );

        match self.papers.get_mut(&meta.doi) {
            Some(existing) => {
                if meta.relevance_score.is_none() {
                    meta.relevance_score = existing.relevance_score;
                    meta.relevance_reasoning = existing.relevance_reasoning.clone();
                }
                meta.discovery_stage = existing.discovery_stage;
                *existing = meta;
            }
            None => {
                self.discovery_order.push(meta.doi.clone());
                self.papers.insert(meta.doi.clone(), meta);
            }
        }
    }

    /// Merge a stage's admitted candidates into the corpus and graph
    ///
    /// Candidates without metadata go through one batch DOI lookup against
    /// the citation source; those still unresolvable are dropped and logged,
    /// never retried within the run. Nodes are created before edges so the
    /// edge-endpoint invariant holds throughout.
    pub async fn update_corpus(
        &mut self,
        graph: &mut CitationGraph,
        candidates: Vec<AdmittedCandidate>,
        intra_corpus_edges: &[(String, String, EdgeType)],
        source: &dyn CitationSource,
        stage: u32,
    ) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        // One batch fallback for citation-target-only candidates
        let missing: Vec<String> = candidates
            .iter()
            .filter(|c| c.work.is_none())
            .map(|c| c.doi.clone())
            .collect();
        let mut resolved: HashMap<String, Work> = HashMap::new();
        if !missing.is_empty() {
            debug!(count = missing.len(), "Resolving citation-target candidates by DOI lookup");
            match source.get_works_by_dois(&missing).await {
                Ok(works) => {
                    for work in works {
                        resolved.insert(work.doi.clone(), work);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Batch DOI lookup failed, dropping unresolved candidates");
                }
            }
        }

        for candidate in &candidates {
            let work = match (&candidate.work, resolved.get(&candidate.doi)) {
                (Some(work), _) => work,
                (None, Some(work)) => {
                    outcome.resolved_by_fallback += 1;
                    work
                }
                (None, None) => {
                    warn!(doi = %candidate.doi, "Candidate unresolvable after fallback lookup, dropping");
                    outcome.dropped_unresolvable.push(candidate.doi.clone());
                    continue;
                }
            };

            let mut meta = PaperMetadata::from_work(work, stage);
            meta.relevance_score = Some(candidate.relevance_score);
            meta.relevance_reasoning = candidate.relevance_reasoning.clone();
            self.insert_paper(graph, meta);
            outcome.merged.push(candidate.doi.clone());
        }

        // Edges last: both endpoints exist for every merged candidate, and
        // add_citation quietly skips candidates that were dropped above
        for candidate in &candidates {
            for cited in &candidate.cites {
                if graph.add_citation(&candidate.doi, cited, EdgeType::Forward) {
                    outcome.edges_added += 1;
                }
            }
            for citing in &candidate.cited_by {
                if graph.add_citation(citing, &candidate.doi, EdgeType::Backward) {
                    outcome.edges_added += 1;
                }
            }
        }
        for (citing, cited, edge_type) in intra_corpus_edges {
            if graph.add_citation(citing, cited, *edge_type) {
                outcome.edges_added += 1;
            }
        }

        outcome
    }

    /// Top-N corpus DOIs by relevance score
    ///
    /// Unscored papers rank lowest; ties keep discovery order (stable).
    pub fn top_by_relevance(&self, max_papers: usize) -> Vec<String> {
        let mut ranked: Vec<(usize, &String, f64)> = self
            .discovery_order
            .iter()
            .enumerate()
            .filter_map(|(order, doi)| {
                self.papers
                    .get(doi)
                    .map(|p| (order, doi, p.relevance_score.unwrap_or(0.0)))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
            .into_iter()
            .take(max_papers)
            .map(|(_, doi, _)| doi.clone())
            .collect()
    }
}

impl Default for CorpusManager {
    fn default() -> Self {
        Self::new()
    }
}
