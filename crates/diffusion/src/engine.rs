//! Diffusion engine
//!
//! Drives the stage loop: seed selection, concurrent citation fetch, the
//! two-stage relevance filter (co-citation overlap, then scored relevance),
//! corpus update, and saturation check. All graph and corpus mutation
//! happens inside the corpus-update step, strictly after the stage's fetch
//! and score operations have completed, so stage mutation is atomic with
//! respect to stage boundaries.

use crate::corpus::{AdmittedCandidate, CorpusManager};
use crate::graph::CitationGraph;
use crate::saturation::SaturationController;
use crate::types::{DiffusionStage, DiffusionState, EdgeType, PaperMetadata};
use chrono::Utc;
use citeflow_common::normalize_doi;
use citeflow_common::sources::{CitationSource, RelevanceScorer, Work};
use citeflow_common::QualitySettings;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of one diffusion run
#[derive(Debug)]
pub struct DiffusionOutcome {
    pub run_id: Uuid,

    /// Top papers by relevance, at most `max_papers`
    pub selected_dois: Vec<String>,

    /// Full corpus, including papers beyond the selection cut
    pub corpus: HashMap<String, PaperMetadata>,

    /// The citation graph built during the run
    pub graph: CitationGraph,

    /// Per-stage records
    pub stages: Vec<DiffusionStage>,

    /// Final run state
    pub state: DiffusionState,

    /// Why the run stopped
    pub saturation_reason: String,
}

/// Stage-local record for a discovered candidate
///
/// Candidates become graph nodes only when the corpus manager merges them;
/// until then their citation links to corpus members live here.
struct CandidateRecord {
    work: Option<Work>,
    cites: HashSet<String>,
    cited_by: HashSet<String>,
}

/// Citation-network diffusion engine
///
/// Holds only the collaborators and settings; all run state is local to
/// [`DiffusionEngine::run`], so the engine carries nothing between runs.
pub struct DiffusionEngine {
    source: Arc<dyn CitationSource>,
    scorer: Arc<dyn RelevanceScorer>,
    settings: QualitySettings,
}

impl DiffusionEngine {
    pub fn new(
        source: Arc<dyn CitationSource>,
        scorer: Arc<dyn RelevanceScorer>,
        settings: QualitySettings,
    ) -> Self {
        Self {
            source,
            scorer,
            settings,
        }
    }

    /// Run diffusion from the given seed papers
    ///
    /// Always completes with an outcome and an explicit saturation reason;
    /// failures of individual fetch, score, or lookup operations degrade the
    /// affected candidate and never abort a stage.
    #[instrument(skip_all, fields(topic = %topic, seeds = seeds.len()))]
    pub async fn run(
        &self,
        seeds: Vec<Work>,
        topic: &str,
        research_questions: &[String],
    ) -> DiffusionOutcome {
        let run_id = Uuid::new_v4();
        let controller = SaturationController::new(&self.settings);

        let mut graph = CitationGraph::new();
        let mut corpus = CorpusManager::new();
        let mut state = DiffusionState::new(&self.settings);
        let mut stages: Vec<DiffusionStage> = Vec::new();
        let mut explored: HashSet<String> = HashSet::new();
        let mut rejected_ever: HashSet<String> = HashSet::new();

        // Seeds enter the corpus at full relevance so finalization never
        // evicts a seed in favor of a scored candidate
        let discovery_seeds: Vec<String> =
            seeds.iter().map(|w| normalize_doi(&w.doi)).collect();
        for work in &seeds {
            let mut meta = PaperMetadata::from_work(work, 0);
            meta.relevance_score = Some(1.0);
            meta.relevance_reasoning = Some("Discovery seed".to_string());
            corpus.insert_paper(&mut graph, meta);
        }

        info!(run_id = %run_id, "Starting diffusion run");

        let mut saturation_reason: Option<String> = None;

        for stage in 0..self.settings.max_stages {
            let started_at = Utc::now();

            // SELECT_SEEDS
            let stage_seeds: Vec<String> = if stage == 0 {
                discovery_seeds.clone()
            } else {
                graph
                    .get_expansion_candidates(self.settings.max_seeds_per_stage, true)
                    .into_iter()
                    .filter(|doi| !explored.contains(doi))
                    .collect()
            };
            explored.extend(stage_seeds.iter().cloned());

            // FETCH_CITATIONS
            let (candidates, intra_edges) = self
                .fetch_candidates(&stage_seeds, &corpus, &rejected_ever)
                .await;
            let total_candidates = candidates.len();
            let candidate_dois: Vec<String> = {
                let mut dois: Vec<String> = candidates.keys().cloned().collect();
                dois.sort();
                dois
            };
            state.total_discovered += total_candidates;

            // COCITATION_CHECK then RELEVANCE_SCORE
            let (auto_included, to_score) = self.split_by_cocitation(candidates, &graph, &corpus);
            let auto_count = auto_included.len();
            let (mut admitted, mut stage_rejected) = (auto_included, Vec::new());
            self.score_candidates(
                to_score,
                topic,
                research_questions,
                &mut admitted,
                &mut stage_rejected,
            )
            .await;

            // UPDATE_CORPUS
            let merge = corpus
                .update_corpus(
                    &mut graph,
                    admitted,
                    &intra_edges,
                    self.source.as_ref(),
                    stage,
                )
                .await;
            stage_rejected.extend(merge.dropped_unresolvable.iter().cloned());
            rejected_ever.extend(stage_rejected.iter().cloned());

            let newly_relevant = merge.merged;
            let coverage_delta = if total_candidates == 0 {
                0.0
            } else {
                newly_relevant.len() as f64 / total_candidates as f64
            };

            state.current_stage = stage;
            state.total_relevant += newly_relevant.len();
            state.total_rejected += stage_rejected.len();

            info!(
                stage,
                seeds = stage_seeds.len(),
                candidates = total_candidates,
                auto_included = auto_count,
                relevant = newly_relevant.len(),
                rejected = stage_rejected.len(),
                edges_added = merge.edges_added,
                coverage_delta,
                corpus_size = corpus.len(),
                "Diffusion stage complete"
            );

            stages.push(DiffusionStage {
                stage_number: stage,
                seed_dois: stage_seeds,
                candidate_dois,
                newly_relevant,
                newly_rejected: stage_rejected,
                coverage_delta,
                started_at,
                completed_at: Utc::now(),
            });

            // CHECK_SATURATION
            if let Some(reason) = controller.evaluate(&mut state, corpus.len(), coverage_delta) {
                saturation_reason = Some(reason);
                break;
            }
        }

        let saturation_reason = saturation_reason.unwrap_or_else(|| {
            format!(
                "Reached maximum of {} diffusion stages",
                self.settings.max_stages
            )
        });
        state.is_saturated = true;

        // FINALIZE
        let selected_dois = corpus.top_by_relevance(self.settings.max_papers);
        info!(
            run_id = %run_id,
            selected = selected_dois.len(),
            corpus_size = corpus.len(),
            reason = %saturation_reason,
            "Diffusion run finished"
        );

        DiffusionOutcome {
            run_id,
            selected_dois,
            corpus: corpus.into_papers(),
            graph,
            stages,
            state,
            saturation_reason,
        }
    }

    /// Fetch forward and backward citations for every stage seed
    ///
    /// Fetches run concurrently under one semaphore sized to the external
    /// rate limit. A failed fetch degrades to an empty list for that seed.
    /// Returns the deduplicated candidate map plus citation edges observed
    /// between papers already in the corpus.
    async fn fetch_candidates(
        &self,
        stage_seeds: &[String],
        corpus: &CorpusManager,
        skip: &HashSet<String>,
    ) -> (
        HashMap<String, CandidateRecord>,
        Vec<(String, String, EdgeType)>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_fetches.max(1)));

        let fetches = stage_seeds.iter().map(|seed| {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let seed = seed.clone();
            async move {
                let forward = async {
                    match semaphore.acquire().await {
                        Ok(_permit) => source.get_forward_citations(&seed).await,
                        Err(_) => Ok(Vec::new()),
                    }
                };
                let backward = async {
                    match semaphore.acquire().await {
                        Ok(_permit) => source.get_backward_citations(&seed).await,
                        Err(_) => Ok(Vec::new()),
                    }
                };
                let (forward, backward) = tokio::join!(forward, backward);

                let forward = forward.unwrap_or_else(|e| {
                    warn!(doi = %seed, error = %e, "Forward citation fetch failed, using empty result");
                    Vec::new()
                });
                let backward = backward.unwrap_or_else(|e| {
                    warn!(doi = %seed, error = %e, "Backward citation fetch failed, using empty result");
                    Vec::new()
                });
                (seed, forward, backward)
            }
        });

        let results = futures::future::join_all(fetches).await;

        let mut candidates: HashMap<String, CandidateRecord> = HashMap::new();
        let mut intra_edges: Vec<(String, String, EdgeType)> = Vec::new();
        let cap = self.settings.max_citations_per_paper;

        for (seed, mut forward, mut backward) in results {
            // Hub papers can carry thousands of citations; cap per direction
            forward.truncate(cap);
            backward.truncate(cap);

            for work in forward {
                // This work cites the seed
                let doi = normalize_doi(&work.doi);
                if corpus.contains(&doi) {
                    intra_edges.push((doi, seed.clone(), EdgeType::Forward));
                } else if !skip.contains(&doi) {
                    let record = candidates.entry(doi).or_insert_with(|| CandidateRecord {
                        work: None,
                        cites: HashSet::new(),
                        cited_by: HashSet::new(),
                    });
                    record.work.get_or_insert(work);
                    record.cites.insert(seed.clone());
                }
            }
            for work in backward {
                // The seed cites this work
                let doi = normalize_doi(&work.doi);
                if corpus.contains(&doi) {
                    intra_edges.push((seed.clone(), doi, EdgeType::Backward));
                } else if !skip.contains(&doi) {
                    let record = candidates.entry(doi).or_insert_with(|| CandidateRecord {
                        work: None,
                        cites: HashSet::new(),
                        cited_by: HashSet::new(),
                    });
                    record.work.get_or_insert(work);
                    record.cited_by.insert(seed.clone());
                }
            }
        }

        (candidates, intra_edges)
    }

    /// Partition candidates by co-citation overlap with the corpus
    ///
    /// Overlap is the unweighted sum of both directions: corpus members the
    /// candidate cites plus corpus members citing it, so a mutual link
    /// counts twice. Each direction merges the stage-local link records with
    /// graph adjacency for candidates already known as nodes. Meeting the
    /// threshold auto-includes the candidate at the configured default
    /// score; no relevance call is spent on it.
    fn split_by_cocitation(
        &self,
        candidates: HashMap<String, CandidateRecord>,
        graph: &CitationGraph,
        corpus: &CorpusManager,
    ) -> (Vec<AdmittedCandidate>, Vec<(String, CandidateRecord)>) {
        let corpus_dois = corpus.doi_set();
        let mut auto_included = Vec::new();
        let mut to_score = Vec::new();

        let mut ordered: Vec<(String, CandidateRecord)> = candidates.into_iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        for (doi, record) in ordered {
            let overlap = {
                let cites_in_corpus: HashSet<&str> = record
                    .cites
                    .iter()
                    .map(String::as_str)
                    .chain(graph.get_references(&doi).iter().map(String::as_str))
                    .filter(|d| corpus_dois.contains(*d))
                    .collect();
                let cited_in_corpus: HashSet<&str> = record
                    .cited_by
                    .iter()
                    .map(String::as_str)
                    .chain(graph.get_citing(&doi).iter().map(String::as_str))
                    .filter(|d| corpus_dois.contains(*d))
                    .collect();
                cites_in_corpus.len() + cited_in_corpus.len()
            };

            if overlap >= self.settings.cocitation_threshold {
                debug!(doi = %doi, overlap, "Auto-including co-cited candidate");
                auto_included.push(AdmittedCandidate {
                    doi,
                    work: record.work,
                    relevance_score: self.settings.auto_include_score,
                    relevance_reasoning: Some(format!(
                        "Co-citation overlap of {} with corpus",
                        overlap
                    )),
                    cites: record.cites,
                    cited_by: record.cited_by,
                });
            } else {
                to_score.push((doi, record));
            }
        }

        (auto_included, to_score)
    }

    /// Score remaining candidates and extend the admitted/rejected lists
    ///
    /// Candidates without metadata cannot be scored and are rejected for the
    /// stage; candidates below the citation floor are not worth a scoring
    /// call. Scorer failures are handled inside `score_batch` as neutral
    /// pass-through scores.
    async fn score_candidates(
        &self,
        to_score: Vec<(String, CandidateRecord)>,
        topic: &str,
        research_questions: &[String],
        admitted: &mut Vec<AdmittedCandidate>,
        stage_rejected: &mut Vec<String>,
    ) {
        let mut scorable: Vec<Work> = Vec::new();
        let mut records: HashMap<String, CandidateRecord> = HashMap::new();

        for (doi, record) in to_score {
            match &record.work {
                Some(work) if work.cited_by_count >= self.settings.min_citations_filter => {
                    scorable.push(work.clone());
                    records.insert(doi, record);
                }
                Some(work) => {
                    debug!(
                        doi = %doi,
                        cited_by = work.cited_by_count,
                        "Candidate below citation floor, rejecting without scoring"
                    );
                    stage_rejected.push(doi);
                }
                None => {
                    debug!(doi = %doi, "Candidate has no metadata and no co-citation support, rejecting");
                    stage_rejected.push(doi);
                }
            }
        }

        if scorable.is_empty() {
            return;
        }

        let (relevant, rejected) = self
            .scorer
            .score_batch(
                scorable,
                topic,
                research_questions,
                self.settings.relevance_threshold,
                self.settings.max_concurrent_scores,
            )
            .await;

        for scored in rejected {
            stage_rejected.push(normalize_doi(&scored.work.doi));
        }
        for scored in relevant {
            let doi = normalize_doi(&scored.work.doi);
            let record = records.remove(&doi).unwrap_or(CandidateRecord {
                work: None,
                cites: HashSet::new(),
                cited_by: HashSet::new(),
            });
            admitted.push(AdmittedCandidate {
                doi,
                work: Some(scored.work),
                relevance_score: scored.judgment.score,
                relevance_reasoning: Some(scored.judgment.reasoning),
                cites: record.cites,
                cited_by: record.cited_by,
            });
        }
    }
}
