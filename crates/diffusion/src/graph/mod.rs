//! Citation graph representation
//!
//! Owns the directed paper-citation graph and its derived analyses:
//! centrality, community detection, co-citation overlap, and the combined
//! expansion ranking. Adjacency is held explicitly (outgoing and incoming
//! maps keyed by DOI) alongside a node attribute map; the betweenness cache
//! is an instance field invalidated on any mutation.

mod centrality;
mod community;

use crate::types::{CitationEdge, EdgeType, PaperNode};
use chrono::{Datelike, Utc};
use citeflow_common::normalize_doi;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Trailing window (years) for the recent-impactful component of the
/// expansion ranking
const RECENT_WINDOW_YEARS: i32 = 5;

/// Community detection algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterAlgorithm {
    /// Greedy modularity optimization (preferred)
    Modularity,
    /// Deterministic label propagation (fallback)
    LabelPropagation,
}

/// Serialized graph form: the only persisted representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub nodes: Vec<PaperNode>,
    pub edges: Vec<CitationEdge>,
}

/// In-memory citation graph
#[derive(Debug)]
pub struct CitationGraph {
    /// Node attributes keyed by normalized DOI
    nodes: HashMap<String, PaperNode>,

    /// Adjacency list: DOI -> papers it cites
    outgoing: HashMap<String, Vec<String>>,

    /// Reverse adjacency: DOI -> papers citing it
    incoming: HashMap<String, Vec<String>>,

    /// Edge set keyed by (citing, cited); enforces one edge per ordered pair
    edges: HashMap<(String, String), EdgeType>,

    /// Cached betweenness scores, invalidated on any mutation
    betweenness_cache: Option<HashMap<String, f64>>,
}

impl CitationGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            edges: HashMap::new(),
            betweenness_cache: None,
        }
    }

    /// Idempotent upsert of a paper node
    ///
    /// An existing node keeps its accumulated degrees, its first
    /// `discovery_stage`, and its cluster assignment; title, year, and
    /// popularity are refreshed.
    pub fn add_paper(
        &mut self,
        doi: &str,
        title: &str,
        year: Option<i32>,
        cited_by_count: u32,
        discovery_stage: u32,
    ) {
        let doi = normalize_doi(doi);
        self.betweenness_cache = None;

        match self.nodes.get_mut(&doi) {
            Some(node) => {
                node.title = title.to_string();
                node.year = year;
                node.cited_by_count = cited_by_count;
            }
            None => {
                self.nodes.insert(
                    doi.clone(),
                    PaperNode {
                        doi,
                        title: title.to_string(),
                        year,
                        cited_by_count,
                        in_degree: 0,
                        out_degree: 0,
                        discovery_stage,
                        cluster_id: None,
                    },
                );
            }
        }
    }

    /// Add a citation edge
    ///
    /// Returns false (no-op) if either endpoint is missing or the edge
    /// already exists; never fails for missing endpoints. On success the
    /// degree counters of both endpoints are incremented with the edge
    /// insertion, the single place degree math happens.
    pub fn add_citation(&mut self, citing: &str, cited: &str, edge_type: EdgeType) -> bool {
        let citing = normalize_doi(citing);
        let cited = normalize_doi(cited);

        if !self.nodes.contains_key(&citing) || !self.nodes.contains_key(&cited) {
            return false;
        }
        let key = (citing.clone(), cited.clone());
        if self.edges.contains_key(&key) {
            return false;
        }

        self.edges.insert(key, edge_type);
        self.outgoing.entry(citing.clone()).or_default().push(cited.clone());
        self.incoming.entry(cited.clone()).or_default().push(citing.clone());

        if let Some(node) = self.nodes.get_mut(&citing) {
            node.out_degree += 1;
        }
        if let Some(node) = self.nodes.get_mut(&cited) {
            node.in_degree += 1;
        }

        self.betweenness_cache = None;
        true
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check whether a DOI is present
    pub fn contains(&self, doi: &str) -> bool {
        self.nodes.contains_key(&normalize_doi(doi))
    }

    /// Get a node by DOI
    pub fn get_node(&self, doi: &str) -> Option<&PaperNode> {
        self.nodes.get(&normalize_doi(doi))
    }

    /// Papers cited by this paper
    pub fn get_references(&self, doi: &str) -> &[String] {
        self.outgoing
            .get(&normalize_doi(doi))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Papers citing this paper
    pub fn get_citing(&self, doi: &str) -> &[String] {
        self.incoming
            .get(&normalize_doi(doi))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All neighbors in both directions
    pub fn neighbors(&self, doi: &str) -> impl Iterator<Item = &String> {
        self.get_citing(doi).iter().chain(self.get_references(doi))
    }

    /// Most-cited papers within the discovered subgraph
    ///
    /// Ranked by (in_degree, external citation count) descending; the
    /// popularity signal breaks in-degree ties.
    pub fn get_seminal_papers(&self, top_n: usize) -> Vec<String> {
        let mut ranked: Vec<&PaperNode> = self.nodes.values().collect();
        ranked.sort_by(|a, b| {
            (b.in_degree, b.cited_by_count, &a.doi).cmp(&(a.in_degree, a.cited_by_count, &b.doi))
        });
        ranked.into_iter().take(top_n).map(|n| n.doi.clone()).collect()
    }

    /// Papers bridging otherwise distant regions of the network
    ///
    /// Betweenness centrality over the undirected projection, cached until
    /// the next mutation. A failed computation yields an empty ranking.
    pub fn get_bridging_papers(&mut self, top_n: usize) -> Vec<String> {
        if self.betweenness_cache.is_none() {
            match centrality::betweenness(&self.undirected_adjacency()) {
                Ok(scores) => self.betweenness_cache = Some(scores),
                Err(e) => {
                    warn!(error = %e, "Centrality computation failed, returning empty ranking");
                    return Vec::new();
                }
            }
        }

        let scores = match &self.betweenness_cache {
            Some(scores) => scores,
            None => return Vec::new(),
        };
        let mut ranked: Vec<(&String, f64)> = scores
            .iter()
            .filter(|(_, &s)| s > 0.0)
            .map(|(doi, &s)| (doi, s))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.into_iter().take(top_n).map(|(doi, _)| doi.clone()).collect()
    }

    /// Recently published papers accumulating citations fastest
    ///
    /// Citation velocity is in_degree over years since publication, clamped
    /// to one year, restricted to the trailing window.
    pub fn get_recent_impactful(&self, years: i32, top_n: usize, current_year: i32) -> Vec<String> {
        let mut ranked: Vec<(&PaperNode, f64)> = self
            .nodes
            .values()
            .filter_map(|node| {
                let year = node.year?;
                if year < current_year - years {
                    return None;
                }
                let age = (current_year - year).max(1) as f64;
                Some((node, node.in_degree as f64 / age))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.doi.cmp(&b.0.doi))
        });
        ranked.into_iter().take(top_n).map(|(n, _)| n.doi.clone()).collect()
    }

    /// Detect communities and assign `cluster_id` to every node
    ///
    /// Modularity optimization is preferred; on failure (or when requested)
    /// deterministic label propagation runs instead. Returns the grouping as
    /// lists of DOIs ordered by cluster id.
    pub fn identify_clusters(&mut self, algorithm: ClusterAlgorithm) -> Vec<Vec<String>> {
        let adjacency = self.undirected_adjacency();

        let assignment = match algorithm {
            ClusterAlgorithm::Modularity => match community::modularity_clusters(&adjacency) {
                Ok(assignment) => assignment,
                Err(e) => {
                    warn!(error = %e, "Modularity clustering failed, falling back to label propagation");
                    community::label_propagation(&adjacency)
                }
            },
            ClusterAlgorithm::LabelPropagation => community::label_propagation(&adjacency),
        };

        let cluster_count = assignment.values().max().map(|&m| m + 1).unwrap_or(0);
        let mut groups: Vec<Vec<String>> = vec![Vec::new(); cluster_count];
        for (doi, &cluster) in &assignment {
            if let Some(node) = self.nodes.get_mut(doi) {
                node.cluster_id = Some(cluster);
            }
            groups[cluster].push(doi.clone());
        }
        for group in &mut groups {
            group.sort();
        }
        groups
    }

    /// Two-direction co-citation overlap with the corpus
    ///
    /// Counts papers this paper cites that are corpus members plus papers
    /// citing it that are corpus members. Both directions sum unweighted
    /// into one number.
    pub fn cocitation_overlap(&self, doi: &str, corpus_dois: &HashSet<String>) -> usize {
        let doi = normalize_doi(doi);
        let cited_in_corpus = self
            .get_references(&doi)
            .iter()
            .filter(|d| corpus_dois.contains(*d))
            .count();
        let citing_in_corpus = self
            .get_citing(&doi)
            .iter()
            .filter(|d| corpus_dois.contains(*d))
            .count();
        cited_in_corpus + citing_in_corpus
    }

    /// Whether a paper meets the co-citation threshold against the corpus
    pub fn get_cocitation_candidates(
        &self,
        doi: &str,
        corpus_dois: &HashSet<String>,
        threshold: usize,
    ) -> bool {
        self.cocitation_overlap(doi, corpus_dois) >= threshold
    }

    /// Incoming and outgoing neighbors not yet explored
    pub fn get_unexplored_citations(
        &self,
        doi: &str,
        explored_dois: &HashSet<String>,
    ) -> (Vec<String>, Vec<String>) {
        let doi = normalize_doi(doi);
        let unexplored_citing = self
            .get_citing(&doi)
            .iter()
            .filter(|d| !explored_dois.contains(*d))
            .cloned()
            .collect();
        let unexplored_cited = self
            .get_references(&doi)
            .iter()
            .filter(|d| !explored_dois.contains(*d))
            .cloned()
            .collect();
        (unexplored_citing, unexplored_cited)
    }

    /// Combined expansion ranking for the next stage's seeds
    ///
    /// Seminal membership is worth 3 points, bridging 2, recent-impactful 2
    /// (the latter only when `prioritize_recent`). Each ranking contributes a
    /// pool of up to twice `max_papers` members before combination.
    pub fn get_expansion_candidates(
        &mut self,
        max_papers: usize,
        prioritize_recent: bool,
    ) -> Vec<String> {
        let pool = max_papers * 2;
        let mut scores: HashMap<String, u32> = HashMap::new();

        for doi in self.get_seminal_papers(pool) {
            *scores.entry(doi).or_insert(0) += 3;
        }
        for doi in self.get_bridging_papers(pool) {
            *scores.entry(doi).or_insert(0) += 2;
        }
        if prioritize_recent {
            let current_year = Utc::now().year();
            for doi in self.get_recent_impactful(RECENT_WINDOW_YEARS, pool, current_year) {
                *scores.entry(doi).or_insert(0) += 2;
            }
        }

        let mut ranked: Vec<(String, u32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.into_iter().take(max_papers).map(|(doi, _)| doi).collect()
    }

    /// Serialize to the checkpoint representation
    pub fn to_serializable(&self) -> SerializedGraph {
        let mut nodes: Vec<PaperNode> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.doi.cmp(&b.doi));

        let mut edges: Vec<CitationEdge> = self
            .edges
            .iter()
            .map(|((citing, cited), &edge_type)| CitationEdge {
                citing_doi: citing.clone(),
                cited_doi: cited.clone(),
                edge_type,
            })
            .collect();
        edges.sort_by(|a, b| {
            (&a.citing_doi, &a.cited_doi).cmp(&(&b.citing_doi, &b.cited_doi))
        });

        SerializedGraph { nodes, edges }
    }

    /// Reconstruct a graph from its serialized form
    ///
    /// Degrees are recomputed from the edge list rather than copied, so a
    /// checkpoint with drifted counters heals on load.
    pub fn from_serializable(data: SerializedGraph) -> Self {
        let mut graph = Self::new();

        for node in data.nodes {
            graph.add_paper(
                &node.doi,
                &node.title,
                node.year,
                node.cited_by_count,
                node.discovery_stage,
            );
            if let Some(stored) = graph.nodes.get_mut(&normalize_doi(&node.doi)) {
                stored.cluster_id = node.cluster_id;
            }
        }
        for edge in data.edges {
            graph.add_citation(&edge.citing_doi, &edge.cited_doi, edge.edge_type);
        }

        graph
    }

    /// Undirected projection for centrality and community detection
    fn undirected_adjacency(&self) -> HashMap<String, Vec<String>> {
        let mut adjacency: HashMap<String, Vec<String>> = self
            .nodes
            .keys()
            .map(|doi| (doi.clone(), Vec::new()))
            .collect();

        for (citing, cited) in self.edges.keys() {
            if let Some(neighbors) = adjacency.get_mut(citing) {
                neighbors.push(cited.clone());
            }
            if let Some(neighbors) = adjacency.get_mut(cited) {
                neighbors.push(citing.clone());
            }
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort();
            neighbors.dedup();
        }
        adjacency
    }
}

impl Default for CitationGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(papers: &[&str]) -> CitationGraph {
        let mut graph = CitationGraph::new();
        for doi in papers {
            graph.add_paper(doi, &format!("Paper {}", doi), Some(2020), 0, 0);
        }
        graph
    }

    #[test]
    fn test_add_citation_contract() {
        let mut graph = graph_with(&["10.1/a", "10.1/b"]);

        // First call adds the edge, second is a no-op
        assert!(graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward));
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_graph_debug_includes_nodes() {
        // The graph is embedded in run outcomes that render with {:?}
        let graph = graph_with(&["10.1/a"]);
        let rendered = format!("{:?}", graph);
        assert!(rendered.contains("10.1/a"));
    }

    #[test]
    fn test_add_citation_missing_endpoint_returns_false() {
        let mut graph = graph_with(&["10.1/a"]);

        assert!(!graph.add_citation("10.1/a", "10.1/missing", EdgeType::Forward));
        assert!(!graph.add_citation("10.1/missing", "10.1/a", EdgeType::Backward));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_degrees_match_edge_sets() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c"]);
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/a", "10.1/c", EdgeType::Backward);

        for node in graph.nodes.values() {
            let stored_in = graph.get_citing(&node.doi).len();
            let stored_out = graph.get_references(&node.doi).len();
            assert_eq!(node.in_degree, stored_in, "in-degree drift at {}", node.doi);
            assert_eq!(node.out_degree, stored_out, "out-degree drift at {}", node.doi);
            assert_eq!(graph.neighbors(&node.doi).count(), stored_in + stored_out);
        }
    }

    #[test]
    fn test_add_paper_idempotent_preserves_degrees() {
        let mut graph = graph_with(&["10.1/a", "10.1/b"]);
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);

        // Re-adding with fresher metadata keeps accumulated degrees
        graph.add_paper("10.1/b", "Updated Title", Some(2021), 99, 3);

        let node = graph.get_node("10.1/b").expect("node");
        assert_eq!(node.title, "Updated Title");
        assert_eq!(node.cited_by_count, 99);
        assert_eq!(node.in_degree, 1);
        assert_eq!(node.discovery_stage, 0, "first discovery stage preserved");
    }

    #[test]
    fn test_doi_normalization_on_write_paths() {
        let mut graph = CitationGraph::new();
        graph.add_paper("https://doi.org/10.1/A", "A", None, 0, 0);
        graph.add_paper("doi:10.1/b", "B", None, 0, 0);

        assert!(graph.contains("10.1/a"));
        assert!(graph.add_citation("10.1/A", "DOI:10.1/B", EdgeType::Forward));
        assert_eq!(graph.get_node("10.1/b").unwrap().in_degree, 1);
    }

    #[test]
    fn test_seminal_ordering() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c", "10.1/d"]);
        // b gets two incoming edges, c one, a none
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/a", "10.1/c", EdgeType::Forward);
        // d ties with c on in-degree but has higher external popularity
        graph.add_citation("10.1/b", "10.1/d", EdgeType::Forward);
        graph.add_paper("10.1/d", "Paper d", Some(2020), 500, 0);

        let ranked = graph.get_seminal_papers(4);
        assert_eq!(ranked[0], "10.1/b");
        assert_eq!(ranked[1], "10.1/d", "popularity breaks the in-degree tie");

        // Non-increasing by (in_degree, cited_by_count)
        let keys: Vec<(usize, u32)> = ranked
            .iter()
            .map(|d| {
                let n = graph.get_node(d).unwrap();
                (n.in_degree, n.cited_by_count)
            })
            .collect();
        for pair in keys.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_bridging_papers_finds_connector() {
        let mut graph = graph_with(&[
            "10.1/a", "10.1/b", "10.1/c", "10.1/x", "10.1/d", "10.1/e", "10.1/f",
        ]);
        // Two triangles connected only through x
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/b", "10.1/c", EdgeType::Forward);
        graph.add_citation("10.1/a", "10.1/c", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/x", EdgeType::Forward);
        graph.add_citation("10.1/x", "10.1/d", EdgeType::Forward);
        graph.add_citation("10.1/d", "10.1/e", EdgeType::Forward);
        graph.add_citation("10.1/e", "10.1/f", EdgeType::Forward);
        graph.add_citation("10.1/d", "10.1/f", EdgeType::Forward);

        let bridging = graph.get_bridging_papers(2);
        assert_eq!(bridging[0], "10.1/x");
    }

    #[test]
    fn test_bridging_cache_invalidated_on_mutation() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c"]);
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/b", "10.1/c", EdgeType::Forward);

        let before = graph.get_bridging_papers(3);
        assert_eq!(before, vec!["10.1/b".to_string()]);

        // New path through d changes the picture; cache must not serve stale
        // data. The graph becomes a 4-cycle where every node carries equal
        // betweenness, so ask for all four.
        graph.add_paper("10.1/d", "Paper d", Some(2020), 0, 1);
        graph.add_citation("10.1/a", "10.1/d", EdgeType::Forward);
        graph.add_citation("10.1/d", "10.1/c", EdgeType::Forward);

        let after = graph.get_bridging_papers(4);
        assert!(after.contains(&"10.1/d".to_string()));
    }

    #[test]
    fn test_recent_impactful_velocity() {
        let mut graph = CitationGraph::new();
        graph.add_paper("10.1/old", "Old", Some(2010), 0, 0);
        graph.add_paper("10.1/new", "New", Some(2024), 0, 0);
        graph.add_paper("10.1/mid", "Mid", Some(2022), 0, 0);
        graph.add_paper("10.1/src1", "S1", Some(2024), 0, 0);
        graph.add_paper("10.1/src2", "S2", Some(2024), 0, 0);
        graph.add_citation("10.1/src1", "10.1/new", EdgeType::Forward);
        graph.add_citation("10.1/src2", "10.1/new", EdgeType::Forward);
        graph.add_citation("10.1/src1", "10.1/mid", EdgeType::Forward);
        graph.add_citation("10.1/src1", "10.1/old", EdgeType::Forward);

        let ranked = graph.get_recent_impactful(5, 10, 2025);
        // Old paper falls outside the window entirely
        assert!(!ranked.contains(&"10.1/old".to_string()));
        // new: 2 citations / 1 year beats mid: 1 / 3 years
        assert_eq!(ranked[0], "10.1/new");
    }

    #[test]
    fn test_cocitation_overlap_sums_both_directions() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c", "10.1/d"]);
        // d cites a and b; c cites d
        graph.add_citation("10.1/d", "10.1/a", EdgeType::Forward);
        graph.add_citation("10.1/d", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/d", EdgeType::Backward);

        let corpus: HashSet<String> = ["10.1/a", "10.1/b", "10.1/c"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(graph.cocitation_overlap("10.1/d", &corpus), 3);
        assert!(graph.get_cocitation_candidates("10.1/d", &corpus, 3));
        assert!(!graph.get_cocitation_candidates("10.1/d", &corpus, 4));
    }

    #[test]
    fn test_unexplored_citations() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c", "10.1/d"]);
        graph.add_citation("10.1/b", "10.1/a", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/a", EdgeType::Forward);
        graph.add_citation("10.1/a", "10.1/d", EdgeType::Backward);

        let explored: HashSet<String> = ["10.1/b"].iter().map(|s| s.to_string()).collect();
        let (citing, cited) = graph.get_unexplored_citations("10.1/a", &explored);

        assert_eq!(citing, vec!["10.1/c".to_string()]);
        assert_eq!(cited, vec!["10.1/d".to_string()]);
    }

    #[test]
    fn test_identify_clusters_assigns_every_node() {
        let mut graph = graph_with(&[
            "10.1/a", "10.1/b", "10.1/c", "10.1/d", "10.1/e", "10.1/f",
        ]);
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/b", "10.1/c", EdgeType::Forward);
        graph.add_citation("10.1/a", "10.1/c", EdgeType::Forward);
        graph.add_citation("10.1/d", "10.1/e", EdgeType::Forward);
        graph.add_citation("10.1/e", "10.1/f", EdgeType::Forward);
        graph.add_citation("10.1/d", "10.1/f", EdgeType::Forward);

        let groups = graph.identify_clusters(ClusterAlgorithm::Modularity);

        let assigned: usize = groups.iter().map(|g| g.len()).sum();
        assert_eq!(assigned, 6);
        assert!(graph.nodes.values().all(|n| n.cluster_id.is_some()));
        assert!(groups.len() >= 2, "the two triangles should separate");
    }

    #[test]
    fn test_identify_clusters_edgeless_falls_back() {
        let mut graph = graph_with(&["10.1/a", "10.1/b"]);

        // Modularity is undefined without edges; label propagation takes over
        let groups = graph.identify_clusters(ClusterAlgorithm::Modularity);
        let assigned: usize = groups.iter().map(|g| g.len()).sum();
        assert_eq!(assigned, 2);
    }

    #[test]
    fn test_expansion_candidates_combined_scoring() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c", "10.1/x", "10.1/d"]);
        // b is seminal (most cited); x bridges the chain
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/b", "10.1/x", EdgeType::Forward);
        graph.add_citation("10.1/x", "10.1/d", EdgeType::Forward);

        let ranked = graph.get_expansion_candidates(3, false);
        assert!(!ranked.is_empty());
        // b carries seminal points and appears first
        assert_eq!(ranked[0], "10.1/b");
        assert!(ranked.len() <= 3);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut graph = graph_with(&["10.1/a", "10.1/b", "10.1/c"]);
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);
        graph.add_citation("10.1/c", "10.1/b", EdgeType::Backward);
        graph.add_citation("10.1/a", "10.1/c", EdgeType::Forward);

        let restored = CitationGraph::from_serializable(graph.to_serializable());

        assert_eq!(restored.node_count(), graph.node_count());
        assert_eq!(restored.edge_count(), graph.edge_count());
        for node in graph.nodes.values() {
            let other = restored.get_node(&node.doi).expect("node survives");
            assert_eq!(other.in_degree, node.in_degree);
            assert_eq!(other.out_degree, node.out_degree);
        }

        // Edge types survive the round trip
        let serialized = restored.to_serializable();
        let edge = serialized
            .edges
            .iter()
            .find(|e| e.citing_doi == "10.1/c")
            .expect("edge");
        assert_eq!(edge.edge_type, EdgeType::Backward);
    }

    #[test]
    fn test_round_trip_heals_degree_drift() {
        let mut graph = graph_with(&["10.1/a", "10.1/b"]);
        graph.add_citation("10.1/a", "10.1/b", EdgeType::Forward);

        let mut data = graph.to_serializable();
        // Simulate a drifted checkpoint
        for node in &mut data.nodes {
            node.in_degree = 42;
            node.out_degree = 42;
        }

        let restored = CitationGraph::from_serializable(data);
        assert_eq!(restored.get_node("10.1/a").unwrap().out_degree, 1);
        assert_eq!(restored.get_node("10.1/b").unwrap().in_degree, 1);
    }
}
