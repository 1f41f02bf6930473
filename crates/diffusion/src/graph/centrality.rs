//! Betweenness centrality (Brandes' algorithm)
//!
//! Operates on the undirected projection of the citation graph. Used to
//! surface bridging papers that connect otherwise distant regions of the
//! network.

use citeflow_common::errors::{DiffusionError, Result};
use std::collections::{HashMap, VecDeque};

/// Node cap; Brandes is O(V*E) and the expansion ranking degrades gracefully
/// without centrality, so large graphs skip it rather than stall the run
const MAX_NODES: usize = 20_000;

/// Compute betweenness centrality over an undirected adjacency map
///
/// Returns a score per node; unreachable pairs contribute nothing. Scores are
/// halved at the end because each undirected path is counted from both
/// endpoints.
pub fn betweenness(adjacency: &HashMap<String, Vec<String>>) -> Result<HashMap<String, f64>> {
    let n = adjacency.len();
    if n > MAX_NODES {
        return Err(DiffusionError::CentralityComputation {
            message: format!("graph too large for centrality: {} nodes", n),
        });
    }

    let mut centrality: HashMap<String, f64> =
        adjacency.keys().map(|k| (k.clone(), 0.0)).collect();

    for source in adjacency.keys() {
        // BFS from source, accumulating shortest-path counts
        let mut stack: Vec<&String> = Vec::new();
        let mut preds: HashMap<&String, Vec<&String>> = HashMap::new();
        let mut sigma: HashMap<&String, f64> = HashMap::new();
        let mut dist: HashMap<&String, i64> = HashMap::new();

        sigma.insert(source, 1.0);
        dist.insert(source, 0);

        let mut queue: VecDeque<&String> = VecDeque::new();
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let d_v = dist[v];
            let sigma_v = sigma[v];

            if let Some(neighbors) = adjacency.get(v) {
                for w in neighbors {
                    if !dist.contains_key(w) {
                        dist.insert(w, d_v + 1);
                        queue.push_back(w);
                    }
                    if dist[w] == d_v + 1 {
                        *sigma.entry(w).or_insert(0.0) += sigma_v;
                        preds.entry(w).or_default().push(v);
                    }
                }
            }
        }

        // Back-propagate dependencies
        let mut delta: HashMap<&String, f64> = HashMap::new();
        while let Some(w) = stack.pop() {
            let coeff = (1.0 + delta.get(w).copied().unwrap_or(0.0)) / sigma[w];
            if let Some(ps) = preds.get(w) {
                for v in ps {
                    *delta.entry(v).or_insert(0.0) += sigma[v] * coeff;
                }
            }
            if w != source {
                if let Some(c) = centrality.get_mut(w) {
                    *c += delta.get(w).copied().unwrap_or(0.0);
                }
            }
        }
    }

    // Each undirected path was counted from both endpoints
    for value in centrality.values_mut() {
        *value /= 2.0;
    }

    Ok(centrality)
}
