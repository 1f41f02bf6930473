//! Community detection over the undirected citation graph
//!
//! Two detectors: a greedy modularity optimizer (local moving in the style of
//! Louvain's first phase, repeated until stable) and deterministic label
//! propagation as the fallback when modularity optimization cannot run.

use citeflow_common::errors::{DiffusionError, Result};
use std::collections::HashMap;

/// Passes over the node set before the optimizer gives up on convergence
const MAX_PASSES: usize = 20;

/// Greedy modularity-optimizing clustering
///
/// Each node starts in its own community; nodes are repeatedly moved to the
/// neighboring community with the best modularity gain until a full pass
/// makes no move. Fails on edgeless graphs, where modularity is undefined.
pub fn modularity_clusters(
    adjacency: &HashMap<String, Vec<String>>,
) -> Result<HashMap<String, usize>> {
    let mut nodes: Vec<&String> = adjacency.keys().collect();
    nodes.sort();

    let total_degree: usize = adjacency.values().map(|n| n.len()).sum();
    // Undirected: every edge contributes to two adjacency lists
    let m = (total_degree / 2) as f64;
    if m == 0.0 {
        return Err(DiffusionError::CommunityDetection {
            message: "graph has no edges".to_string(),
        });
    }

    let degree: HashMap<&String, f64> = nodes
        .iter()
        .map(|&n| (n, adjacency[n].len() as f64))
        .collect();

    let mut community: HashMap<&String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, &n)| (n, i))
        .collect();
    let mut community_degree: HashMap<usize, f64> =
        nodes.iter().map(|&n| (community[n], degree[n])).collect();

    for _ in 0..MAX_PASSES {
        let mut moved = false;

        for &node in &nodes {
            let current = community[node];
            let k_i = degree[node];

            // Edge counts from this node into each neighboring community
            let mut links: HashMap<usize, f64> = HashMap::new();
            for neighbor in &adjacency[node] {
                if neighbor != node {
                    *links.entry(community[neighbor]).or_insert(0.0) += 1.0;
                }
            }

            // Detach before evaluating gains
            *community_degree.get_mut(&current).unwrap() -= k_i;
            let own_links = links.get(&current).copied().unwrap_or(0.0);

            let mut best = (current, 0.0);
            let mut targets: Vec<(&usize, &f64)> = links.iter().collect();
            targets.sort_by_key(|(c, _)| **c);
            for (&target, &k_i_in) in targets {
                let sum_tot = community_degree.get(&target).copied().unwrap_or(0.0);
                let gain = k_i_in - own_links - sum_tot * k_i / (2.0 * m)
                    + community_degree[&current] * k_i / (2.0 * m);
                if gain > best.1 + 1e-12 {
                    best = (target, gain);
                }
            }

            *community_degree.entry(best.0).or_insert(0.0) += k_i;
            if best.0 != current {
                community.insert(node, best.0);
                moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    Ok(compress_labels(
        community.into_iter().map(|(k, v)| (k.clone(), v)).collect(),
    ))
}

/// Deterministic label propagation
///
/// Nodes are visited in sorted DOI order; each adopts the most frequent label
/// among its neighbors, ties resolved toward the smallest label. Converges in
/// a bounded number of sweeps.
pub fn label_propagation(adjacency: &HashMap<String, Vec<String>>) -> HashMap<String, usize> {
    let mut nodes: Vec<&String> = adjacency.keys().collect();
    nodes.sort();

    let mut labels: HashMap<&String, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, &n)| (n, i))
        .collect();

    for _ in 0..MAX_PASSES {
        let mut changed = false;

        for &node in &nodes {
            let mut counts: HashMap<usize, usize> = HashMap::new();
            for neighbor in &adjacency[node] {
                if neighbor != node {
                    *counts.entry(labels[neighbor]).or_insert(0) += 1;
                }
            }

            if let Some(best) = counts
                .iter()
                .map(|(&label, &count)| (count, std::cmp::Reverse(label)))
                .max()
                .map(|(_, std::cmp::Reverse(label))| label)
            {
                if labels[node] != best {
                    labels.insert(node, best);
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }

    compress_labels(labels.into_iter().map(|(k, v)| (k.clone(), v)).collect())
}

/// Renumber labels to a dense 0..k range, ordered by first appearance in
/// sorted DOI order
fn compress_labels(assignment: HashMap<String, usize>) -> HashMap<String, usize> {
    let mut dois: Vec<&String> = assignment.keys().collect();
    dois.sort();

    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut compressed = HashMap::new();
    for doi in dois {
        let next = remap.len();
        let label = *remap.entry(assignment[doi]).or_insert(next);
        compressed.insert(doi.clone(), label);
    }
    compressed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undirected(edges: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        let mut adj: HashMap<String, Vec<String>> = HashMap::new();
        for (a, b) in edges {
            adj.entry(a.to_string()).or_default().push(b.to_string());
            adj.entry(b.to_string()).or_default().push(a.to_string());
        }
        adj
    }

    fn two_triangles() -> HashMap<String, Vec<String>> {
        // Two dense triangles joined by a single edge
        undirected(&[
            ("a", "b"),
            ("b", "c"),
            ("a", "c"),
            ("c", "d"),
            ("d", "e"),
            ("e", "f"),
            ("d", "f"),
        ])
    }

    #[test]
    fn test_modularity_separates_triangles() {
        let clusters = modularity_clusters(&two_triangles()).expect("clustering");

        assert_eq!(clusters["a"], clusters["b"]);
        assert_eq!(clusters["b"], clusters["c"]);
        assert_eq!(clusters["d"], clusters["e"]);
        assert_eq!(clusters["e"], clusters["f"]);
        assert_ne!(clusters["a"], clusters["d"]);
    }

    #[test]
    fn test_modularity_fails_without_edges() {
        let mut adj: HashMap<String, Vec<String>> = HashMap::new();
        adj.insert("a".to_string(), vec![]);
        adj.insert("b".to_string(), vec![]);

        assert!(modularity_clusters(&adj).is_err());
    }

    #[test]
    fn test_label_propagation_separates_triangles() {
        let clusters = label_propagation(&two_triangles());

        assert_eq!(clusters["a"], clusters["b"]);
        assert_eq!(clusters["d"], clusters["f"]);
    }

    #[test]
    fn test_label_propagation_deterministic() {
        let first = label_propagation(&two_triangles());
        let second = label_propagation(&two_triangles());
        assert_eq!(first, second);
    }

    #[test]
    fn test_label_propagation_isolated_nodes() {
        let mut adj = undirected(&[("a", "b")]);
        adj.insert("lonely".to_string(), vec![]);

        let clusters = label_propagation(&adj);
        assert_eq!(clusters.len(), 3);
        assert_ne!(clusters["lonely"], clusters["a"]);
    }
}
