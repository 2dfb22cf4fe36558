/// Longest-path leveling for parallel execution
///
/// A node's level is 0 when nothing feeds it, otherwise one more than the deepest of
/// its sources. Every dependency of a node in level `i` lives in a level `< i`, so a
/// whole level can run concurrently behind a barrier.

use crate::workflow::{Node, Workflow};
use std::collections::HashMap;

/// Bucket topologically sorted nodes into execution levels
///
/// `sorted` must be in dependency order. Inside a level nodes keep their declaration
/// order from the workflow.
pub fn compute_levels(sorted: &[Node], workflow: &Workflow) -> Vec<Vec<Node>> {
    let mut node_level: HashMap<&str, usize> = HashMap::with_capacity(sorted.len());

    for node in sorted {
        let level = workflow
            .incoming_edges(&node.id)
            .map(|edge| node_level.get(edge.source.as_str()).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        node_level.insert(node.id.as_str(), level);
    }

    let declared: HashMap<&str, usize> = workflow
        .nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.id.as_str(), position))
        .collect();

    let depth = node_level.values().max().map_or(0, |deepest| deepest + 1);
    let mut levels: Vec<Vec<Node>> = vec![Vec::new(); depth];
    for node in sorted {
        levels[node_level[node.id.as_str()]].push(node.clone());
    }
    for level in &mut levels {
        level.sort_by_key(|node| declared.get(node.id.as_str()).copied().unwrap_or(usize::MAX));
    }

    levels
}
