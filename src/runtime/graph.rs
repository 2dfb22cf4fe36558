/// Graph validation and topological ordering
///
/// Builds a petgraph DAG from a workflow definition, rejecting dangling edges and
/// duplicate node ids, then orders nodes with a depth-first search that fails fast on
/// the first back edge. Traversal follows node declaration order for roots and edge
/// declaration order for successors, so the output is deterministic.

use crate::error::{OrchestratorError, Result};
use crate::workflow::{Edge, Node, Workflow};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// Validated dependency graph borrowed from a workflow
#[derive(Debug)]
pub struct WorkflowGraph<'a> {
    /// Edge direction is source -> target, i.e. dependency -> dependent
    graph: DiGraph<&'a Node, &'a Edge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

impl<'a> WorkflowGraph<'a> {
    /// Build the graph, validating ids and edge endpoints
    pub fn build(workflow: &'a Workflow) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(workflow.nodes.len(), workflow.edges.len());
        let mut node_id_to_index = HashMap::with_capacity(workflow.nodes.len());

        for node in &workflow.nodes {
            let index = graph.add_node(node);
            if node_id_to_index.insert(node.id.as_str(), index).is_some() {
                return Err(OrchestratorError::InvalidGraph {
                    message: format!("duplicate node id '{}'", node.id),
                });
            }
        }

        for edge in &workflow.edges {
            let endpoint = |id: &str| {
                node_id_to_index.get(id).copied().ok_or_else(|| OrchestratorError::InvalidGraph {
                    message: format!(
                        "edge {} -> {} references unknown node '{}'",
                        edge.source, edge.target, id
                    ),
                })
            };
            let from = endpoint(&edge.source)?;
            let to = endpoint(&edge.target)?;
            graph.add_edge(from, to, edge);
        }

        tracing::debug!("🏗️ Built graph for '{}': {} nodes, {} edges",
            workflow.id, graph.node_count(), graph.edge_count());

        Ok(Self { graph })
    }

    /// Successors of `index` in edge declaration order
    fn successors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut outgoing: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        // petgraph walks adjacency lists newest-first
        outgoing.sort_by_key(|(edge_id, _)| *edge_id);
        outgoing.into_iter().map(|(_, target)| target).collect()
    }

    /// Depth-first topological sort
    ///
    /// A node is emitted ahead of everything reachable from it. Reaching a node that is
    /// still on the DFS stack aborts with `Cycle` naming that node.
    pub fn topological_order(&self) -> Result<Vec<Node>> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        let mut post_order: Vec<NodeIndex> = Vec::with_capacity(self.graph.node_count());

        for root in self.graph.node_indices() {
            if marks[root.index()] != Mark::Unvisited {
                continue;
            }

            marks[root.index()] = Mark::Visiting;
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> =
                vec![(root, self.successors(root), 0)];

            while let Some((current, successors, cursor)) = stack.last_mut() {
                if let Some(&next) = successors.get(*cursor) {
                    *cursor += 1;
                    match marks[next.index()] {
                        Mark::Visited => {}
                        Mark::Visiting => {
                            let node_id = self.graph[next].id.clone();
                            tracing::error!("❌ Cycle detected at node '{}'", node_id);
                            return Err(OrchestratorError::Cycle { node_id });
                        }
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::Visiting;
                            let next_successors = self.successors(next);
                            stack.push((next, next_successors, 0));
                        }
                    }
                } else {
                    let finished = *current;
                    stack.pop();
                    marks[finished.index()] = Mark::Visited;
                    post_order.push(finished);
                }
            }
        }

        Ok(post_order
            .into_iter()
            .rev()
            .map(|index| self.graph[index].clone())
            .collect())
    }
}

/// Validate `workflow` and return its nodes in dependency order
pub fn topological_order(workflow: &Workflow) -> Result<Vec<Node>> {
    WorkflowGraph::build(workflow)?.topological_order()
}
