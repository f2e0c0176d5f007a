//! Structural checks on generated graphs

use crate::graph::Graph;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use thiserror::Error;

/// Reasons a graph is not a well-formed aggregation tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph has no nodes")]
    Empty,

    #[error("tree with {nodes} nodes has {edges} edges")]
    EdgeCount { nodes: usize, edges: usize },

    #[error("edge references node {node} but graph has {num_nodes} nodes")]
    NodeOutOfRange { node: u32, num_nodes: usize },

    #[error("graph splits into {components} components")]
    Disconnected { components: usize },

    #[error("{kind} has {rows} rows for {nodes} nodes")]
    RowMismatch {
        kind: &'static str,
        rows: usize,
        nodes: usize,
    },
}

/// Convert into a petgraph undirected graph (node weights are node indices)
pub fn to_petgraph(graph: &Graph) -> Result<UnGraph<u32, ()>, GraphError> {
    let mut pg = UnGraph::with_capacity(graph.num_nodes, graph.edges.len());
    for node in 0..graph.num_nodes {
        pg.add_node(node as u32);
    }

    for edge in &graph.edges {
        for node in [edge.start, edge.end] {
            if node as usize >= graph.num_nodes {
                return Err(GraphError::NodeOutOfRange {
                    node,
                    num_nodes: graph.num_nodes,
                });
            }
        }
        pg.add_edge(
            NodeIndex::new(edge.start as usize),
            NodeIndex::new(edge.end as usize),
            (),
        );
    }

    Ok(pg)
}

/// Check that `graph` is a single tree containing node 0 and that its
/// optional rows are aligned with its nodes
pub fn validate_tree(graph: &Graph) -> Result<(), GraphError> {
    let nodes = graph.num_nodes;
    if nodes == 0 {
        return Err(GraphError::Empty);
    }

    if graph.edges.len() != nodes - 1 {
        return Err(GraphError::EdgeCount {
            nodes,
            edges: graph.edges.len(),
        });
    }

    // n - 1 edges and a single component is exactly a tree
    let pg = to_petgraph(graph)?;
    let components = connected_components(&pg);
    if components != 1 {
        return Err(GraphError::Disconnected { components });
    }

    check_rows("features", graph.features.len(), nodes)?;
    check_rows("labels", graph.labels.len(), nodes)?;

    Ok(())
}

fn check_rows(kind: &'static str, rows: usize, nodes: usize) -> Result<(), GraphError> {
    if rows != 0 && rows != nodes {
        return Err(GraphError::RowMismatch { kind, rows, nodes });
    }
    Ok(())
}
