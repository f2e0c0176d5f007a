//! Tree-shaped graph produced by one aggregation run

use serde::{Serialize, Deserialize};

/// Undirected edge, stored once per aggregated particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Node the new particle stuck to
    pub start: u32,

    /// Node created by the aggregation
    pub end: u32,
}

impl Edge {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// Per-node float attributes
pub type Features = Vec<f32>;

/// Per-node integer labels
pub type Labels = Vec<i32>;

/// One generated graph, as handed from a rank to the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Graph {
    /// Number of nodes in the graph
    pub num_nodes: usize,

    /// Edges in aggregation order
    pub edges: Vec<Edge>,

    /// Optional feature rows aligned by node index (empty when disabled)
    pub features: Vec<Features>,

    /// Optional label rows aligned by node index (empty when disabled)
    pub labels: Vec<Labels>,

    /// Optional scalar label of the whole graph
    pub graph_label: Option<i32>,
}

impl Graph {
    /// Create an empty graph with pre-allocated capacity
    pub fn with_capacity(node_count: usize) -> Self {
        Self {
            num_nodes: 0,
            edges: Vec::with_capacity(node_count.saturating_sub(1)),
            features: Vec::new(),
            labels: Vec::new(),
            graph_label: None,
        }
    }
}
