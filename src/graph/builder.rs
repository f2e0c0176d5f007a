//! Graph construction module

use crate::graph::tree::{Edge, Features, Labels};
use crate::graph::Graph;

/// Builder for incrementally constructing a [`Graph`]
///
/// Nodes are only ever appended; the index returned by [`add_node`] is the
/// node identifier used by edges and by the aligned feature/label rows.
///
/// [`add_node`]: GraphBuilder::add_node
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    /// Graph under construction
    graph: Graph,
}

impl GraphBuilder {
    /// Create a new builder with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            graph: Graph::with_capacity(capacity),
        }
    }

    /// Append a node and return its index
    pub fn add_node(&mut self) -> u32 {
        let idx = self.graph.num_nodes as u32;
        self.graph.num_nodes += 1;
        idx
    }

    /// Add an undirected edge between two existing nodes
    pub fn add_edge(&mut self, start: u32, end: u32) {
        debug_assert!((start as usize) < self.graph.num_nodes);
        debug_assert!((end as usize) < self.graph.num_nodes);
        self.graph.edges.push(Edge::new(start, end));
    }

    /// Append the feature row of the next node lacking one
    pub fn push_features(&mut self, features: Features) {
        self.graph.features.push(features);
    }

    /// Append the label row of the next node lacking one
    pub fn push_labels(&mut self, labels: Labels) {
        self.graph.labels.push(labels);
    }

    pub fn set_graph_label(&mut self, label: Option<i32>) {
        self.graph.graph_label = label;
    }

    /// Borrow the graph built so far
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Finish construction
    pub fn build(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_path() {
        let mut builder = GraphBuilder::with_capacity(3);
        let root = builder.add_node();
        let a = builder.add_node();
        builder.add_edge(root, a);
        let b = builder.add_node();
        builder.add_edge(a, b);
        builder.set_graph_label(Some(1));

        let graph = builder.build();
        assert_eq!(graph.num_nodes, 3);
        assert_eq!(graph.edges, vec![Edge::new(0, 1), Edge::new(1, 2)]);
        assert_eq!(graph.graph_label, Some(1));
    }

    #[test]
    fn test_rows_follow_node_order() {
        let mut builder = GraphBuilder::default();
        builder.add_node();
        builder.push_features(vec![0.0, 0.0]);
        builder.push_labels(vec![7]);
        builder.add_node();
        builder.push_features(vec![1.5, -2.0]);
        builder.push_labels(vec![7]);

        let graph = builder.build();
        assert_eq!(graph.features[1], vec![1.5, -2.0]);
        assert_eq!(graph.labels.len(), graph.num_nodes);
    }
}
