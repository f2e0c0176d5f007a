//! Dataset persistence module

pub mod writer;

use anyhow::Result;
use crate::graph::Graph;

pub use writer::{DatasetLayout, DatasetWriter};

/// Receiver of finished graphs at the collector.
///
/// Graphs arrive one at a time in collector arrival order; node offsets are
/// assigned from that order alone.
pub trait GraphSink {
    fn deliver(&mut self, graph: &Graph) -> Result<()>;
}

/// Running position inside a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetCursor {
    /// Nodes written so far; the next graph's nodes start after these
    pub nodes: usize,

    /// Graphs written so far
    pub graphs: usize,

    /// Undirected edges written so far
    pub edges: usize,
}

impl DatasetCursor {
    /// 1-based id of the next graph
    pub fn next_graph_id(&self) -> usize {
        self.graphs + 1
    }

    /// 1-based id of the first node of the next graph
    pub fn node_offset(&self) -> usize {
        self.nodes + 1
    }

    pub fn advance(&mut self, graph: &Graph) {
        self.nodes += graph.num_nodes;
        self.edges += graph.edges.len();
        self.graphs += 1;
    }
}

/// Sink keeping everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub graphs: Vec<Graph>,

    /// Cursor after each delivery
    pub history: Vec<DatasetCursor>,

    cursor: DatasetCursor,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> DatasetCursor {
        self.cursor
    }
}

impl GraphSink for MemorySink {
    fn deliver(&mut self, graph: &Graph) -> Result<()> {
        self.cursor.advance(graph);
        self.history.push(self.cursor);
        self.graphs.push(graph.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn path(num_nodes: usize) -> Graph {
        Graph {
            num_nodes,
            edges: (1..num_nodes as u32).map(|i| Edge::new(i - 1, i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_offsets_follow_arrival_order() {
        let mut sink = MemorySink::new();
        for n in [3, 1, 5, 2] {
            sink.deliver(&path(n)).unwrap();
        }

        let offsets: Vec<usize> = sink.history.iter().map(|c| c.nodes).collect();
        assert_eq!(offsets, vec![3, 4, 9, 11]);
        assert_eq!(sink.cursor().graphs, 4);
        assert_eq!(sink.cursor().edges, 7);
        assert_eq!(sink.cursor().node_offset(), 12);
        assert_eq!(sink.cursor().next_graph_id(), 5);
    }
}
