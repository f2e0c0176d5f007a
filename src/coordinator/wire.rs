//! Wire format of graphs travelling between ranks

use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec failures
#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode graph message: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode graph message from rank {source_rank}: {cause}")]
    Decode {
        source_rank: usize,
        #[source]
        cause: bincode::Error,
    },
}

/// A finished graph together with where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMessage {
    /// Rank that produced the graph
    pub source: u32,

    /// Position of the graph in its producer's share
    pub sequence: u32,

    pub graph: Graph,
}

impl GraphMessage {
    pub fn new(source: usize, sequence: usize, graph: Graph) -> Self {
        Self {
            source: source as u32,
            sequence: sequence as u32,
            graph,
        }
    }

    /// Serialize for sending
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        bincode::serialize(self).map_err(WireError::Encode)
    }

    /// Deserialize a payload received from `source_rank`
    pub fn decode(bytes: &[u8], source_rank: usize) -> Result<Self, WireError> {
        bincode::deserialize(bytes).map_err(|cause| WireError::Decode { source_rank, cause })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    #[test]
    fn test_message_survives_the_wire() {
        let graph = Graph {
            num_nodes: 3,
            edges: vec![Edge::new(0, 1), Edge::new(1, 2)],
            features: vec![vec![0.0, 0.0], vec![1.5, 0.5], vec![2.0, -1.0]],
            labels: vec![vec![1], vec![1], vec![1]],
            graph_label: Some(1),
        };
        let message = GraphMessage::new(2, 5, graph);

        let bytes = message.encode().unwrap();
        assert_eq!(GraphMessage::decode(&bytes, 2).unwrap(), message);
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let message = GraphMessage::new(1, 0, Graph::default());
        let bytes = message.encode().unwrap();

        let err = GraphMessage::decode(&bytes[..bytes.len() / 2], 1).unwrap_err();
        assert!(matches!(err, WireError::Decode { source_rank: 1, .. }));
    }
}
