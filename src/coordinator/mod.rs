//! Distributed production and collection of graphs.
//!
//! Every rank runs on its own thread with its own engines and random streams
//! and talks to the others only through [`transport::Endpoint`]s. Rank 0 is
//! the collector: besides producing its own share it receives every other
//! rank's graphs and hands them to a [`GraphSink`] in arrival order.

pub mod batched;
pub mod streaming;
pub mod transport;
pub mod wire;

use anyhow::Result;
use crate::config::{ConfigError, DeliveryMode, RunConfig, SimulationConfig};
use crate::dla::{derive_seed, AggregationEngine};
use crate::graph::algorithms::{validate_tree, GraphError};
use crate::graph::Graph;
use crate::storage::GraphSink;
use std::thread;
use std::time::Instant;
use thiserror::Error;
use transport::{Endpoint, Packet, TransportError, World, COLLECTOR_RANK};
use wire::{GraphMessage, WireError};

/// Failures of the collection protocol
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("collector stopped after {received} of {expected} graphs")]
    Incomplete {
        received: usize,
        expected: usize,
        #[source]
        cause: TransportError,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("message from rank {sender} claims to come from rank {claimed}")]
    SenderMismatch { sender: usize, claimed: usize },

    #[error("rank {sender} delivered a malformed graph")]
    InvalidGraph {
        sender: usize,
        #[source]
        cause: GraphError,
    },

    #[error("rank {0} panicked")]
    WorkerPanicked(usize),
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Graphs requested by the operator
    pub requested: usize,

    /// Graphs produced and written (`share * ranks`)
    pub effective_total: usize,

    /// Graphs handed to the sink
    pub delivered: usize,

    /// Graphs received from each rank
    pub per_rank: Vec<usize>,
}

/// Sequential source of one rank's share of graphs.
///
/// Graph `i` of rank `r` is seeded from the base seed, `r` and `i`, so any
/// graph can be regenerated on its own.
pub struct Producer {
    rank: usize,
    config: SimulationConfig,
    rank_seed: u64,
    share: usize,
    produced: usize,
}

impl Producer {
    pub fn new(run: &RunConfig, rank: usize) -> Self {
        let config = run.simulation_for_rank(rank);
        let rank_seed = derive_seed(config.seed, rank as u64);
        Self {
            rank,
            config,
            rank_seed,
            share: run.share_per_rank(),
            produced: 0,
        }
    }

    /// Graphs still to produce
    pub fn remaining(&self) -> usize {
        self.share - self.produced
    }

    /// Build the next graph of the share, `None` once the share is done
    pub fn next_graph(&mut self) -> Result<Option<GraphMessage>, ConfigError> {
        if self.produced == self.share {
            return Ok(None);
        }

        let mut config = self.config.clone();
        config.seed = derive_seed(self.rank_seed, self.produced as u64);

        let started = Instant::now();
        let graph = AggregationEngine::from_config(&config)?.run();
        log::debug!(
            "Rank {} built graph {} ({} nodes) in {:?}",
            self.rank,
            self.produced,
            graph.num_nodes,
            started.elapsed()
        );

        let message = GraphMessage::new(self.rank, self.produced, graph);
        self.produced += 1;
        Ok(Some(message))
    }
}

/// Collector-side bookkeeping shared by both delivery modes
pub struct Collector<'a, S: GraphSink + ?Sized> {
    sink: &'a mut S,
    expected: usize,
    per_rank: Vec<usize>,
    received: usize,
}

impl<'a, S: GraphSink + ?Sized> Collector<'a, S> {
    pub fn new(sink: &'a mut S, expected: usize, num_ranks: usize) -> Self {
        Self {
            sink,
            expected,
            per_rank: vec![0; num_ranks],
            received: 0,
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.received >= self.expected
    }

    /// Decode a packet from another rank and deliver it
    pub fn accept(&mut self, packet: Packet) -> Result<()> {
        let message = GraphMessage::decode(&packet.payload, packet.source)
            .map_err(ProtocolError::from)?;
        if message.source as usize != packet.source {
            return Err(ProtocolError::SenderMismatch {
                sender: packet.source,
                claimed: message.source as usize,
            }
            .into());
        }
        self.deliver(packet.source, &message.graph)
    }

    /// Deliver a graph produced by `sender`
    pub fn deliver(&mut self, sender: usize, graph: &Graph) -> Result<()> {
        validate_tree(graph).map_err(|cause| ProtocolError::InvalidGraph { sender, cause })?;

        self.sink.deliver(graph)?;
        if let Some(count) = self.per_rank.get_mut(sender) {
            *count += 1;
        }
        self.received += 1;
        log::debug!(
            "Collected graph {}/{} from rank {}",
            self.received,
            self.expected,
            sender
        );
        Ok(())
    }

    fn into_report(self, requested: usize) -> RunReport {
        RunReport {
            requested,
            effective_total: self.expected,
            delivered: self.received,
            per_rank: self.per_rank,
        }
    }
}

/// Produce `config.effective_total()` graphs across `config.num_ranks` ranks and
/// deliver all of them to `sink`
pub fn run<S: GraphSink + ?Sized>(config: &RunConfig, sink: &mut S) -> Result<RunReport> {
    config.validate()?;

    log::info!(
        "Producing {} graphs ({} requested) on {} ranks, {} per rank, {:?} delivery",
        config.effective_total(),
        config.total_graphs,
        config.num_ranks,
        config.share_per_rank(),
        config.delivery_mode
    );

    let started = Instant::now();
    let mut endpoints = World::new(config.num_ranks);
    let collector_endpoint = endpoints.remove(COLLECTOR_RANK);

    let report = thread::scope(|scope| -> Result<RunReport> {
        let mut workers = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let rank = endpoint.rank();
            let handle = thread::Builder::new()
                .name(format!("rank-{}", rank))
                .spawn_scoped(scope, move || run_worker(config, endpoint))?;
            workers.push((rank, handle));
        }

        // drops the collector endpoint on return, which unblocks any worker
        // still waiting on it
        let collected = run_collector(config, collector_endpoint, sink);

        let mut worker_error = None;
        for (rank, handle) in workers {
            match handle.join() {
                Ok(Ok(sent)) => log::debug!("Rank {} finished after {} graphs", rank, sent),
                Ok(Err(e)) => {
                    log::warn!("Rank {} failed: {:#}", rank, e);
                    worker_error.get_or_insert(e);
                }
                Err(_) => {
                    worker_error.get_or_insert(ProtocolError::WorkerPanicked(rank).into());
                }
            }
        }

        let report = collected?;
        if let Some(e) = worker_error {
            return Err(e);
        }
        Ok(report)
    })?;

    log::info!(
        "Collected {} graphs in {:.2?}",
        report.delivered,
        started.elapsed()
    );

    Ok(report)
}

/// Body of rank 0
pub fn run_collector<S: GraphSink + ?Sized>(
    run: &RunConfig,
    endpoint: Endpoint,
    sink: &mut S,
) -> Result<RunReport> {
    let mut collector = Collector::new(sink, run.effective_total(), run.num_ranks);
    match run.delivery_mode {
        DeliveryMode::Batched => batched::collect(run, &endpoint, &mut collector)?,
        DeliveryMode::Streaming => streaming::collect(run, &endpoint, &mut collector)?,
    }
    Ok(collector.into_report(run.total_graphs))
}

/// Body of every rank but 0; returns the number of graphs handed over
pub fn run_worker(run: &RunConfig, endpoint: Endpoint) -> Result<usize> {
    match run.delivery_mode {
        DeliveryMode::Batched => batched::produce(run, &endpoint),
        DeliveryMode::Streaming => streaming::produce(run, &endpoint),
    }
}
