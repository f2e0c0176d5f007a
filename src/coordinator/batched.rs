//! Batched collective delivery.
//!
//! Every rank builds its whole share first. Then, once per graph of the
//! share, all ranks take part in a gather that brings one graph from each
//! rank to the collector; nobody starts the next round before the collector
//! has written the current one.

use anyhow::Result;
use crate::config::RunConfig;
use crate::coordinator::transport::Endpoint;
use crate::coordinator::wire::GraphMessage;
use crate::coordinator::{Collector, Producer, ProtocolError};
use crate::storage::GraphSink;

fn produce_share(run: &RunConfig, rank: usize) -> Result<Vec<GraphMessage>> {
    let mut producer = Producer::new(run, rank);
    let mut share = Vec::with_capacity(producer.remaining());
    while let Some(message) = producer.next_graph()? {
        share.push(message);
    }
    log::debug!("Rank {} finished its share of {} graphs", rank, share.len());
    Ok(share)
}

/// Worker side: build the share, then contribute one graph per round
pub fn produce(run: &RunConfig, endpoint: &Endpoint) -> Result<usize> {
    let share = produce_share(run, endpoint.rank())?;
    let rounds = share.len();

    for message in share {
        endpoint
            .gather(message.encode()?, run.collector_wait)
            .map_err(ProtocolError::from)?;
    }

    Ok(rounds)
}

/// Collector side: build the local share, then run every gather round
pub fn collect<S: GraphSink + ?Sized>(
    run: &RunConfig,
    endpoint: &Endpoint,
    collector: &mut Collector<'_, S>,
) -> Result<()> {
    let share = produce_share(run, endpoint.rank())?;

    for (round, message) in share.into_iter().enumerate() {
        let gathered = endpoint
            .gather(message.encode()?, run.collector_wait)
            .map_err(|cause| ProtocolError::Incomplete {
                received: collector.received(),
                expected: collector.expected(),
                cause,
            })?
            .unwrap_or_default();

        log::debug!("Round {}: gathered {} graphs", round, gathered.len());
        for packet in gathered {
            collector.accept(packet)?;
        }

        endpoint.release().map_err(ProtocolError::from)?;
    }

    Ok(())
}
