//! Streaming point-to-point delivery.
//!
//! Workers send each graph to the collector as soon as it is built and move
//! on without waiting. The collector alternates between building one of its
//! own graphs and draining whatever has already arrived. Once its own share
//! is done it waits for the rest with the configured [`CollectorWait`]; a
//! bare non-blocking poll at that point could conclude early while senders
//! still have graphs in flight.
//!
//! [`CollectorWait`]: crate::config::CollectorWait

use anyhow::Result;
use crate::config::RunConfig;
use crate::coordinator::transport::{Endpoint, COLLECTOR_RANK};
use crate::coordinator::{Collector, Producer, ProtocolError};
use crate::storage::GraphSink;

/// Worker side: build and send graphs one at a time
pub fn produce(run: &RunConfig, endpoint: &Endpoint) -> Result<usize> {
    let mut producer = Producer::new(run, endpoint.rank());
    let mut sent = 0;
    while let Some(message) = producer.next_graph()? {
        endpoint
            .send(COLLECTOR_RANK, message.encode()?)
            .map_err(ProtocolError::from)?;
        sent += 1;
    }
    Ok(sent)
}

/// Collector side: interleave local production with draining arrivals
pub fn collect<S: GraphSink + ?Sized>(
    run: &RunConfig,
    endpoint: &Endpoint,
    collector: &mut Collector<'_, S>,
) -> Result<()> {
    let mut producer = Producer::new(run, endpoint.rank());

    while let Some(message) = producer.next_graph()? {
        collector.deliver(endpoint.rank(), &message.graph)?;
        drain(endpoint, collector)?;
    }

    log::debug!(
        "Collector finished its own share with {}/{} graphs collected",
        collector.received(),
        collector.expected()
    );

    while !collector.is_complete() {
        let packet = endpoint
            .recv(run.collector_wait)
            .map_err(|cause| ProtocolError::Incomplete {
                received: collector.received(),
                expected: collector.expected(),
                cause,
            })?;
        collector.accept(packet)?;
    }

    Ok(())
}

/// Deliver every message that has already arrived
fn drain<S: GraphSink + ?Sized>(
    endpoint: &Endpoint,
    collector: &mut Collector<'_, S>,
) -> Result<()> {
    while let Some(packet) = endpoint.try_recv() {
        collector.accept(packet)?;
    }
    Ok(())
}
