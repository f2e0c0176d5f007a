//! Message passing between ranks.
//!
//! A [`World`] wires `n` endpoints together with crossbeam channels. Ranks
//! share nothing but these channels, and every payload is an opaque byte
//! buffer, so an endpoint behaves like a process talking over a network.

use crate::config::CollectorWait;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use thiserror::Error;

/// Rank that receives point-to-point traffic and roots collectives
pub const COLLECTOR_RANK: usize = 0;

/// Failures of the channel layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no message arrived within {0:?}")]
    Timeout(Duration),

    #[error("every peer has disconnected")]
    Disconnected,

    #[error("rank {rank} is not part of a world of {size}")]
    UnknownRank { rank: usize, size: usize },

    #[error("rank {0} contributed twice to one gather round")]
    DuplicateContribution(usize),

    #[error("only the collector can {0}")]
    NotCollector(&'static str),
}

/// Bytes tagged with the rank that sent them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub source: usize,
    pub payload: Vec<u8>,
}

enum Collective {
    Root {
        contributions: Receiver<Packet>,
        releases: Vec<Sender<()>>,
    },
    Member {
        contribute: Sender<Packet>,
        release: Receiver<()>,
    },
}

/// One rank's view of the world
pub struct Endpoint {
    rank: usize,
    size: usize,
    /// Senders into every other rank's inbox; `None` at our own index
    peers: Vec<Option<Sender<Packet>>>,
    inbox: Receiver<Packet>,
    collective: Collective,
}

/// Builder for a fully connected set of endpoints
pub struct World;

impl World {
    /// Create `size` connected endpoints, indexed by rank
    pub fn new(size: usize) -> Vec<Endpoint> {
        let (senders, inboxes): (Vec<_>, Vec<_>) =
            (0..size).map(|_| channel::unbounded::<Packet>()).unzip();
        let (contribute, contributions) = channel::unbounded::<Packet>();

        let mut releases = Vec::with_capacity(size.saturating_sub(1));
        let mut endpoints = Vec::with_capacity(size);
        let mut root_inbox = None;

        for (rank, inbox) in inboxes.into_iter().enumerate() {
            let peers = senders
                .iter()
                .enumerate()
                .map(|(peer, tx)| (peer != rank).then(|| tx.clone()))
                .collect();

            if rank == COLLECTOR_RANK {
                root_inbox = Some((peers, inbox));
                continue;
            }

            let (release_tx, release_rx) = channel::unbounded();
            releases.push(release_tx);
            endpoints.push(Endpoint {
                rank,
                size,
                peers,
                inbox,
                collective: Collective::Member {
                    contribute: contribute.clone(),
                    release: release_rx,
                },
            });
        }

        if let Some((peers, inbox)) = root_inbox {
            endpoints.insert(
                COLLECTOR_RANK,
                Endpoint {
                    rank: COLLECTOR_RANK,
                    size,
                    peers,
                    inbox,
                    collective: Collective::Root {
                        contributions,
                        releases,
                    },
                },
            );
        }

        endpoints
    }
}

impl Endpoint {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Queue `payload` for rank `dest` without waiting for it to be received
    pub fn send(&self, dest: usize, payload: Vec<u8>) -> Result<(), TransportError> {
        let tx = self
            .peers
            .get(dest)
            .and_then(Option::as_ref)
            .ok_or(TransportError::UnknownRank {
                rank: dest,
                size: self.size,
            })?;

        tx.send(Packet {
            source: self.rank,
            payload,
        })
        .map_err(|_| TransportError::Disconnected)
    }

    /// Take an already arrived message, if any
    pub fn try_recv(&self) -> Option<Packet> {
        self.inbox.try_recv().ok()
    }

    /// Wait for the next message from any sender
    pub fn recv(&self, wait: CollectorWait) -> Result<Packet, TransportError> {
        recv_with(&self.inbox, wait)
    }

    /// Gather one payload per rank at the collector.
    ///
    /// The collector gets `Some` with the packets ordered by rank (its own
    /// first) and must call [`release`] once it has processed them. Other
    /// ranks get `None` after the collector released the round.
    ///
    /// [`release`]: Endpoint::release
    pub fn gather(
        &self,
        payload: Vec<u8>,
        wait: CollectorWait,
    ) -> Result<Option<Vec<Packet>>, TransportError> {
        match &self.collective {
            Collective::Member {
                contribute,
                release,
            } => {
                contribute
                    .send(Packet {
                        source: self.rank,
                        payload,
                    })
                    .map_err(|_| TransportError::Disconnected)?;
                release.recv().map_err(|_| TransportError::Disconnected)?;
                Ok(None)
            }
            Collective::Root { contributions, .. } => {
                let mut slots: Vec<Option<Packet>> = vec![None; self.size];
                slots[self.rank] = Some(Packet {
                    source: self.rank,
                    payload,
                });

                for _ in 1..self.size {
                    let packet = recv_with(contributions, wait)?;
                    let slot = slots.get_mut(packet.source).ok_or(TransportError::UnknownRank {
                        rank: packet.source,
                        size: self.size,
                    })?;
                    if slot.is_some() {
                        return Err(TransportError::DuplicateContribution(packet.source));
                    }
                    *slot = Some(packet);
                }

                Ok(Some(slots.into_iter().flatten().collect()))
            }
        }
    }

    /// Let every rank blocked in [`gather`] continue to the next round
    ///
    /// [`gather`]: Endpoint::gather
    pub fn release(&self) -> Result<(), TransportError> {
        match &self.collective {
            Collective::Root { releases, .. } => {
                for release in releases {
                    release.send(()).map_err(|_| TransportError::Disconnected)?;
                }
                Ok(())
            }
            Collective::Member { .. } => Err(TransportError::NotCollector("release a gather")),
        }
    }
}

fn recv_with(rx: &Receiver<Packet>, wait: CollectorWait) -> Result<Packet, TransportError> {
    match wait {
        CollectorWait::Block => rx.recv().map_err(|_| TransportError::Disconnected),
        CollectorWait::Timeout(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => TransportError::Timeout(timeout),
            RecvTimeoutError::Disconnected => TransportError::Disconnected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_point_to_point_reaches_collector() {
        let mut world = World::new(3);
        let worker = world.pop().unwrap();
        let collector = world.remove(0);

        assert_eq!(worker.rank(), 2);
        worker.send(COLLECTOR_RANK, vec![1, 2, 3]).unwrap();

        let packet = collector.recv(CollectorWait::Block).unwrap();
        assert_eq!(packet, Packet { source: 2, payload: vec![1, 2, 3] });
        assert!(collector.try_recv().is_none());
    }

    #[test]
    fn test_send_to_self_or_unknown_rank_fails() {
        let world = World::new(2);
        assert_eq!(
            world[1].send(1, vec![]),
            Err(TransportError::UnknownRank { rank: 1, size: 2 })
        );
        assert_eq!(
            world[1].send(9, vec![]),
            Err(TransportError::UnknownRank { rank: 9, size: 2 })
        );
    }

    #[test]
    fn test_collector_sees_disconnect_once_workers_leave() {
        let mut world = World::new(3);
        let collector = world.remove(0);
        world[0].send(COLLECTOR_RANK, vec![7]).unwrap();
        drop(world);

        // buffered messages survive the senders
        assert_eq!(collector.recv(CollectorWait::Block).unwrap().payload, vec![7]);
        assert_eq!(
            collector.recv(CollectorWait::Block),
            Err(TransportError::Disconnected)
        );
    }

    #[test]
    fn test_timed_wait_reports_timeout() {
        let world = World::new(2);
        let wait = CollectorWait::Timeout(Duration::from_millis(20));
        assert_eq!(
            world[0].recv(wait),
            Err(TransportError::Timeout(Duration::from_millis(20)))
        );
    }

    #[test]
    fn test_gather_orders_by_rank_and_blocks_until_release() {
        let mut world = World::new(4);
        let collector = world.remove(0);

        thread::scope(|scope| {
            for endpoint in world {
                scope.spawn(move || {
                    let rank = endpoint.rank() as u8;
                    for round in 0..3u8 {
                        let gathered = endpoint
                            .gather(vec![rank, round], CollectorWait::Block)
                            .unwrap();
                        assert!(gathered.is_none());
                    }
                });
            }

            for round in 0..3u8 {
                let gathered = collector
                    .gather(vec![0, round], CollectorWait::Block)
                    .unwrap()
                    .unwrap();
                let payloads: Vec<Vec<u8>> = gathered.into_iter().map(|p| p.payload).collect();
                assert_eq!(
                    payloads,
                    vec![vec![0, round], vec![1, round], vec![2, round], vec![3, round]]
                );
                collector.release().unwrap();
            }
        });
    }

    #[test]
    fn test_single_rank_gather_returns_own_payload() {
        let world = World::new(1);
        let gathered = world[0].gather(vec![5], CollectorWait::Block).unwrap().unwrap();
        assert_eq!(gathered, vec![Packet { source: 0, payload: vec![5] }]);
        assert_eq!(world[0].release(), Ok(()));
    }

    #[test]
    fn test_members_cannot_release() {
        let world = World::new(2);
        assert!(matches!(
            world[1].release(),
            Err(TransportError::NotCollector(_))
        ));
    }
}
