//! Zero-copy claim/commit.
//!
//! A [`SinkBufferClaim`] is a reusable value that a sink fills in on a
//! successful `try_claim`. The caller writes the message directly into
//! [`SinkBufferClaim::buffer_mut`] and then calls [`SinkBufferClaim::commit`]
//! exactly once.
//!
//! A local-queue claim holds its ring slot locked until commit; consumers of
//! that ring stall at the claimed sequence until it is committed or aborted.

use std::sync::Arc;

use tracing::warn;

use crate::error::{MessagingError, Result};
use crate::queue::{RingBuffer, SlotGuard};
use crate::metrics;
use crate::transport::{OfferOutcome, Publication, Reservation};
use crate::types::PublishResult;

/// How a claimed region is made visible.
enum Committer {
    /// Publish a reserved ring sequence.
    LocalSequence {
        ring: Arc<RingBuffer>,
        sequence: i64,
        slot: SlotGuard,
    },
    /// Hand the scratch region to the publication's native commit.
    NetworkCommit {
        publication: Arc<dyn Publication>,
        reservation: Reservation,
    },
}

impl std::fmt::Debug for Committer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Committer::LocalSequence { sequence, .. } => f
                .debug_struct("LocalSequence")
                .field("sequence", sequence)
                .finish_non_exhaustive(),
            Committer::NetworkCommit {
                publication,
                reservation,
            } => f
                .debug_struct("NetworkCommit")
                .field("endpoint", &publication.endpoint())
                .field("reservation", reservation)
                .finish(),
        }
    }
}

/// Reusable claim over a region of a sink's buffer.
#[derive(Debug, Default)]
pub struct SinkBufferClaim {
    committer: Option<Committer>,
    scratch: Vec<u8>,
    len: usize,
}

impl SinkBufferClaim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a claim is outstanding.
    pub fn is_claimed(&self) -> bool {
        self.committer.is_some()
    }

    /// Length of the claimed region.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Claimed region, empty when nothing is claimed.
    pub fn buffer(&self) -> &[u8] {
        match &self.committer {
            Some(Committer::LocalSequence { slot, .. }) => slot.payload(),
            Some(Committer::NetworkCommit { .. }) => &self.scratch[..self.len],
            None => &[],
        }
    }

    /// Writable claimed region, empty when nothing is claimed.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        let len = self.len;
        match &mut self.committer {
            Some(Committer::LocalSequence { slot, .. }) => slot.region_mut(len),
            Some(Committer::NetworkCommit { .. }) => &mut self.scratch[..len],
            None => &mut [],
        }
    }

    /// Make the claimed region visible to the destination.
    ///
    /// Returns `Err(NothingClaimed)` if no claim is outstanding. A network
    /// commit retries back-pressure and only reports `Failure` once the peer
    /// is gone or the publication is closed.
    pub fn commit(&mut self) -> Result<PublishResult> {
        let committer = self.committer.take().ok_or(MessagingError::NothingClaimed)?;
        let result = match committer {
            Committer::LocalSequence {
                ring,
                sequence,
                slot,
            } => {
                drop(slot);
                ring.publish(sequence);
                PublishResult::Ok
            }
            Committer::NetworkCommit {
                publication,
                reservation,
            } => {
                let (outcome, retries) =
                    publication.commit(reservation, &self.scratch[..self.len]);
                if retries > 0 {
                    metrics::record_back_pressure(retries, "network");
                }
                if outcome != OfferOutcome::Accepted {
                    warn!(
                        endpoint = publication.endpoint(),
                        ?outcome,
                        "Claimed network message was not delivered"
                    );
                }
                PublishResult::from(outcome)
            }
        };
        self.len = 0;
        Ok(result)
    }

    /// Give up an outstanding claim.
    ///
    /// Network claims are dropped unsent and release any reserved transport
    /// capacity. Local claims publish an empty frame
    /// so consumers move past the reserved sequence.
    pub fn abort(&mut self) -> Result<()> {
        let committer = self.committer.take().ok_or(MessagingError::NothingClaimed)?;
        if let Committer::LocalSequence {
            ring,
            sequence,
            mut slot,
        } = committer
        {
            slot.clear();
            drop(slot);
            ring.publish(sequence);
        }
        self.len = 0;
        Ok(())
    }

    /// Reserve `len` bytes of `ring` and bind the sequence committer.
    pub(crate) fn claim_local(&mut self, ring: &Arc<RingBuffer>, len: usize) -> PublishResult {
        if self.is_claimed() {
            return PublishResult::Failure;
        }
        if len > ring.slot_size() {
            return PublishResult::LengthExceedsMessageSize;
        }
        let Some(sequence) = ring.try_next() else {
            return PublishResult::InsufficientSpace;
        };

        let mut slot = ring.get(sequence);
        slot.region_mut(len);
        self.committer = Some(Committer::LocalSequence {
            ring: Arc::clone(ring),
            sequence,
            slot,
        });
        self.len = len;
        PublishResult::Ok
    }

    /// Reserve `len` bytes through the publication's native claim.
    pub(crate) fn claim_network(
        &mut self,
        publication: &Arc<dyn Publication>,
        len: usize,
    ) -> PublishResult {
        if self.is_claimed() {
            return PublishResult::Failure;
        }
        match publication.try_claim(len) {
            Ok(reservation) => {
                self.scratch.clear();
                self.scratch.resize(len, 0);
                self.committer = Some(Committer::NetworkCommit {
                    publication: Arc::clone(publication),
                    reservation,
                });
                self.len = len;
                PublishResult::Ok
            }
            Err(outcome) => PublishResult::from(outcome),
        }
    }
}

impl Drop for SinkBufferClaim {
    fn drop(&mut self) {
        if let Some(Committer::LocalSequence { sequence, .. }) = &self.committer {
            warn!(
                sequence = *sequence,
                "Dropped an uncommitted queue claim; consumers will stall at this sequence"
            );
        }
    }
}
