//! Datagram publications backing network sinks.
//!
//! A [`Publication`] is one outbound stream to a remote endpoint. Sinks never
//! see transport errors directly; every attempt reports an [`OfferOutcome`]
//! which the network sink maps onto a [`PublishResult`](crate::PublishResult).
//!
//! Bindings:
//! - [`UdpPublication`]: connected non-blocking UDP socket
//! - [`ChannelPublication`]: in-process `tokio::sync::mpsc` channel
//! - [`DiscardPublication`]: accepts and drops everything

mod channel;
mod udp;

pub use channel::ChannelPublication;
pub use udp::UdpPublication;

use tokio::sync::mpsc;

use crate::types::PublishResult;

/// Result of a single offer, claim or commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Handed to the transport
    Accepted,
    /// Transport buffer full, retry later
    BackPressured,
    /// Transport busy with housekeeping, retry later
    AdminAction,
    /// No live peer
    NotConnected,
    /// Publication closed
    Closed,
    /// Message larger than the transport frame
    MaxLengthExceeded,
}

impl OfferOutcome {
    /// Whether retrying the same attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, OfferOutcome::BackPressured | OfferOutcome::AdminAction)
    }
}

impl From<OfferOutcome> for PublishResult {
    fn from(outcome: OfferOutcome) -> Self {
        match outcome {
            OfferOutcome::Accepted => PublishResult::Ok,
            OfferOutcome::BackPressured | OfferOutcome::AdminAction => {
                PublishResult::InsufficientSpace
            }
            OfferOutcome::NotConnected | OfferOutcome::Closed => PublishResult::Failure,
            OfferOutcome::MaxLengthExceeded => PublishResult::LengthExceedsFrameSize,
        }
    }
}

/// Transport capacity held between a claim and its commit.
pub enum Reservation {
    /// Nothing is held; commit offers the region until the transport
    /// settles on a non-transient outcome.
    Offer,
    /// A slot already taken from an in-process channel.
    Channel(mpsc::OwnedPermit<Vec<u8>>),
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reservation::Offer => f.write_str("Offer"),
            Reservation::Channel(_) => f.write_str("Channel"),
        }
    }
}

/// Busy spins between offers before a transient outcome starts yielding.
const SPIN_LIMIT: u64 = 64;

/// Offer `buf` until the outcome is no longer transient.
///
/// Returns the final outcome and how many offers were retried.
pub(crate) fn offer_until_settled<P: Publication + ?Sized>(
    publication: &P,
    buf: &[u8],
) -> (OfferOutcome, u64) {
    let mut retries = 0u64;
    loop {
        match publication.offer(buf) {
            outcome if outcome.is_transient() => {
                retries += 1;
                if retries <= SPIN_LIMIT {
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
            }
            outcome => return (outcome, retries),
        }
    }
}

/// Outbound datagram stream to one endpoint.
pub trait Publication: Send + Sync + std::fmt::Debug {
    /// Endpoint address, used to index network sinks.
    fn endpoint(&self) -> &str;

    /// Largest message a single offer may carry.
    fn max_message_length(&self) -> usize;

    /// Whether a peer is currently reachable.
    fn is_connected(&self) -> bool;

    /// Send one message.
    fn offer(&self, buf: &[u8]) -> OfferOutcome;

    /// Reserve room for a `len`-byte message.
    ///
    /// A transport without native reservation returns [`Reservation::Offer`]
    /// and settles the message at commit time.
    fn try_claim(&self, len: usize) -> Result<Reservation, OfferOutcome> {
        if len > self.max_message_length() {
            return Err(OfferOutcome::MaxLengthExceeded);
        }
        if !self.is_connected() {
            return Err(OfferOutcome::NotConnected);
        }
        Ok(Reservation::Offer)
    }

    /// Send `region` through a reservation taken by [`try_claim`](Self::try_claim).
    ///
    /// Transient outcomes are retried; only a lost peer or a closed
    /// publication ends the message. Returns the outcome and retry count.
    fn commit(&self, reservation: Reservation, region: &[u8]) -> (OfferOutcome, u64) {
        match reservation {
            Reservation::Channel(permit) => {
                permit.send(region.to_vec());
                (OfferOutcome::Accepted, 0)
            }
            Reservation::Offer => offer_until_settled(self, region),
        }
    }
}

/// Publication that accepts every message and sends nothing.
///
/// Backs claims made against placeholder sinks so that commit stays a
/// harmless no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardPublication;

impl Publication for DiscardPublication {
    fn endpoint(&self) -> &str {
        "discard"
    }

    fn max_message_length(&self) -> usize {
        usize::MAX
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn offer(&self, _buf: &[u8]) -> OfferOutcome {
        OfferOutcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_transient_outcomes() {
        assert!(OfferOutcome::BackPressured.is_transient());
        assert!(OfferOutcome::AdminAction.is_transient());
        assert!(!OfferOutcome::NotConnected.is_transient());
        assert!(!OfferOutcome::Closed.is_transient());
        assert!(!OfferOutcome::MaxLengthExceeded.is_transient());
        assert!(!OfferOutcome::Accepted.is_transient());
    }

    #[test]
    fn test_outcome_to_result() {
        assert_eq!(PublishResult::from(OfferOutcome::Accepted), PublishResult::Ok);
        assert_eq!(
            PublishResult::from(OfferOutcome::AdminAction),
            PublishResult::InsufficientSpace
        );
        assert_eq!(PublishResult::from(OfferOutcome::Closed), PublishResult::Failure);
        assert_eq!(
            PublishResult::from(OfferOutcome::MaxLengthExceeded),
            PublishResult::LengthExceedsFrameSize
        );
    }

    #[test]
    fn test_default_claim_settles_at_commit() {
        let publication = DiscardPublication;
        let reservation = publication.try_claim(2).unwrap();
        assert_matches!(reservation, Reservation::Offer);
        assert_eq!(publication.commit(reservation, &[0, 0]), (OfferOutcome::Accepted, 0));
    }

    /// Reports back-pressure for the first `busy` offers.
    #[derive(Debug)]
    struct Congested {
        busy: usize,
        offers: AtomicUsize,
    }

    impl Publication for Congested {
        fn endpoint(&self) -> &str {
            "congested"
        }

        fn max_message_length(&self) -> usize {
            16
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn offer(&self, _buf: &[u8]) -> OfferOutcome {
            if self.offers.fetch_add(1, Ordering::Relaxed) < self.busy {
                OfferOutcome::BackPressured
            } else {
                OfferOutcome::Accepted
            }
        }
    }

    #[test]
    fn test_commit_retries_back_pressure() {
        let publication = Congested {
            busy: 3,
            offers: AtomicUsize::new(0),
        };
        let reservation = publication.try_claim(4).unwrap();
        assert_eq!(publication.commit(reservation, b"late"), (OfferOutcome::Accepted, 3));
        assert_eq!(publication.offers.load(Ordering::Relaxed), 4);
        assert_matches!(publication.try_claim(17), Err(OfferOutcome::MaxLengthExceeded));
    }
}
