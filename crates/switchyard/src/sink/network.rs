use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::claim::SinkBufferClaim;
use crate::metrics;
use crate::transport::{offer_until_settled, OfferOutcome, Publication};
use crate::types::{PublishResult, SinkIdentity};

const TRANSPORT: &str = "network";

/// Sink sending datagrams through a [`Publication`].
#[derive(Debug)]
pub struct NetworkSink {
    identity: SinkIdentity,
    publication: Arc<dyn Publication>,
    back_pressure: AtomicU64,
}

impl NetworkSink {
    pub fn new(identity: SinkIdentity, publication: Arc<dyn Publication>) -> Self {
        Self {
            identity,
            publication,
            back_pressure: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &SinkIdentity {
        &self.identity
    }

    pub fn publication(&self) -> &Arc<dyn Publication> {
        &self.publication
    }

    pub fn back_pressure_intensity(&self) -> u64 {
        self.back_pressure.load(Ordering::Relaxed)
    }

    /// Offer `buf` until the transport accepts it or reports a permanent
    /// condition. A disconnected peer yields `Failure`.
    pub fn publish(&self, buf: &[u8]) -> PublishResult {
        if buf.len() > self.publication.max_message_length() {
            return self.finish(PublishResult::LengthExceedsFrameSize);
        }

        let (outcome, retries) = offer_until_settled(self.publication.as_ref(), buf);

        if retries > 0 {
            self.back_pressure.fetch_add(retries, Ordering::Relaxed);
            metrics::record_back_pressure(retries, TRANSPORT);
        }
        if outcome != OfferOutcome::Accepted {
            debug!(
                sink = %self.identity,
                endpoint = self.publication.endpoint(),
                ?outcome,
                "Network publish not delivered"
            );
        }
        self.finish(outcome.into())
    }

    /// Offer `buf` once; back-pressure yields `InsufficientSpace`.
    pub fn try_publish(&self, buf: &[u8]) -> PublishResult {
        if buf.len() > self.publication.max_message_length() {
            return self.finish(PublishResult::LengthExceedsFrameSize);
        }
        self.finish(self.publication.offer(buf).into())
    }

    pub fn try_claim(&self, len: usize, claim: &mut SinkBufferClaim) -> PublishResult {
        self.finish(claim.claim_network(&self.publication, len))
    }

    pub(crate) fn with_identity(&self, identity: SinkIdentity) -> Self {
        Self::new(identity, Arc::clone(&self.publication))
    }

    fn finish(&self, result: PublishResult) -> PublishResult {
        if !result.is_ok() {
            metrics::record_publish_failure(TRANSPORT, result.name());
        }
        result
    }
}
