use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::claim::SinkBufferClaim;
use crate::metrics;
use crate::queue::RingBuffer;
use crate::types::{PublishResult, SinkIdentity};

const TRANSPORT: &str = "local";

/// Sink writing into an in-process ring buffer.
#[derive(Debug)]
pub struct LocalQueueSink {
    identity: SinkIdentity,
    ring: Arc<RingBuffer>,
    back_pressure: AtomicU64,
}

impl LocalQueueSink {
    pub fn new(identity: SinkIdentity, ring: Arc<RingBuffer>) -> Self {
        Self {
            identity,
            ring,
            back_pressure: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &SinkIdentity {
        &self.identity
    }

    /// Ring buffer this sink publishes into.
    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }

    pub fn back_pressure_intensity(&self) -> u64 {
        self.back_pressure.load(Ordering::Relaxed)
    }

    /// Publish `buf`, waiting for the consumer to free a slot if necessary.
    pub fn publish(&self, buf: &[u8]) -> PublishResult {
        if buf.len() > self.ring.slot_size() {
            return finish(PublishResult::LengthExceedsMessageSize);
        }

        let mut retries = 0u64;
        let sequence = self.ring.next_observed(|| retries += 1);
        self.ring.get(sequence).write(buf);
        self.ring.publish(sequence);

        if retries > 0 {
            self.back_pressure.fetch_add(retries, Ordering::Relaxed);
            metrics::record_back_pressure(retries, TRANSPORT);
        }
        PublishResult::Ok
    }

    /// Publish `buf` only if a slot is free right now.
    pub fn try_publish(&self, buf: &[u8]) -> PublishResult {
        if buf.len() > self.ring.slot_size() {
            return finish(PublishResult::LengthExceedsMessageSize);
        }
        let Some(sequence) = self.ring.try_next() else {
            return finish(PublishResult::InsufficientSpace);
        };
        self.ring.get(sequence).write(buf);
        self.ring.publish(sequence);
        PublishResult::Ok
    }

    pub fn try_claim(&self, len: usize, claim: &mut SinkBufferClaim) -> PublishResult {
        finish(claim.claim_local(&self.ring, len))
    }

    pub(crate) fn with_identity(&self, identity: SinkIdentity) -> Self {
        Self::new(identity, Arc::clone(&self.ring))
    }
}

fn finish(result: PublishResult) -> PublishResult {
    if !result.is_ok() {
        metrics::record_publish_failure(TRANSPORT, result.name());
    }
    result
}
