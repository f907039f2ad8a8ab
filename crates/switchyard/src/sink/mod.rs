//! Message sinks.
//!
//! A [`MessageSink`] is a uniform write endpoint for one destination service.
//! The variant set is closed:
//!
//! - [`LocalQueueSink`]: same-process destination behind a ring buffer
//! - [`NetworkSink`]: remote destination behind a datagram publication
//! - [`PlaceholderSink`]: destination not available, messages dropped
//! - [`ForbiddenSink`]: must never be published to
//!
//! Every variant carries a fixed [`SinkIdentity`]. Transient conditions are
//! reported through [`PublishResult`] codes.

mod inert;
mod local;
mod network;

use std::sync::Arc;

pub use inert::{ForbiddenSink, PlaceholderSink, FORBIDDEN_SINK_NAME, NOT_APPLICABLE_SINK_NAME};
pub use local::LocalQueueSink;
pub use network::NetworkSink;

use crate::claim::SinkBufferClaim;
use crate::error::{MessagingError, Result};
use crate::queue::RingBuffer;
use crate::transport::Publication;
use crate::types::{PublishResult, ServiceType, SinkIdentity, SinkStatus};

/// Write endpoint for one destination service.
#[derive(Debug)]
pub enum MessageSink {
    LocalQueue(LocalQueueSink),
    Network(NetworkSink),
    Placeholder(PlaceholderSink),
    Forbidden(ForbiddenSink),
}

impl MessageSink {
    /// Sink publishing into `ring`.
    pub fn local_queue(identity: SinkIdentity, ring: Arc<RingBuffer>) -> Self {
        Self::LocalQueue(LocalQueueSink::new(identity, ring))
    }

    /// Sink publishing through `publication`.
    pub fn network(identity: SinkIdentity, publication: Arc<dyn Publication>) -> Self {
        Self::Network(NetworkSink::new(identity, publication))
    }

    /// Placeholder carrying `identity`.
    pub fn placeholder(identity: SinkIdentity) -> Self {
        Self::Placeholder(PlaceholderSink::new(identity))
    }

    /// Placeholder for references that have no applicable destination.
    pub fn not_applicable() -> Self {
        Self::placeholder(SinkIdentity::not_applicable(NOT_APPLICABLE_SINK_NAME))
    }

    /// Sink that panics on every publish.
    pub fn forbidden() -> Self {
        Self::Forbidden(ForbiddenSink::new())
    }

    pub fn identity(&self) -> &SinkIdentity {
        match self {
            Self::LocalQueue(sink) => sink.identity(),
            Self::Network(sink) => sink.identity(),
            Self::Placeholder(sink) => sink.identity(),
            Self::Forbidden(sink) => sink.identity(),
        }
    }

    pub fn system_id(&self) -> i32 {
        self.identity().system_id
    }

    pub fn sink_id(&self) -> i32 {
        self.identity().sink_id
    }

    pub fn service_type(&self) -> ServiceType {
        self.identity().service_type
    }

    pub fn name(&self) -> &str {
        &self.identity().name
    }

    /// Whether this sink drops (or rejects) everything.
    pub fn is_inert(&self) -> bool {
        matches!(self, Self::Placeholder(_) | Self::Forbidden(_))
    }

    pub fn status(&self) -> SinkStatus {
        if self.is_inert() {
            SinkStatus::Down
        } else {
            SinkStatus::Up
        }
    }

    /// Remote endpoint of a network sink.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Network(sink) => Some(sink.publication().endpoint()),
            _ => None,
        }
    }

    /// Number of retries spent waiting on a full queue or transport buffer.
    pub fn back_pressure_intensity(&self) -> u64 {
        match self {
            Self::LocalQueue(sink) => sink.back_pressure_intensity(),
            Self::Network(sink) => sink.back_pressure_intensity(),
            Self::Placeholder(_) | Self::Forbidden(_) => 0,
        }
    }

    /// Publish `buf`, retrying while the destination is back-pressured.
    ///
    /// # Panics
    ///
    /// Panics on the forbidden sink.
    pub fn publish(&self, buf: &[u8]) -> PublishResult {
        match self {
            Self::LocalQueue(sink) => sink.publish(buf),
            Self::Network(sink) => sink.publish(buf),
            Self::Placeholder(sink) => sink.publish(buf),
            Self::Forbidden(sink) => sink.reject("publish"),
        }
    }

    /// Publish `buf` in a single attempt.
    ///
    /// # Panics
    ///
    /// Panics on the forbidden sink.
    pub fn try_publish(&self, buf: &[u8]) -> PublishResult {
        match self {
            Self::LocalQueue(sink) => sink.try_publish(buf),
            Self::Network(sink) => sink.try_publish(buf),
            Self::Placeholder(sink) => sink.publish(buf),
            Self::Forbidden(sink) => sink.reject("try_publish"),
        }
    }

    /// Reserve `len` bytes for direct writing. Never retries.
    ///
    /// On `Ok`, the caller must call [`SinkBufferClaim::commit`] exactly once.
    ///
    /// # Panics
    ///
    /// Panics on the forbidden sink.
    pub fn try_claim(&self, len: usize, claim: &mut SinkBufferClaim) -> PublishResult {
        match self {
            Self::LocalQueue(sink) => sink.try_claim(len, claim),
            Self::Network(sink) => sink.try_claim(len, claim),
            Self::Placeholder(sink) => sink.try_claim(len, claim),
            Self::Forbidden(sink) => sink.reject("try_claim"),
        }
    }

    /// New sink sharing this sink's transport under another identity.
    pub fn with_identity(&self, identity: SinkIdentity) -> Result<Self> {
        match self {
            Self::LocalQueue(sink) => Ok(Self::LocalQueue(sink.with_identity(identity))),
            Self::Network(sink) => Ok(Self::Network(sink.with_identity(identity))),
            Self::Placeholder(_) => Ok(Self::placeholder(identity)),
            Self::Forbidden(sink) => Err(MessagingError::UnsupportedClone {
                name: sink.identity().name.clone(),
            }),
        }
    }

    /// Whether both sinks write into the same ring or publication.
    pub fn shares_transport_with(&self, other: &MessageSink) -> bool {
        match (self, other) {
            (Self::LocalQueue(a), Self::LocalQueue(b)) => Arc::ptr_eq(a.ring(), b.ring()),
            (Self::Network(a), Self::Network(b)) => std::ptr::addr_eq(
                Arc::as_ptr(a.publication()),
                Arc::as_ptr(b.publication()),
            ),
            _ => false,
        }
    }

    /// Toggle the drop warning of a placeholder. Returns whether this is one.
    pub fn set_placeholder_warning(&self, enabled: bool) -> bool {
        match self {
            Self::Placeholder(sink) => {
                sink.set_warning(enabled);
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for MessageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self.identity(), f)
    }
}
