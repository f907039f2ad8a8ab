use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::claim::SinkBufferClaim;
use crate::transport::{DiscardPublication, Publication};
use crate::types::{PublishResult, SinkIdentity};

/// Name of the forbidden sink.
pub const FORBIDDEN_SINK_NAME: &str = "null-message-sink";

/// Name of the shared not-applicable placeholder.
pub const NOT_APPLICABLE_SINK_NAME: &str = "na-message-sink";

fn discard() -> &'static Arc<dyn Publication> {
    static DISCARD: OnceLock<Arc<dyn Publication>> = OnceLock::new();
    DISCARD.get_or_init(|| Arc::new(DiscardPublication))
}

/// Stand-in for a destination that is not (or no longer) available.
///
/// Accepts and drops every message, warning unless the warning is disabled.
#[derive(Debug)]
pub struct PlaceholderSink {
    identity: SinkIdentity,
    warn_on_publish: AtomicBool,
}

impl PlaceholderSink {
    pub fn new(identity: SinkIdentity) -> Self {
        Self {
            identity,
            warn_on_publish: AtomicBool::new(true),
        }
    }

    pub fn identity(&self) -> &SinkIdentity {
        &self.identity
    }

    pub fn set_warning(&self, enabled: bool) {
        self.warn_on_publish.store(enabled, Ordering::Relaxed);
    }

    pub fn warning_enabled(&self) -> bool {
        self.warn_on_publish.load(Ordering::Relaxed)
    }

    pub fn publish(&self, buf: &[u8]) -> PublishResult {
        self.warn_dropped(buf.len());
        PublishResult::Ok
    }

    pub fn try_claim(&self, len: usize, claim: &mut SinkBufferClaim) -> PublishResult {
        self.warn_dropped(len);
        claim.claim_network(discard(), len)
    }

    fn warn_dropped(&self, len: usize) {
        if self.warning_enabled() {
            warn!(
                sink = %self.identity,
                len,
                "Publishing to placeholder sink, message dropped"
            );
        }
    }
}

/// Sink that must never be published to.
///
/// Stands in for "no sink at all"; reaching it through a publish is a wiring
/// bug.
#[derive(Debug)]
pub struct ForbiddenSink {
    identity: SinkIdentity,
}

impl ForbiddenSink {
    pub fn new() -> Self {
        Self {
            identity: SinkIdentity::not_applicable(FORBIDDEN_SINK_NAME),
        }
    }

    pub fn identity(&self) -> &SinkIdentity {
        &self.identity
    }

    /// # Panics
    ///
    /// Always.
    pub fn reject(&self, operation: &str) -> ! {
        panic!("{operation} called on {FORBIDDEN_SINK_NAME}; the sink reference was never bound")
    }
}

impl Default for ForbiddenSink {
    fn default() -> Self {
        Self::new()
    }
}
