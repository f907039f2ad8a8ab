//! Stable sink references.
//!
//! A [`SinkRef`] is the handle services keep. It forwards every call to the
//! sink currently bound to it, so the directory can swap destinations
//! (reconnect, warmup, teardown) without invalidating handles held elsewhere.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use tracing::debug;

use crate::claim::SinkBufferClaim;
use crate::error::{MessagingError, Result};
use crate::sink::MessageSink;
use crate::types::{PublishResult, ServiceType, SinkIdentity, SinkStatus};

static NEXT_REF_ID: AtomicU64 = AtomicU64::new(0);

/// Swappable handle to a [`MessageSink`].
///
/// Equality and hashing consider only the bound sink's id.
#[derive(Debug)]
pub struct SinkRef {
    ref_id: u64,
    mnemonic: String,
    sink: ArcSwap<MessageSink>,
}

impl SinkRef {
    /// Reference bound to `sink`.
    pub fn new(sink: Arc<MessageSink>, mnemonic: impl Into<String>) -> Self {
        Self {
            ref_id: NEXT_REF_ID.fetch_add(1, Ordering::Relaxed),
            mnemonic: mnemonic.into(),
            sink: ArcSwap::new(sink),
        }
    }

    /// Reference bound to `sink`, named after it.
    pub fn of(sink: MessageSink) -> Self {
        let mnemonic = sink.name().to_string();
        Self::new(Arc::new(sink), mnemonic)
    }

    /// Reference bound to the forbidden sink.
    pub fn null() -> Self {
        Self::new(Arc::new(MessageSink::forbidden()), "null")
    }

    /// Shared reference for handles with no applicable destination.
    pub fn not_applicable() -> Arc<SinkRef> {
        static NOT_APPLICABLE: OnceLock<Arc<SinkRef>> = OnceLock::new();
        Arc::clone(NOT_APPLICABLE.get_or_init(|| {
            Arc::new(Self::new(Arc::new(MessageSink::not_applicable()), "na"))
        }))
    }

    /// Reference bound to a placeholder carrying `identity`.
    pub fn placeholder(identity: SinkIdentity, mnemonic: impl Into<String>) -> Self {
        Self::new(Arc::new(MessageSink::placeholder(identity)), mnemonic)
    }

    /// New reference with the identity of `identity_of` and the transport of
    /// `transport_of`.
    pub fn clone_with_sink(identity_of: &SinkRef, transport_of: &MessageSink) -> Result<Self> {
        let identity = identity_of.identity();
        let sink = transport_of.with_identity(identity)?;
        Ok(Self::new(Arc::new(sink), identity_of.mnemonic()))
    }

    /// Bind `sink` to this reference.
    ///
    /// Allowed when the current sink is unset (`ServiceType::Null`) or has the
    /// same service type as `sink`.
    pub fn rebind(&self, sink: Arc<MessageSink>) -> Result<&Self> {
        let current = self.sink.load();
        let current_type = current.service_type();
        if !current_type.is_null() && current_type != sink.service_type() {
            return Err(MessagingError::IncompatibleRebind {
                sink_id: current.sink_id(),
                current: current_type,
                requested: sink.service_type(),
            });
        }

        debug!(
            ref_id = self.ref_id,
            mnemonic = %self.mnemonic,
            from = %current,
            to = %sink,
            "Rebinding sink reference"
        );
        self.sink.store(sink);
        Ok(self)
    }

    pub fn ref_id(&self) -> u64 {
        self.ref_id
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Currently bound sink.
    pub fn sink(&self) -> Arc<MessageSink> {
        self.sink.load_full()
    }

    pub fn identity(&self) -> SinkIdentity {
        self.sink.load().identity().clone()
    }

    pub fn system_id(&self) -> i32 {
        self.sink.load().system_id()
    }

    pub fn sink_id(&self) -> i32 {
        self.sink.load().sink_id()
    }

    pub fn service_type(&self) -> ServiceType {
        self.sink.load().service_type()
    }

    pub fn name(&self) -> String {
        self.sink.load().name().to_string()
    }

    pub fn endpoint(&self) -> Option<String> {
        self.sink.load().endpoint().map(str::to_string)
    }

    pub fn status(&self) -> SinkStatus {
        self.sink.load().status()
    }

    pub fn is_inert(&self) -> bool {
        self.sink.load().is_inert()
    }

    pub fn back_pressure_intensity(&self) -> u64 {
        self.sink.load().back_pressure_intensity()
    }

    /// See [`MessageSink::publish`].
    pub fn publish(&self, buf: &[u8]) -> PublishResult {
        self.sink.load().publish(buf)
    }

    /// See [`MessageSink::try_publish`].
    pub fn try_publish(&self, buf: &[u8]) -> PublishResult {
        self.sink.load().try_publish(buf)
    }

    /// See [`MessageSink::try_claim`].
    pub fn try_claim(&self, len: usize, claim: &mut SinkBufferClaim) -> PublishResult {
        self.sink.load().try_claim(len, claim)
    }

    /// Silence the drop warning if the bound sink is a placeholder.
    /// Returns whether it is one.
    pub fn disable_placeholder_warning(&self) -> bool {
        self.sink.load().set_placeholder_warning(false)
    }

    /// Restore the drop warning if the bound sink is a placeholder.
    /// Returns whether it is one.
    pub fn enable_placeholder_warning(&self) -> bool {
        self.sink.load().set_placeholder_warning(true)
    }
}

impl PartialEq for SinkRef {
    fn eq(&self, other: &Self) -> bool {
        self.sink_id() == other.sink_id()
    }
}

impl Eq for SinkRef {}

impl Hash for SinkRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sink_id().hash(state);
    }
}

impl std::fmt::Display for SinkRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.mnemonic, self.sink.load())
    }
}
