//! Sink directory for id- and role-based routing.
//!
//! The directory maps dense sink ids and well-known roles to stable
//! [`SinkRef`]s. Every slot always holds a reference, pre-filled with a
//! placeholder, so lookups by id never come back empty for an id inside the
//! directory's capacity.
//!
//! ## Architecture
//!
//! ```text
//!   admin thread                         service threads
//!        |                                      |
//!   register / deactivate                role() / get() / views
//!        |                                      |
//!        v                                      v
//!   Directory ---- slots: [Arc<SinkRef>; capacity] ---- SinkRef ---> MessageSink
//!        |         roles: [Arc<SinkRef>; Role::COUNT]      (ArcSwap)
//!        |         views: ArcSwap<Vec<Arc<SinkRef>>>
//!        v
//!   modify_time (advanced after every mutation)
//! ```
//!
//! Mutations come from one administrative thread and are additionally
//! serialized by a write lock. Readers never lock: views and the strategy
//! list are rebuilt and swapped whole, and each `SinkRef` swaps its sink
//! atomically.
//!
//! [`DirectoryProxy`] switches callers between the normal directory and a
//! warmup directory built by [`Directory::create_warmup`].

mod proxy;
mod registry;
mod role;
mod warmup;

use std::sync::Arc;

pub use proxy::DirectoryProxy;
pub use registry::Directory;
pub use role::Role;

use crate::error::Result;
use crate::queue::RingBuffer;
use crate::reference::SinkRef;
use crate::sink::MessageSink;
use crate::transport::Publication;
use crate::types::{ServiceType, SinkIdentity};

/// First id handed out to directories in this process.
pub const FIRST_DIRECTORY_ID: u64 = 5000;

/// Shared, swap-on-write list of references.
pub type SinkRefList = Arc<Vec<Arc<SinkRef>>>;

/// Routing directory interface shared by [`Directory`] and [`DirectoryProxy`].
pub trait SinkDirectory: Send + Sync {
    /// Process-unique directory id, for diagnostics.
    fn id(&self) -> u64;

    /// System that owns this directory.
    fn system_id(&self) -> i32;

    /// Number of sink slots.
    fn capacity(&self) -> usize;

    /// Monotonic timestamp of the last mutation.
    fn modify_time(&self) -> u64;

    /// Reference for `sink_id`; `None` only outside `[0, capacity)`.
    fn get(&self, sink_id: i32) -> Option<Arc<SinkRef>>;

    /// Every slot reference, indexed by sink id.
    fn sinks(&self) -> Vec<Arc<SinkRef>>;

    /// Reference for a singleton role.
    fn role(&self, role: Role) -> Arc<SinkRef>;

    /// Registered strategies.
    fn strategies(&self) -> SinkRefList;

    /// Non-admin sinks of this system.
    fn local_sinks(&self) -> SinkRefList;

    /// Non-admin sinks of other systems.
    fn remote_sinks(&self) -> SinkRefList;

    /// Admin sinks of other systems.
    fn remote_admins(&self) -> SinkRefList;

    /// Network sink registered for `endpoint`.
    fn get_by_endpoint(&self, endpoint: &str) -> Option<Arc<SinkRef>>;

    /// Bind `sink` into its slot and role, returning the slot reference.
    fn register(&self, sink: Arc<MessageSink>) -> Result<Arc<SinkRef>>;

    /// Bind the sink currently behind `reference`.
    fn register_ref(&self, reference: &SinkRef) -> Result<Arc<SinkRef>> {
        self.register(reference.sink())
    }

    /// Replace the sink behind `reference` with a same-identity placeholder.
    fn deactivate(&self, reference: &SinkRef) -> Result<Arc<SinkRef>>;

    /// Deactivate every live slot belonging to `system_id`. Returns the count.
    fn deactivate_by_system(&self, system_id: i32) -> usize;

    /// Bind the dead-letter role to the sink behind `reference`.
    fn register_dead_letters(&self, reference: &SinkRef) -> Result<Arc<SinkRef>>;

    /// Create a local-queue sink of this system and register it.
    fn create_and_register_local_queue_sink(
        &self,
        sink_id: i32,
        service_type: ServiceType,
        name: &str,
        ring: Arc<RingBuffer>,
    ) -> Result<Arc<SinkRef>> {
        let identity = SinkIdentity::new(self.system_id(), sink_id, service_type, name);
        self.register(Arc::new(MessageSink::local_queue(identity, ring)))
    }

    /// Create a network sink and register it, indexed by its endpoint.
    fn create_and_register_network_sink(
        &self,
        system_id: i32,
        sink_id: i32,
        service_type: ServiceType,
        name: &str,
        publication: Arc<dyn Publication>,
    ) -> Result<Arc<SinkRef>> {
        let identity = SinkIdentity::new(system_id, sink_id, service_type, name);
        self.register(Arc::new(MessageSink::network(identity, publication)))
    }

    fn admin(&self) -> Arc<SinkRef> {
        self.role(Role::Admin)
    }

    fn order_management(&self) -> Arc<SinkRef> {
        self.role(Role::OrderManagement)
    }

    fn ref_data(&self) -> Arc<SinkRef> {
        self.role(Role::RefData)
    }

    fn market_data(&self) -> Arc<SinkRef> {
        self.role(Role::MarketData)
    }

    fn market_data_snapshot(&self) -> Arc<SinkRef> {
        self.role(Role::MarketDataSnapshot)
    }

    fn performance(&self) -> Arc<SinkRef> {
        self.role(Role::Performance)
    }

    fn persist(&self) -> Arc<SinkRef> {
        self.role(Role::Persist)
    }

    fn dead_letters(&self) -> Arc<SinkRef> {
        self.role(Role::DeadLetter)
    }

    fn risk(&self) -> Arc<SinkRef> {
        self.role(Role::Risk)
    }

    fn order_and_trade_snapshot(&self) -> Arc<SinkRef> {
        self.role(Role::OrderAndTradeSnapshot)
    }

    fn warmup(&self) -> Arc<SinkRef> {
        self.role(Role::Warmup)
    }

    fn notification(&self) -> Arc<SinkRef> {
        self.role(Role::Notification)
    }

    fn pricing(&self) -> Arc<SinkRef> {
        self.role(Role::Pricing)
    }

    fn dashboard(&self) -> Arc<SinkRef> {
        self.role(Role::Dashboard)
    }

    fn dashboard_web(&self) -> Arc<SinkRef> {
        self.role(Role::DashboardWeb)
    }

    fn scoreboard(&self) -> Arc<SinkRef> {
        self.role(Role::ScoreBoard)
    }
}
