//! # switchyard
//!
//! Location-transparent message sinks and the routing directory for a
//! low-latency service mesh.
//!
//! Every service addresses every other service the same way, whether the
//! destination lives in the same process (lock-free ring buffer) or in
//! another process or host (datagram publication). Destinations can be
//! rebound at runtime without invalidating the references held by callers.
//!
//! ## Architecture
//!
//! - **Sinks**: [`MessageSink`], a closed set of write endpoints (local
//!   queue, network, placeholder, forbidden) sharing one publish contract
//! - **Claims**: [`SinkBufferClaim`], two-phase zero-copy writes
//! - **References**: [`SinkRef`], stable handles over a swappable sink
//! - **Directory**: [`Directory`], id- and role-indexed references with
//!   local/remote views, plus the warmup variant and [`DirectoryProxy`]
//!
//! ```text
//! service --> SinkDirectory::role()/get() --> SinkRef --> MessageSink
//!                                                           |-- LocalQueue --> RingBuffer --> QueueReader
//!                                                           |-- Network ----> Publication (UDP / channel)
//!                                                           |-- Placeholder   (dropped, warns)
//!                                                           '-- Forbidden     (panics)
//! ```
//!
//! Transient conditions are [`PublishResult`] codes; wiring mistakes are
//! [`MessagingError`]s returned from registration.

pub mod claim;
pub mod clock;
pub mod directory;
pub mod metrics;
pub mod queue;
pub mod reference;
pub mod sink;
pub mod transport;

mod error;
mod types;

pub use claim::SinkBufferClaim;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use directory::{Directory, DirectoryProxy, Role, SinkDirectory, SinkRefList};
pub use error::{MessagingError, Result};
pub use queue::{QueueReader, RingBuffer};
pub use reference::SinkRef;
pub use sink::MessageSink;
pub use transport::{ChannelPublication, OfferOutcome, Publication, Reservation, UdpPublication};
pub use types::*;
