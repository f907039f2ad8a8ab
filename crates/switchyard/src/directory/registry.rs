use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{Role, SinkDirectory, SinkRefList, FIRST_DIRECTORY_ID};
use crate::clock::{Clock, MonotonicClock};
use crate::error::{MessagingError, Result};
use crate::metrics;
use crate::reference::SinkRef;
use crate::sink::MessageSink;
use crate::types::{ServiceType, SinkIdentity, NA_SINK_ID};

static NEXT_DIRECTORY_ID: AtomicU64 = AtomicU64::new(FIRST_DIRECTORY_ID);

/// Mnemonic of a slot that has never been registered.
const UNSET_MNEMONIC: &str = "null";

/// Fixed-capacity routing directory of one system.
pub struct Directory {
    id: u64,
    system_id: i32,
    clock: Arc<dyn Clock>,
    /// One reference per sink id; never replaced, only rebound.
    slots: Box<[Arc<SinkRef>]>,
    /// One reference per [`Role`], indexed by `Role::index`.
    roles: Box<[Arc<SinkRef>]>,
    strategies: ArcSwap<Vec<Arc<SinkRef>>>,
    local_sinks: ArcSwap<Vec<Arc<SinkRef>>>,
    remote_sinks: ArcSwap<Vec<Arc<SinkRef>>>,
    remote_admins: ArcSwap<Vec<Arc<SinkRef>>>,
    /// Network sinks by publication endpoint.
    endpoints: DashMap<String, Arc<SinkRef>>,
    modify_time: AtomicU64,
    write_lock: Mutex<()>,
}

impl Directory {
    /// Create a directory for `system_id` with `capacity` sink slots.
    pub fn new(system_id: i32, capacity: usize) -> Result<Self> {
        Self::with_clock(system_id, capacity, Arc::new(MonotonicClock::new()))
    }

    /// Create a directory stamping mutations with `clock`.
    pub fn with_clock(system_id: i32, capacity: usize, clock: Arc<dyn Clock>) -> Result<Self> {
        if capacity == 0 {
            return Err(MessagingError::config("directory capacity must be positive"));
        }
        if capacity > i32::MAX as usize {
            return Err(MessagingError::config(format!(
                "directory capacity {capacity} does not fit a sink id"
            )));
        }

        let id = NEXT_DIRECTORY_ID.fetch_add(1, Ordering::Relaxed);
        let slots = (0..capacity)
            .map(|sink_id| {
                Arc::new(SinkRef::placeholder(
                    SinkIdentity::new(system_id, sink_id as i32, ServiceType::Null, UNSET_MNEMONIC),
                    UNSET_MNEMONIC,
                ))
            })
            .collect();
        let roles = Role::ALL
            .into_iter()
            .map(|role| {
                Arc::new(SinkRef::placeholder(
                    SinkIdentity::new(system_id, NA_SINK_ID, role.service_type(), role.mnemonic()),
                    role.mnemonic(),
                ))
            })
            .collect();

        info!(directory = id, system_id, capacity, "Creating sink directory");
        let modify_time = clock.now_nanos();

        Ok(Self {
            id,
            system_id,
            clock,
            slots,
            roles,
            strategies: ArcSwap::from_pointee(Vec::new()),
            local_sinks: ArcSwap::from_pointee(Vec::new()),
            remote_sinks: ArcSwap::from_pointee(Vec::new()),
            remote_admins: ArcSwap::from_pointee(Vec::new()),
            endpoints: DashMap::new(),
            modify_time: AtomicU64::new(modify_time),
            write_lock: Mutex::new(()),
        })
    }

    pub(super) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Slot for `sink_id`, or the out-of-range error.
    pub(super) fn slot(&self, sink_id: i32) -> Result<&Arc<SinkRef>> {
        usize::try_from(sink_id)
            .ok()
            .and_then(|index| self.slots.get(index))
            .ok_or_else(|| MessagingError::sink_id_out_of_range(sink_id, self.slots.len()))
    }

    /// Number of slots backed by a live sink.
    pub fn registered_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_inert()).count()
    }

    fn register_locked(&self, sink: Arc<MessageSink>) -> Result<Arc<SinkRef>> {
        let slot = self.slot(sink.sink_id())?;
        slot.rebind(Arc::clone(&sink))?;

        let service_type = sink.service_type();
        let is_remote = sink.system_id() != self.system_id;
        match Role::for_service_type(service_type) {
            Some(Role::Admin) if is_remote => {}
            Some(role) => {
                self.roles[role.index()].rebind(Arc::clone(&sink))?;
            }
            None if service_type == ServiceType::Strategy => {
                if !upsert(&self.strategies, slot) {
                    debug!(sink = %sink, "Strategy sink already registered");
                }
            }
            None => {}
        }

        if !service_type.is_null() {
            let (target, others) = match (service_type == ServiceType::Admin, is_remote) {
                (true, true) => (
                    Some(&self.remote_admins),
                    [&self.local_sinks, &self.remote_sinks],
                ),
                (true, false) => (None, [&self.local_sinks, &self.remote_sinks]),
                (false, true) => (
                    Some(&self.remote_sinks),
                    [&self.local_sinks, &self.remote_admins],
                ),
                (false, false) => (
                    Some(&self.local_sinks),
                    [&self.remote_sinks, &self.remote_admins],
                ),
            };
            if let Some(view) = target {
                upsert(view, slot);
            }
            for view in others {
                remove(view, sink.sink_id());
            }
        }

        self.endpoints
            .retain(|_, reference| reference.sink_id() != sink.sink_id());
        if let Some(endpoint) = sink.endpoint() {
            self.endpoints.insert(endpoint.to_string(), Arc::clone(slot));
        }

        info!(sink = %sink, remote = is_remote, "Registered sink");
        metrics::record_directory_mutation("register", service_type);
        self.touch();
        Ok(Arc::clone(slot))
    }

    fn deactivate_locked(&self, identity: SinkIdentity) -> Result<Arc<SinkRef>> {
        let slot = self.slot(identity.sink_id)?;
        let placeholder = Arc::new(MessageSink::placeholder(identity.clone()));
        slot.rebind(Arc::clone(&placeholder))?;

        let is_remote = identity.system_id != self.system_id;
        match Role::for_service_type(identity.service_type) {
            Some(Role::Admin) if is_remote => {}
            Some(role) => {
                let role_ref = &self.roles[role.index()];
                if role_ref.sink_id() == identity.sink_id {
                    role_ref.rebind(placeholder)?;
                }
            }
            None if identity.service_type == ServiceType::Strategy => {
                if !remove(&self.strategies, identity.sink_id) {
                    warn!(sink = %identity, "Strategy sink to deactivate was not registered");
                }
            }
            None => {}
        }

        self.endpoints
            .retain(|_, reference| reference.sink_id() != identity.sink_id);

        info!(sink = %identity, "Deactivated sink");
        metrics::record_directory_mutation("deactivate", identity.service_type);
        self.touch();
        Ok(Arc::clone(slot))
    }

    /// Advance `modify_time` past its previous value. Callers hold the
    /// writer lock, so the load and store cannot interleave with another touch.
    fn touch(&self) {
        let previous = self.modify_time.load(Ordering::Acquire);
        let next = self.clock.now_nanos().max(previous + 1);
        self.modify_time.store(next, Ordering::Release);
        metrics::record_registered_count(self.registered_count() as i64, self.id);
    }
}

/// Replace the entry with the same sink id, or append. Returns whether the
/// reference was newly added.
fn upsert(view: &ArcSwap<Vec<Arc<SinkRef>>>, reference: &Arc<SinkRef>) -> bool {
    let current = view.load();
    let mut next = Vec::clone(&current);
    let added = match next.iter().position(|entry| entry.sink_id() == reference.sink_id()) {
        Some(index) => {
            next[index] = Arc::clone(reference);
            false
        }
        None => {
            next.push(Arc::clone(reference));
            true
        }
    };
    view.store(Arc::new(next));
    added
}

/// Drop the entry with `sink_id`. Returns whether one was present.
fn remove(view: &ArcSwap<Vec<Arc<SinkRef>>>, sink_id: i32) -> bool {
    let current = view.load();
    if !current.iter().any(|entry| entry.sink_id() == sink_id) {
        return false;
    }
    let next: Vec<Arc<SinkRef>> = current
        .iter()
        .filter(|entry| entry.sink_id() != sink_id)
        .cloned()
        .collect();
    view.store(Arc::new(next));
    true
}

impl SinkDirectory for Directory {
    fn id(&self) -> u64 {
        self.id
    }

    fn system_id(&self) -> i32 {
        self.system_id
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn modify_time(&self) -> u64 {
        self.modify_time.load(Ordering::Acquire)
    }

    fn get(&self, sink_id: i32) -> Option<Arc<SinkRef>> {
        self.slot(sink_id).ok().cloned()
    }

    fn sinks(&self) -> Vec<Arc<SinkRef>> {
        self.slots.to_vec()
    }

    fn role(&self, role: Role) -> Arc<SinkRef> {
        Arc::clone(&self.roles[role.index()])
    }

    fn strategies(&self) -> SinkRefList {
        self.strategies.load_full()
    }

    fn local_sinks(&self) -> SinkRefList {
        self.local_sinks.load_full()
    }

    fn remote_sinks(&self) -> SinkRefList {
        self.remote_sinks.load_full()
    }

    fn remote_admins(&self) -> SinkRefList {
        self.remote_admins.load_full()
    }

    fn get_by_endpoint(&self, endpoint: &str) -> Option<Arc<SinkRef>> {
        self.endpoints
            .get(endpoint)
            .map(|entry| Arc::clone(entry.value()))
    }

    #[instrument(skip(self, sink), fields(directory = self.id, sink_id = sink.sink_id()))]
    fn register(&self, sink: Arc<MessageSink>) -> Result<Arc<SinkRef>> {
        let _guard = self.write_lock.lock();
        self.register_locked(sink)
    }

    #[instrument(skip(self, reference), fields(directory = self.id, sink_id = reference.sink_id()))]
    fn deactivate(&self, reference: &SinkRef) -> Result<Arc<SinkRef>> {
        let _guard = self.write_lock.lock();
        self.deactivate_locked(reference.identity())
    }

    #[instrument(skip(self), fields(directory = self.id))]
    fn deactivate_by_system(&self, system_id: i32) -> usize {
        let _guard = self.write_lock.lock();
        info!(system_id, "Deactivating all sinks of system");

        let mut deactivated = 0;
        for slot in self.slots.iter() {
            if slot.is_inert() || slot.system_id() != system_id {
                continue;
            }
            match self.deactivate_locked(slot.identity()) {
                Ok(_) => deactivated += 1,
                Err(e) => warn!(sink = %slot, error = %e, "Failed to deactivate sink"),
            }
        }
        deactivated
    }

    fn register_dead_letters(&self, reference: &SinkRef) -> Result<Arc<SinkRef>> {
        let _guard = self.write_lock.lock();
        let dead_letters = &self.roles[Role::DeadLetter.index()];
        dead_letters.rebind(reference.sink())?;
        info!(sink = %reference, "Registered dead letter sink");
        metrics::record_directory_mutation("register", ServiceType::DeadLetter);
        self.touch();
        Ok(Arc::clone(dead_letters))
    }
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("id", &self.id)
            .field("system_id", &self.system_id)
            .field("capacity", &self.slots.len())
            .field("registered", &self.registered_count())
            .field("modify_time", &self.modify_time())
            .finish()
    }
}
