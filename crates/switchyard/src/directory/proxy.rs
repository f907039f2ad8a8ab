use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::info;

use super::{Directory, Role, SinkDirectory, SinkRefList};
use crate::error::Result;
use crate::reference::SinkRef;
use crate::sink::MessageSink;

/// Switches callers between the normal directory and a lazily built warmup
/// directory.
///
/// Every forwarded call reads the current directory afresh, so a switch is
/// visible to the next lookup on any thread.
pub struct DirectoryProxy {
    self_sink_id: i32,
    normal: Arc<Directory>,
    warmup: Mutex<Option<Arc<Directory>>>,
    current: ArcSwap<Directory>,
}

impl DirectoryProxy {
    /// Proxy starting on `normal`, for the service owning `self_sink_id`.
    pub fn new(self_sink_id: i32, normal: Arc<Directory>) -> Self {
        Self {
            self_sink_id,
            current: ArcSwap::new(Arc::clone(&normal)),
            normal,
            warmup: Mutex::new(None),
        }
    }

    /// Directory currently answering lookups.
    pub fn current(&self) -> Arc<Directory> {
        self.current.load_full()
    }

    pub fn normal(&self) -> &Arc<Directory> {
        &self.normal
    }

    /// Whether lookups currently go to the warmup directory.
    pub fn is_warmup(&self) -> bool {
        !Arc::ptr_eq(&self.current.load(), &self.normal)
    }

    /// Route lookups to the warmup directory, building it on first use from
    /// the normal directory's warmup role.
    pub fn use_warmup(&self) -> Result<Arc<Directory>> {
        info!(self_sink_id = self.self_sink_id, "Switching to warmup directory");
        let mut warmup = self.warmup.lock();
        let directory = match warmup.as_ref() {
            Some(directory) => Arc::clone(directory),
            None => {
                let directory = Arc::new(
                    self.normal
                        .create_warmup(self.self_sink_id, &self.normal.warmup())?,
                );
                *warmup = Some(Arc::clone(&directory));
                directory
            }
        };
        self.current.store(Arc::clone(&directory));
        Ok(directory)
    }

    /// Route lookups back to the normal directory.
    pub fn use_normal(&self) -> Arc<Directory> {
        info!(self_sink_id = self.self_sink_id, "Switching to normal directory");
        self.current.store(Arc::clone(&self.normal));
        Arc::clone(&self.normal)
    }
}

impl SinkDirectory for DirectoryProxy {
    fn id(&self) -> u64 {
        self.current.load().id()
    }

    fn system_id(&self) -> i32 {
        self.current.load().system_id()
    }

    fn capacity(&self) -> usize {
        self.current.load().capacity()
    }

    fn modify_time(&self) -> u64 {
        self.current.load().modify_time()
    }

    fn get(&self, sink_id: i32) -> Option<Arc<SinkRef>> {
        self.current.load().get(sink_id)
    }

    fn sinks(&self) -> Vec<Arc<SinkRef>> {
        self.current.load().sinks()
    }

    fn role(&self, role: Role) -> Arc<SinkRef> {
        self.current.load().role(role)
    }

    fn strategies(&self) -> SinkRefList {
        self.current.load().strategies()
    }

    fn local_sinks(&self) -> SinkRefList {
        self.current.load().local_sinks()
    }

    fn remote_sinks(&self) -> SinkRefList {
        self.current.load().remote_sinks()
    }

    fn remote_admins(&self) -> SinkRefList {
        self.current.load().remote_admins()
    }

    fn get_by_endpoint(&self, endpoint: &str) -> Option<Arc<SinkRef>> {
        self.current.load().get_by_endpoint(endpoint)
    }

    fn register(&self, sink: Arc<MessageSink>) -> Result<Arc<SinkRef>> {
        self.current.load().register(sink)
    }

    fn deactivate(&self, reference: &SinkRef) -> Result<Arc<SinkRef>> {
        self.current.load().deactivate(reference)
    }

    fn deactivate_by_system(&self, system_id: i32) -> usize {
        self.current.load().deactivate_by_system(system_id)
    }

    fn register_dead_letters(&self, reference: &SinkRef) -> Result<Arc<SinkRef>> {
        self.current.load().register_dead_letters(reference)
    }
}

impl std::fmt::Debug for DirectoryProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryProxy")
            .field("self_sink_id", &self.self_sink_id)
            .field("warmup", &self.is_warmup())
            .field("current", &self.current.load().id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RingBuffer;
    use crate::types::ServiceType;

    fn ring() -> Arc<RingBuffer> {
        Arc::new(RingBuffer::new(4, 32).unwrap())
    }

    #[test]
    fn test_switching_modes() {
        let normal = Arc::new(Directory::new(1, 8).unwrap());
        normal
            .create_and_register_local_queue_sink(2, ServiceType::Pricing, "pricing", ring())
            .unwrap();
        normal
            .create_and_register_local_queue_sink(7, ServiceType::Warmup, "warmup", ring())
            .unwrap();

        let proxy = DirectoryProxy::new(0, Arc::clone(&normal));
        assert!(!proxy.is_warmup());
        assert_eq!(proxy.id(), normal.id());

        let warmup = proxy.use_warmup().unwrap();
        assert!(proxy.is_warmup());
        assert_eq!(proxy.id(), warmup.id());
        assert!(proxy
            .pricing()
            .sink()
            .shares_transport_with(&normal.warmup().sink()));

        // The warmup directory is built once.
        let again = proxy.use_warmup().unwrap();
        assert!(Arc::ptr_eq(&warmup, &again));

        proxy.use_normal();
        assert!(!proxy.is_warmup());
        assert!(Arc::ptr_eq(&proxy.pricing().sink(), &normal.pricing().sink()));
    }

    #[test]
    fn test_proxy_as_trait_object() {
        let normal = Arc::new(Directory::new(1, 8).unwrap());
        let directory: Arc<dyn SinkDirectory> = Arc::new(DirectoryProxy::new(0, normal));
        directory
            .create_and_register_local_queue_sink(3, ServiceType::Notification, "notify", ring())
            .unwrap();
        assert_eq!(directory.notification().sink_id(), 3);
        assert_eq!(directory.local_sinks().len(), 1);
    }
}
