use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{Directory, Role, SinkDirectory};
use crate::error::Result;
use crate::reference::SinkRef;
use crate::types::ServiceType;

impl Directory {
    /// Build a parallel directory that routes traffic to `warmup` instead of
    /// the real destinations.
    ///
    /// Every slot is rebound to a clone of the warmup sink carrying the slot's
    /// identity, except:
    /// - the slot of `self_sink_id`
    /// - warmup, dead-letter, performance and unset slots
    /// - admins of this system
    ///
    /// The admin role, the dead-letter role, the self slot and the warmup sink
    /// itself are then registered unchanged.
    #[instrument(skip(self, warmup), fields(directory = self.id(), warmup = %warmup))]
    pub fn create_warmup(&self, self_sink_id: i32, warmup: &SinkRef) -> Result<Directory> {
        let system_id = self.system_id();
        let directory = Directory::with_clock(system_id, self.capacity(), Arc::clone(self.clock()))?;
        let warmup_sink = warmup.sink();

        let mut redirected = 0;
        for slot in self.sinks() {
            let service_type = slot.service_type();
            let keep = slot.sink_id() == self_sink_id
                || service_type.is_null()
                || matches!(
                    service_type,
                    ServiceType::Warmup | ServiceType::DeadLetter | ServiceType::Performance
                )
                || (service_type == ServiceType::Admin && slot.system_id() == system_id);
            if keep {
                continue;
            }

            let clone = SinkRef::clone_with_sink(&slot, &warmup_sink)?;
            directory.register_ref(&clone)?;
            redirected += 1;
        }

        let self_slot = Arc::clone(self.slot(self_sink_id)?);
        let warmup_ref = Arc::new(SinkRef::new(warmup_sink, warmup.mnemonic()));
        for reference in [
            self.role(Role::Admin),
            self.role(Role::DeadLetter),
            self_slot,
            warmup_ref,
        ] {
            if reference.service_type().is_null() || self.get(reference.sink_id()).is_none() {
                debug!(sink = %reference, "Skipping unbound sink for warmup directory");
                continue;
            }
            directory.register_ref(&reference)?;
        }

        info!(
            warmup_directory = directory.id(),
            redirected, "Created warmup directory"
        );
        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RingBuffer;
    use crate::types::SinkStatus;

    fn ring() -> Arc<RingBuffer> {
        Arc::new(RingBuffer::new(4, 32).unwrap())
    }

    #[test]
    fn test_warmup_redirects_peers_only() {
        let normal = Directory::new(1, 16).unwrap();
        normal
            .create_and_register_local_queue_sink(0, ServiceType::Admin, "admin", ring())
            .unwrap();
        normal
            .create_and_register_local_queue_sink(1, ServiceType::Strategy, "self", ring())
            .unwrap();
        let mds = normal
            .create_and_register_local_queue_sink(2, ServiceType::MarketData, "mds", ring())
            .unwrap();
        normal
            .create_and_register_local_queue_sink(3, ServiceType::Performance, "perf", ring())
            .unwrap();
        let warmup = normal
            .create_and_register_local_queue_sink(9, ServiceType::Warmup, "warmup", ring())
            .unwrap();

        let directory = normal.create_warmup(1, &warmup).unwrap();
        let warmup_sink = warmup.sink();

        let redirected = directory.get(2).unwrap();
        assert!(redirected.sink().shares_transport_with(&warmup_sink));
        assert_eq!(redirected.identity(), mds.identity());
        assert!(directory.market_data().sink().shares_transport_with(&warmup_sink));

        assert!(Arc::ptr_eq(&directory.get(0).unwrap().sink(), &normal.get(0).unwrap().sink()));
        assert!(Arc::ptr_eq(&directory.get(1).unwrap().sink(), &normal.get(1).unwrap().sink()));
        assert!(Arc::ptr_eq(&directory.warmup().sink(), &warmup_sink));
        assert_eq!(directory.admin().sink_id(), 0);

        // Performance is left unbound in warmup mode.
        assert_eq!(directory.get(3).unwrap().status(), SinkStatus::Down);
        assert_eq!(directory.get(3).unwrap().service_type(), ServiceType::Null);
        // Unset slots stay unset.
        assert_eq!(directory.get(5).unwrap().service_type(), ServiceType::Null);
    }

    #[test]
    fn test_warmup_with_unbound_warmup_role() {
        let normal = Directory::new(1, 4).unwrap();
        normal
            .create_and_register_local_queue_sink(2, ServiceType::Pricing, "pricing", ring())
            .unwrap();

        let directory = normal.create_warmup(0, &normal.warmup()).unwrap();
        assert!(directory.get(2).unwrap().is_inert());
        assert_eq!(directory.get(2).unwrap().service_type(), ServiceType::Pricing);
    }

    #[test]
    fn test_warmup_self_out_of_range() {
        let normal = Directory::new(1, 4).unwrap();
        assert!(normal.create_warmup(8, &normal.warmup()).is_err());
    }
}
