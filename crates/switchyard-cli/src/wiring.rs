// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2025 Switchyard Contributors

//! Builds a live directory from a topology.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use switchyard::{
    Directory, QueueReader, RingBuffer, SinkDirectory, SinkRef, UdpPublication,
};
use tracing::{debug, info};

use crate::config::{Topology, TransportKind};

/// A populated directory plus the consumer ends of its local queues.
pub struct Wiring {
    pub directory: Arc<Directory>,
    pub readers: BTreeMap<i32, QueueReader>,
}

impl Wiring {
    /// Reference for `sink_id`, or an error naming the directory capacity.
    pub fn sink(&self, sink_id: i32) -> Result<Arc<SinkRef>> {
        self.directory.get(sink_id).with_context(|| {
            format!(
                "sink id {sink_id} is outside the directory (capacity {})",
                self.directory.capacity()
            )
        })
    }
}

/// Register every sink the topology declares.
///
/// Local sinks get their own ring buffer; UDP sinks connect from the
/// configured bind address; `none` leaves the slot as a placeholder.
pub async fn build(topology: &Topology) -> Result<Wiring> {
    let directory = Arc::new(
        Directory::new(topology.system.id, topology.system.capacity)
            .context("failed to create directory")?,
    );
    let bind: SocketAddr = topology.bind_addr()?;
    let mut readers = BTreeMap::new();

    for sink in &topology.sinks {
        let name = sink.display_name();
        match sink.transport {
            TransportKind::Local => {
                let ring = Arc::new(RingBuffer::new(
                    topology.queue.slots,
                    topology.queue.slot_size,
                )?);
                readers.insert(sink.sink_id, ring.reader()?);
                directory
                    .create_and_register_local_queue_sink(
                        sink.sink_id,
                        sink.service_type,
                        name,
                        ring,
                    )
                    .with_context(|| format!("failed to register local sink {}", sink.sink_id))?;
            }
            TransportKind::Udp => {
                let endpoint = sink
                    .endpoint
                    .as_deref()
                    .with_context(|| format!("udp sink {} has no endpoint", sink.sink_id))?;
                let remote: SocketAddr = endpoint
                    .parse()
                    .with_context(|| format!("invalid endpoint {endpoint}"))?;
                let publication =
                    UdpPublication::connect(bind, remote, topology.network.max_datagram_size)
                        .await
                        .with_context(|| format!("failed to connect to {remote}"))?;
                directory
                    .create_and_register_network_sink(
                        sink.system_id_or(topology.system.id),
                        sink.sink_id,
                        sink.service_type,
                        name,
                        Arc::new(publication),
                    )
                    .with_context(|| format!("failed to register udp sink {}", sink.sink_id))?;
            }
            TransportKind::Unwired => {
                debug!(sink_id = sink.sink_id, "Leaving slot as placeholder");
            }
        }
    }

    info!(
        system_id = topology.system.id,
        system = %topology.system.name,
        registered = directory.registered_count(),
        local_queues = readers.len(),
        "Topology wired"
    );

    Ok(Wiring { directory, readers })
}
