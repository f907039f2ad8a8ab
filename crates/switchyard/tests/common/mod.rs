//! Test utilities for directory and sink integration tests.
//!
//! Provides helpers for building rings, local and remote sinks, and
//! draining what a destination received.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use switchyard::{
    ChannelPublication, Directory, QueueReader, RingBuffer, ServiceType, SinkDirectory, SinkRef,
};
use tokio::sync::mpsc;

/// Default timeout for async test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default system id of the directory under test.
pub const LOCAL_SYSTEM: i32 = 1;

/// Ring with a single reader attached.
pub fn ring_with_reader(slots: usize, slot_size: usize) -> (Arc<RingBuffer>, QueueReader) {
    let ring = Arc::new(RingBuffer::new(slots, slot_size).unwrap());
    let reader = ring.reader().unwrap();
    (ring, reader)
}

/// Register a local-queue sink and return it with the reader of its ring.
pub fn register_local(
    directory: &dyn SinkDirectory,
    sink_id: i32,
    service_type: ServiceType,
) -> (Arc<SinkRef>, QueueReader) {
    let (ring, reader) = ring_with_reader(8, 128);
    let reference = directory
        .create_and_register_local_queue_sink(
            sink_id,
            service_type,
            &format!("{service_type}-{sink_id}"),
            ring,
        )
        .unwrap();
    (reference, reader)
}

/// Register a channel-backed network sink of another system.
pub fn register_remote(
    directory: &dyn SinkDirectory,
    system_id: i32,
    sink_id: i32,
    service_type: ServiceType,
) -> (Arc<SinkRef>, mpsc::Receiver<Vec<u8>>) {
    let (publication, receiver) =
        ChannelPublication::new(format!("mem://{system_id}/{sink_id}"), 16, 1024);
    let reference = directory
        .create_and_register_network_sink(
            system_id,
            sink_id,
            service_type,
            &format!("{service_type}-{system_id}-{sink_id}"),
            Arc::new(publication),
        )
        .unwrap();
    (reference, receiver)
}

/// Directory owned by [`LOCAL_SYSTEM`].
pub fn directory(capacity: usize) -> Directory {
    Directory::new(LOCAL_SYSTEM, capacity).unwrap()
}
