//! Two-phase claim/commit through stable references.

mod common;

use std::sync::Arc;

use common::{directory, register_local, register_remote, ring_with_reader};
use switchyard::{
    ChannelPublication, MessageSink, MessagingError, PublishResult, ServiceType,
    SinkBufferClaim, SinkDirectory, SinkIdentity,
};

#[test]
fn test_claim_on_exhausted_queue_is_insufficient_space() {
    let (ring, mut reader) = ring_with_reader(3, 128);
    let sink = MessageSink::local_queue(
        SinkIdentity::new(1, 2, ServiceType::Strategy, "strategy"),
        ring,
    );

    let mut outstanding: Vec<SinkBufferClaim> = (0..3).map(|_| SinkBufferClaim::new()).collect();
    for claim in outstanding.iter_mut() {
        assert_eq!(sink.try_claim(64, claim), PublishResult::Ok);
    }

    let mut claim = SinkBufferClaim::new();
    assert_eq!(sink.try_claim(64, &mut claim), PublishResult::InsufficientSpace);
    assert!(!claim.is_claimed());
    assert_matches::assert_matches!(claim.commit(), Err(MessagingError::NothingClaimed));

    for (n, claim) in outstanding.iter_mut().enumerate() {
        claim.buffer_mut()[0] = n as u8;
        assert_eq!(claim.commit().unwrap(), PublishResult::Ok);
    }
    let frames = reader.drain();
    assert_eq!(frames.len(), 3);
    for (n, frame) in frames.iter().enumerate() {
        assert_eq!(frame.len(), 64);
        assert_eq!(frame[0], n as u8);
    }
}

#[test]
fn test_commit_makes_region_visible_exactly_once() {
    let directory = directory(8);
    let (reference, mut reader) = register_local(&directory, 3, ServiceType::Persist);

    let mut claim = SinkBufferClaim::new();
    assert_eq!(reference.try_claim(4, &mut claim), PublishResult::Ok);
    claim.buffer_mut().copy_from_slice(b"save");
    assert!(reader.drain().is_empty());

    assert_eq!(claim.commit().unwrap(), PublishResult::Ok);
    assert!(claim.commit().is_err());
    assert_eq!(reader.drain(), vec![b"save".to_vec()]);
    assert!(reader.drain().is_empty());
}

#[test]
fn test_try_publish_leaves_no_partial_state() {
    let (ring, mut reader) = ring_with_reader(1, 8);
    let sink = MessageSink::local_queue(
        SinkIdentity::new(1, 2, ServiceType::Echo, "echo"),
        ring.clone(),
    );

    assert_eq!(sink.try_publish(b"first"), PublishResult::Ok);
    assert_eq!(sink.try_publish(b"second"), PublishResult::InsufficientSpace);
    assert_eq!(sink.try_publish(b"far too long"), PublishResult::LengthExceedsMessageSize);
    assert_eq!(reader.drain(), vec![b"first".to_vec()]);
    assert_eq!(ring.remaining_capacity(), 1);
}

#[test]
fn test_uncommitted_claim_stalls_later_frames_until_abort() {
    let directory = directory(8);
    let (reference, mut reader) = register_local(&directory, 3, ServiceType::Pricing);

    let mut claim = SinkBufferClaim::new();
    assert_eq!(reference.try_claim(8, &mut claim), PublishResult::Ok);
    assert_eq!(reference.publish(b"behind"), PublishResult::Ok);
    assert!(reader.drain().is_empty());

    claim.abort().unwrap();
    assert_eq!(reader.drain(), vec![Vec::new(), b"behind".to_vec()]);
}

#[tokio::test]
async fn test_network_claim_through_reference() {
    let directory = directory(8);
    let (reference, mut receiver) = register_remote(&directory, 2, 5, ServiceType::RefData);

    let mut claim = SinkBufferClaim::new();
    assert_eq!(reference.try_claim(3, &mut claim), PublishResult::Ok);
    claim.buffer_mut().copy_from_slice(b"ref");
    assert_eq!(claim.commit().unwrap(), PublishResult::Ok);
    assert_eq!(receiver.recv().await.unwrap(), b"ref".to_vec());
}

#[test]
fn test_network_claim_reserves_channel_capacity() {
    let (publication, mut receiver) = ChannelPublication::new("mem://2/7", 1, 64);
    let sink = MessageSink::network(
        SinkIdentity::new(2, 7, ServiceType::Strategy, "strategy"),
        Arc::new(publication),
    );

    let mut claim = SinkBufferClaim::new();
    assert_eq!(sink.try_claim(4, &mut claim), PublishResult::Ok);
    assert_eq!(sink.try_publish(b"othr"), PublishResult::InsufficientSpace);

    claim.buffer_mut().copy_from_slice(b"mine");
    assert_eq!(claim.commit().unwrap(), PublishResult::Ok);
    assert_eq!(receiver.try_recv().unwrap(), b"mine".to_vec());

    assert_eq!(sink.try_publish(b"othr"), PublishResult::Ok);
    assert_eq!(receiver.try_recv().unwrap(), b"othr".to_vec());
}

#[test]
fn test_aborted_network_claim_releases_capacity() {
    let (publication, mut receiver) = ChannelPublication::new("mem://2/8", 1, 64);
    let sink = MessageSink::network(
        SinkIdentity::new(2, 8, ServiceType::Echo, "echo"),
        Arc::new(publication),
    );

    let mut claim = SinkBufferClaim::new();
    assert_eq!(sink.try_claim(4, &mut claim), PublishResult::Ok);
    let mut second = SinkBufferClaim::new();
    assert_eq!(sink.try_claim(4, &mut second), PublishResult::InsufficientSpace);

    claim.abort().unwrap();
    assert!(receiver.try_recv().is_err());
    assert_eq!(sink.try_publish(b"next"), PublishResult::Ok);
    assert_eq!(receiver.try_recv().unwrap(), b"next".to_vec());
}
