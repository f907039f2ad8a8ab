//! Network sinks over real publications.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::{directory, register_remote, DEFAULT_TIMEOUT};
use switchyard::{
    MessageSink, Publication, PublishResult, ServiceType, SinkBufferClaim, SinkDirectory,
    SinkIdentity, UdpPublication,
};
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn any_local() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

#[tokio::test]
async fn test_udp_sink_delivers_datagrams() {
    let receiver = UdpSocket::bind(any_local()).await.unwrap();
    let remote = receiver.local_addr().unwrap();
    let publication = UdpPublication::connect(any_local(), remote, 1400).await.unwrap();

    let directory = directory(8);
    let reference = directory
        .create_and_register_network_sink(
            2,
            3,
            ServiceType::PortfolioAndRisk,
            "risk",
            Arc::new(publication),
        )
        .unwrap();

    assert_eq!(reference.publish(b"position"), PublishResult::Ok);
    assert_eq!(reference.try_publish(b"limit"), PublishResult::Ok);

    let mut buf = [0u8; 64];
    let len = timeout(DEFAULT_TIMEOUT, receiver.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"position");
    let len = timeout(DEFAULT_TIMEOUT, receiver.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"limit");

    let found = directory.get_by_endpoint(&remote.to_string()).unwrap();
    assert!(Arc::ptr_eq(&found, &reference));
    assert_eq!(directory.remote_sinks().len(), 1);
}

#[tokio::test]
async fn test_udp_claim_commit() {
    let receiver = UdpSocket::bind(any_local()).await.unwrap();
    let publication = UdpPublication::connect(any_local(), receiver.local_addr().unwrap(), 1400)
        .await
        .unwrap();
    let sink = MessageSink::network(
        SinkIdentity::new(2, 1, ServiceType::Admin, "admin"),
        Arc::new(publication),
    );

    let mut claim = SinkBufferClaim::new();
    assert_eq!(sink.try_claim(5, &mut claim), PublishResult::Ok);
    claim.buffer_mut().copy_from_slice(b"hello");
    assert_eq!(claim.commit().unwrap(), PublishResult::Ok);

    let mut buf = [0u8; 16];
    let len = timeout(DEFAULT_TIMEOUT, receiver.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"hello");
}

#[tokio::test]
async fn test_udp_oversize_is_frame_size_error() {
    let receiver = UdpSocket::bind(any_local()).await.unwrap();
    let publication = UdpPublication::connect(any_local(), receiver.local_addr().unwrap(), 8)
        .await
        .unwrap();
    let sink = MessageSink::network(
        SinkIdentity::new(2, 1, ServiceType::Echo, "echo"),
        Arc::new(publication),
    );

    assert_eq!(sink.publish(&[0u8; 9]), PublishResult::LengthExceedsFrameSize);
    let mut claim = SinkBufferClaim::new();
    assert_eq!(
        sink.try_claim(9, &mut claim),
        PublishResult::LengthExceedsFrameSize
    );
    assert!(!claim.is_claimed());
}

#[tokio::test]
async fn test_closed_udp_publication_fails() {
    let receiver = UdpSocket::bind(any_local()).await.unwrap();
    let publication = Arc::new(
        UdpPublication::connect(any_local(), receiver.local_addr().unwrap(), 1400)
            .await
            .unwrap(),
    );
    let sink = MessageSink::network(
        SinkIdentity::new(2, 1, ServiceType::Echo, "echo"),
        publication.clone(),
    );

    publication.close();
    assert!(!publication.is_connected());
    assert_eq!(sink.publish(b"late"), PublishResult::Failure);
    assert_eq!(sink.try_publish(b"late"), PublishResult::Failure);
}

#[tokio::test]
async fn test_unreachable_udp_peer_reports_failure() {
    // Bind then drop to get a port with no listener.
    let remote = {
        let socket = UdpSocket::bind(any_local()).await.unwrap();
        socket.local_addr().unwrap()
    };
    let publication = UdpPublication::connect(any_local(), remote, 1400).await.unwrap();
    let sink = MessageSink::network(
        SinkIdentity::new(3, 2, ServiceType::MarketData, "mds"),
        Arc::new(publication),
    );

    let mut saw_failure = false;
    for _ in 0..50 {
        if sink.publish(b"ping") == PublishResult::Failure {
            saw_failure = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(saw_failure);
}

#[tokio::test]
async fn test_channel_sink_back_pressure_and_recovery() {
    let directory = directory(8);
    let (reference, mut receiver) = register_remote(&directory, 2, 4, ServiceType::Notification);

    for n in 0..16u8 {
        assert_eq!(reference.try_publish(&[n]), PublishResult::Ok);
    }
    assert_eq!(reference.try_publish(&[16]), PublishResult::InsufficientSpace);

    let drained = tokio::spawn(async move {
        let mut received = Vec::new();
        while received.len() < 17 {
            match timeout(DEFAULT_TIMEOUT, receiver.recv()).await {
                Ok(Some(message)) => received.push(message[0]),
                _ => break,
            }
        }
        received
    });

    let blocking = Arc::clone(&reference);
    let result = tokio::task::spawn_blocking(move || blocking.publish(&[16]))
        .await
        .unwrap();
    assert_eq!(result, PublishResult::Ok);

    let received = drained.await.unwrap();
    assert_eq!(received, (0..17u8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_dropped_channel_peer_is_failure() {
    let directory = directory(8);
    let (reference, receiver) = register_remote(&directory, 2, 4, ServiceType::Notification);
    drop(receiver);
    assert_eq!(reference.publish(b"gone"), PublishResult::Failure);
}
