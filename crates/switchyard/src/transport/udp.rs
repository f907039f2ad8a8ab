use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use super::{OfferOutcome, Publication};
use crate::error::Result;

/// Publication over a connected UDP socket.
///
/// The socket is set up on the tokio runtime and then detached from it, so
/// offers are plain non-blocking sends that work from any thread without
/// waiting on reactor readiness. A full socket buffer reports back-pressure
/// and an ICMP-refused peer reports not-connected until it comes back.
#[derive(Debug)]
pub struct UdpPublication {
    socket: UdpSocket,
    endpoint: String,
    max_datagram_size: usize,
    closed: AtomicBool,
}

impl UdpPublication {
    /// Bind to `bind` and connect to `remote`.
    pub async fn connect(
        bind: SocketAddr,
        remote: SocketAddr,
        max_datagram_size: usize,
    ) -> Result<Self> {
        let socket = tokio::net::UdpSocket::bind(bind).await?;
        socket.connect(remote).await?;
        let socket = socket.into_std()?;
        socket.set_nonblocking(true)?;
        debug!(local = ?socket.local_addr().ok(), %remote, "UDP publication connected");

        Ok(Self {
            socket,
            endpoint: remote.to_string(),
            max_datagram_size,
            closed: AtomicBool::new(false),
        })
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Stop accepting offers.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn map_error(&self, err: io::Error) -> OfferOutcome {
        match err.kind() {
            io::ErrorKind::WouldBlock => OfferOutcome::BackPressured,
            io::ErrorKind::Interrupted => OfferOutcome::AdminAction,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable => OfferOutcome::NotConnected,
            _ => {
                warn!(endpoint = %self.endpoint, error = %err, "UDP send failed");
                OfferOutcome::Closed
            }
        }
    }
}

impl Publication for UdpPublication {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn max_message_length(&self) -> usize {
        self.max_datagram_size
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn offer(&self, buf: &[u8]) -> OfferOutcome {
        if self.closed.load(Ordering::Acquire) {
            return OfferOutcome::Closed;
        }
        if buf.len() > self.max_datagram_size {
            return OfferOutcome::MaxLengthExceeded;
        }
        match self.socket.send(buf) {
            Ok(_) => OfferOutcome::Accepted,
            Err(err) => self.map_error(err),
        }
    }
}
