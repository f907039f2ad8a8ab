use tokio::sync::mpsc;

use super::{OfferOutcome, Publication, Reservation};

/// Publication over an in-process bounded channel.
///
/// Used for loopback wiring between directories in one process and for
/// exercising network sinks without sockets.
#[derive(Debug)]
pub struct ChannelPublication {
    endpoint: String,
    sender: mpsc::Sender<Vec<u8>>,
    max_message_length: usize,
}

impl ChannelPublication {
    /// Create a publication and the receiving end of its channel.
    pub fn new(
        endpoint: impl Into<String>,
        capacity: usize,
        max_message_length: usize,
    ) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                endpoint: endpoint.into(),
                sender,
                max_message_length,
            },
            receiver,
        )
    }
}

impl Publication for ChannelPublication {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    fn offer(&self, buf: &[u8]) -> OfferOutcome {
        if buf.len() > self.max_message_length {
            return OfferOutcome::MaxLengthExceeded;
        }
        match self.sender.try_send(buf.to_vec()) {
            Ok(()) => OfferOutcome::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => OfferOutcome::BackPressured,
            Err(mpsc::error::TrySendError::Closed(_)) => OfferOutcome::NotConnected,
        }
    }

    /// Takes a channel permit, so the commit that follows cannot be
    /// back-pressured by other producers.
    fn try_claim(&self, len: usize) -> Result<Reservation, OfferOutcome> {
        if len > self.max_message_length {
            return Err(OfferOutcome::MaxLengthExceeded);
        }
        match self.sender.clone().try_reserve_owned() {
            Ok(permit) => Ok(Reservation::Channel(permit)),
            Err(mpsc::error::TrySendError::Full(_)) => Err(OfferOutcome::BackPressured),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(OfferOutcome::NotConnected),
        }
    }
}
