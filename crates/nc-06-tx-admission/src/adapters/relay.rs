//! Relay adapter over an unbounded channel.
//!
//! The network side owns the receiver. Sending never blocks and needs no
//! runtime, so admission threads hand off without awaiting.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::ports::outbound::{EncodedNotarizationRequest, OutboundMessage, RelayError, RelaySink};

/// `RelaySink` that forwards every message to a channel.
#[derive(Debug, Clone)]
pub struct ChannelRelay {
    sender: UnboundedSender<OutboundMessage>,
}

impl ChannelRelay {
    /// Create a relay and the receiver the network layer drains.
    pub fn new() -> (Self, UnboundedReceiver<OutboundMessage>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, message: OutboundMessage) -> Result<(), RelayError> {
        self.sender
            .send(message)
            .map_err(|_| RelayError::ChannelClosed)
    }
}

impl RelaySink for ChannelRelay {
    fn relay_transactions(&self, blobs: Vec<Vec<u8>>) -> Result<(), RelayError> {
        trace!("[nc-06] relay {} transactions", blobs.len());
        self.send(OutboundMessage::Transactions(blobs))
    }

    fn relay_notarization_request(
        &self,
        request: EncodedNotarizationRequest,
    ) -> Result<(), RelayError> {
        self.send(OutboundMessage::NotarizationRequest(request))
    }

    fn relay_block(&self, block_blob: Vec<u8>, tx_blobs: Vec<Vec<u8>>) -> Result<(), RelayError> {
        self.send(OutboundMessage::Block {
            block_blob,
            tx_blobs,
        })
    }
}
