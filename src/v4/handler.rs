//! DHCPv4 state machine implementation
//!
//! This module implements the DHCPv4 client state machine that handles
//! the complete DORA (Discover, Offer, Request, Acknowledge) process.
//! Every outgoing message is derived from its predecessor with the
//! builders in [`super::message`].

use super::message::{new_discovery, new_request_from_offer};
use super::packet::Message;
use super::types::{MessageType, TransactionId};
use crate::{
    client::{Action, DhcpStateMachine, Event},
    error::ClientError,
};
use bytes::Bytes;

#[derive(Debug, PartialEq, Clone, Copy)]
enum DhcpV4State {
    Init,
    Selecting,
    Requesting,
    Bound,
}

pub struct DhcpV4Handler {
    state: DhcpV4State,
    mac_address: Bytes,
    initial: Option<Message>,
    xid: TransactionId,
    last_sent: Option<Vec<u8>>,
    retries: u32,
    attempts: u32,
    conversation: Vec<Message>,
}

impl DhcpV4Handler {
    pub fn new(mac_address: Bytes, retries: u32) -> Self {
        Self {
            state: DhcpV4State::Init,
            mac_address,
            initial: None,
            xid: TransactionId::default(),
            last_sent: None,
            retries,
            attempts: 0,
            conversation: Vec::new(),
        }
    }

    /// Starts the exchange with `discover` instead of a default DISCOVER.
    pub fn with_initial(discover: Message, retries: u32) -> Self {
        let mac_address = Bytes::copy_from_slice(discover.chaddr());
        Self {
            initial: Some(discover),
            ..Self::new(mac_address, retries)
        }
    }

    fn send(&mut self, msg: Message) -> Action {
        let packet = msg.to_padded_bytes();
        tracing::info!("Sending {msg}");
        self.conversation.push(msg);
        self.last_sent = Some(packet.clone());
        self.attempts = 0;
        Action::Send(packet)
    }

    fn handle_init(&mut self) -> Result<Action, ClientError> {
        let discover = match self.initial.take() {
            Some(msg) => msg,
            None => new_discovery(&self.mac_address)?,
        };
        self.xid = discover.xid();
        self.state = DhcpV4State::Selecting;
        Ok(self.send(discover))
    }

    /// Decodes `data` if it answers our transaction, `None` otherwise.
    fn decode_ours(&self, data: &[u8]) -> Option<Message> {
        tracing::debug!("Received packet in {:?} state, length: {}", self.state, data.len());
        let msg = match Message::from_bytes(data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Failed to decode DHCP message: {}", e);
                return None;
            }
        };
        if msg.xid() != self.xid {
            tracing::debug!(
                "XID mismatch (got {}, ours {}), ignoring packet",
                msg.xid(),
                self.xid
            );
            return None;
        }
        Some(msg)
    }

    fn handle_selecting(&mut self, data: &[u8]) -> Result<Action, ClientError> {
        let Some(offer) = self.decode_ours(data) else {
            return Ok(Action::Wait);
        };
        if offer.message_type() != Some(MessageType::Offer) {
            tracing::debug!("Not a DHCP OFFER message: {:?}", offer.message_type());
            return Ok(Action::Wait);
        }

        tracing::info!(
            "Received DHCP OFFER from server, offered IP: {}",
            offer.yiaddr()
        );
        let request = new_request_from_offer(&offer);
        self.conversation.push(offer);
        let request = request?;
        self.state = DhcpV4State::Requesting;
        tracing::info!("Transitioning to Requesting state");
        Ok(self.send(request))
    }

    fn handle_requesting(&mut self, data: &[u8]) -> Result<Action, ClientError> {
        let Some(reply) = self.decode_ours(data) else {
            return Ok(Action::Wait);
        };
        match reply.message_type() {
            Some(MessageType::Ack) => {
                tracing::info!("Received DHCP ACK, leased {}", reply.yiaddr());
                self.conversation.push(reply);
                self.state = DhcpV4State::Bound;
                Ok(Action::Done)
            }
            Some(MessageType::Nak) => {
                tracing::warn!("Received DHCP NAK");
                self.conversation.push(reply);
                Err(ClientError::Nak)
            }
            // Not the message we're looking for, keep waiting
            _ => Ok(Action::Wait),
        }
    }

    fn handle_timeout(&mut self, waited: std::time::Duration) -> Result<Action, ClientError> {
        match &self.last_sent {
            Some(packet) if self.attempts < self.retries => {
                self.attempts += 1;
                tracing::warn!(
                    "Timeout in {} state, retransmitting (attempt {}/{})",
                    self.state_name(),
                    self.attempts,
                    self.retries
                );
                Ok(Action::Send(packet.clone()))
            }
            _ => Err(ClientError::Timeout(waited)),
        }
    }
}

impl DhcpStateMachine for DhcpV4Handler {
    type Message = Message;

    fn state_name(&self) -> &'static str {
        match self.state {
            DhcpV4State::Init => "Init",
            DhcpV4State::Selecting => "Selecting",
            DhcpV4State::Requesting => "Requesting",
            DhcpV4State::Bound => "Bound",
        }
    }

    fn handle_event(&mut self, event: Event<'_>) -> Result<Action, ClientError> {
        tracing::debug!("Handling event {:?} in state {:?}", event, self.state);
        match (self.state, event) {
            (DhcpV4State::Bound, _) => Ok(Action::Done),
            (DhcpV4State::Init, _) => self.handle_init(),
            (_, Event::Timeout(waited)) => self.handle_timeout(waited),
            (DhcpV4State::Selecting, Event::PacketReceived(data)) => self.handle_selecting(data),
            (DhcpV4State::Requesting, Event::PacketReceived(data)) => {
                self.handle_requesting(data)
            }
            (_, Event::Start) => Ok(Action::Wait),
        }
    }

    fn take_conversation(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.conversation)
    }
}
