//! DHCPv6 state machine implementation
//!
//! Runs SOLICIT, ADVERTISE, REQUEST, REPLY. When the SOLICIT carries Rapid
//! Commit and the server answers it directly with a REPLY, the exchange
//! ends after two messages.

use super::message::{new_request_from_advertise, new_solicit};
use super::option::DhcpOption;
use super::packet::Message;
use super::types::{MessageType, TransactionId};
use crate::{
    client::{Action, DhcpStateMachine, Event},
    error::ClientError,
};
use bytes::Bytes;
use std::time::Duration;

#[derive(Debug, PartialEq, Clone, Copy)]
enum DhcpV6State {
    Init,
    Soliciting,
    Requesting,
    Bound,
}

pub struct DhcpV6Handler {
    state: DhcpV6State,
    mac_address: Bytes,
    initial: Option<Message>,
    rapid_commit: bool,
    xid: TransactionId,
    last_sent: Option<Vec<u8>>,
    retries: u32,
    attempts: u32,
    conversation: Vec<Message>,
}

impl DhcpV6Handler {
    pub fn new(mac_address: Bytes, retries: u32) -> Self {
        Self {
            state: DhcpV6State::Init,
            mac_address,
            initial: None,
            rapid_commit: false,
            xid: TransactionId::default(),
            last_sent: None,
            retries,
            attempts: 0,
            conversation: Vec::new(),
        }
    }

    /// Starts the exchange with `solicit` instead of a default SOLICIT.
    pub fn with_initial(solicit: Message, retries: u32) -> Self {
        Self {
            rapid_commit: solicit.is_rapid_commit(),
            initial: Some(solicit),
            ..Self::new(Bytes::new(), retries)
        }
    }

    /// Asks the server for a two-message exchange.
    pub fn with_rapid_commit(mut self) -> Self {
        self.rapid_commit = true;
        self
    }

    fn send(&mut self, msg: Message) -> Action {
        let packet = msg.to_bytes();
        tracing::info!("Sending {msg}");
        self.xid = msg.xid();
        self.conversation.push(msg);
        self.last_sent = Some(packet.clone());
        self.attempts = 0;
        Action::Send(packet)
    }

    fn handle_init(&mut self) -> Result<Action, ClientError> {
        let mut solicit = match self.initial.take() {
            Some(msg) => msg,
            None => new_solicit(&self.mac_address)?,
        };
        if self.rapid_commit && !solicit.is_rapid_commit() {
            solicit.opts_mut().add(DhcpOption::RapidCommit);
        }
        self.state = DhcpV6State::Soliciting;
        Ok(self.send(solicit))
    }

    /// Decodes `data` if it answers our transaction, `None` otherwise.
    fn decode_ours(&self, data: &[u8]) -> Option<Message> {
        tracing::debug!("Received packet in {:?} state, length: {}", self.state, data.len());
        let msg = match Message::from_bytes(data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Failed to decode DHCPv6 message: {}", e);
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

    /// Accepts a REPLY unless it carries a failure status.
    fn finish(&mut self, reply: Message) -> Result<Action, ClientError> {
        let status = reply.status().filter(|s| !s.is_success()).cloned();
        self.conversation.push(reply);
        if let Some(status) = status {
            tracing::warn!("Server returned {}", status);
            return Err(ClientError::ServerStatus(status.to_string()));
        }
        self.state = DhcpV6State::Bound;
        tracing::info!("Received DHCPv6 REPLY, exchange complete");
        Ok(Action::Done)
    }

    fn handle_soliciting(&mut self, data: &[u8]) -> Result<Action, ClientError> {
        let Some(msg) = self.decode_ours(data) else {
            return Ok(Action::Wait);
        };
        match msg.msg_type() {
            MessageType::Advertise => {
                tracing::info!("Received DHCPv6 ADVERTISE");
                let request = new_request_from_advertise(&msg);
                self.conversation.push(msg);
                let request = request?;
                self.state = DhcpV6State::Requesting;
                tracing::info!("Transitioning to Requesting state");
                Ok(self.send(request))
            }
            MessageType::Reply if self.rapid_commit && msg.is_rapid_commit() => {
                tracing::info!("Received rapid commit REPLY");
                self.finish(msg)
            }
            other => {
                tracing::debug!("Ignoring DHCPv6 {} while soliciting", other);
                Ok(Action::Wait)
            }
        }
    }

    fn handle_requesting(&mut self, data: &[u8]) -> Result<Action, ClientError> {
        let Some(msg) = self.decode_ours(data) else {
            return Ok(Action::Wait);
        };
        if msg.msg_type() != MessageType::Reply {
            tracing::debug!("Not a DHCPv6 REPLY message: {}", msg.msg_type());
            return Ok(Action::Wait);
        }
        self.finish(msg)
    }

    fn handle_timeout(&mut self, waited: Duration) -> Result<Action, ClientError> {
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

impl DhcpStateMachine for DhcpV6Handler {
    type Message = Message;

    fn state_name(&self) -> &'static str {
        match self.state {
            DhcpV6State::Init => "Init",
            DhcpV6State::Soliciting => "Soliciting",
            DhcpV6State::Requesting => "Requesting",
            DhcpV6State::Bound => "Bound",
        }
    }

    fn handle_event(&mut self, event: Event<'_>) -> Result<Action, ClientError> {
        tracing::debug!("Handling event {:?} in state {:?}", event, self.state);
        match (self.state, event) {
            (DhcpV6State::Bound, _) => Ok(Action::Done),
            (DhcpV6State::Init, _) => self.handle_init(),
            (_, Event::Timeout(waited)) => self.handle_timeout(waited),
            (DhcpV6State::Soliciting, Event::PacketReceived(data)) => {
                self.handle_soliciting(data)
            }
            (DhcpV6State::Requesting, Event::PacketReceived(data)) => {
                self.handle_requesting(data)
            }
            (_, Event::Start) => Ok(Action::Wait),
        }
    }

    fn take_conversation(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.conversation)
    }
}
