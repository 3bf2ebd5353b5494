//! DHCPv6 client/server messages and relay agent messages.
//!
//! ```text
//! client/server: msg-type(1) transaction-id(3) options...
//! relay:         msg-type(1) hop-count(1) link-address(16) peer-address(16) options...
//! ```
//!
//! A relay message must carry exactly one Relay Message option. Its payload
//! stays serialized until [`RelayMessage::inner`] decodes it.

use super::duid::Duid;
use super::option::{status_of, DhcpOption, IaNa, StatusCodeOption};
use super::options::Options;
use super::types::{MessageType, OptionCode, TransactionId, HOP_COUNT_LIMIT};
use crate::cursor::Cursor;
use crate::error::DecodeError;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::Ipv6Addr;

pub const MESSAGE_HEADER_LEN: usize = 4;
pub const RELAY_HEADER_LEN: usize = 34;

/// A client/server DHCPv6 message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    msg_type: MessageType,
    xid: TransactionId,
    opts: Options,
}

impl Message {
    /// A message of `msg_type` with a fresh transaction ID and no options.
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            xid: TransactionId::random(),
            opts: Options::new(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MESSAGE_HEADER_LEN {
            return Err(DecodeError::PacketTooShort {
                needed: MESSAGE_HEADER_LEN,
                length: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let msg_type = MessageType::from(cursor.read_u8());
        if msg_type.is_relay() {
            return Err(DecodeError::value(
                "message type",
                format!("{msg_type} is a relay message"),
            ));
        }
        let xid = TransactionId(cursor.array::<3>().unwrap_or_default());
        cursor.error()?;
        let opts = Options::from_bytes(cursor.read_all())?;
        Ok(Self {
            msg_type,
            xid,
            opts,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.len());
        buf.put_u8(u8::from(self.msg_type));
        buf.put_slice(&self.xid.0);
        self.opts.write_to(&mut buf);
        buf.to_vec()
    }

    /// Serialized length in bytes.
    pub fn len(&self) -> usize {
        MESSAGE_HEADER_LEN + self.opts.encoded_len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn set_msg_type(&mut self, msg_type: MessageType) -> &mut Self {
        self.msg_type = msg_type;
        self
    }

    pub fn xid(&self) -> TransactionId {
        self.xid
    }

    pub fn set_xid(&mut self, xid: TransactionId) -> &mut Self {
        self.xid = xid;
        self
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    pub fn opts_mut(&mut self) -> &mut Options {
        &mut self.opts
    }

    pub fn client_id(&self) -> Option<&Duid> {
        match self.opts.get(OptionCode::CLIENT_ID) {
            Some(DhcpOption::ClientId(duid)) => Some(duid),
            _ => None,
        }
    }

    pub fn server_id(&self) -> Option<&Duid> {
        match self.opts.get(OptionCode::SERVER_ID) {
            Some(DhcpOption::ServerId(duid)) => Some(duid),
            _ => None,
        }
    }

    /// Every IA_NA option, in order.
    pub fn ia_na(&self) -> Vec<&IaNa> {
        self.opts
            .iter()
            .filter_map(|o| match o {
                DhcpOption::IaNa(ia) => Some(ia),
                _ => None,
            })
            .collect()
    }

    /// Message-level status, if the server sent one.
    pub fn status(&self) -> Option<&StatusCodeOption> {
        status_of(&self.opts)
    }

    pub fn is_rapid_commit(&self) -> bool {
        self.opts.has(OptionCode::RAPID_COMMIT)
    }

    pub fn dns_servers(&self) -> Option<&[Ipv6Addr]> {
        match self.opts.get(OptionCode::DNS_SERVERS) {
            Some(DhcpOption::DnsServers(ips)) => Some(ips),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "DHCPv6Message\n  messageType={}\n  transactionID={}\n  options:\n{}",
            self.msg_type, self.xid, self.opts
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DHCPv6Message(messageType={} transactionID={}, {} options)",
            self.msg_type,
            self.xid,
            self.opts.len()
        )
    }
}

/// A RELAY-FORW or RELAY-REPL message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    msg_type: MessageType,
    hop_count: u8,
    link_addr: Ipv6Addr,
    peer_addr: Ipv6Addr,
    opts: Options,
}

impl RelayMessage {
    /// A relay message carrying `inner` in its Relay Message option.
    pub fn new(
        msg_type: MessageType,
        hop_count: u8,
        link_addr: Ipv6Addr,
        peer_addr: Ipv6Addr,
        inner: &Packet,
    ) -> Self {
        let mut opts = Options::new();
        opts.add(DhcpOption::RelayMsg(inner.to_bytes()));
        Self {
            msg_type,
            hop_count,
            link_addr,
            peer_addr,
            opts,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < RELAY_HEADER_LEN {
            return Err(DecodeError::PacketTooShort {
                needed: RELAY_HEADER_LEN,
                length: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let msg_type = MessageType::from(cursor.read_u8());
        if !msg_type.is_relay() {
            return Err(DecodeError::NotARelay);
        }
        let hop_count = cursor.read_u8();
        let link_addr = cursor.read_ipv6();
        let peer_addr = cursor.read_ipv6();
        cursor.error()?;
        let opts = Options::from_bytes(cursor.read_all())?;

        match opts.get_all(OptionCode::RELAY_MSG).len() {
            0 => return Err(DecodeError::MissingRelayMessage),
            1 => {}
            n => {
                return Err(DecodeError::InvalidOptions(format!(
                    "relay message carries {n} Relay Message options"
                )))
            }
        }
        Ok(Self {
            msg_type,
            hop_count,
            link_addr,
            peer_addr,
            opts,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.len());
        buf.put_u8(u8::from(self.msg_type));
        buf.put_u8(self.hop_count);
        buf.put_slice(&self.link_addr.octets());
        buf.put_slice(&self.peer_addr.octets());
        self.opts.write_to(&mut buf);
        buf.to_vec()
    }

    pub fn len(&self) -> usize {
        RELAY_HEADER_LEN + self.opts.encoded_len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn hop_count(&self) -> u8 {
        self.hop_count
    }

    pub fn link_addr(&self) -> Ipv6Addr {
        self.link_addr
    }

    pub fn peer_addr(&self) -> Ipv6Addr {
        self.peer_addr
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    pub fn opts_mut(&mut self) -> &mut Options {
        &mut self.opts
    }

    /// The still-serialized payload of the Relay Message option.
    pub fn relay_message(&self) -> Result<&[u8], DecodeError> {
        match self.opts.get(OptionCode::RELAY_MSG) {
            Some(DhcpOption::RelayMsg(data)) => Ok(data),
            _ => Err(DecodeError::MissingRelayMessage),
        }
    }

    /// Decodes the encapsulated packet, one level down.
    pub fn inner(&self) -> Result<Packet, DecodeError> {
        Packet::from_bytes(self.relay_message()?)
    }

    /// Unwraps every relay level down to the client/server message.
    pub fn innermost(&self) -> Result<Message, DecodeError> {
        let mut current = self.inner()?;
        for _ in 0..HOP_COUNT_LIMIT {
            match current {
                Packet::Message(msg) => return Ok(msg),
                Packet::Relay(relay) => current = relay.inner()?,
            }
        }
        Err(DecodeError::RelayDepthExceeded(usize::from(HOP_COUNT_LIMIT)))
    }

    pub fn summary(&self) -> String {
        format!(
            "DHCPv6Relay\n  messageType={}\n  hopcount={}\n  linkaddr={}\n  peeraddr={}\n  options:\n{}",
            self.msg_type, self.hop_count, self.link_addr, self.peer_addr, self.opts
        )
    }
}

impl fmt::Display for RelayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DHCPv6Relay(messageType={} hopcount={}, linkaddr={}, peeraddr={}, {} options)",
            self.msg_type,
            self.hop_count,
            self.link_addr,
            self.peer_addr,
            self.opts.len()
        )
    }
}

/// Any DHCPv6 packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Message(Message),
    Relay(RelayMessage),
}

impl Packet {
    /// Decodes a message or a relay message depending on the type byte.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        match data.first().copied().map(MessageType::from) {
            Some(t) if t.is_relay() => RelayMessage::from_bytes(data).map(Packet::Relay),
            _ => Message::from_bytes(data).map(Packet::Message),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Packet::Message(msg) => msg.to_bytes(),
            Packet::Relay(relay) => relay.to_bytes(),
        }
    }

    pub fn msg_type(&self) -> MessageType {
        match self {
            Packet::Message(msg) => msg.msg_type(),
            Packet::Relay(relay) => relay.msg_type(),
        }
    }

    pub fn opts(&self) -> &Options {
        match self {
            Packet::Message(msg) => msg.opts(),
            Packet::Relay(relay) => relay.opts(),
        }
    }

    pub fn is_relay(&self) -> bool {
        matches!(self, Packet::Relay(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Packet::Message(msg) => msg.len(),
            Packet::Relay(relay) => relay.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn summary(&self) -> String {
        match self {
            Packet::Message(msg) => msg.summary(),
            Packet::Relay(relay) => relay.summary(),
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Message(msg) => write!(f, "{msg}"),
            Packet::Relay(relay) => write!(f, "{relay}"),
        }
    }
}

impl From<Message> for Packet {
    fn from(msg: Message) -> Self {
        Packet::Message(msg)
    }
}

impl From<RelayMessage> for Packet {
    fn from(relay: RelayMessage) -> Self {
        Packet::Relay(relay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn solicit() -> Message {
        let mut msg = Message::new(MessageType::Solicit);
        msg.set_xid(TransactionId([0xaa, 0xbb, 0xcc]));
        msg.opts_mut()
            .add(DhcpOption::ClientId(Duid::from_hardware_address(&[1, 2, 3, 4, 5, 6])));
        msg.opts_mut()
            .add(DhcpOption::ElapsedTime(Duration::ZERO));
        msg
    }

    #[test]
    fn message_wire_format() {
        let msg = solicit();
        let bytes = msg.to_bytes();
        assert_eq!(&bytes[..4], &[1, 0xaa, 0xbb, 0xcc]);
        assert_eq!(bytes.len(), msg.len());
        assert_eq!(Message::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn message_rejects_short_header() {
        assert!(matches!(
            Message::from_bytes(&[1, 2, 3]),
            Err(DecodeError::PacketTooShort { needed: 4, length: 3 })
        ));
    }

    #[test]
    fn relay_round_trip_is_lazy() {
        let inner = Packet::from(solicit());
        let link: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let peer: Ipv6Addr = "fe80::1".parse().unwrap();
        let relay = RelayMessage::new(MessageType::RelayForward, 0, link, peer, &inner);

        let decoded = Packet::from_bytes(&relay.to_bytes()).unwrap();
        let Packet::Relay(decoded) = decoded else {
            panic!("expected a relay message");
        };
        assert_eq!(decoded.link_addr(), link);
        assert_eq!(decoded.peer_addr(), peer);
        assert_eq!(decoded.relay_message().unwrap(), inner.to_bytes().as_slice());
        assert_eq!(decoded.inner().unwrap(), inner);
        assert_eq!(decoded.len(), relay.to_bytes().len());
    }

    #[test]
    fn relay_without_relay_message_is_rejected() {
        let mut bytes = vec![12, 0];
        bytes.extend_from_slice(&[0u8; 32]);
        assert_eq!(
            RelayMessage::from_bytes(&bytes),
            Err(DecodeError::MissingRelayMessage)
        );
    }

    #[test]
    fn relay_with_two_relay_messages_is_rejected() {
        let mut bytes = vec![12, 0];
        bytes.extend_from_slice(&[0u8; 32]);
        bytes.extend_from_slice(&[0, 9, 0, 4, 1, 0, 0, 1]);
        bytes.extend_from_slice(&[0, 9, 0, 4, 1, 0, 0, 2]);
        assert!(matches!(
            RelayMessage::from_bytes(&bytes),
            Err(DecodeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn innermost_stops_at_hop_limit() {
        let mut packet = Packet::from(solicit());
        for hop in 0..=HOP_COUNT_LIMIT {
            packet = Packet::Relay(RelayMessage::new(
                MessageType::RelayForward,
                hop,
                Ipv6Addr::UNSPECIFIED,
                Ipv6Addr::UNSPECIFIED,
                &packet,
            ));
        }
        let Packet::Relay(relay) = packet else {
            panic!("expected a relay message");
        };
        assert_eq!(
            relay.innermost(),
            Err(DecodeError::RelayDepthExceeded(usize::from(HOP_COUNT_LIMIT)))
        );
    }

    #[test]
    fn innermost_unwraps_nested_relays() {
        let msg = solicit();
        let one = RelayMessage::new(
            MessageType::RelayForward,
            0,
            Ipv6Addr::UNSPECIFIED,
            Ipv6Addr::LOCALHOST,
            &Packet::from(msg.clone()),
        );
        let two = RelayMessage::new(
            MessageType::RelayForward,
            1,
            Ipv6Addr::UNSPECIFIED,
            Ipv6Addr::LOCALHOST,
            &Packet::from(one),
        );
        assert_eq!(two.innermost().unwrap(), msg);
    }

    #[test]
    fn message_from_bytes_refuses_relays() {
        let relay = RelayMessage::new(
            MessageType::RelayReply,
            0,
            Ipv6Addr::UNSPECIFIED,
            Ipv6Addr::UNSPECIFIED,
            &Packet::from(solicit()),
        );
        assert!(Message::from_bytes(&relay.to_bytes()).is_err());
        assert_eq!(
            RelayMessage::from_bytes(&solicit().to_bytes()),
            Err(DecodeError::NotARelay)
        );
    }
}
