//! DHCPv6 message builders.
//!
//! There is no stateful protocol object: each builder checks that its
//! predecessor has the right type and carries the options the next message
//! needs, and returns a [`BuildError`] otherwise.

use super::duid::Duid;
use super::option::{DhcpOption, IaNa};
use super::packet::{Message, Packet, RelayMessage};
use super::types::{MessageType, OptionCode, HOP_COUNT_LIMIT};
use crate::error::{BuildError, DecodeError};
use std::net::Ipv6Addr;
use std::time::Duration;

/// Options every client message asks for.
pub fn default_option_request() -> Vec<OptionCode> {
    vec![OptionCode::DNS_SERVERS, OptionCode::DOMAIN_LIST]
}

fn expect_type(msg: &Message, expected: &[MessageType]) -> Result<(), BuildError> {
    if expected.contains(&msg.msg_type()) {
        return Ok(());
    }
    let expected = expected
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(BuildError::unexpected(expected, msg.msg_type()))
}

fn client_id(msg: &Message) -> Result<Duid, BuildError> {
    msg.client_id()
        .cloned()
        .ok_or(BuildError::MissingOption("Client ID"))
}

fn server_id(msg: &Message) -> Result<Duid, BuildError> {
    msg.server_id()
        .cloned()
        .ok_or(BuildError::MissingOption("Server ID"))
}

/// IAID derived from the last four bytes of the client DUID.
fn iaid_for(duid: &Duid) -> [u8; 4] {
    let bytes = duid.to_bytes();
    let mut iaid = [0u8; 4];
    let tail = &bytes[bytes.len().saturating_sub(4)..];
    iaid[4 - tail.len()..].copy_from_slice(tail);
    iaid
}

/// A SOLICIT identified by a DUID-LL built from `hw_addr`.
pub fn new_solicit(hw_addr: &[u8]) -> Result<Message, BuildError> {
    if hw_addr.is_empty() {
        return Err(BuildError::InvalidHardwareAddress(0));
    }
    Ok(new_solicit_with_cid(Duid::from_hardware_address(hw_addr)))
}

/// A SOLICIT carrying Client ID, Option Request, Elapsed Time and an IA_NA.
pub fn new_solicit_with_cid(duid: Duid) -> Message {
    let mut msg = Message::new(MessageType::Solicit);
    let iaid = iaid_for(&duid);
    let opts = msg.opts_mut();
    opts.add(DhcpOption::ClientId(duid));
    opts.add(DhcpOption::Oro(default_option_request()));
    opts.add(DhcpOption::ElapsedTime(Duration::ZERO));
    opts.add(DhcpOption::IaNa(IaNa::new(iaid)));
    msg
}

/// The server's ADVERTISE answering `solicit`.
///
/// Copies the transaction ID and the Client ID; `solicit` must be a SOLICIT
/// and must carry a Client ID.
pub fn new_advertise_from_solicit(solicit: &Message, server: Duid) -> Result<Message, BuildError> {
    expect_type(solicit, &[MessageType::Solicit])?;
    let cid = client_id(solicit)?;

    let mut msg = Message::new(MessageType::Advertise);
    msg.set_xid(solicit.xid());
    let opts = msg.opts_mut();
    opts.add(DhcpOption::ClientId(cid));
    opts.add(DhcpOption::ServerId(server));
    Ok(msg)
}

/// A REQUEST for the offer in `advertise`.
///
/// Requires Client ID and Server ID. IA_NA options and a Vendor Class are
/// copied when present.
pub fn new_request_from_advertise(advertise: &Message) -> Result<Message, BuildError> {
    expect_type(advertise, &[MessageType::Advertise])?;
    let cid = client_id(advertise)?;
    let sid = server_id(advertise)?;

    let mut msg = Message::new(MessageType::Request);
    let opts = msg.opts_mut();
    opts.add(DhcpOption::ClientId(cid));
    opts.add(DhcpOption::ServerId(sid));
    opts.add(DhcpOption::ElapsedTime(Duration::ZERO));
    opts.add(DhcpOption::Oro(default_option_request()));
    for ia in advertise.ia_na() {
        opts.add(DhcpOption::IaNa(ia.clone()));
    }
    if let Some(vendor_class) = advertise.opts().get(OptionCode::VENDOR_CLASS) {
        opts.add(vendor_class.clone());
    }
    Ok(msg)
}

/// The server's REPLY to a client message.
///
/// Answers REQUEST, CONFIRM, RENEW, REBIND, RELEASE, DECLINE, a Rapid
/// Commit SOLICIT, and INFORMATION-REQUEST. The client message must carry
/// a Client ID, which is echoed in the reply.
pub fn new_reply_from_message(msg: &Message, server: Duid) -> Result<Message, BuildError> {
    expect_type(
        msg,
        &[
            MessageType::Request,
            MessageType::Confirm,
            MessageType::Renew,
            MessageType::Rebind,
            MessageType::Release,
            MessageType::Decline,
            MessageType::Solicit,
            MessageType::InformationRequest,
        ],
    )?;
    let cid = client_id(msg)?;

    let mut reply = Message::new(MessageType::Reply);
    reply.set_xid(msg.xid());
    let opts = reply.opts_mut();
    opts.add(DhcpOption::ClientId(cid));
    opts.add(DhcpOption::ServerId(server));
    if msg.msg_type() == MessageType::Solicit && msg.is_rapid_commit() {
        opts.add(DhcpOption::RapidCommit);
    }
    Ok(reply)
}

/// A RENEW extending the leases granted in `reply`.
pub fn new_renew_from_reply(reply: &Message) -> Result<Message, BuildError> {
    expect_type(reply, &[MessageType::Reply])?;
    let cid = client_id(reply)?;
    let sid = server_id(reply)?;

    let mut msg = Message::new(MessageType::Renew);
    let opts = msg.opts_mut();
    opts.add(DhcpOption::ClientId(cid));
    opts.add(DhcpOption::ServerId(sid));
    opts.add(DhcpOption::ElapsedTime(Duration::ZERO));
    opts.add(DhcpOption::Oro(default_option_request()));
    for ia in reply.ia_na() {
        opts.add(DhcpOption::IaNa(ia.clone()));
    }
    Ok(msg)
}

/// An INFORMATION-REQUEST for stateless configuration.
pub fn new_information_request(hw_addr: &[u8]) -> Message {
    let mut msg = Message::new(MessageType::InformationRequest);
    let opts = msg.opts_mut();
    opts.add(DhcpOption::ClientId(Duid::from_hardware_address(hw_addr)));
    opts.add(DhcpOption::Oro(default_option_request()));
    opts.add(DhcpOption::ElapsedTime(Duration::ZERO));
    msg
}

/// Wraps `packet` in a relay message of type `msg_type`.
///
/// The hop count is 0 for a client message and one more than the inner
/// relay's hop count otherwise.
pub fn encapsulate_relay(
    packet: &Packet,
    msg_type: MessageType,
    link_addr: Ipv6Addr,
    peer_addr: Ipv6Addr,
) -> Result<RelayMessage, BuildError> {
    if !msg_type.is_relay() {
        return Err(BuildError::unexpected("RELAY-FORW or RELAY-REPL", msg_type));
    }
    let hop_count = match packet {
        Packet::Message(_) => 0,
        Packet::Relay(inner) if inner.hop_count() >= HOP_COUNT_LIMIT - 1 => {
            return Err(BuildError::HopCountExceeded(inner.hop_count()))
        }
        Packet::Relay(inner) => inner.hop_count() + 1,
    };
    Ok(RelayMessage::new(
        msg_type, hop_count, link_addr, peer_addr, packet,
    ))
}

/// Decodes the packet carried by `relay`, one level down.
pub fn decapsulate_relay(relay: &RelayMessage) -> Result<Packet, DecodeError> {
    relay.inner()
}

/// The relay at nesting level `index` inside `relay`, where 0 is `relay`
/// itself. `None` selects the innermost relay, the one that carries the
/// client/server message.
pub fn decapsulate_relay_index(
    relay: &RelayMessage,
    index: Option<usize>,
) -> Result<RelayMessage, DecodeError> {
    let limit = usize::from(HOP_COUNT_LIMIT);
    if index.is_some_and(|i| i >= limit) {
        return Err(DecodeError::RelayDepthExceeded(limit));
    }
    let mut current = relay.clone();
    for level in 0..limit {
        if index == Some(level) {
            return Ok(current);
        }
        match current.inner()? {
            Packet::Relay(inner) => current = inner,
            Packet::Message(_) if index.is_none() => return Ok(current),
            Packet::Message(_) => {
                return Err(DecodeError::value(
                    "relay index",
                    format!("only {} relay level(s) present", level + 1),
                ))
            }
        }
    }
    Err(DecodeError::RelayDepthExceeded(limit))
}

/// A RELAY-REPL chain mirroring the RELAY-FORW chain of `forward`, with
/// `reply` as the innermost payload.
///
/// Each level keeps the hop count, link and peer addresses and the
/// Interface-Id of the matching forward.
pub fn new_relay_reply_from_forward(
    forward: &RelayMessage,
    reply: &Message,
) -> Result<RelayMessage, BuildError> {
    if forward.msg_type() != MessageType::RelayForward {
        return Err(BuildError::unexpected(
            MessageType::RelayForward,
            forward.msg_type(),
        ));
    }

    let mut chain = vec![forward.clone()];
    loop {
        let Some(last) = chain.last() else { break };
        match last.inner() {
            Ok(Packet::Relay(inner)) if chain.len() < usize::from(HOP_COUNT_LIMIT) => {
                chain.push(inner)
            }
            Ok(Packet::Relay(inner)) => return Err(BuildError::HopCountExceeded(inner.hop_count())),
            Ok(Packet::Message(_)) => break,
            Err(_) => return Err(BuildError::MissingOption("Relay Message")),
        }
    }

    let mut packet = Packet::from(reply.clone());
    for fwd in chain.iter().rev() {
        let mut relay = RelayMessage::new(
            MessageType::RelayReply,
            fwd.hop_count(),
            fwd.link_addr(),
            fwd.peer_addr(),
            &packet,
        );
        if let Some(interface_id) = fwd.opts().get(OptionCode::INTERFACE_ID) {
            relay.opts_mut().add(interface_id.clone());
        }
        packet = Packet::Relay(relay);
    }
    match packet {
        Packet::Relay(relay) => Ok(relay),
        Packet::Message(_) => Err(BuildError::MissingOption("Relay Message")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v6::types::TransactionId;

    const MAC: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];

    fn server_duid() -> Duid {
        Duid::from_hardware_address(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
    }

    #[test]
    fn solicit_carries_required_options() {
        let solicit = new_solicit(&MAC).unwrap();
        assert_eq!(solicit.msg_type(), MessageType::Solicit);
        assert_eq!(
            solicit.client_id(),
            Some(&Duid::from_hardware_address(&MAC))
        );
        assert!(solicit.opts().has(OptionCode::ORO));
        assert!(solicit.opts().has(OptionCode::ELAPSED_TIME));
        let ia = solicit.ia_na();
        assert_eq!(ia.len(), 1);
        assert_eq!(ia[0].iaid, [0x22, 0x33, 0x44, 0x55]);
        assert!(new_solicit(&[]).is_err());
    }

    #[test]
    fn advertise_copies_xid_and_client_id() {
        let duid = Duid::Uuid([3u8; 16]);
        let mut solicit = new_solicit_with_cid(duid.clone());
        solicit.set_xid(TransactionId([1, 2, 3]));

        let advertise = new_advertise_from_solicit(&solicit, server_duid()).unwrap();
        assert_eq!(advertise.msg_type(), MessageType::Advertise);
        assert_eq!(advertise.xid(), solicit.xid());
        assert_eq!(advertise.client_id(), Some(&duid));
        assert_eq!(advertise.server_id(), Some(&server_duid()));
    }

    #[test]
    fn advertise_requires_solicit_with_client_id() {
        let info = new_information_request(&MAC);
        assert!(matches!(
            new_advertise_from_solicit(&info, server_duid()),
            Err(BuildError::UnexpectedMessageType { .. })
        ));

        let mut solicit = new_solicit(&MAC).unwrap();
        solicit.opts_mut().del(OptionCode::CLIENT_ID);
        assert_eq!(
            new_advertise_from_solicit(&solicit, server_duid()),
            Err(BuildError::MissingOption("Client ID"))
        );
    }

    #[test]
    fn request_from_advertise() {
        let solicit = new_solicit(&MAC).unwrap();
        let mut advertise = new_advertise_from_solicit(&solicit, server_duid()).unwrap();
        let mut ia = IaNa::new([0, 0, 0, 7]);
        ia.t1 = Duration::from_secs(100);
        advertise.opts_mut().add(DhcpOption::IaNa(ia.clone()));

        let request = new_request_from_advertise(&advertise).unwrap();
        assert_eq!(request.msg_type(), MessageType::Request);
        assert_eq!(request.client_id(), solicit.client_id());
        assert_eq!(request.server_id(), Some(&server_duid()));
        assert_eq!(request.ia_na(), vec![&ia]);
        assert!(!request.opts().has(OptionCode::VENDOR_CLASS));
    }

    #[test]
    fn request_requires_server_id() {
        let solicit = new_solicit(&MAC).unwrap();
        let mut advertise = new_advertise_from_solicit(&solicit, server_duid()).unwrap();
        advertise.opts_mut().del(OptionCode::SERVER_ID);
        assert_eq!(
            new_request_from_advertise(&advertise),
            Err(BuildError::MissingOption("Server ID"))
        );
    }

    #[test]
    fn reply_requires_client_id() {
        let solicit = new_solicit(&MAC).unwrap();
        let advertise = new_advertise_from_solicit(&solicit, server_duid()).unwrap();
        let mut request = new_request_from_advertise(&advertise).unwrap();

        let reply = new_reply_from_message(&request, server_duid()).unwrap();
        assert_eq!(reply.msg_type(), MessageType::Reply);
        assert_eq!(reply.xid(), request.xid());

        request.opts_mut().del(OptionCode::CLIENT_ID);
        assert_eq!(
            new_reply_from_message(&request, server_duid()),
            Err(BuildError::MissingOption("Client ID"))
        );

        let mut info = new_information_request(&MAC);
        let reply = new_reply_from_message(&info, server_duid()).unwrap();
        assert_eq!(reply.client_id(), info.client_id());
        info.opts_mut().del(OptionCode::CLIENT_ID);
        assert_eq!(
            new_reply_from_message(&info, server_duid()),
            Err(BuildError::MissingOption("Client ID"))
        );
        assert!(new_reply_from_message(&advertise, server_duid()).is_err());
    }

    #[test]
    fn rapid_commit_reply() {
        let mut solicit = new_solicit(&MAC).unwrap();
        solicit.opts_mut().add(DhcpOption::RapidCommit);
        let reply = new_reply_from_message(&solicit, server_duid()).unwrap();
        assert!(reply.is_rapid_commit());
    }

    #[test]
    fn renew_from_reply() {
        let solicit = new_solicit(&MAC).unwrap();
        let mut reply = new_reply_from_message(&solicit, server_duid()).unwrap();
        reply.opts_mut().add(DhcpOption::IaNa(IaNa::new([0, 0, 0, 1])));
        let renew = new_renew_from_reply(&reply).unwrap();
        assert_eq!(renew.msg_type(), MessageType::Renew);
        assert_eq!(renew.server_id(), Some(&server_duid()));
        assert_eq!(renew.ia_na().len(), 1);
        assert!(new_renew_from_reply(&solicit).is_err());
    }

    #[test]
    fn relay_encapsulation_increments_hop_count() {
        let msg = new_solicit(&MAC).unwrap();
        let solicit = Packet::from(msg.clone());
        let link: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let peer: Ipv6Addr = "fe80::211:22ff:fe33:4455".parse().unwrap();

        let first = encapsulate_relay(&solicit, MessageType::RelayForward, link, peer).unwrap();
        assert_eq!(first.hop_count(), 0);
        let second = encapsulate_relay(
            &Packet::from(first.clone()),
            MessageType::RelayForward,
            Ipv6Addr::UNSPECIFIED,
            link,
        )
        .unwrap();
        assert_eq!(second.hop_count(), 1);

        assert_eq!(decapsulate_relay(&second).unwrap(), Packet::from(first.clone()));
        assert_eq!(decapsulate_relay_index(&second, Some(0)).unwrap(), second);
        assert_eq!(decapsulate_relay_index(&second, Some(1)).unwrap(), first);
        assert_eq!(decapsulate_relay_index(&second, None).unwrap(), first);
        assert!(decapsulate_relay_index(&second, Some(2)).is_err());
        assert_eq!(first.innermost().unwrap(), msg);

        assert!(encapsulate_relay(&solicit, MessageType::Solicit, link, peer).is_err());
    }

    #[test]
    fn relay_reply_mirrors_forward_chain() {
        let solicit = new_solicit(&MAC).unwrap();
        let mut first = encapsulate_relay(
            &Packet::from(solicit.clone()),
            MessageType::RelayForward,
            "2001:db8::1".parse().unwrap(),
            "fe80::1".parse().unwrap(),
        )
        .unwrap();
        first
            .opts_mut()
            .add(DhcpOption::InterfaceId(b"eth1".to_vec()));
        let second = encapsulate_relay(
            &Packet::from(first.clone()),
            MessageType::RelayForward,
            "2001:db8:1::1".parse().unwrap(),
            "2001:db8::1".parse().unwrap(),
        )
        .unwrap();

        let advertise = new_advertise_from_solicit(&solicit, server_duid()).unwrap();
        let reply = new_relay_reply_from_forward(&second, &advertise).unwrap();
        assert_eq!(reply.msg_type(), MessageType::RelayReply);
        assert_eq!(reply.hop_count(), 1);
        assert_eq!(reply.peer_addr(), second.peer_addr());

        let inner = decapsulate_relay_index(&reply, None).unwrap();
        assert_eq!(inner.msg_type(), MessageType::RelayReply);
        assert_eq!(inner.hop_count(), 0);
        assert_eq!(inner.link_addr(), first.link_addr());
        assert_eq!(
            inner.opts().get(OptionCode::INTERFACE_ID),
            Some(&DhcpOption::InterfaceId(b"eth1".to_vec()))
        );
        assert_eq!(reply.innermost().unwrap(), advertise);

        assert!(new_relay_reply_from_forward(&reply, &advertise).is_err());
    }
}
