//! DHCPv4 message builders.
//!
//! Each builder derives the next message of the DORA exchange from its
//! predecessor and fails with a [`BuildError`] when the predecessor lacks
//! what the next message needs.

use super::option::DhcpOption;
use super::packet::{Message, CHADDR_LEN};
use super::types::{Flags, HType, MessageType, Opcode, OptionCode};
use crate::error::BuildError;
use std::net::Ipv4Addr;

/// Parameters every client message asks for.
pub fn default_parameter_request_list() -> Vec<OptionCode> {
    vec![
        OptionCode::SUBNET_MASK,        // 1
        OptionCode::ROUTER,             // 3
        OptionCode::DOMAIN_NAME_SERVER, // 6
        OptionCode::DOMAIN_NAME,        // 15
        OptionCode::DOMAIN_SEARCH,      // 119
    ]
}

/// Client identifier: htype 1 (Ethernet) followed by the hardware address.
fn client_identifier(hw_addr: &[u8]) -> DhcpOption {
    let mut data = Vec::with_capacity(hw_addr.len() + 1);
    data.push(u8::from(HType::Eth));
    data.extend_from_slice(hw_addr);
    DhcpOption::ClientIdentifier(data)
}

fn check_hw_addr(hw_addr: &[u8]) -> Result<(), BuildError> {
    if hw_addr.len() > CHADDR_LEN {
        return Err(BuildError::InvalidHardwareAddress(hw_addr.len()));
    }
    Ok(())
}

/// Constructs a DHCPDISCOVER for `hw_addr` with a fresh transaction ID and
/// the broadcast flag set.
pub fn new_discovery(hw_addr: &[u8]) -> Result<Message, BuildError> {
    check_hw_addr(hw_addr)?;
    let mut msg = Message::new();
    msg.set_opcode(Opcode::BootRequest)
        .set_chaddr(hw_addr)
        .set_htype(HType::Eth)
        .set_hops(0)
        .set_secs(0)
        .set_flags(Flags::default().set_broadcast());

    let opts = msg.opts_mut();
    opts.add(DhcpOption::MessageType(MessageType::Discover));
    opts.add(client_identifier(hw_addr));
    opts.add(DhcpOption::ParameterRequestList(
        default_parameter_request_list(),
    ));
    Ok(msg)
}

/// Constructs a DHCPREQUEST selecting `offer`.
///
/// The transaction ID, hardware address and broadcast flag are copied
/// from the offer; the offer's Server Identifier is required.
pub fn new_request_from_offer(offer: &Message) -> Result<Message, BuildError> {
    match offer.message_type() {
        Some(MessageType::Offer) => {}
        other => {
            return Err(BuildError::unexpected(
                MessageType::Offer,
                other.map_or_else(|| "none".to_string(), |t| t.to_string()),
            ))
        }
    }
    let server_id = offer
        .server_identifier()
        .ok_or(BuildError::MissingOption("Server Identifier"))?;

    let mut msg = Message::new();
    msg.set_opcode(Opcode::BootRequest)
        .set_htype(offer.htype())
        .set_chaddr(offer.chaddr())
        .set_xid(offer.xid())
        .set_flags(offer.flags())
        .set_ciaddr(Ipv4Addr::UNSPECIFIED);

    let opts = msg.opts_mut();
    opts.add(DhcpOption::MessageType(MessageType::Request));
    opts.add(DhcpOption::RequestedIpAddress(offer.yiaddr()));
    opts.add(DhcpOption::ServerIdentifier(server_id));
    opts.add(client_identifier(offer.chaddr()));
    opts.add(DhcpOption::ParameterRequestList(
        default_parameter_request_list(),
    ));
    Ok(msg)
}

/// Constructs a server reply (OFFER, ACK or NAK) answering `request`.
///
/// The reply mirrors the request's transaction ID, hardware address,
/// flags and relay agent address.
pub fn new_reply_from_request(request: &Message, msg_type: MessageType) -> Message {
    let mut msg = Message::new();
    msg.set_opcode(Opcode::BootReply)
        .set_htype(request.htype())
        .set_chaddr(request.chaddr())
        .set_xid(request.xid())
        .set_flags(request.flags())
        .set_giaddr(request.giaddr());
    msg.opts_mut().add(DhcpOption::MessageType(msg_type));
    msg
}

/// Constructs a DHCPINFORM for a client that already has `local_ip`.
pub fn new_inform(hw_addr: &[u8], local_ip: Ipv4Addr) -> Result<Message, BuildError> {
    check_hw_addr(hw_addr)?;
    let mut msg = Message::new();
    msg.set_opcode(Opcode::BootRequest)
        .set_htype(HType::Eth)
        .set_chaddr(hw_addr)
        .set_ciaddr(local_ip);
    let opts = msg.opts_mut();
    opts.add(DhcpOption::MessageType(MessageType::Inform));
    opts.add(DhcpOption::ParameterRequestList(
        default_parameter_request_list(),
    ));
    Ok(msg)
}

/// Constructs a unicast DHCPRELEASE giving back the lease in `ack`.
pub fn new_release_from_ack(ack: &Message) -> Result<Message, BuildError> {
    match ack.message_type() {
        Some(MessageType::Ack) => {}
        other => {
            return Err(BuildError::unexpected(
                MessageType::Ack,
                other.map_or_else(|| "none".to_string(), |t| t.to_string()),
            ))
        }
    }
    let server_id = ack
        .server_identifier()
        .ok_or(BuildError::MissingOption("Server Identifier"))?;

    let mut msg = Message::new();
    msg.set_opcode(Opcode::BootRequest)
        .set_htype(ack.htype())
        .set_chaddr(ack.chaddr())
        .set_flags(Flags::default().set_unicast())
        .set_ciaddr(ack.yiaddr());
    let opts = msg.opts_mut();
    opts.add(DhcpOption::MessageType(MessageType::Release));
    opts.add(DhcpOption::ServerIdentifier(server_id));
    opts.add(client_identifier(ack.chaddr()));
    Ok(msg)
}
