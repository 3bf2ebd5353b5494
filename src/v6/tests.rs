use super::*;
use crate::client::{Action, DhcpStateMachine, Event};
use crate::error::ClientError;
use bytes::Bytes;
use std::time::Duration;

const MAC: [u8; 6] = [0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4];

fn server_duid() -> Duid {
    Duid::from_hardware_address(&[0x02, 0, 0, 0, 0, 0x01])
}

fn start(handler: &mut DhcpV6Handler) -> Message {
    let Action::Send(packet) = handler.handle_event(Event::Start).unwrap() else {
        panic!("Expected Send action");
    };
    Message::from_bytes(&packet).unwrap()
}

fn advertise_for(solicit: &Message) -> Message {
    let mut advertise = new_advertise_from_solicit(solicit, server_duid()).unwrap();
    let mut ia = IaNa::new(solicit.ia_na()[0].iaid);
    ia.options.add(DhcpOption::IaAddr(IaAddr {
        addr: "2001:db8::100".parse().unwrap(),
        preferred_lifetime: Duration::from_secs(3600),
        valid_lifetime: Duration::from_secs(7200),
        options: Options::new(),
    }));
    advertise.opts_mut().add(DhcpOption::IaNa(ia));
    advertise
}

#[test]
fn test_dhcp_v6_handler_creation() {
    let handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3);
    assert_eq!(handler.state_name(), "Init");
}

#[test]
fn test_dhcp_v6_handler_full_exchange() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3);
    let solicit = start(&mut handler);
    assert_eq!(solicit.msg_type(), MessageType::Solicit);
    assert!(!solicit.is_rapid_commit());
    assert_eq!(handler.state_name(), "Soliciting");

    let advertise = advertise_for(&solicit);
    let Action::Send(packet) = handler
        .handle_event(Event::PacketReceived(&advertise.to_bytes()))
        .unwrap()
    else {
        panic!("Expected Send action");
    };
    assert_eq!(handler.state_name(), "Requesting");
    let request = Message::from_bytes(&packet).unwrap();
    assert_eq!(request.msg_type(), MessageType::Request);
    assert_eq!(request.server_id(), Some(&server_duid()));
    assert_eq!(request.ia_na(), advertise.ia_na());

    let reply = new_reply_from_message(&request, server_duid()).unwrap();
    let action = handler
        .handle_event(Event::PacketReceived(&reply.to_bytes()))
        .unwrap();
    assert_eq!(action, Action::Done);
    assert_eq!(handler.state_name(), "Bound");

    let types: Vec<_> = handler
        .take_conversation()
        .iter()
        .map(Message::msg_type)
        .collect();
    assert_eq!(
        types,
        vec![
            MessageType::Solicit,
            MessageType::Advertise,
            MessageType::Request,
            MessageType::Reply,
        ]
    );
}

#[test]
fn test_rapid_commit_finishes_after_two_messages() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3).with_rapid_commit();
    let solicit = start(&mut handler);
    assert!(solicit.is_rapid_commit());

    let reply = new_reply_from_message(&solicit, server_duid()).unwrap();
    let action = handler
        .handle_event(Event::PacketReceived(&reply.to_bytes()))
        .unwrap();
    assert_eq!(action, Action::Done);
    assert_eq!(handler.take_conversation().len(), 2);
}

#[test]
fn test_reply_without_rapid_commit_is_ignored_while_soliciting() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3);
    let solicit = start(&mut handler);
    let mut reply = new_reply_from_message(&solicit, server_duid()).unwrap();
    reply.opts_mut().del(OptionCode::RAPID_COMMIT);
    let action = handler
        .handle_event(Event::PacketReceived(&reply.to_bytes()))
        .unwrap();
    assert_eq!(action, Action::Wait);
    assert_eq!(handler.state_name(), "Soliciting");
}

#[test]
fn test_foreign_transaction_is_ignored() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3);
    let solicit = start(&mut handler);
    let mut advertise = advertise_for(&solicit);
    let [a, b, c] = solicit.xid().0;
    advertise.set_xid(TransactionId([a, b, c.wrapping_add(1)]));
    let action = handler
        .handle_event(Event::PacketReceived(&advertise.to_bytes()))
        .unwrap();
    assert_eq!(action, Action::Wait);
}

#[test]
fn test_garbage_is_ignored() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3);
    start(&mut handler);
    let action = handler
        .handle_event(Event::PacketReceived(&[2, 0]))
        .unwrap();
    assert_eq!(action, Action::Wait);
}

#[test]
fn test_failure_status_ends_exchange() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 3);
    let solicit = start(&mut handler);
    let Action::Send(packet) = handler
        .handle_event(Event::PacketReceived(&advertise_for(&solicit).to_bytes()))
        .unwrap()
    else {
        panic!("Expected Send action");
    };
    let request = Message::from_bytes(&packet).unwrap();
    let mut reply = new_reply_from_message(&request, server_duid()).unwrap();
    reply.opts_mut().add(DhcpOption::StatusCode(StatusCodeOption::new(
        StatusCode::NoAddrsAvail,
        "no addresses",
    )));
    assert!(matches!(
        handler.handle_event(Event::PacketReceived(&reply.to_bytes())),
        Err(ClientError::ServerStatus(_))
    ));
    assert_eq!(handler.take_conversation().len(), 4);
}

#[test]
fn test_retransmits_then_times_out() {
    let mut handler = DhcpV6Handler::new(Bytes::from_static(&MAC), 2);
    let first = start(&mut handler).to_bytes();
    let timeout = Duration::from_secs(1);
    for _ in 0..2 {
        assert_eq!(
            handler.handle_event(Event::Timeout(timeout)).unwrap(),
            Action::Send(first.clone())
        );
    }
    assert!(handler
        .handle_event(Event::Timeout(timeout))
        .is_err_and(|e| e.is_timeout()));
}

#[test]
fn test_with_initial_solicit() {
    let mut solicit = new_solicit_with_cid(Duid::Uuid([5u8; 16]));
    solicit.opts_mut().add(DhcpOption::RapidCommit);
    let mut handler = DhcpV6Handler::with_initial(solicit.clone(), 0);
    let sent = start(&mut handler);
    assert_eq!(sent, solicit);
}
