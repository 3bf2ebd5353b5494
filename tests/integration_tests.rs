use bytes::Bytes;
use dhcpkit::client::MAX_DATAGRAM_SIZE;
use dhcpkit::{v4, v6, Client, ClientConfig, ClientError};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

const MAC: [u8; 6] = [0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4];

/// A client on a loopback socket aimed at a fake server on another one.
async fn loopback_client(v6: bool) -> (Client, UdpSocket) {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mac = Bytes::from_static(&MAC);
    let mut config = if v6 {
        ClientConfig::new_v6("lo".to_string(), mac)
    } else {
        ClientConfig::new("lo".to_string(), mac)
    };
    config.server_address = server.local_addr().unwrap();
    config.read_timeout = Duration::from_millis(200);
    config.retries = 1;
    (Client::from_socket(socket, config), server)
}

async fn recv(server: &UdpSocket) -> (Vec<u8>, SocketAddr) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let (len, peer) = server.recv_from(&mut buf).await.unwrap();
    buf.truncate(len);
    (buf, peer)
}

async fn recv_v4(server: &UdpSocket) -> (v4::Message, SocketAddr) {
    let (data, peer) = recv(server).await;
    (v4::Message::from_bytes(&data).unwrap(), peer)
}

fn offer_for(discover: &v4::Message) -> v4::Message {
    let mut offer = v4::new_reply_from_request(discover, v4::MessageType::Offer);
    offer.set_yiaddr(Ipv4Addr::new(192, 168, 1, 100));
    offer
        .opts_mut()
        .add(v4::DhcpOption::ServerIdentifier(Ipv4Addr::new(192, 168, 1, 1)));
    offer
}

/// Answers one DISCOVER and one REQUEST, replying to the request with `answer`.
fn spawn_v4_server(server: UdpSocket, answer: v4::MessageType) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (discover, peer) = recv_v4(&server).await;
        assert_eq!(discover.message_type(), Some(v4::MessageType::Discover));
        server
            .send_to(&offer_for(&discover).to_bytes(), peer)
            .await
            .unwrap();

        let (request, peer) = recv_v4(&server).await;
        assert_eq!(request.message_type(), Some(v4::MessageType::Request));
        let mut reply = v4::new_reply_from_request(&request, answer);
        reply.set_yiaddr(Ipv4Addr::new(192, 168, 1, 100));
        server.send_to(&reply.to_bytes(), peer).await.unwrap();
    })
}

#[test]
fn test_config_creation() {
    let mac_addr = Bytes::from_static(&MAC);
    let config = ClientConfig::new("eth0".to_string(), mac_addr.clone());

    assert_eq!(config.interface, "eth0");
    assert_eq!(config.mac_address, mac_addr);
    assert_eq!(config.client_port, 68);
    assert_eq!(config.server_port, 67);
    assert_eq!(
        config.server_address,
        SocketAddr::from((Ipv4Addr::BROADCAST, 67))
    );
    assert_eq!(config.read_timeout, Duration::from_secs(3));
    assert_eq!(config.write_timeout, Duration::from_secs(3));
    assert!(!config.is_v6());
}

#[test]
fn test_v6_config_creation() {
    let config = ClientConfig::new_v6("eth0".to_string(), Bytes::from_static(&MAC));

    assert_eq!(config.client_port, 546);
    assert_eq!(config.server_port, 547);
    assert_eq!(config.server_address.to_string(), "[ff02::1:2]:547");
    assert!(config.is_v6());
}

#[tokio::test]
async fn test_v4_dora_exchange() {
    let (client, server) = loopback_client(false).await;
    let server = spawn_v4_server(server, v4::MessageType::Ack);

    let conversation = assert_ok!(client.exchange_v4(None).await);
    let types: Vec<_> = conversation
        .iter()
        .map(|m| m.message_type().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            v4::MessageType::Discover,
            v4::MessageType::Offer,
            v4::MessageType::Request,
            v4::MessageType::Ack,
        ]
    );
    assert!(conversation.iter().all(|m| m.xid() == conversation[0].xid()));
    assert_eq!(conversation[3].yiaddr(), Ipv4Addr::new(192, 168, 1, 100));
    server.await.unwrap();
}

#[tokio::test]
async fn test_v4_exchange_with_custom_discover() {
    let (client, server) = loopback_client(false).await;
    let server = spawn_v4_server(server, v4::MessageType::Ack);

    let mut discover = assert_ok!(v4::new_discovery(&MAC));
    discover.set_xid(0x0102_0304u32);
    let conversation = assert_ok!(client.exchange_v4(Some(discover)).await);
    assert_eq!(conversation[0].xid(), v4::TransactionId::from(0x0102_0304u32));
    assert_eq!(conversation.len(), 4);
    server.await.unwrap();
}

#[tokio::test]
async fn test_v4_nak_keeps_conversation() {
    let (client, server) = loopback_client(false).await;
    let server = spawn_v4_server(server, v4::MessageType::Nak);

    let err = assert_err!(client.exchange_v4(None).await);
    assert!(matches!(err.source, ClientError::Nak));
    assert_eq!(err.conversation.len(), 4);
    assert_eq!(
        err.conversation[3].message_type(),
        Some(v4::MessageType::Nak)
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_v4_retransmits_unanswered_discover() {
    let (client, server) = loopback_client(false).await;
    let server = tokio::spawn(async move {
        let (first, _) = recv(&server).await;
        let (second, peer) = recv(&server).await;
        assert_eq!(first, second);
        let discover = v4::Message::from_bytes(&second).unwrap();
        server
            .send_to(&offer_for(&discover).to_bytes(), peer)
            .await
            .unwrap();
        let (request, peer) = recv_v4(&server).await;
        let ack = v4::new_reply_from_request(&request, v4::MessageType::Ack);
        server.send_to(&ack.to_bytes(), peer).await.unwrap();
    });

    let conversation = assert_ok!(client.exchange_v4(None).await);
    assert_eq!(conversation.len(), 4);
    server.await.unwrap();
}

#[tokio::test]
async fn test_v4_timeout_returns_partial_conversation() {
    let (client, server) = loopback_client(false).await;
    let server = tokio::spawn(async move {
        let (discover, peer) = recv_v4(&server).await;
        server
            .send_to(&offer_for(&discover).to_bytes(), peer)
            .await
            .unwrap();
        // Swallow the request and its retransmission.
        recv(&server).await;
        recv(&server).await;
    });

    let err = assert_err!(client.exchange_v4(None).await);
    assert!(err.is_timeout());
    assert_eq!(err.state, "Requesting");
    let types: Vec<_> = err
        .conversation
        .iter()
        .map(|m| m.message_type().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            v4::MessageType::Discover,
            v4::MessageType::Offer,
            v4::MessageType::Request,
        ]
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_v6_solicit_advertise_request_reply() {
    let (client, server) = loopback_client(true).await;
    let server_duid = v6::Duid::Uuid([7; 16]);
    let server = tokio::spawn(async move {
        let (data, peer) = recv(&server).await;
        let solicit = v6::Message::from_bytes(&data).unwrap();
        let advertise = v6::new_advertise_from_solicit(&solicit, server_duid.clone()).unwrap();
        server.send_to(&advertise.to_bytes(), peer).await.unwrap();

        let (data, peer) = recv(&server).await;
        let request = v6::Message::from_bytes(&data).unwrap();
        assert_eq!(request.server_id(), Some(&server_duid));
        let reply = v6::new_reply_from_message(&request, server_duid).unwrap();
        server.send_to(&reply.to_bytes(), peer).await.unwrap();
    });

    let conversation = assert_ok!(client.exchange_v6(None).await);
    let types: Vec<_> = conversation.iter().map(v6::Message::msg_type).collect();
    assert_eq!(
        types,
        vec![
            v6::MessageType::Solicit,
            v6::MessageType::Advertise,
            v6::MessageType::Request,
            v6::MessageType::Reply,
        ]
    );
    assert_eq!(conversation[2].xid(), conversation[3].xid());
    server.await.unwrap();
}

#[tokio::test]
async fn test_v6_timeout_without_server() {
    let (client, _server) = loopback_client(true).await;

    let err = assert_err!(client.exchange_v6(None).await);
    assert!(err.is_timeout());
    assert_eq!(err.state, "Soliciting");
    assert_eq!(err.conversation.len(), 1);
    assert_eq!(err.conversation[0].msg_type(), v6::MessageType::Solicit);
}
