//! Concurrent DHCP client
//!
//! Many requests can be in flight at once. A sender task drains a bounded
//! outbound queue onto the socket while a receiver task decodes inbound
//! packets and hands each one to the waiter registered for its transaction
//! ID. Responses resolve in whatever order the server answers.

use crate::{
    client::{bind_socket, MAX_DATAGRAM_SIZE},
    config::ClientConfig,
    error::{ClientError, DecodeError},
    v4, v6,
};
use std::{collections::HashMap, fmt::Debug, hash::Hash, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    net::UdpSocket,
    sync::{mpsc, oneshot, watch, Mutex},
    task::JoinHandle,
    time,
};

/// A message the async client can send and match replies against.
pub trait Exchangeable: Sized + Send + 'static {
    type Xid: Eq + Hash + Copy + Send + Debug + 'static;

    fn xid(&self) -> Self::Xid;
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError>;
}

impl Exchangeable for v4::Message {
    type Xid = v4::TransactionId;

    fn xid(&self) -> Self::Xid {
        v4::Message::xid(self)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.to_padded_bytes()
    }

    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        v4::Message::from_bytes(data)
    }
}

impl Exchangeable for v6::Message {
    type Xid = v6::TransactionId;

    fn xid(&self) -> Self::Xid {
        v6::Message::xid(self)
    }

    fn to_bytes(&self) -> Vec<u8> {
        v6::Message::to_bytes(self)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        v6::Message::from_bytes(data)
    }
}

type Pending<M> = Arc<Mutex<HashMap<<M as Exchangeable>::Xid, oneshot::Sender<M>>>>;

struct Outbound<X> {
    xid: X,
    packet: Vec<u8>,
}

/// Reports background failures unless the client was opened with
/// `ignore_errors`.
#[derive(Clone)]
struct ErrorSink {
    tx: mpsc::Sender<ClientError>,
    ignore: bool,
}

impl ErrorSink {
    fn report(&self, err: ClientError) {
        if self.ignore {
            tracing::debug!("Ignoring async client error: {}", err);
            return;
        }
        if let Err(e) = self.tx.try_send(err) {
            tracing::warn!("Dropping async client error: {}", e);
        }
    }
}

pub struct AsyncClient<M: Exchangeable> {
    socket: Arc<UdpSocket>,
    outbound: mpsc::Sender<Outbound<M::Xid>>,
    pending: Pending<M>,
    errors: mpsc::Receiver<ClientError>,
    cancel: watch::Sender<bool>,
    sender: JoinHandle<()>,
    receiver: JoinHandle<()>,
}

impl<M: Exchangeable> AsyncClient<M> {
    /// Binds a socket from `config` and starts the background tasks.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let socket = bind_socket(config)?;
        Ok(Self::open(Arc::new(socket), config.server_address, config))
    }

    /// Starts the sender and receiver tasks on `socket`. Every message is
    /// sent to `remote`.
    pub fn open(socket: Arc<UdpSocket>, remote: SocketAddr, config: &ClientConfig) -> Self {
        let depth = config.queue_depth.max(1);
        let (outbound, outbound_rx) = mpsc::channel(depth);
        let (errors_tx, errors) = mpsc::channel(depth);
        let (cancel, cancel_rx) = watch::channel(false);
        let pending: Pending<M> = Arc::new(Mutex::new(HashMap::new()));
        let sink = ErrorSink {
            tx: errors_tx,
            ignore: config.ignore_errors,
        };

        let sender = tokio::spawn(send_loop::<M>(
            socket.clone(),
            remote,
            config.write_timeout,
            outbound_rx,
            pending.clone(),
            sink.clone(),
            cancel_rx.clone(),
        ));
        let receiver = tokio::spawn(receive_loop::<M>(
            socket.clone(),
            pending.clone(),
            sink,
            cancel_rx,
        ));
        tracing::debug!("Async client started for {}, queue depth {}", remote, depth);

        Self {
            socket,
            outbound,
            pending,
            errors,
            cancel,
            sender,
            receiver,
        }
    }

    /// Queues `msg` and returns the channel its reply will arrive on.
    ///
    /// Waits for room when the outbound queue is full. The returned
    /// receiver fails if the packet could not be sent or the client closes
    /// first.
    pub async fn send(&self, msg: M) -> Result<oneshot::Receiver<M>, ClientError> {
        let xid = msg.xid();
        let (tx, rx) = oneshot::channel();
        if self.pending.lock().await.insert(xid, tx).is_some() {
            tracing::warn!("Replacing waiter for transaction {:?}", xid);
        }
        let packet = msg.to_bytes();
        if self.outbound.send(Outbound { xid, packet }).await.is_err() {
            self.pending.lock().await.remove(&xid);
            return Err(ClientError::Closed);
        }
        Ok(rx)
    }

    /// Sends `msg` and waits up to `timeout` for its reply.
    pub async fn request(&self, msg: M, timeout: Duration) -> Result<M, ClientError> {
        let xid = msg.xid();
        let rx = self.send(msg).await?;
        match time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&xid);
                Err(ClientError::Timeout(timeout))
            }
        }
    }

    /// Number of requests still waiting for a reply.
    pub async fn in_flight(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Background failures, unless the client ignores them.
    pub fn errors(&mut self) -> &mut mpsc::Receiver<ClientError> {
        &mut self.errors
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    /// Stops both tasks, then releases the queues and the socket.
    ///
    /// Unanswered requests resolve with an error.
    pub async fn close(self) {
        let Self {
            socket,
            outbound,
            pending,
            errors,
            cancel,
            sender,
            receiver,
        } = self;

        let _ = cancel.send(true);
        for (name, task) in [("sender", sender), ("receiver", receiver)] {
            if let Err(e) = task.await {
                tracing::error!("Async client {} task failed: {}", name, e);
            }
        }
        drop(outbound);
        drop(errors);
        pending.lock().await.clear();
        drop(socket);
        tracing::debug!("Async client closed");
    }
}

async fn send_loop<M: Exchangeable>(
    socket: Arc<UdpSocket>,
    remote: SocketAddr,
    write_timeout: Duration,
    mut outbound: mpsc::Receiver<Outbound<M::Xid>>,
    pending: Pending<M>,
    errors: ErrorSink,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        let Outbound { xid, packet } = tokio::select! {
            _ = cancel.changed() => break,
            next = outbound.recv() => match next {
                Some(next) => next,
                None => break,
            },
        };
        let err = match time::timeout(write_timeout, socket.send_to(&packet, remote)).await {
            Ok(Ok(sent)) => {
                tracing::debug!("Sent {} bytes for transaction {:?} to {}", sent, xid, remote);
                continue;
            }
            Ok(Err(e)) => ClientError::Io(e),
            Err(_) => ClientError::Timeout(write_timeout),
        };
        tracing::warn!("Failed to send transaction {:?}: {}", xid, err);
        pending.lock().await.remove(&xid);
        errors.report(err);
    }
    tracing::debug!("Async client sender stopped");
}

async fn receive_loop<M: Exchangeable>(
    socket: Arc<UdpSocket>,
    pending: Pending<M>,
    errors: ErrorSink,
    mut cancel: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        let (len, addr) = tokio::select! {
            _ = cancel.changed() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    tracing::warn!("Socket receive error: {}", e);
                    errors.report(ClientError::Io(e));
                    continue;
                }
            },
        };
        let msg = match M::from_bytes(&buf[..len]) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("Dropping undecodable packet from {}: {}", addr, e);
                continue;
            }
        };
        let xid = msg.xid();
        let Some(waiter) = pending.lock().await.remove(&xid) else {
            tracing::warn!("No request waiting for transaction {:?} from {}", xid, addr);
            continue;
        };
        if waiter.send(msg).is_err() {
            tracing::debug!("Waiter for transaction {:?} went away", xid);
        }
    }
    tracing::debug!("Async client receiver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v6::{new_advertise_from_solicit, new_solicit, Duid};
    use bytes::Bytes;

    const MAC: [u8; 6] = [0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4];

    fn config() -> ClientConfig {
        let mut config = ClientConfig::new_v6("lo".to_string(), Bytes::from_static(&MAC));
        config.queue_depth = 4;
        config
    }

    async fn loopback_pair() -> (Arc<UdpSocket>, UdpSocket) {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (Arc::new(client), server)
    }

    async fn recv_solicit(server: &UdpSocket) -> (v6::Message, SocketAddr) {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, peer) = server.recv_from(&mut buf).await.unwrap();
        (v6::Message::from_bytes(&buf[..len]).unwrap(), peer)
    }

    fn advertise(solicit: &v6::Message) -> Vec<u8> {
        new_advertise_from_solicit(solicit, Duid::Uuid([9; 16]))
            .unwrap()
            .to_bytes()
    }

    #[tokio::test]
    async fn test_replies_are_routed_by_transaction_id() {
        let (socket, server) = loopback_pair().await;
        let remote = server.local_addr().unwrap();
        let client = AsyncClient::<v6::Message>::open(socket, remote, &config());

        let first = new_solicit(&MAC).unwrap();
        let second = new_solicit(&MAC).unwrap();
        assert_ne!(first.xid(), second.xid());
        let first_rx = client.send(first.clone()).await.unwrap();
        let second_rx = client.send(second.clone()).await.unwrap();

        let (a, peer) = recv_solicit(&server).await;
        let (b, _) = recv_solicit(&server).await;
        // Answer in reverse order.
        server.send_to(&advertise(&b), peer).await.unwrap();
        server.send_to(&advertise(&a), peer).await.unwrap();

        let second_reply = second_rx.await.unwrap();
        let first_reply = first_rx.await.unwrap();
        assert_eq!(first_reply.xid(), first.xid());
        assert_eq!(second_reply.xid(), second.xid());
        assert_eq!(first_reply.msg_type(), v6::MessageType::Advertise);
        assert_eq!(client.in_flight().await, 0);

        client.close().await;
    }

    #[tokio::test]
    async fn test_unmatched_reply_is_dropped() {
        let (socket, server) = loopback_pair().await;
        let remote = server.local_addr().unwrap();
        let client = AsyncClient::<v6::Message>::open(socket, remote, &config());

        let solicit = new_solicit(&MAC).unwrap();
        let rx = client.send(solicit.clone()).await.unwrap();
        let (received, peer) = recv_solicit(&server).await;

        let mut stray = new_solicit(&MAC).unwrap();
        let [a, b, c] = received.xid().0;
        stray.set_xid(v6::TransactionId([a, b, c.wrapping_add(1)]));
        server.send_to(&advertise(&stray), peer).await.unwrap();
        server.send_to(&[0xde, 0xad], peer).await.unwrap();
        server.send_to(&advertise(&received), peer).await.unwrap();

        let reply = time::timeout(Duration::from_secs(2), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.xid(), solicit.xid());
        client.close().await;
    }

    #[tokio::test]
    async fn test_request_times_out_and_clears_waiter() {
        let (socket, server) = loopback_pair().await;
        let remote = server.local_addr().unwrap();
        let client = AsyncClient::<v6::Message>::open(socket, remote, &config());

        let result = client
            .request(new_solicit(&MAC).unwrap(), Duration::from_millis(50))
            .await;
        assert!(result.is_err_and(|e| e.is_timeout()));
        assert_eq!(client.in_flight().await, 0);
        client.close().await;
    }

    #[tokio::test]
    async fn test_close_resolves_outstanding_requests() {
        let (socket, server) = loopback_pair().await;
        let remote = server.local_addr().unwrap();
        let client = AsyncClient::<v6::Message>::open(socket, remote, &config());

        let rx = client.send(new_solicit(&MAC).unwrap()).await.unwrap();
        time::timeout(Duration::from_secs(2), client.close())
            .await
            .unwrap();
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_v4_request() {
        let (socket, server) = loopback_pair().await;
        let remote = server.local_addr().unwrap();
        let client = AsyncClient::<v4::Message>::open(socket, remote, &config());

        let discover = v4::new_discovery(&MAC).unwrap();
        let responder = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            let discover = v4::Message::from_bytes(&buf[..len]).unwrap();
            let offer = v4::new_reply_from_request(&discover, v4::MessageType::Offer);
            server.send_to(&offer.to_bytes(), peer).await.unwrap();
        });

        let offer = client
            .request(discover.clone(), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(offer.xid(), discover.xid());
        assert_eq!(offer.message_type(), Some(v4::MessageType::Offer));
        responder.await.unwrap();
        client.close().await;
    }
}
