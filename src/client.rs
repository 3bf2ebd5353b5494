//! DHCP exchange driver
//!
//! This module contains the transport side of a DHCP exchange:
//! - The state machine contract shared by the v4 and v6 handlers
//! - The event loop that feeds socket I/O and timeouts into a handler
//! - Partial conversation reporting when an exchange fails

use crate::{
    config::ClientConfig,
    error::ClientError,
    network,
    v4::{self, DhcpV4Handler},
    v6::{self, DhcpV6Handler},
};
use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    net::UdpSocket,
    time::{self, Instant},
};

/// Largest datagram the client reads.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// Binds a device-bound socket for the address family of `config.server_address`.
pub(crate) fn bind_socket(config: &ClientConfig) -> Result<UdpSocket, ClientError> {
    let socket = match config.server_address.ip() {
        IpAddr::V4(_) => network::new_v4_socket(&config.interface, config.client_port)?,
        IpAddr::V6(group) => {
            network::new_v6_socket(&config.interface, config.client_port, Some(group))?
        }
    };
    tracing::info!(
        "Bound {} client socket on interface '{}' port {}",
        if config.is_v6() { "DHCPv6" } else { "DHCPv4" },
        config.interface,
        config.client_port
    );
    Ok(socket)
}

/// Actions a state machine asks the driver to perform.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Transmit the packet to the configured server address and wait for a reply.
    Send(Vec<u8>),
    /// Keep waiting for a reply until the current deadline.
    Wait,
    /// The exchange is complete.
    Done,
}

/// External events a state machine reacts to.
#[derive(Debug)]
pub enum Event<'a> {
    Start,
    PacketReceived(&'a [u8]),
    /// No reply arrived within the given read timeout.
    Timeout(Duration),
}

/// Common interface of the DHCPv4 and DHCPv6 client state machines.
pub trait DhcpStateMachine {
    /// Decoded message type recorded in the conversation.
    type Message;

    /// Handles one event and returns the next action for the driver.
    fn handle_event(&mut self, event: Event<'_>) -> Result<Action, ClientError>;

    /// Name of the current state, for logging.
    fn state_name(&self) -> &'static str;

    /// Every message sent or accepted so far, in order.
    fn take_conversation(&mut self) -> Vec<Self::Message>;
}

/// A failed exchange together with the messages exchanged before the failure.
#[derive(Error, Debug)]
#[error("exchange failed in state {state} after {} message(s)", .conversation.len())]
pub struct ExchangeError<M> {
    pub state: &'static str,
    pub conversation: Vec<M>,
    #[source]
    pub source: ClientError,
}

impl<M> ExchangeError<M> {
    pub fn is_timeout(&self) -> bool {
        self.source.is_timeout()
    }
}

pub struct Client {
    config: ClientConfig,
    socket: UdpSocket,
}

impl Client {
    /// Opens the client on `config.interface`.
    pub async fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let socket = bind_socket(&config)?;
        Ok(Self { config, socket })
    }

    /// Uses an already bound socket, e.g. a loopback socket in tests.
    pub fn from_socket(socket: UdpSocket, config: ClientConfig) -> Self {
        Self { config, socket }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    /// Runs a DORA exchange, starting from `discover` or a default DISCOVER.
    pub async fn exchange_v4(
        &self,
        discover: Option<v4::Message>,
    ) -> Result<Vec<v4::Message>, ExchangeError<v4::Message>> {
        let mut handler = match discover {
            Some(msg) => DhcpV4Handler::with_initial(msg, self.config.retries),
            None => DhcpV4Handler::new(self.config.mac_address.clone(), self.config.retries),
        };
        self.exchange(&mut handler).await
    }

    /// Runs a SOLICIT/ADVERTISE/REQUEST/REPLY exchange, starting from
    /// `solicit` or a default SOLICIT.
    pub async fn exchange_v6(
        &self,
        solicit: Option<v6::Message>,
    ) -> Result<Vec<v6::Message>, ExchangeError<v6::Message>> {
        let mut handler = match solicit {
            Some(msg) => DhcpV6Handler::with_initial(msg, self.config.retries),
            None => DhcpV6Handler::new(self.config.mac_address.clone(), self.config.retries),
        };
        self.exchange(&mut handler).await
    }

    /// Drives `machine` until it is done or fails.
    ///
    /// On failure the messages exchanged so far are returned inside the
    /// error so callers can see how far the exchange got.
    pub async fn exchange<S: DhcpStateMachine>(
        &self,
        machine: &mut S,
    ) -> Result<Vec<S::Message>, ExchangeError<S::Message>> {
        match self.run(machine).await {
            Ok(()) => Ok(machine.take_conversation()),
            Err(source) => {
                tracing::warn!("Exchange failed in {} state: {}", machine.state_name(), source);
                Err(ExchangeError {
                    state: machine.state_name(),
                    conversation: machine.take_conversation(),
                    source,
                })
            }
        }
    }

    async fn run<S: DhcpStateMachine>(&self, machine: &mut S) -> Result<(), ClientError> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut deadline = Instant::now() + self.config.read_timeout;
        let mut next_action = machine.handle_event(Event::Start)?;

        loop {
            tracing::debug!("State: {}, Action: {:?}", machine.state_name(), next_action);

            match next_action {
                Action::Send(packet) => {
                    self.send(&packet).await?;
                    deadline = Instant::now() + self.config.read_timeout;
                    next_action = self.wait_for_response(machine, deadline, &mut buf).await?;
                }
                Action::Wait => {
                    next_action = self.wait_for_response(machine, deadline, &mut buf).await?;
                }
                Action::Done => {
                    tracing::info!("Exchange complete in {} state", machine.state_name());
                    return Ok(());
                }
            }
        }
    }

    async fn send(&self, packet: &[u8]) -> Result<(), ClientError> {
        let target = self.config.server_address;
        match time::timeout(self.config.write_timeout, self.socket.send_to(packet, target)).await {
            Ok(sent) => {
                let sent = sent?;
                tracing::debug!("Sent {} bytes to {}", sent, target);
                Ok(())
            }
            Err(_) => Err(ClientError::Timeout(self.config.write_timeout)),
        }
    }

    /// Waits for a datagram until `deadline` and hands it to the state machine.
    async fn wait_for_response<S: DhcpStateMachine>(
        &self,
        machine: &mut S,
        deadline: Instant,
        buf: &mut [u8],
    ) -> Result<Action, ClientError> {
        match time::timeout_at(deadline, self.socket.recv_from(buf)).await {
            Ok(Ok((len, addr))) => {
                tracing::debug!("Received {} bytes from {}", len, addr);
                machine.handle_event(Event::PacketReceived(&buf[..len]))
            }
            Ok(Err(e)) => {
                tracing::error!("Socket receive error: {}", e);
                Err(ClientError::Io(e))
            }
            Err(_) => {
                tracing::debug!("Timeout waiting for response");
                machine.handle_event(Event::Timeout(self.config.read_timeout))
            }
        }
    }
}
