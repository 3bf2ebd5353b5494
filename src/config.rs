use bytes::Bytes;
use clap::Parser;
use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6},
    time::Duration,
};

/// All-DHCP-relay-agents-and-servers multicast group.
pub const ALL_DHCP_RELAY_AGENTS_AND_SERVERS: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 1, 2);

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The network interface to bind to (e.g., 'eth0', 'lo')
    #[arg(short, long)]
    pub interface: String,

    /// Run a DHCPv6 exchange instead of DHCPv4
    #[arg(long)]
    pub v6: bool,

    /// Seconds to wait for each reply
    #[arg(long, default_value_t = 3)]
    pub timeout: u64,

    /// Retransmissions before giving up
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Log exchange details
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub interface: String,
    pub mac_address: Bytes,
    pub client_port: u16,
    pub server_port: u16,
    pub server_address: SocketAddr,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub retries: u32,
    /// Capacity of the async client's outbound queue.
    pub queue_depth: usize,
    /// Drop async receive errors instead of reporting them.
    pub ignore_errors: bool,
}

impl ClientConfig {
    /// DHCPv4 defaults: bind port 68 and broadcast to port 67.
    pub fn new(interface: String, mac_address: Bytes) -> Self {
        Self {
            interface,
            mac_address,
            client_port: crate::v4::types::CLIENT_PORT,
            server_port: crate::v4::types::SERVER_PORT,
            server_address: SocketAddr::from((Ipv4Addr::BROADCAST, crate::v4::types::SERVER_PORT)),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            retries: 3,
            queue_depth: 16,
            ignore_errors: false,
        }
    }

    /// DHCPv6 defaults: bind port 546 and multicast to ff02::1:2 port 547.
    pub fn new_v6(interface: String, mac_address: Bytes) -> Self {
        let server_port = crate::v6::types::SERVER_PORT;
        Self {
            client_port: crate::v6::types::CLIENT_PORT,
            server_port,
            server_address: SocketAddr::V6(SocketAddrV6::new(
                ALL_DHCP_RELAY_AGENTS_AND_SERVERS,
                server_port,
                0,
                0,
            )),
            ..Self::new(interface, mac_address)
        }
    }

    /// Applies the command line overrides.
    pub fn with_args(mut self, args: &Args) -> Self {
        self.read_timeout = Duration::from_secs(args.timeout);
        self.retries = args.retries;
        self
    }

    pub fn is_v6(&self) -> bool {
        self.server_address.is_ipv6()
    }
}
