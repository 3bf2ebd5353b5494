use bytes::{BufMut, Bytes, BytesMut};
use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket as StdUdpSocket},
};
use thiserror::Error;
use tokio::net::UdpSocket as TokioUdpSocket;

use crate::error::ClientError;

/// Defines all possible errors for socket operations.
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("Failed to create a new socket")]
    CreateSocket(#[source] io::Error),

    #[error("Failed to enable broadcast on socket")]
    SetBroadcast(#[source] io::Error),

    #[error("Failed to set SO_BINDTODEVICE on interface '{interface}'")]
    BindToDevice {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind socket to address")]
    BindSocket(#[source] io::Error),

    #[error("Failed to set IPV6_V6ONLY on socket")]
    SetOnlyV6(#[source] io::Error),

    #[error("Failed to set SO_REUSEADDR on socket")]
    SetReuseAddress(#[source] io::Error),

    #[error("Failed to join multicast group {group}")]
    JoinMulticast {
        group: Ipv6Addr,
        #[source]
        source: io::Error,
    },

    #[error("Failed to set socket to non-blocking mode")]
    SetNonBlocking(#[source] io::Error),

    #[error("Failed to convert socket to TokioUdpSocket")]
    ConvertToTokio(#[source] io::Error),

    #[error("Binding to a specific device is not implemented on this platform")]
    NotImplemented,
}

/// Creates a new `tokio::net::UdpSocket` bound to a specific network device and port.
///
/// The address family follows `bind`: an IPv4 socket gets `SO_BROADCAST`, an
/// IPv6 socket is restricted to IPv6 traffic.
///
/// # Arguments
/// * `interface` - The name of the network interface (e.g., "eth0").
/// * `bind` - The local address and port to bind the socket to.
#[cfg(target_os = "linux")]
pub fn new_tokio_socket_bound_to_device(
    interface: &str,
    bind: SocketAddr,
) -> Result<TokioUdpSocket, SocketError> {
    use socket2::{Domain, Socket, Type};
    use std::os::fd::AsRawFd;

    let socket2 =
        Socket::new(Domain::for_address(bind), Type::DGRAM, None).map_err(SocketError::CreateSocket)?;

    if bind.is_ipv4() {
        socket2
            .set_broadcast(true)
            .map_err(SocketError::SetBroadcast)?;
    } else {
        socket2
            .set_only_v6(true)
            .map_err(SocketError::SetOnlyV6)?;
    }

    socket2
        .set_reuse_address(true)
        .map_err(SocketError::SetReuseAddress)?;

    // SAFETY: the descriptor is owned by `socket2` and the option value
    // points at `interface.len()` valid bytes.
    let ret = unsafe {
        libc::setsockopt(
            socket2.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            interface.as_ptr() as *const libc::c_void,
            interface.len() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(SocketError::BindToDevice {
            interface: interface.to_string(),
            source: io::Error::last_os_error(),
        });
    }

    socket2.bind(&bind.into()).map_err(SocketError::BindSocket)?;

    let std_socket: StdUdpSocket = socket2.into();
    std_socket
        .set_nonblocking(true)
        .map_err(SocketError::SetNonBlocking)?;
    TokioUdpSocket::from_std(std_socket).map_err(SocketError::ConvertToTokio)
}

/// Fallback for non-Linux systems where `SO_BINDTODEVICE` is not available.
#[cfg(not(target_os = "linux"))]
pub fn new_tokio_socket_bound_to_device(
    _interface: &str,
    _bind: SocketAddr,
) -> Result<TokioUdpSocket, SocketError> {
    Err(SocketError::NotImplemented)
}

/// A DHCPv4 client socket on `0.0.0.0:port`.
pub fn new_v4_socket(interface: &str, port: u16) -> Result<TokioUdpSocket, SocketError> {
    new_tokio_socket_bound_to_device(interface, SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
}

/// A DHCPv6 client socket on `[::]:port` that has joined `group` on `interface`.
pub fn new_v6_socket(
    interface: &str,
    port: u16,
    group: Option<Ipv6Addr>,
) -> Result<TokioUdpSocket, SocketError> {
    let socket =
        new_tokio_socket_bound_to_device(interface, SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)))?;
    if let Some(group) = group.filter(Ipv6Addr::is_multicast) {
        let index = interface_index(interface).unwrap_or(0);
        socket
            .join_multicast_v6(&group, index)
            .map_err(|source| SocketError::JoinMulticast { group, source })?;
    }
    Ok(socket)
}

/// Parses a MAC address string (e.g., "0a:1b:2c:3d:4e:5f") into a `Bytes` object.
pub fn parse_mac_address(mac_str: &str) -> Result<Bytes, ClientError> {
    let mut bytes = BytesMut::new();
    for byte_str in mac_str.trim().split(':') {
        if byte_str.is_empty() {
            continue;
        }
        let byte = u8::from_str_radix(byte_str, 16)
            .map_err(|e| ClientError::MacParse(format!("{mac_str:?}: {e}")))?;
        bytes.put_u8(byte);
    }
    if bytes.is_empty() {
        return Err(ClientError::MacParse(format!("{mac_str:?}: no octets")));
    }
    Ok(bytes.freeze())
}

/// Reads the hardware (MAC) address of `interface` from sysfs.
pub async fn hardware_address(interface: &str) -> Result<Bytes, ClientError> {
    let mac_path = format!("/sys/class/net/{interface}/address");
    let mac_str = tokio::fs::read_to_string(&mac_path)
        .await
        .map_err(|e| ClientError::InterfaceInvalid(format!("{interface}: {e}")))?;
    tracing::debug!("Found MAC address {} for {}", mac_str.trim(), interface);
    parse_mac_address(&mac_str)
}

/// The kernel interface index, or `None` if the interface does not exist.
pub fn interface_index(interface: &str) -> Option<u32> {
    std::fs::read_to_string(format!("/sys/class/net/{interface}/ifindex"))
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// The first IPv6 link-local address configured on `interface`.
pub async fn link_local_address(interface: &str) -> Result<Ipv6Addr, ClientError> {
    let table = tokio::fs::read_to_string("/proc/net/if_inet6").await?;
    parse_if_inet6(&table, interface)
        .into_iter()
        .find(|ip| is_link_local(ip))
        .ok_or_else(|| {
            ClientError::InterfaceInvalid(format!("{interface}: no IPv6 link-local address"))
        })
}

/// Addresses of `interface` listed in a `/proc/net/if_inet6` table.
fn parse_if_inet6(table: &str, interface: &str) -> Vec<Ipv6Addr> {
    table
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 || fields[5] != interface || fields[0].len() != 32 {
                return None;
            }
            let raw = u128::from_str_radix(fields[0], 16).ok()?;
            Some(Ipv6Addr::from(raw))
        })
        .collect()
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mac_address() {
        let mac = parse_mac_address("0a:1b:2c:3d:4e:5f\n").unwrap();
        assert_eq!(&mac[..], &[0x0a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f]);
    }

    #[test]
    fn rejects_bad_mac_address() {
        assert!(matches!(
            parse_mac_address("0a:zz:2c"),
            Err(ClientError::MacParse(_))
        ));
        assert!(matches!(parse_mac_address(""), Err(ClientError::MacParse(_))));
    }

    #[test]
    fn only_v6_failure_names_the_socket_option() {
        use std::error::Error as _;

        let err = SocketError::SetOnlyV6(io::Error::from(io::ErrorKind::InvalidInput));
        assert_eq!(err.to_string(), "Failed to set IPV6_V6ONLY on socket");
        assert!(err.source().is_some());
    }

    #[test]
    fn finds_link_local_in_if_inet6() {
        let table = "\
00000000000000000000000000000001 01 80 10 80       lo
fe800000000000000a0027fffe5b6c4d 02 40 20 80     eth0
20010db8000000000000000000000005 02 40 00 80     eth0
";
        let addrs = parse_if_inet6(table, "eth0");
        assert_eq!(addrs.len(), 2);
        let ll: Ipv6Addr = "fe80::a00:27ff:fe5b:6c4d".parse().unwrap();
        assert_eq!(addrs[0], ll);
        assert!(is_link_local(&addrs[0]));
        assert!(!is_link_local(&addrs[1]));
        assert!(parse_if_inet6(table, "wlan0").is_empty());
    }
}
