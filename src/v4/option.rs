//! DHCPv4 option values and the code-to-parser dispatch.

use super::options::{split_frames, write_tlv, Frame};
use super::types::{MessageType, OptionCode};
use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::rfc1035label::Labels;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Largest value behind a one-byte length prefix.
const MAX_ENTRY_LEN: usize = u8::MAX as usize;

/// A decoded DHCPv4 option.
///
/// Codes without a dedicated variant decode to [`DhcpOption::Unknown`] and
/// re-encode byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    Pad,
    SubnetMask(Ipv4Addr),
    TimeOffset(i32),
    Router(Vec<Ipv4Addr>),
    TimeServer(Vec<Ipv4Addr>),
    NameServer(Vec<Ipv4Addr>),
    DomainNameServer(Vec<Ipv4Addr>),
    LogServer(Vec<Ipv4Addr>),
    HostName(String),
    DomainName(String),
    RootPath(String),
    InterfaceMtu(u16),
    BroadcastAddress(Ipv4Addr),
    NtpServers(Vec<Ipv4Addr>),
    VendorSpecific(Vec<u8>),
    RequestedIpAddress(Ipv4Addr),
    AddressLeaseTime(Duration),
    MessageType(MessageType),
    ServerIdentifier(Ipv4Addr),
    ParameterRequestList(Vec<OptionCode>),
    Message(String),
    MaxMessageSize(u16),
    RenewalTime(Duration),
    RebindingTime(Duration),
    ClassIdentifier(String),
    ClientIdentifier(Vec<u8>),
    TftpServerName(String),
    BootfileName(String),
    UserClass(UserClass),
    RelayAgentInformation(RelayAgentInformation),
    ClientSystemArchitecture(Vec<u16>),
    ClientNetworkInterfaceId(NetworkInterfaceId),
    ClientMachineId(Vec<u8>),
    DomainSearch(Labels),
    ClasslessStaticRoute(Vec<Route>),
    VendorIdentifyingVendorClass(Vec<VendorClass>),
    End,
    Unknown(OptionCode, Vec<u8>),
}

impl DhcpOption {
    /// Dispatches `data` to the parser registered for `code`.
    pub fn parse(code: OptionCode, data: &[u8]) -> Result<Self, DecodeError> {
        let opt = match code {
            OptionCode::PAD => DhcpOption::Pad,
            OptionCode::END => DhcpOption::End,
            OptionCode::SUBNET_MASK => DhcpOption::SubnetMask(ip(code, data)?),
            OptionCode::TIME_OFFSET => DhcpOption::TimeOffset(u32_value(code, data)? as i32),
            OptionCode::ROUTER => DhcpOption::Router(ip_list(code, data)?),
            OptionCode::TIME_SERVER => DhcpOption::TimeServer(ip_list(code, data)?),
            OptionCode::NAME_SERVER => DhcpOption::NameServer(ip_list(code, data)?),
            OptionCode::DOMAIN_NAME_SERVER => DhcpOption::DomainNameServer(ip_list(code, data)?),
            OptionCode::LOG_SERVER => DhcpOption::LogServer(ip_list(code, data)?),
            OptionCode::HOST_NAME => text(code, data, DhcpOption::HostName),
            OptionCode::DOMAIN_NAME => text(code, data, DhcpOption::DomainName),
            OptionCode::ROOT_PATH => text(code, data, DhcpOption::RootPath),
            OptionCode::INTERFACE_MTU => DhcpOption::InterfaceMtu(u16_value(code, data)?),
            OptionCode::BROADCAST_ADDRESS => DhcpOption::BroadcastAddress(ip(code, data)?),
            OptionCode::NTP_SERVERS => DhcpOption::NtpServers(ip_list(code, data)?),
            OptionCode::VENDOR_SPECIFIC => DhcpOption::VendorSpecific(data.to_vec()),
            OptionCode::REQUESTED_IP_ADDRESS => DhcpOption::RequestedIpAddress(ip(code, data)?),
            OptionCode::ADDRESS_LEASE_TIME => DhcpOption::AddressLeaseTime(seconds(code, data)?),
            OptionCode::MESSAGE_TYPE => {
                DhcpOption::MessageType(MessageType::from(u8_value(code, data)?))
            }
            OptionCode::SERVER_IDENTIFIER => DhcpOption::ServerIdentifier(ip(code, data)?),
            OptionCode::PARAMETER_REQUEST_LIST => DhcpOption::ParameterRequestList(
                data.iter().copied().map(OptionCode).collect(),
            ),
            OptionCode::MESSAGE => text(code, data, DhcpOption::Message),
            OptionCode::MAX_MESSAGE_SIZE => DhcpOption::MaxMessageSize(u16_value(code, data)?),
            OptionCode::RENEWAL_TIME => DhcpOption::RenewalTime(seconds(code, data)?),
            OptionCode::REBINDING_TIME => DhcpOption::RebindingTime(seconds(code, data)?),
            OptionCode::CLASS_IDENTIFIER => text(code, data, DhcpOption::ClassIdentifier),
            OptionCode::CLIENT_IDENTIFIER => {
                if data.len() < 2 {
                    return Err(DecodeError::length(code.to_string(), data.len()));
                }
                DhcpOption::ClientIdentifier(data.to_vec())
            }
            OptionCode::TFTP_SERVER_NAME => text(code, data, DhcpOption::TftpServerName),
            OptionCode::BOOTFILE_NAME => text(code, data, DhcpOption::BootfileName),
            OptionCode::USER_CLASS => DhcpOption::UserClass(UserClass::from_bytes(data)?),
            OptionCode::RELAY_AGENT_INFORMATION => {
                DhcpOption::RelayAgentInformation(RelayAgentInformation::from_bytes(data)?)
            }
            OptionCode::CLIENT_SYSTEM_ARCHITECTURE => {
                if data.is_empty() || data.len() % 2 != 0 {
                    return Err(DecodeError::length(code.to_string(), data.len()));
                }
                DhcpOption::ClientSystemArchitecture(
                    data.chunks_exact(2)
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .collect(),
                )
            }
            OptionCode::CLIENT_NETWORK_INTERFACE_ID => {
                DhcpOption::ClientNetworkInterfaceId(NetworkInterfaceId::from_bytes(data)?)
            }
            OptionCode::CLIENT_MACHINE_ID => DhcpOption::ClientMachineId(data.to_vec()),
            OptionCode::DOMAIN_SEARCH => DhcpOption::DomainSearch(Labels::from_bytes(data)?),
            OptionCode::CLASSLESS_STATIC_ROUTE => {
                DhcpOption::ClasslessStaticRoute(Route::list_from_bytes(data)?)
            }
            OptionCode::VENDOR_IDENTIFYING_VENDOR_CLASS => {
                DhcpOption::VendorIdentifyingVendorClass(VendorClass::list_from_bytes(data)?)
            }
            _ => DhcpOption::Unknown(code, data.to_vec()),
        };
        Ok(opt)
    }

    pub fn code(&self) -> OptionCode {
        match self {
            DhcpOption::Pad => OptionCode::PAD,
            DhcpOption::SubnetMask(_) => OptionCode::SUBNET_MASK,
            DhcpOption::TimeOffset(_) => OptionCode::TIME_OFFSET,
            DhcpOption::Router(_) => OptionCode::ROUTER,
            DhcpOption::TimeServer(_) => OptionCode::TIME_SERVER,
            DhcpOption::NameServer(_) => OptionCode::NAME_SERVER,
            DhcpOption::DomainNameServer(_) => OptionCode::DOMAIN_NAME_SERVER,
            DhcpOption::LogServer(_) => OptionCode::LOG_SERVER,
            DhcpOption::HostName(_) => OptionCode::HOST_NAME,
            DhcpOption::DomainName(_) => OptionCode::DOMAIN_NAME,
            DhcpOption::RootPath(_) => OptionCode::ROOT_PATH,
            DhcpOption::InterfaceMtu(_) => OptionCode::INTERFACE_MTU,
            DhcpOption::BroadcastAddress(_) => OptionCode::BROADCAST_ADDRESS,
            DhcpOption::NtpServers(_) => OptionCode::NTP_SERVERS,
            DhcpOption::VendorSpecific(_) => OptionCode::VENDOR_SPECIFIC,
            DhcpOption::RequestedIpAddress(_) => OptionCode::REQUESTED_IP_ADDRESS,
            DhcpOption::AddressLeaseTime(_) => OptionCode::ADDRESS_LEASE_TIME,
            DhcpOption::MessageType(_) => OptionCode::MESSAGE_TYPE,
            DhcpOption::ServerIdentifier(_) => OptionCode::SERVER_IDENTIFIER,
            DhcpOption::ParameterRequestList(_) => OptionCode::PARAMETER_REQUEST_LIST,
            DhcpOption::Message(_) => OptionCode::MESSAGE,
            DhcpOption::MaxMessageSize(_) => OptionCode::MAX_MESSAGE_SIZE,
            DhcpOption::RenewalTime(_) => OptionCode::RENEWAL_TIME,
            DhcpOption::RebindingTime(_) => OptionCode::REBINDING_TIME,
            DhcpOption::ClassIdentifier(_) => OptionCode::CLASS_IDENTIFIER,
            DhcpOption::ClientIdentifier(_) => OptionCode::CLIENT_IDENTIFIER,
            DhcpOption::TftpServerName(_) => OptionCode::TFTP_SERVER_NAME,
            DhcpOption::BootfileName(_) => OptionCode::BOOTFILE_NAME,
            DhcpOption::UserClass(_) => OptionCode::USER_CLASS,
            DhcpOption::RelayAgentInformation(_) => OptionCode::RELAY_AGENT_INFORMATION,
            DhcpOption::ClientSystemArchitecture(_) => OptionCode::CLIENT_SYSTEM_ARCHITECTURE,
            DhcpOption::ClientNetworkInterfaceId(_) => OptionCode::CLIENT_NETWORK_INTERFACE_ID,
            DhcpOption::ClientMachineId(_) => OptionCode::CLIENT_MACHINE_ID,
            DhcpOption::DomainSearch(_) => OptionCode::DOMAIN_SEARCH,
            DhcpOption::ClasslessStaticRoute(_) => OptionCode::CLASSLESS_STATIC_ROUTE,
            DhcpOption::VendorIdentifyingVendorClass(_) => {
                OptionCode::VENDOR_IDENTIFYING_VENDOR_CLASS
            }
            DhcpOption::End => OptionCode::END,
            DhcpOption::Unknown(code, _) => *code,
        }
    }

    /// The option's value bytes, without code or length.
    pub fn value_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        match self {
            DhcpOption::Pad | DhcpOption::End => {}
            DhcpOption::SubnetMask(ip)
            | DhcpOption::BroadcastAddress(ip)
            | DhcpOption::RequestedIpAddress(ip)
            | DhcpOption::ServerIdentifier(ip) => buf.put_slice(&ip.octets()),
            DhcpOption::TimeOffset(offset) => buf.put_i32(*offset),
            DhcpOption::Router(ips)
            | DhcpOption::TimeServer(ips)
            | DhcpOption::NameServer(ips)
            | DhcpOption::DomainNameServer(ips)
            | DhcpOption::LogServer(ips)
            | DhcpOption::NtpServers(ips) => {
                for ip in ips {
                    buf.put_slice(&ip.octets());
                }
            }
            DhcpOption::HostName(s)
            | DhcpOption::DomainName(s)
            | DhcpOption::RootPath(s)
            | DhcpOption::Message(s)
            | DhcpOption::ClassIdentifier(s)
            | DhcpOption::TftpServerName(s)
            | DhcpOption::BootfileName(s) => buf.put_slice(s.as_bytes()),
            DhcpOption::InterfaceMtu(n) | DhcpOption::MaxMessageSize(n) => buf.put_u16(*n),
            DhcpOption::VendorSpecific(data)
            | DhcpOption::ClientIdentifier(data)
            | DhcpOption::ClientMachineId(data)
            | DhcpOption::Unknown(_, data) => buf.put_slice(data),
            DhcpOption::AddressLeaseTime(d)
            | DhcpOption::RenewalTime(d)
            | DhcpOption::RebindingTime(d) => buf.put_u32(clamp_secs(*d)),
            DhcpOption::MessageType(t) => buf.put_u8(u8::from(*t)),
            DhcpOption::ParameterRequestList(codes) => {
                for code in codes {
                    buf.put_u8(code.0);
                }
            }
            DhcpOption::UserClass(uc) => uc.write_to(&mut buf),
            DhcpOption::RelayAgentInformation(rai) => rai.write_to(&mut buf),
            DhcpOption::ClientSystemArchitecture(archs) => {
                for arch in archs {
                    buf.put_u16(*arch);
                }
            }
            DhcpOption::ClientNetworkInterfaceId(nii) => nii.write_to(&mut buf),
            DhcpOption::DomainSearch(labels) => buf.put_slice(&labels.to_bytes()),
            DhcpOption::ClasslessStaticRoute(routes) => {
                for route in routes {
                    route.write_to(&mut buf);
                }
            }
            DhcpOption::VendorIdentifyingVendorClass(classes) => {
                for class in classes {
                    class.write_to(&mut buf);
                }
            }
        }
        buf.to_vec()
    }
}

impl fmt::Display for DhcpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.code())?;
        match self {
            DhcpOption::Pad | DhcpOption::End => Ok(()),
            DhcpOption::SubnetMask(ip)
            | DhcpOption::BroadcastAddress(ip)
            | DhcpOption::RequestedIpAddress(ip)
            | DhcpOption::ServerIdentifier(ip) => write!(f, "{ip}"),
            DhcpOption::TimeOffset(offset) => write!(f, "{offset}s"),
            DhcpOption::Router(ips)
            | DhcpOption::TimeServer(ips)
            | DhcpOption::NameServer(ips)
            | DhcpOption::DomainNameServer(ips)
            | DhcpOption::LogServer(ips)
            | DhcpOption::NtpServers(ips) => write_list(f, ips),
            DhcpOption::HostName(s)
            | DhcpOption::DomainName(s)
            | DhcpOption::RootPath(s)
            | DhcpOption::Message(s)
            | DhcpOption::ClassIdentifier(s)
            | DhcpOption::TftpServerName(s)
            | DhcpOption::BootfileName(s) => write!(f, "{s}"),
            DhcpOption::InterfaceMtu(n) | DhcpOption::MaxMessageSize(n) => write!(f, "{n}"),
            DhcpOption::VendorSpecific(data)
            | DhcpOption::ClientIdentifier(data)
            | DhcpOption::ClientMachineId(data)
            | DhcpOption::Unknown(_, data) => write!(f, "{data:02x?}"),
            DhcpOption::AddressLeaseTime(d)
            | DhcpOption::RenewalTime(d)
            | DhcpOption::RebindingTime(d) => write!(f, "{d:?}"),
            DhcpOption::MessageType(t) => write!(f, "{t}"),
            DhcpOption::ParameterRequestList(codes) => write_list(f, codes),
            DhcpOption::UserClass(uc) => write!(f, "{uc}"),
            DhcpOption::RelayAgentInformation(rai) => write!(f, "{rai}"),
            DhcpOption::ClientSystemArchitecture(archs) => write_list(f, archs),
            DhcpOption::ClientNetworkInterfaceId(nii) => write!(f, "{nii}"),
            DhcpOption::DomainSearch(labels) => write!(f, "{labels}"),
            DhcpOption::ClasslessStaticRoute(routes) => write_list(f, routes),
            DhcpOption::VendorIdentifyingVendorClass(classes) => write_list(f, classes),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn clamp_secs(d: Duration) -> u32 {
    u32::try_from(d.as_secs()).unwrap_or(u32::MAX)
}

/// Text that is not UTF-8 stays an [`DhcpOption::Unknown`] so its bytes
/// survive re-encoding.
fn text(code: OptionCode, data: &[u8], variant: fn(String) -> DhcpOption) -> DhcpOption {
    match std::str::from_utf8(data) {
        Ok(s) => variant(s.to_owned()),
        Err(_) => {
            tracing::debug!("option {} is not UTF-8, keeping raw bytes", code);
            DhcpOption::Unknown(code, data.to_vec())
        }
    }
}

/// Writes `data` behind a one-byte length. Longer values are truncated to
/// 255 bytes with a warning.
fn put_len_prefixed(buf: &mut BytesMut, what: &str, data: &[u8]) {
    let data = if data.len() > MAX_ENTRY_LEN {
        tracing::warn!("{} entry of {} bytes truncated", what, data.len());
        &data[..MAX_ENTRY_LEN]
    } else {
        data
    };
    buf.put_u8(data.len() as u8);
    buf.put_slice(data);
}

fn u8_value(code: OptionCode, data: &[u8]) -> Result<u8, DecodeError> {
    match data {
        [n] => Ok(*n),
        _ => Err(DecodeError::length(code.to_string(), data.len())),
    }
}

fn u16_value(code: OptionCode, data: &[u8]) -> Result<u16, DecodeError> {
    match data {
        [a, b] => Ok(u16::from_be_bytes([*a, *b])),
        _ => Err(DecodeError::length(code.to_string(), data.len())),
    }
}

fn u32_value(code: OptionCode, data: &[u8]) -> Result<u32, DecodeError> {
    let bytes: [u8; 4] = data
        .try_into()
        .map_err(|_| DecodeError::length(code.to_string(), data.len()))?;
    Ok(u32::from_be_bytes(bytes))
}

fn seconds(code: OptionCode, data: &[u8]) -> Result<Duration, DecodeError> {
    u32_value(code, data).map(|secs| Duration::from_secs(u64::from(secs)))
}

fn ip(code: OptionCode, data: &[u8]) -> Result<Ipv4Addr, DecodeError> {
    u32_value(code, data).map(Ipv4Addr::from)
}

/// At least one address, and a whole number of them.
fn ip_list(code: OptionCode, data: &[u8]) -> Result<Vec<Ipv4Addr>, DecodeError> {
    if data.is_empty() || data.len() % 4 != 0 {
        return Err(DecodeError::length(code.to_string(), data.len()));
    }
    Ok(data
        .chunks_exact(4)
        .map(|c| Ipv4Addr::new(c[0], c[1], c[2], c[3]))
        .collect())
}

/// Option 77, either an RFC 3004 list of length-prefixed classes or a
/// single opaque string as sent by many non-compliant clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserClass {
    pub user_classes: Vec<Vec<u8>>,
    pub rfc3004: bool,
}

impl UserClass {
    pub fn rfc3004<I, T>(classes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        Self {
            user_classes: classes.into_iter().map(Into::into).collect(),
            rfc3004: true,
        }
    }

    pub fn opaque(data: impl Into<Vec<u8>>) -> Self {
        Self {
            user_classes: vec![data.into()],
            rfc3004: false,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::length(
                OptionCode::USER_CLASS.to_string(),
                0,
            ));
        }

        // The payload is RFC 3004 only if the embedded lengths add up to
        // exactly the option length. A zero length is never valid there.
        let mut pos = 0;
        let mut compliant = true;
        while pos < data.len() {
            let len = data[pos] as usize;
            if len == 0 {
                return Err(DecodeError::value(
                    OptionCode::USER_CLASS.to_string(),
                    format!("zero-length class at offset {pos}"),
                ));
            }
            if pos + 1 + len > data.len() {
                compliant = false;
                break;
            }
            pos += 1 + len;
        }

        if !compliant {
            return Ok(Self::opaque(data));
        }

        let mut cursor = Cursor::new(data);
        let mut user_classes = Vec::new();
        while cursor.has(1) {
            let len = cursor.read_u8() as usize;
            user_classes.push(cursor.read_n(len).to_vec());
        }
        cursor.finish()?;
        Ok(Self {
            user_classes,
            rfc3004: true,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        if self.rfc3004 {
            for class in &self.user_classes {
                put_len_prefixed(buf, "User Class", class);
            }
        } else if let Some(class) = self.user_classes.first() {
            buf.put_slice(class);
        }
    }
}

impl fmt::Display for UserClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes: Vec<_> = self
            .user_classes
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        if self.rfc3004 {
            write!(f, "{}", classes.join(", "))
        } else {
            write!(f, "{} (non-RFC 3004)", classes.join(", "))
        }
    }
}

/// Sub-option codes of the relay agent information option (RFC 3046 and
/// later additions).
pub mod relay_sub_option {
    pub const CIRCUIT_ID: u8 = 1;
    pub const REMOTE_ID: u8 = 2;
    pub const LINK_SELECTION: u8 = 5;
    pub const SUBSCRIBER_ID: u8 = 6;
    pub const RELAY_PORT: u8 = 19;
    pub const SERVER_IDENTIFIER_OVERRIDE: u8 = 11;
}

/// A raw sub-option inside an encapsulating option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubOption {
    pub code: u8,
    pub data: Vec<u8>,
}

/// Option 82. Sub-options share the option framing but have their own
/// code space, so they stay undecoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayAgentInformation {
    pub options: Vec<SubOption>,
}

impl RelayAgentInformation {
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let options = split_frames(data)?
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Tlv { code, data } => Some(SubOption { code, data }),
                Frame::Pad | Frame::End => None,
            })
            .collect();
        Ok(Self { options })
    }

    pub fn get(&self, code: u8) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|o| o.code == code)
            .map(|o| o.data.as_slice())
    }

    pub fn add(&mut self, code: u8, data: impl Into<Vec<u8>>) {
        self.options.push(SubOption {
            code,
            data: data.into(),
        });
    }

    fn write_to(&self, buf: &mut BytesMut) {
        for opt in &self.options {
            write_tlv(buf, opt.code, &opt.data);
        }
    }
}

impl fmt::Display for RelayAgentInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, opt) in self.options.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "sub-option {} = {:02x?}", opt.code, opt.data)?;
        }
        Ok(())
    }
}

/// Option 94, the PXE client network interface identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInterfaceId {
    pub kind: u8,
    pub major: u8,
    pub minor: u8,
}

impl NetworkInterfaceId {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        match data {
            [kind, major, minor] => Ok(Self {
                kind: *kind,
                major: *major,
                minor: *minor,
            }),
            _ => Err(DecodeError::length(
                OptionCode::CLIENT_NETWORK_INTERFACE_ID.to_string(),
                data.len(),
            )),
        }
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind);
        buf.put_u8(self.major);
        buf.put_u8(self.minor);
    }
}

impl fmt::Display for NetworkInterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {} version {}.{}", self.kind, self.major, self.minor)
    }
}

/// One entry of the classless static route option (RFC 3442).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub destination: Ipv4Addr,
    pub prefix_len: u8,
    pub router: Ipv4Addr,
}

impl Route {
    fn list_from_bytes(data: &[u8]) -> Result<Vec<Route>, DecodeError> {
        let code = OptionCode::CLASSLESS_STATIC_ROUTE;
        if data.is_empty() {
            return Err(DecodeError::length(code.to_string(), 0));
        }
        let mut cursor = Cursor::new(data);
        let mut routes = Vec::new();
        while cursor.has(1) {
            let prefix_len = cursor.read_u8();
            if prefix_len > 32 {
                return Err(DecodeError::value(
                    code.to_string(),
                    format!("prefix length {prefix_len} exceeds 32"),
                ));
            }
            let significant = usize::from(prefix_len).div_ceil(8);
            let mut octets = [0u8; 4];
            cursor.copy_n(&mut octets[..significant]);
            let router = cursor.read_ipv4();
            cursor.error()?;
            routes.push(Route {
                destination: Ipv4Addr::from(octets),
                prefix_len,
                router,
            });
        }
        cursor.finish()?;
        Ok(routes)
    }

    fn write_to(&self, buf: &mut BytesMut) {
        let significant = usize::from(self.prefix_len.min(32)).div_ceil(8);
        buf.put_u8(self.prefix_len.min(32));
        buf.put_slice(&self.destination.octets()[..significant]);
        buf.put_slice(&self.router.octets());
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} via {}", self.destination, self.prefix_len, self.router)
    }
}

/// One enterprise entry of option 124 (RFC 3925).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorClass {
    pub enterprise_number: u32,
    pub data: Vec<Vec<u8>>,
}

impl VendorClass {
    fn list_from_bytes(data: &[u8]) -> Result<Vec<VendorClass>, DecodeError> {
        let mut cursor = Cursor::new(data);
        let mut classes = Vec::new();
        while cursor.has(1) {
            let enterprise_number = cursor.read_u32();
            let len = cursor.read_u8() as usize;
            let mut inner = Cursor::new(cursor.read_n(len));
            cursor.error()?;
            let mut items = Vec::new();
            while inner.has(1) {
                let n = inner.read_u8() as usize;
                items.push(inner.read_n(n).to_vec());
            }
            inner.finish()?;
            classes.push(VendorClass {
                enterprise_number,
                data: items,
            });
        }
        cursor.finish()?;
        Ok(classes)
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.enterprise_number);
        let mut inner = BytesMut::new();
        for (i, item) in self.data.iter().enumerate() {
            if inner.len() + item.len().min(MAX_ENTRY_LEN) + 1 > MAX_ENTRY_LEN {
                tracing::warn!(
                    "vendor class data for enterprise {} does not fit, dropping {} item(s)",
                    self.enterprise_number,
                    self.data.len() - i
                );
                break;
            }
            put_len_prefixed(&mut inner, "Vendor Class", item);
        }
        buf.put_u8(inner.len() as u8);
        buf.put_slice(&inner);
    }
}

impl fmt::Display for VendorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<_> = self
            .data
            .iter()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect();
        write!(f, "enterprise {}: {}", self.enterprise_number, items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(opt: DhcpOption) {
        let bytes = opt.value_bytes();
        assert_eq!(DhcpOption::parse(opt.code(), &bytes).unwrap(), opt);
    }

    #[test]
    fn ip_list_rejects_empty_and_ragged() {
        for data in [&[][..], &[10, 0, 0][..], &[10, 0, 0, 1, 10][..]] {
            assert!(matches!(
                DhcpOption::parse(OptionCode::ROUTER, data),
                Err(DecodeError::InvalidLength { .. })
            ));
        }
    }

    #[test]
    fn durations_require_exact_length() {
        assert_eq!(
            DhcpOption::parse(OptionCode::ADDRESS_LEASE_TIME, &[0, 0, 0x0e, 0x10]).unwrap(),
            DhcpOption::AddressLeaseTime(Duration::from_secs(3600))
        );
        assert!(DhcpOption::parse(OptionCode::ADDRESS_LEASE_TIME, &[0, 0, 1]).is_err());
        assert!(DhcpOption::parse(OptionCode::RENEWAL_TIME, &[0, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn strings_may_be_empty() {
        assert_eq!(
            DhcpOption::parse(OptionCode::HOST_NAME, &[]).unwrap(),
            DhcpOption::HostName(String::new())
        );
    }

    #[test]
    fn value_types_round_trip() {
        round_trip(DhcpOption::SubnetMask(Ipv4Addr::new(255, 255, 255, 0)));
        round_trip(DhcpOption::TimeOffset(-3600));
        round_trip(DhcpOption::Router(vec![
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        ]));
        round_trip(DhcpOption::MessageType(MessageType::Offer));
        round_trip(DhcpOption::ParameterRequestList(vec![
            OptionCode::SUBNET_MASK,
            OptionCode::ROUTER,
        ]));
        round_trip(DhcpOption::MaxMessageSize(1500));
        round_trip(DhcpOption::ClientSystemArchitecture(vec![0x0007, 0x0010]));
        round_trip(DhcpOption::ClientNetworkInterfaceId(NetworkInterfaceId {
            kind: 1,
            major: 3,
            minor: 10,
        }));
        round_trip(DhcpOption::DomainSearch(Labels::new(["example.com", "lab"])));
        round_trip(DhcpOption::VendorIdentifyingVendorClass(vec![VendorClass {
            enterprise_number: 4491,
            data: vec![b"docsis3.0".to_vec()],
        }]));
    }

    #[test]
    fn user_class_detects_rfc3004_lists() {
        let uc = UserClass::from_bytes(&[5, b'l', b'i', b'n', b'u', b'x', 2, b'o', b'k']).unwrap();
        assert!(uc.rfc3004);
        assert_eq!(uc.user_classes, vec![b"linux".to_vec(), b"ok".to_vec()]);
        assert_eq!(uc.to_string(), "linux, ok");
    }

    #[test]
    fn user_class_falls_back_to_opaque_string() {
        let uc = UserClass::from_bytes(b"linuxboot").unwrap();
        assert!(!uc.rfc3004);
        assert_eq!(uc.user_classes, vec![b"linuxboot".to_vec()]);

        let mut buf = BytesMut::new();
        uc.write_to(&mut buf);
        assert_eq!(&buf[..], b"linuxboot");
    }

    #[test]
    fn user_class_rejects_empty() {
        assert!(UserClass::from_bytes(&[]).is_err());
    }

    #[test]
    fn user_class_rejects_zero_length_class() {
        for data in [&[0][..], &[2, b'o', b'k', 0][..]] {
            assert!(matches!(
                UserClass::from_bytes(data),
                Err(DecodeError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn oversized_user_class_is_truncated() {
        let opt = DhcpOption::UserClass(UserClass::rfc3004([vec![b'a'; 300], b"ok".to_vec()]));
        let bytes = opt.value_bytes();
        assert_eq!(bytes.len(), 1 + 255 + 1 + 2);
        assert_eq!(bytes[0], 255);

        let DhcpOption::UserClass(back) = DhcpOption::parse(OptionCode::USER_CLASS, &bytes).unwrap()
        else {
            panic!("expected a user class");
        };
        assert!(back.rfc3004);
        assert_eq!(back.user_classes, vec![vec![b'a'; 255], b"ok".to_vec()]);
    }

    #[test]
    fn vendor_class_drops_items_past_length_limit() {
        let opt = DhcpOption::VendorIdentifyingVendorClass(vec![VendorClass {
            enterprise_number: 4491,
            data: vec![vec![b'x'; 200], vec![b'y'; 200]],
        }]);
        let bytes = opt.value_bytes();
        assert_eq!(bytes[4], 201);
        assert_eq!(bytes.len(), 4 + 1 + 201);

        let back = DhcpOption::parse(OptionCode::VENDOR_IDENTIFYING_VENDOR_CLASS, &bytes).unwrap();
        assert_eq!(
            back,
            DhcpOption::VendorIdentifyingVendorClass(vec![VendorClass {
                enterprise_number: 4491,
                data: vec![vec![b'x'; 200]],
            }])
        );
    }

    #[test]
    fn non_utf8_text_keeps_raw_bytes() {
        let opt = DhcpOption::parse(OptionCode::HOST_NAME, &[b'a', 0xff, b'b']).unwrap();
        assert_eq!(
            opt,
            DhcpOption::Unknown(OptionCode::HOST_NAME, vec![b'a', 0xff, b'b'])
        );
        assert_eq!(opt.value_bytes(), vec![b'a', 0xff, b'b']);
        assert_eq!(
            DhcpOption::parse(OptionCode::HOST_NAME, b"node-1").unwrap(),
            DhcpOption::HostName("node-1".to_string())
        );
    }

    #[test]
    fn classless_routes() {
        let data = [24, 192, 168, 2, 10, 0, 0, 1, 0, 10, 0, 0, 254];
        let routes = Route::list_from_bytes(&data).unwrap();
        assert_eq!(
            routes,
            vec![
                Route {
                    destination: Ipv4Addr::new(192, 168, 2, 0),
                    prefix_len: 24,
                    router: Ipv4Addr::new(10, 0, 0, 1),
                },
                Route {
                    destination: Ipv4Addr::UNSPECIFIED,
                    prefix_len: 0,
                    router: Ipv4Addr::new(10, 0, 0, 254),
                },
            ]
        );
        round_trip(DhcpOption::ClasslessStaticRoute(routes));
        assert!(Route::list_from_bytes(&[33, 0, 0, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(Route::list_from_bytes(&[24, 192, 168]).is_err());
    }

    #[test]
    fn relay_agent_information_is_nested_tlv() {
        let data = [1, 3, b'e', b't', b'h', 2, 2, 0xbe, 0xef];
        let rai = RelayAgentInformation::from_bytes(&data).unwrap();
        assert_eq!(rai.get(relay_sub_option::CIRCUIT_ID), Some(&b"eth"[..]));
        assert_eq!(rai.get(relay_sub_option::REMOTE_ID), Some(&[0xbe, 0xef][..]));
        round_trip(DhcpOption::RelayAgentInformation(rai));
    }

    #[test]
    fn client_identifier_needs_two_bytes() {
        assert!(DhcpOption::parse(OptionCode::CLIENT_IDENTIFIER, &[1]).is_err());
    }
}
