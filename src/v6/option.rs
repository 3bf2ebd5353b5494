//! DHCPv6 option values and the code-to-parser dispatch.
//!
//! Unknown codes decode to [`DhcpOption::Unknown`]. A known code whose
//! payload fails to parse decodes to [`DhcpOption::Malformed`], keeping the
//! original bytes, so one bad option never aborts a whole message.

use super::duid::Duid;
use super::options::{split_tlvs, write_tlv, Options};
use super::types::{MessageType, OptionCode, StatusCode};
use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::rfc1035label::Labels;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    ClientId(Duid),
    ServerId(Duid),
    IaNa(IaNa),
    IaTa(IaTa),
    IaAddr(IaAddr),
    Oro(Vec<OptionCode>),
    Preference(u8),
    /// Time since the client began the exchange, in 10 ms units on the wire.
    ElapsedTime(Duration),
    /// A serialized inner message; decoded on demand by the relay helpers.
    RelayMsg(Vec<u8>),
    Unicast(Ipv6Addr),
    StatusCode(StatusCodeOption),
    RapidCommit,
    UserClass(Vec<Vec<u8>>),
    VendorClass(VendorClass),
    VendorOpts(VendorOpts),
    InterfaceId(Vec<u8>),
    ReconfMsg(MessageType),
    ReconfAccept,
    DnsServers(Vec<Ipv6Addr>),
    DomainList(Labels),
    IaPd(IaPd),
    IaPrefix(IaPrefix),
    RemoteId(RemoteId),
    Fqdn(Fqdn),
    InformationRefreshTime(Duration),
    BootFileUrl(String),
    BootFileParam(Vec<String>),
    ClientArchType(Vec<u16>),
    Nii(NetworkInterfaceId),
    ClientLinkLayerAddr { link_layer_type: u16, addr: Vec<u8> },
    SolMaxRt(Duration),
    InfMaxRt(Duration),
    Unknown(OptionCode, Vec<u8>),
    /// A known option whose payload did not parse.
    Malformed {
        code: OptionCode,
        data: Vec<u8>,
        error: DecodeError,
    },
}

impl DhcpOption {
    /// Dispatches `data` to the parser registered for `code`.
    pub fn parse(code: OptionCode, data: &[u8]) -> Self {
        Self::parse_nested(code, data, 0)
    }

    /// Like [`DhcpOption::parse`] for an option found `depth` levels inside
    /// other options.
    pub(crate) fn parse_nested(code: OptionCode, data: &[u8], depth: usize) -> Self {
        match Self::try_parse(code, data, depth) {
            Ok(opt) => opt,
            Err(error) => {
                tracing::warn!("Malformed DHCPv6 option {}: {}", code, error);
                DhcpOption::Malformed {
                    code,
                    data: data.to_vec(),
                    error,
                }
            }
        }
    }

    fn try_parse(code: OptionCode, data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        let opt = match code {
            OptionCode::CLIENT_ID => DhcpOption::ClientId(Duid::from_bytes(data)?),
            OptionCode::SERVER_ID => DhcpOption::ServerId(Duid::from_bytes(data)?),
            OptionCode::IA_NA => DhcpOption::IaNa(IaNa::from_bytes(data, depth)?),
            OptionCode::IA_TA => DhcpOption::IaTa(IaTa::from_bytes(data, depth)?),
            OptionCode::IA_ADDR => DhcpOption::IaAddr(IaAddr::from_bytes(data, depth)?),
            OptionCode::ORO => DhcpOption::Oro(
                u16_list(code, data)?
                    .into_iter()
                    .map(OptionCode)
                    .collect(),
            ),
            OptionCode::PREFERENCE => DhcpOption::Preference(u8_value(code, data)?),
            OptionCode::ELAPSED_TIME => DhcpOption::ElapsedTime(Duration::from_millis(
                u64::from(u16_value(code, data)?) * 10,
            )),
            OptionCode::RELAY_MSG => DhcpOption::RelayMsg(data.to_vec()),
            OptionCode::UNICAST => DhcpOption::Unicast(ip(code, data)?),
            OptionCode::STATUS_CODE => DhcpOption::StatusCode(StatusCodeOption::from_bytes(data)?),
            OptionCode::RAPID_COMMIT => {
                empty(code, data)?;
                DhcpOption::RapidCommit
            }
            OptionCode::USER_CLASS => DhcpOption::UserClass(opaque_list(code, data)?),
            OptionCode::VENDOR_CLASS => DhcpOption::VendorClass(VendorClass::from_bytes(data)?),
            OptionCode::VENDOR_OPTS => DhcpOption::VendorOpts(VendorOpts::from_bytes(data)?),
            OptionCode::INTERFACE_ID => DhcpOption::InterfaceId(data.to_vec()),
            OptionCode::RECONF_MSG => DhcpOption::ReconfMsg(u8_value(code, data)?.into()),
            OptionCode::RECONF_ACCEPT => {
                empty(code, data)?;
                DhcpOption::ReconfAccept
            }
            OptionCode::DNS_SERVERS => DhcpOption::DnsServers(ip_list(code, data)?),
            OptionCode::DOMAIN_LIST => DhcpOption::DomainList(Labels::from_bytes(data)?),
            OptionCode::IA_PD => DhcpOption::IaPd(IaPd::from_bytes(data, depth)?),
            OptionCode::IA_PREFIX => DhcpOption::IaPrefix(IaPrefix::from_bytes(data, depth)?),
            OptionCode::REMOTE_ID => DhcpOption::RemoteId(RemoteId::from_bytes(data)?),
            OptionCode::FQDN => DhcpOption::Fqdn(Fqdn::from_bytes(data)?),
            OptionCode::INFORMATION_REFRESH_TIME => {
                DhcpOption::InformationRefreshTime(seconds(code, data)?)
            }
            OptionCode::BOOTFILE_URL => DhcpOption::BootFileUrl(utf8(code, data.to_vec())?),
            OptionCode::BOOTFILE_PARAM => DhcpOption::BootFileParam(
                opaque_list(code, data)?
                    .into_iter()
                    .map(|p| utf8(code, p))
                    .collect::<Result<_, _>>()?,
            ),
            OptionCode::CLIENT_ARCH_TYPE => DhcpOption::ClientArchType(u16_list(code, data)?),
            OptionCode::NII => DhcpOption::Nii(NetworkInterfaceId::from_bytes(data)?),
            OptionCode::CLIENT_LINKLAYER_ADDR => {
                if data.len() < 2 {
                    return Err(DecodeError::length(code.to_string(), data.len()));
                }
                let (ty, addr) = data.split_at(2);
                DhcpOption::ClientLinkLayerAddr {
                    link_layer_type: u16::from_be_bytes([ty[0], ty[1]]),
                    addr: addr.to_vec(),
                }
            }
            OptionCode::SOL_MAX_RT => DhcpOption::SolMaxRt(seconds(code, data)?),
            OptionCode::INF_MAX_RT => DhcpOption::InfMaxRt(seconds(code, data)?),
            _ => DhcpOption::Unknown(code, data.to_vec()),
        };
        Ok(opt)
    }

    pub fn code(&self) -> OptionCode {
        match self {
            DhcpOption::ClientId(_) => OptionCode::CLIENT_ID,
            DhcpOption::ServerId(_) => OptionCode::SERVER_ID,
            DhcpOption::IaNa(_) => OptionCode::IA_NA,
            DhcpOption::IaTa(_) => OptionCode::IA_TA,
            DhcpOption::IaAddr(_) => OptionCode::IA_ADDR,
            DhcpOption::Oro(_) => OptionCode::ORO,
            DhcpOption::Preference(_) => OptionCode::PREFERENCE,
            DhcpOption::ElapsedTime(_) => OptionCode::ELAPSED_TIME,
            DhcpOption::RelayMsg(_) => OptionCode::RELAY_MSG,
            DhcpOption::Unicast(_) => OptionCode::UNICAST,
            DhcpOption::StatusCode(_) => OptionCode::STATUS_CODE,
            DhcpOption::RapidCommit => OptionCode::RAPID_COMMIT,
            DhcpOption::UserClass(_) => OptionCode::USER_CLASS,
            DhcpOption::VendorClass(_) => OptionCode::VENDOR_CLASS,
            DhcpOption::VendorOpts(_) => OptionCode::VENDOR_OPTS,
            DhcpOption::InterfaceId(_) => OptionCode::INTERFACE_ID,
            DhcpOption::ReconfMsg(_) => OptionCode::RECONF_MSG,
            DhcpOption::ReconfAccept => OptionCode::RECONF_ACCEPT,
            DhcpOption::DnsServers(_) => OptionCode::DNS_SERVERS,
            DhcpOption::DomainList(_) => OptionCode::DOMAIN_LIST,
            DhcpOption::IaPd(_) => OptionCode::IA_PD,
            DhcpOption::IaPrefix(_) => OptionCode::IA_PREFIX,
            DhcpOption::RemoteId(_) => OptionCode::REMOTE_ID,
            DhcpOption::Fqdn(_) => OptionCode::FQDN,
            DhcpOption::InformationRefreshTime(_) => OptionCode::INFORMATION_REFRESH_TIME,
            DhcpOption::BootFileUrl(_) => OptionCode::BOOTFILE_URL,
            DhcpOption::BootFileParam(_) => OptionCode::BOOTFILE_PARAM,
            DhcpOption::ClientArchType(_) => OptionCode::CLIENT_ARCH_TYPE,
            DhcpOption::Nii(_) => OptionCode::NII,
            DhcpOption::ClientLinkLayerAddr { .. } => OptionCode::CLIENT_LINKLAYER_ADDR,
            DhcpOption::SolMaxRt(_) => OptionCode::SOL_MAX_RT,
            DhcpOption::InfMaxRt(_) => OptionCode::INF_MAX_RT,
            DhcpOption::Unknown(code, _) => *code,
            DhcpOption::Malformed { code, .. } => *code,
        }
    }

    /// The option value as it appears on the wire, without code and length.
    pub fn value_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        match self {
            DhcpOption::ClientId(duid) | DhcpOption::ServerId(duid) => duid.write_to(&mut buf),
            DhcpOption::IaNa(ia) => ia.write_to(&mut buf),
            DhcpOption::IaTa(ia) => ia.write_to(&mut buf),
            DhcpOption::IaAddr(addr) => addr.write_to(&mut buf),
            DhcpOption::Oro(codes) => codes.iter().for_each(|c| buf.put_u16(c.0)),
            DhcpOption::Preference(n) => buf.put_u8(*n),
            DhcpOption::ElapsedTime(d) => {
                let centis = d.as_millis() / 10;
                buf.put_u16(u16::try_from(centis).unwrap_or(u16::MAX));
            }
            DhcpOption::RelayMsg(data)
            | DhcpOption::InterfaceId(data)
            | DhcpOption::Unknown(_, data)
            | DhcpOption::Malformed { data, .. } => buf.put_slice(data),
            DhcpOption::Unicast(ip) => buf.put_slice(&ip.octets()),
            DhcpOption::StatusCode(status) => status.write_to(&mut buf),
            DhcpOption::RapidCommit | DhcpOption::ReconfAccept => {}
            DhcpOption::UserClass(classes) => write_opaque_list(&mut buf, classes),
            DhcpOption::VendorClass(vc) => vc.write_to(&mut buf),
            DhcpOption::VendorOpts(vo) => vo.write_to(&mut buf),
            DhcpOption::ReconfMsg(t) => buf.put_u8(u8::from(*t)),
            DhcpOption::DnsServers(ips) => ips.iter().for_each(|ip| buf.put_slice(&ip.octets())),
            DhcpOption::DomainList(labels) => buf.put_slice(&labels.to_bytes()),
            DhcpOption::IaPd(ia) => ia.write_to(&mut buf),
            DhcpOption::IaPrefix(prefix) => prefix.write_to(&mut buf),
            DhcpOption::RemoteId(id) => {
                buf.put_u32(id.enterprise_number);
                buf.put_slice(&id.remote_id);
            }
            DhcpOption::Fqdn(fqdn) => {
                buf.put_u8(fqdn.flags);
                buf.put_slice(&fqdn.domain_name.to_bytes());
            }
            DhcpOption::InformationRefreshTime(d)
            | DhcpOption::SolMaxRt(d)
            | DhcpOption::InfMaxRt(d) => buf.put_u32(clamp_secs(*d)),
            DhcpOption::BootFileUrl(url) => buf.put_slice(url.as_bytes()),
            DhcpOption::BootFileParam(params) => {
                let params: Vec<&[u8]> = params.iter().map(|p| p.as_bytes()).collect();
                write_opaque_list(&mut buf, &params);
            }
            DhcpOption::ClientArchType(archs) => archs.iter().for_each(|a| buf.put_u16(*a)),
            DhcpOption::Nii(nii) => {
                buf.put_u8(nii.kind);
                buf.put_u8(nii.major);
                buf.put_u8(nii.minor);
            }
            DhcpOption::ClientLinkLayerAddr {
                link_layer_type,
                addr,
            } => {
                buf.put_u16(*link_layer_type);
                buf.put_slice(addr);
            }
        }
        buf.to_vec()
    }
}

impl fmt::Display for DhcpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ", self.code())?;
        match self {
            DhcpOption::ClientId(duid) | DhcpOption::ServerId(duid) => write!(f, "{duid}"),
            DhcpOption::IaNa(ia) => write!(f, "{ia}"),
            DhcpOption::IaTa(ia) => write!(f, "{ia}"),
            DhcpOption::IaAddr(addr) => write!(f, "{addr}"),
            DhcpOption::Oro(codes) => write_list(f, codes),
            DhcpOption::Preference(n) => write!(f, "{n}"),
            DhcpOption::ElapsedTime(d)
            | DhcpOption::InformationRefreshTime(d)
            | DhcpOption::SolMaxRt(d)
            | DhcpOption::InfMaxRt(d) => write!(f, "{d:?}"),
            DhcpOption::RelayMsg(data) => write!(f, "{} byte(s)", data.len()),
            DhcpOption::Unicast(ip) => write!(f, "{ip}"),
            DhcpOption::StatusCode(status) => write!(f, "{status}"),
            DhcpOption::RapidCommit | DhcpOption::ReconfAccept => Ok(()),
            DhcpOption::UserClass(classes) => {
                let classes: Vec<_> = classes.iter().map(|c| String::from_utf8_lossy(c)).collect();
                write_list(f, &classes)
            }
            DhcpOption::VendorClass(vc) => write!(f, "{vc}"),
            DhcpOption::VendorOpts(vo) => write!(f, "{vo}"),
            DhcpOption::InterfaceId(data) => write!(f, "{data:02x?}"),
            DhcpOption::ReconfMsg(t) => write!(f, "{t}"),
            DhcpOption::DnsServers(ips) => write_list(f, ips),
            DhcpOption::DomainList(labels) => write!(f, "{labels}"),
            DhcpOption::IaPd(ia) => write!(f, "{ia}"),
            DhcpOption::IaPrefix(prefix) => write!(f, "{prefix}"),
            DhcpOption::RemoteId(id) => write!(
                f,
                "enterprise {} id {:02x?}",
                id.enterprise_number, id.remote_id
            ),
            DhcpOption::Fqdn(fqdn) => write!(f, "flags 0x{:02x} {}", fqdn.flags, fqdn.domain_name),
            DhcpOption::BootFileUrl(url) => f.write_str(url),
            DhcpOption::BootFileParam(params) => write_list(f, params),
            DhcpOption::ClientArchType(archs) => write_list(f, archs),
            DhcpOption::Nii(nii) => write!(f, "type {} v{}.{}", nii.kind, nii.major, nii.minor),
            DhcpOption::ClientLinkLayerAddr {
                link_layer_type,
                addr,
            } => write!(f, "type {link_layer_type} {addr:02x?}"),
            DhcpOption::Unknown(_, data) => write!(f, "{data:02x?}"),
            DhcpOption::Malformed { data, error, .. } => {
                write!(f, "malformed ({error}) {data:02x?}")
            }
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

fn utf8(code: OptionCode, data: Vec<u8>) -> Result<String, DecodeError> {
    String::from_utf8(data).map_err(|e| DecodeError::value(code.to_string(), e.to_string()))
}

fn empty(code: OptionCode, data: &[u8]) -> Result<(), DecodeError> {
    if data.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::length(code.to_string(), data.len()))
    }
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

fn seconds(code: OptionCode, data: &[u8]) -> Result<Duration, DecodeError> {
    let bytes: [u8; 4] = data
        .try_into()
        .map_err(|_| DecodeError::length(code.to_string(), data.len()))?;
    Ok(Duration::from_secs(u64::from(u32::from_be_bytes(bytes))))
}

fn ip(code: OptionCode, data: &[u8]) -> Result<Ipv6Addr, DecodeError> {
    let bytes: [u8; 16] = data
        .try_into()
        .map_err(|_| DecodeError::length(code.to_string(), data.len()))?;
    Ok(Ipv6Addr::from(bytes))
}

/// At least one address, and a whole number of them.
fn ip_list(code: OptionCode, data: &[u8]) -> Result<Vec<Ipv6Addr>, DecodeError> {
    if data.is_empty() || data.len() % 16 != 0 {
        return Err(DecodeError::length(code.to_string(), data.len()));
    }
    let mut cursor = Cursor::new(data);
    let mut ips = Vec::with_capacity(data.len() / 16);
    while cursor.has(16) {
        ips.push(cursor.read_ipv6());
    }
    Ok(ips)
}

fn u16_list(code: OptionCode, data: &[u8]) -> Result<Vec<u16>, DecodeError> {
    if data.len() % 2 != 0 {
        return Err(DecodeError::length(code.to_string(), data.len()));
    }
    Ok(data
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

/// A sequence of 2-byte-length-prefixed opaque values.
fn opaque_list(code: OptionCode, data: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::length(code.to_string(), 0));
    }
    read_opaque_list(&mut Cursor::new(data))
}

fn read_opaque_list(cursor: &mut Cursor<'_>) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut items = Vec::new();
    while cursor.has(1) {
        let len = cursor.read_u16() as usize;
        items.push(cursor.read_n(len).to_vec());
    }
    cursor.finish()?;
    Ok(items)
}

fn write_opaque_list<T: AsRef<[u8]>>(buf: &mut BytesMut, items: &[T]) {
    for item in items {
        let item = item.as_ref();
        buf.put_u16(item.len() as u16);
        buf.put_slice(item);
    }
}

/// Identity Association for Non-temporary Addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaNa {
    pub iaid: [u8; 4],
    pub t1: Duration,
    pub t2: Duration,
    pub options: Options,
}

impl IaNa {
    pub fn new(iaid: [u8; 4]) -> Self {
        Self {
            iaid,
            t1: Duration::ZERO,
            t2: Duration::ZERO,
            options: Options::new(),
        }
    }

    fn from_bytes(data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let iaid = cursor.array::<4>().unwrap_or_default();
        let t1 = Duration::from_secs(u64::from(cursor.read_u32()));
        let t2 = Duration::from_secs(u64::from(cursor.read_u32()));
        cursor.error()?;
        let options = Options::from_bytes_nested(cursor.read_all(), depth + 1)?;
        Ok(Self {
            iaid,
            t1,
            t2,
            options,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.iaid);
        buf.put_u32(clamp_secs(self.t1));
        buf.put_u32(clamp_secs(self.t2));
        self.options.write_to(buf);
    }

    /// Addresses carried in IA Address sub-options.
    pub fn addresses(&self) -> impl Iterator<Item = &IaAddr> {
        self.options.iter().filter_map(|o| match o {
            DhcpOption::IaAddr(addr) => Some(addr),
            _ => None,
        })
    }

    pub fn status(&self) -> Option<&StatusCodeOption> {
        status_of(&self.options)
    }
}

impl fmt::Display for IaNa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IAID={:02x?} T1={:?} T2={:?}",
            self.iaid, self.t1, self.t2
        )?;
        write_nested(f, &self.options)
    }
}

/// Identity Association for Temporary Addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaTa {
    pub iaid: [u8; 4],
    pub options: Options,
}

impl IaTa {
    fn from_bytes(data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let iaid = cursor.array::<4>().unwrap_or_default();
        cursor.error()?;
        let options = Options::from_bytes_nested(cursor.read_all(), depth + 1)?;
        Ok(Self { iaid, options })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.iaid);
        self.options.write_to(buf);
    }
}

impl fmt::Display for IaTa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IAID={:02x?}", self.iaid)?;
        write_nested(f, &self.options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaAddr {
    pub addr: Ipv6Addr,
    pub preferred_lifetime: Duration,
    pub valid_lifetime: Duration,
    pub options: Options,
}

impl IaAddr {
    fn from_bytes(data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let addr = cursor.read_ipv6();
        let preferred_lifetime = Duration::from_secs(u64::from(cursor.read_u32()));
        let valid_lifetime = Duration::from_secs(u64::from(cursor.read_u32()));
        cursor.error()?;
        let options = Options::from_bytes_nested(cursor.read_all(), depth + 1)?;
        Ok(Self {
            addr,
            preferred_lifetime,
            valid_lifetime,
            options,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.addr.octets());
        buf.put_u32(clamp_secs(self.preferred_lifetime));
        buf.put_u32(clamp_secs(self.valid_lifetime));
        self.options.write_to(buf);
    }
}

impl fmt::Display for IaAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} preferred {:?} valid {:?}",
            self.addr, self.preferred_lifetime, self.valid_lifetime
        )?;
        write_nested(f, &self.options)
    }
}

/// Identity Association for Prefix Delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaPd {
    pub iaid: [u8; 4],
    pub t1: Duration,
    pub t2: Duration,
    pub options: Options,
}

impl IaPd {
    fn from_bytes(data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        let IaNa {
            iaid,
            t1,
            t2,
            options,
        } = IaNa::from_bytes(data, depth)?;
        Ok(Self {
            iaid,
            t1,
            t2,
            options,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.iaid);
        buf.put_u32(clamp_secs(self.t1));
        buf.put_u32(clamp_secs(self.t2));
        self.options.write_to(buf);
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &IaPrefix> {
        self.options.iter().filter_map(|o| match o {
            DhcpOption::IaPrefix(prefix) => Some(prefix),
            _ => None,
        })
    }
}

impl fmt::Display for IaPd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IAID={:02x?} T1={:?} T2={:?}",
            self.iaid, self.t1, self.t2
        )?;
        write_nested(f, &self.options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaPrefix {
    pub preferred_lifetime: Duration,
    pub valid_lifetime: Duration,
    pub prefix_len: u8,
    pub prefix: Ipv6Addr,
    pub options: Options,
}

impl IaPrefix {
    fn from_bytes(data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let preferred_lifetime = Duration::from_secs(u64::from(cursor.read_u32()));
        let valid_lifetime = Duration::from_secs(u64::from(cursor.read_u32()));
        let prefix_len = cursor.read_u8();
        let prefix = cursor.read_ipv6();
        cursor.error()?;
        if prefix_len > 128 {
            return Err(DecodeError::value(
                "IA Prefix",
                format!("prefix length {prefix_len}"),
            ));
        }
        let options = Options::from_bytes_nested(cursor.read_all(), depth + 1)?;
        Ok(Self {
            preferred_lifetime,
            valid_lifetime,
            prefix_len,
            prefix,
            options,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(clamp_secs(self.preferred_lifetime));
        buf.put_u32(clamp_secs(self.valid_lifetime));
        buf.put_u8(self.prefix_len);
        buf.put_slice(&self.prefix.octets());
        self.options.write_to(buf);
    }
}

impl fmt::Display for IaPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} preferred {:?} valid {:?}",
            self.prefix, self.prefix_len, self.preferred_lifetime, self.valid_lifetime
        )?;
        write_nested(f, &self.options)
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, options: &Options) -> fmt::Result {
    if options.is_empty() {
        return Ok(());
    }
    write!(f, " [")?;
    for (i, opt) in options.iter().enumerate() {
        if i > 0 {
            write!(f, "; ")?;
        }
        write!(f, "{opt}")?;
    }
    write!(f, "]")
}

pub(crate) fn status_of(options: &Options) -> Option<&StatusCodeOption> {
    match options.get(OptionCode::STATUS_CODE) {
        Some(DhcpOption::StatusCode(status)) => Some(status),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeOption {
    pub status: StatusCode,
    pub message: String,
}

impl StatusCodeOption {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::Success
    }

    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let status = StatusCode::from(cursor.read_u16());
        let message = cursor.read_all().to_vec();
        cursor.finish()?;
        let message = utf8(OptionCode::STATUS_CODE, message)?;
        Ok(Self { status, message })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(u16::from(self.status));
        buf.put_slice(self.message.as_bytes());
    }
}

impl fmt::Display for StatusCodeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} ({})", self.status, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorClass {
    pub enterprise_number: u32,
    pub data: Vec<Vec<u8>>,
}

impl VendorClass {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let enterprise_number = cursor.read_u32();
        cursor.error()?;
        let data = read_opaque_list(&mut cursor)?;
        Ok(Self {
            enterprise_number,
            data,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.enterprise_number);
        write_opaque_list(buf, &self.data);
    }
}

impl fmt::Display for VendorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enterprise {}: ", self.enterprise_number)?;
        let data: Vec<_> = self.data.iter().map(|d| String::from_utf8_lossy(d)).collect();
        write_list(f, &data)
    }
}

/// Vendor-specific information: an enterprise number followed by
/// vendor-defined sub-options in the regular 2-byte TLV framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorOpts {
    pub enterprise_number: u32,
    pub options: Vec<(u16, Vec<u8>)>,
}

impl VendorOpts {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let enterprise_number = cursor.read_u32();
        cursor.error()?;
        let options = split_tlvs(cursor.read_all())?
            .into_iter()
            .map(|(code, value)| (code, value.to_vec()))
            .collect();
        Ok(Self {
            enterprise_number,
            options,
        })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.enterprise_number);
        for (code, value) in &self.options {
            write_tlv(buf, *code, value);
        }
    }

    pub fn get(&self, code: u16) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, v)| v.as_slice())
    }
}

impl fmt::Display for VendorOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enterprise {}:", self.enterprise_number)?;
        for (code, value) in &self.options {
            write!(f, " {code}={value:02x?}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteId {
    pub enterprise_number: u32,
    pub remote_id: Vec<u8>,
}

impl RemoteId {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let enterprise_number = cursor.read_u32();
        let remote_id = cursor.read_all().to_vec();
        cursor.finish()?;
        Ok(Self {
            enterprise_number,
            remote_id,
        })
    }
}

/// Client FQDN (RFC 4704): flags followed by a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fqdn {
    pub flags: u8,
    pub domain_name: Labels,
}

impl Fqdn {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let Some((&flags, name)) = data.split_first() else {
            return Err(DecodeError::length("FQDN", 0));
        };
        Ok(Self {
            flags,
            domain_name: Labels::from_bytes(name)?,
        })
    }
}

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
            _ => Err(DecodeError::length("Client Network Interface Identifier", data.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v6::options::MAX_NESTING_DEPTH;
    use crate::v6::packet::Message;

    fn round_trip(opt: DhcpOption) {
        let bytes = opt.value_bytes();
        assert_eq!(DhcpOption::parse(opt.code(), &bytes), opt, "{opt}");
    }

    #[test]
    fn value_types_round_trip() {
        let mut ia = IaNa::new([0, 0, 0, 1]);
        ia.t1 = Duration::from_secs(3600);
        ia.t2 = Duration::from_secs(5400);
        ia.options.add(DhcpOption::IaAddr(IaAddr {
            addr: "2001:db8::5".parse().unwrap(),
            preferred_lifetime: Duration::from_secs(7200),
            valid_lifetime: Duration::from_secs(10800),
            options: Options::new(),
        }));
        round_trip(DhcpOption::IaNa(ia));
        round_trip(DhcpOption::IaTa(IaTa {
            iaid: [9, 9, 9, 9],
            options: Options::new(),
        }));
        round_trip(DhcpOption::Oro(vec![OptionCode::DNS_SERVERS, OptionCode::DOMAIN_LIST]));
        round_trip(DhcpOption::ElapsedTime(Duration::from_millis(1230)));
        round_trip(DhcpOption::StatusCode(StatusCodeOption::new(
            StatusCode::NoAddrsAvail,
            "pool exhausted",
        )));
        round_trip(DhcpOption::RapidCommit);
        round_trip(DhcpOption::UserClass(vec![b"a".to_vec(), b"bc".to_vec()]));
        round_trip(DhcpOption::VendorClass(VendorClass {
            enterprise_number: 9,
            data: vec![b"vendor".to_vec()],
        }));
        round_trip(DhcpOption::VendorOpts(VendorOpts {
            enterprise_number: 4491,
            options: vec![(1, vec![1, 2]), (2, vec![])],
        }));
        round_trip(DhcpOption::ReconfMsg(MessageType::Renew));
        round_trip(DhcpOption::DnsServers(vec![
            "2001:4860:4860::8888".parse().unwrap(),
            "2001:4860:4860::8844".parse().unwrap(),
        ]));
        round_trip(DhcpOption::DomainList(Labels::new(["example.com", "lan"])));
        round_trip(DhcpOption::IaPd(IaPd {
            iaid: [0, 0, 0, 2],
            t1: Duration::ZERO,
            t2: Duration::ZERO,
            options: Options::from(vec![DhcpOption::IaPrefix(IaPrefix {
                preferred_lifetime: Duration::from_secs(60),
                valid_lifetime: Duration::from_secs(120),
                prefix_len: 56,
                prefix: "2001:db8:100::".parse().unwrap(),
                options: Options::new(),
            })]),
        }));
        round_trip(DhcpOption::Fqdn(Fqdn {
            flags: 1,
            domain_name: Labels::new(["host.example.com"]),
        }));
        round_trip(DhcpOption::RemoteId(RemoteId {
            enterprise_number: 1,
            remote_id: vec![0xde, 0xad],
        }));
        round_trip(DhcpOption::BootFileUrl("tftp://[2001:db8::1]/boot.efi".into()));
        round_trip(DhcpOption::BootFileParam(vec!["root=/dev/sda".into()]));
        round_trip(DhcpOption::ClientArchType(vec![7, 9]));
        round_trip(DhcpOption::Nii(NetworkInterfaceId {
            kind: 1,
            major: 3,
            minor: 16,
        }));
        round_trip(DhcpOption::ClientLinkLayerAddr {
            link_layer_type: 1,
            addr: vec![1, 2, 3, 4, 5, 6],
        });
        round_trip(DhcpOption::SolMaxRt(Duration::from_secs(3600)));
    }

    #[test]
    fn dns_servers_reject_empty_and_ragged() {
        assert!(matches!(
            DhcpOption::parse(OptionCode::DNS_SERVERS, &[]),
            DhcpOption::Malformed { .. }
        ));
        assert!(matches!(
            DhcpOption::parse(OptionCode::DNS_SERVERS, &[0u8; 17]),
            DhcpOption::Malformed { .. }
        ));
    }

    #[test]
    fn elapsed_time_is_hundredths() {
        let opt = DhcpOption::parse(OptionCode::ELAPSED_TIME, &[0x01, 0x00]);
        assert_eq!(opt, DhcpOption::ElapsedTime(Duration::from_millis(2560)));
        assert!(matches!(
            DhcpOption::parse(OptionCode::ELAPSED_TIME, &[1]),
            DhcpOption::Malformed { .. }
        ));
    }

    #[test]
    fn short_client_id_is_malformed() {
        let opt = DhcpOption::parse(OptionCode::CLIENT_ID, &[0]);
        let DhcpOption::Malformed { code, data, error } = opt else {
            panic!("expected a malformed option");
        };
        assert_eq!(code, OptionCode::CLIENT_ID);
        assert_eq!(data, vec![0]);
        assert!(matches!(error, DecodeError::InvalidLength { .. }));
    }

    #[test]
    fn unknown_option_keeps_bytes() {
        let opt = DhcpOption::parse(OptionCode(1234), &[1, 2, 3]);
        assert_eq!(opt, DhcpOption::Unknown(OptionCode(1234), vec![1, 2, 3]));
        assert_eq!(opt.value_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn compressed_domain_list() {
        // "example.com" followed by "www" + pointer to offset 0.
        let mut data = vec![7];
        data.extend_from_slice(b"example");
        data.push(3);
        data.extend_from_slice(b"com");
        data.push(0);
        data.push(3);
        data.extend_from_slice(b"www");
        data.extend_from_slice(&[0xc0, 0x00]);
        let opt = DhcpOption::parse(OptionCode::DOMAIN_LIST, &data);
        assert_eq!(
            opt,
            DhcpOption::DomainList(Labels::new(["example.com", "www.example.com"]))
        );
    }

    /// An IA_NA holding an IA_NA holding an IA_NA, `levels` deep.
    fn nested_ia_na(levels: usize) -> Vec<u8> {
        let mut value = vec![0u8; 12];
        for _ in 1..levels {
            let mut outer = vec![0u8; 12];
            outer.extend_from_slice(&OptionCode::IA_NA.0.to_be_bytes());
            outer.extend_from_slice(&(value.len() as u16).to_be_bytes());
            outer.extend_from_slice(&value);
            value = outer;
        }
        value
    }

    #[test]
    fn deeply_nested_ia_na_is_bounded() {
        let opt = DhcpOption::parse(OptionCode::IA_NA, &nested_ia_na(4000));
        let mut current = &opt;
        let mut levels = 0;
        while let DhcpOption::IaNa(ia) = current {
            current = ia.options.iter().next().unwrap();
            levels += 1;
        }
        assert_eq!(levels, MAX_NESTING_DEPTH);
        assert!(matches!(
            current,
            DhcpOption::Malformed {
                code: OptionCode::IA_NA,
                error: DecodeError::InvalidOptions(_),
                ..
            }
        ));
    }

    #[test]
    fn deeply_nested_message_decodes_and_re_encodes() {
        let inner = nested_ia_na(4000);
        let mut data = vec![1, 0x12, 0x34, 0x56];
        data.extend_from_slice(&OptionCode::IA_NA.0.to_be_bytes());
        data.extend_from_slice(&(inner.len() as u16).to_be_bytes());
        data.extend_from_slice(&inner);

        let msg = Message::from_bytes(&data).unwrap();
        assert_eq!(msg.ia_na().len(), 1);
        assert_eq!(msg.to_bytes(), data);
    }

    #[test]
    fn non_utf8_text_is_malformed_and_re_encodes() {
        let url = [b'h', b't', 0xc3, 0x28];
        let opt = DhcpOption::parse(OptionCode::BOOTFILE_URL, &url);
        assert!(matches!(
            opt,
            DhcpOption::Malformed {
                code: OptionCode::BOOTFILE_URL,
                error: DecodeError::InvalidValue { .. },
                ..
            }
        ));
        assert_eq!(opt.value_bytes(), url.to_vec());

        let status = [0, 1, 0xff, b'x'];
        let opt = DhcpOption::parse(OptionCode::STATUS_CODE, &status);
        assert!(matches!(opt, DhcpOption::Malformed { .. }));
        assert_eq!(opt.value_bytes(), status.to_vec());
    }

    #[test]
    fn ia_na_exposes_addresses_and_status() {
        let mut ia = IaNa::new([1, 2, 3, 4]);
        ia.options.add(DhcpOption::StatusCode(StatusCodeOption::new(
            StatusCode::Success,
            "",
        )));
        assert_eq!(ia.addresses().count(), 0);
        assert!(ia.status().is_some_and(StatusCodeOption::is_success));
    }
}
