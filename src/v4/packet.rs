//! The DHCPv4 packet: a fixed BOOTP header, the magic cookie and options.

use super::option::{DhcpOption, Route};
use super::options::{Options, MAGIC_COOKIE};
use super::types::{Flags, HType, MessageType, Opcode, OptionCode, TransactionId};
use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::rfc1035label::Labels;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Size of the fixed BOOTP header that precedes the magic cookie.
pub const HEADER_LEN: usize = 236;
/// Smallest packet BOOTP relays and servers are required to accept.
pub const MIN_BOOTP_LEN: usize = 300;

pub(crate) const CHADDR_LEN: usize = 16;
const SNAME_LEN: usize = 64;
const FILE_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    opcode: Opcode,
    htype: HType,
    hops: u8,
    xid: TransactionId,
    secs: u16,
    flags: Flags,
    ciaddr: Ipv4Addr,
    yiaddr: Ipv4Addr,
    siaddr: Ipv4Addr,
    giaddr: Ipv4Addr,
    chaddr: Vec<u8>,
    sname: Vec<u8>,
    fname: Vec<u8>,
    opts: Options,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            opcode: Opcode::BootRequest,
            htype: HType::Eth,
            hops: 0,
            xid: TransactionId::default(),
            secs: 0,
            flags: Flags::default(),
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: Vec::new(),
            sname: Vec::new(),
            fname: Vec::new(),
            opts: Options::new(),
        }
    }
}

impl Message {
    /// A BOOTREQUEST with a random transaction ID and an End option.
    pub fn new() -> Self {
        Self {
            xid: TransactionId::random(),
            opts: Options::from(vec![DhcpOption::End]),
            ..Self::default()
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let needed = HEADER_LEN + MAGIC_COOKIE.len();
        if data.len() < needed {
            return Err(DecodeError::PacketTooShort {
                needed,
                length: data.len(),
            });
        }

        let mut cursor = Cursor::new(&data[..HEADER_LEN]);
        let opcode = Opcode::from(cursor.read_u8());
        let htype = HType::from(cursor.read_u8());
        let hlen = usize::from(cursor.read_u8()).min(CHADDR_LEN);
        let hops = cursor.read_u8();
        let xid = TransactionId(cursor.array::<4>().unwrap_or_default());
        let secs = cursor.read_u16();
        let flags = Flags::new(cursor.read_u16());
        let ciaddr = cursor.read_ipv4();
        let yiaddr = cursor.read_ipv4();
        let siaddr = cursor.read_ipv4();
        let giaddr = cursor.read_ipv4();
        let chaddr = cursor.read_n(CHADDR_LEN).get(..hlen).unwrap_or_default().to_vec();
        let sname = nul_terminated(cursor.read_n(SNAME_LEN));
        let fname = nul_terminated(cursor.read_n(FILE_LEN));
        cursor.finish()?;

        let opts = Options::from_bytes_with_cookie(&data[HEADER_LEN..])?;

        Ok(Self {
            opcode,
            htype,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            fname,
            opts,
        })
    }

    /// Serializes the packet. An End option is appended when the options
    /// do not contain one.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(MIN_BOOTP_LEN);
        buf.put_u8(self.opcode.into());
        buf.put_u8(self.htype.into());
        buf.put_u8(self.chaddr.len().min(CHADDR_LEN) as u8);
        buf.put_u8(self.hops);
        buf.put_slice(&self.xid.0);
        buf.put_u16(self.secs);
        buf.put_u16(self.flags.bits());
        buf.put_slice(&self.ciaddr.octets());
        buf.put_slice(&self.yiaddr.octets());
        buf.put_slice(&self.siaddr.octets());
        buf.put_slice(&self.giaddr.octets());
        put_fixed(&mut buf, &self.chaddr, CHADDR_LEN);
        put_fixed(&mut buf, &self.sname, SNAME_LEN);
        put_fixed(&mut buf, &self.fname, FILE_LEN);
        buf.put_slice(&MAGIC_COOKIE);
        self.opts.write_to(&mut buf);
        if !self.opts.has_end() {
            tracing::warn!(xid = %self.xid, "options lack an End option, appending one");
            buf.put_u8(OptionCode::END.0);
        }
        buf.to_vec()
    }

    /// Like [`Message::to_bytes`], padded with Pad options up to the
    /// 300-byte BOOTP minimum.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        if bytes.len() < MIN_BOOTP_LEN {
            bytes.resize(MIN_BOOTP_LEN, OptionCode::PAD.0);
        }
        bytes
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn htype(&self) -> HType {
        self.htype
    }

    pub fn hops(&self) -> u8 {
        self.hops
    }

    pub fn xid(&self) -> TransactionId {
        self.xid
    }

    pub fn secs(&self) -> u16 {
        self.secs
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn ciaddr(&self) -> Ipv4Addr {
        self.ciaddr
    }

    pub fn yiaddr(&self) -> Ipv4Addr {
        self.yiaddr
    }

    pub fn siaddr(&self) -> Ipv4Addr {
        self.siaddr
    }

    pub fn giaddr(&self) -> Ipv4Addr {
        self.giaddr
    }

    pub fn chaddr(&self) -> &[u8] {
        &self.chaddr
    }

    /// Server host name bytes up to the first NUL. Usually ASCII, but
    /// nothing on the wire guarantees it.
    pub fn sname(&self) -> &[u8] {
        &self.sname
    }

    /// Boot file name bytes up to the first NUL.
    pub fn fname(&self) -> &[u8] {
        &self.fname
    }

    pub fn opts(&self) -> &Options {
        &self.opts
    }

    pub fn opts_mut(&mut self) -> &mut Options {
        &mut self.opts
    }

    pub fn set_opcode(&mut self, opcode: Opcode) -> &mut Self {
        self.opcode = opcode;
        self
    }

    pub fn set_htype(&mut self, htype: HType) -> &mut Self {
        self.htype = htype;
        self
    }

    pub fn set_hops(&mut self, hops: u8) -> &mut Self {
        self.hops = hops;
        self
    }

    pub fn set_xid(&mut self, xid: impl Into<TransactionId>) -> &mut Self {
        self.xid = xid.into();
        self
    }

    pub fn set_secs(&mut self, secs: u16) -> &mut Self {
        self.secs = secs;
        self
    }

    pub fn set_flags(&mut self, flags: Flags) -> &mut Self {
        self.flags = flags;
        self
    }

    pub fn set_ciaddr(&mut self, ip: Ipv4Addr) -> &mut Self {
        self.ciaddr = ip;
        self
    }

    pub fn set_yiaddr(&mut self, ip: Ipv4Addr) -> &mut Self {
        self.yiaddr = ip;
        self
    }

    pub fn set_siaddr(&mut self, ip: Ipv4Addr) -> &mut Self {
        self.siaddr = ip;
        self
    }

    pub fn set_giaddr(&mut self, ip: Ipv4Addr) -> &mut Self {
        self.giaddr = ip;
        self
    }

    /// Sets the client hardware address, truncated to 16 bytes.
    pub fn set_chaddr(&mut self, chaddr: &[u8]) -> &mut Self {
        self.chaddr = chaddr[..chaddr.len().min(CHADDR_LEN)].to_vec();
        self
    }

    pub fn set_sname(&mut self, sname: impl Into<Vec<u8>>) -> &mut Self {
        self.sname = sname.into();
        self
    }

    pub fn set_fname(&mut self, fname: impl Into<Vec<u8>>) -> &mut Self {
        self.fname = fname.into();
        self
    }

    pub fn set_opts(&mut self, opts: Options) -> &mut Self {
        self.opts = opts;
        self
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags.broadcast()
    }

    pub fn message_type(&self) -> Option<MessageType> {
        match self.opts.get(OptionCode::MESSAGE_TYPE) {
            Some(DhcpOption::MessageType(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        match self.opts.get(OptionCode::SERVER_IDENTIFIER) {
            Some(DhcpOption::ServerIdentifier(ip)) => Some(*ip),
            _ => None,
        }
    }

    pub fn requested_ip_address(&self) -> Option<Ipv4Addr> {
        match self.opts.get(OptionCode::REQUESTED_IP_ADDRESS) {
            Some(DhcpOption::RequestedIpAddress(ip)) => Some(*ip),
            _ => None,
        }
    }

    pub fn subnet_mask(&self) -> Option<Ipv4Addr> {
        match self.opts.get(OptionCode::SUBNET_MASK) {
            Some(DhcpOption::SubnetMask(ip)) => Some(*ip),
            _ => None,
        }
    }

    pub fn router(&self) -> Option<&[Ipv4Addr]> {
        match self.opts.get(OptionCode::ROUTER) {
            Some(DhcpOption::Router(ips)) => Some(ips),
            _ => None,
        }
    }

    pub fn dns(&self) -> Option<&[Ipv4Addr]> {
        match self.opts.get(OptionCode::DOMAIN_NAME_SERVER) {
            Some(DhcpOption::DomainNameServer(ips)) => Some(ips),
            _ => None,
        }
    }

    pub fn ntp_servers(&self) -> Option<&[Ipv4Addr]> {
        match self.opts.get(OptionCode::NTP_SERVERS) {
            Some(DhcpOption::NtpServers(ips)) => Some(ips),
            _ => None,
        }
    }

    pub fn domain_name(&self) -> Option<&str> {
        match self.opts.get(OptionCode::DOMAIN_NAME) {
            Some(DhcpOption::DomainName(s)) => Some(s),
            _ => None,
        }
    }

    pub fn host_name(&self) -> Option<&str> {
        match self.opts.get(OptionCode::HOST_NAME) {
            Some(DhcpOption::HostName(s)) => Some(s),
            _ => None,
        }
    }

    pub fn domain_search(&self) -> Option<&Labels> {
        match self.opts.get(OptionCode::DOMAIN_SEARCH) {
            Some(DhcpOption::DomainSearch(labels)) => Some(labels),
            _ => None,
        }
    }

    pub fn classless_static_routes(&self) -> Option<&[Route]> {
        match self.opts.get(OptionCode::CLASSLESS_STATIC_ROUTE) {
            Some(DhcpOption::ClasslessStaticRoute(routes)) => Some(routes),
            _ => None,
        }
    }

    pub fn lease_time(&self) -> Option<Duration> {
        match self.opts.get(OptionCode::ADDRESS_LEASE_TIME) {
            Some(DhcpOption::AddressLeaseTime(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn renewal_time(&self) -> Option<Duration> {
        match self.opts.get(OptionCode::RENEWAL_TIME) {
            Some(DhcpOption::RenewalTime(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn rebinding_time(&self) -> Option<Duration> {
        match self.opts.get(OptionCode::REBINDING_TIME) {
            Some(DhcpOption::RebindingTime(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn parameter_request_list(&self) -> Option<&[OptionCode]> {
        match self.opts.get(OptionCode::PARAMETER_REQUEST_LIST) {
            Some(DhcpOption::ParameterRequestList(codes)) => Some(codes),
            _ => None,
        }
    }

    pub fn vendor_specific(&self) -> Option<&[u8]> {
        match self.opts.get(OptionCode::VENDOR_SPECIFIC) {
            Some(DhcpOption::VendorSpecific(data)) => Some(data),
            _ => None,
        }
    }

    /// Hardware address as `aa:bb:cc:...`.
    pub fn hw_addr_string(&self) -> String {
        self.chaddr
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// A multi-line dump of every field and option.
    pub fn summary(&self) -> String {
        format!(
            "DHCPv4 Message\n  opcode: {}\n  hwtype: {}\n  hopcount: {}\n  transaction ID: {}\n  \
             num seconds: {}\n  flags: {} ({:#06x})\n  client IP: {}\n  your IP: {}\n  \
             server IP: {}\n  gateway IP: {}\n  client MAC: {}\n  server hostname: {}\n  \
             bootfile name: {}\n  options:\n{}",
            self.opcode,
            self.htype,
            self.hops,
            self.xid,
            self.secs,
            self.flags,
            self.flags.bits(),
            self.ciaddr,
            self.yiaddr,
            self.siaddr,
            self.giaddr,
            self.hw_addr_string(),
            String::from_utf8_lossy(&self.sname),
            String::from_utf8_lossy(&self.fname),
            self.opts,
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg_type = self
            .message_type()
            .map_or_else(|| "none".to_string(), |t| t.to_string());
        write!(
            f,
            "DHCPv4(opcode={} xid={} hwaddr={} msg_type={} your_ip={} server_ip={})",
            self.opcode,
            self.xid,
            self.hw_addr_string(),
            msg_type,
            self.yiaddr,
            self.server_identifier()
                .map_or_else(|| self.siaddr.to_string(), |ip| ip.to_string()),
        )
    }
}

fn put_fixed(buf: &mut BytesMut, data: &[u8], width: usize) {
    let n = data.len().min(width);
    buf.put_slice(&data[..n]);
    buf.put_bytes(0, width - n);
}

fn nul_terminated(data: &[u8]) -> Vec<u8> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    data[..end].to_vec()
}
