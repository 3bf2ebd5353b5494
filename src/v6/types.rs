//! Scalar DHCPv6 header and option-code types.

use rand::random;
use std::fmt;

/// DHCPv6 client port.
pub const CLIENT_PORT: u16 = 546;
/// DHCPv6 server and relay agent port.
pub const SERVER_PORT: u16 = 547;

/// Maximum number of relay agents a message may traverse.
pub const HOP_COUNT_LIMIT: u8 = 32;

/// DHCPv6 message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Solicit,
    Advertise,
    Request,
    Confirm,
    Renew,
    Rebind,
    Reply,
    Release,
    Decline,
    Reconfigure,
    InformationRequest,
    RelayForward,
    RelayReply,
    LeaseQuery,
    LeaseQueryReply,
    LeaseQueryDone,
    LeaseQueryData,
    Unknown(u8),
}

impl MessageType {
    pub fn is_relay(self) -> bool {
        matches!(self, MessageType::RelayForward | MessageType::RelayReply)
    }
}

impl From<u8> for MessageType {
    fn from(n: u8) -> Self {
        match n {
            1 => MessageType::Solicit,
            2 => MessageType::Advertise,
            3 => MessageType::Request,
            4 => MessageType::Confirm,
            5 => MessageType::Renew,
            6 => MessageType::Rebind,
            7 => MessageType::Reply,
            8 => MessageType::Release,
            9 => MessageType::Decline,
            10 => MessageType::Reconfigure,
            11 => MessageType::InformationRequest,
            12 => MessageType::RelayForward,
            13 => MessageType::RelayReply,
            14 => MessageType::LeaseQuery,
            15 => MessageType::LeaseQueryReply,
            16 => MessageType::LeaseQueryDone,
            17 => MessageType::LeaseQueryData,
            n => MessageType::Unknown(n),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::Solicit => 1,
            MessageType::Advertise => 2,
            MessageType::Request => 3,
            MessageType::Confirm => 4,
            MessageType::Renew => 5,
            MessageType::Rebind => 6,
            MessageType::Reply => 7,
            MessageType::Release => 8,
            MessageType::Decline => 9,
            MessageType::Reconfigure => 10,
            MessageType::InformationRequest => 11,
            MessageType::RelayForward => 12,
            MessageType::RelayReply => 13,
            MessageType::LeaseQuery => 14,
            MessageType::LeaseQueryReply => 15,
            MessageType::LeaseQueryDone => 16,
            MessageType::LeaseQueryData => 17,
            MessageType::Unknown(n) => n,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Solicit => "SOLICIT",
            MessageType::Advertise => "ADVERTISE",
            MessageType::Request => "REQUEST",
            MessageType::Confirm => "CONFIRM",
            MessageType::Renew => "RENEW",
            MessageType::Rebind => "REBIND",
            MessageType::Reply => "REPLY",
            MessageType::Release => "RELEASE",
            MessageType::Decline => "DECLINE",
            MessageType::Reconfigure => "RECONFIGURE",
            MessageType::InformationRequest => "INFORMATION-REQUEST",
            MessageType::RelayForward => "RELAY-FORW",
            MessageType::RelayReply => "RELAY-REPL",
            MessageType::LeaseQuery => "LEASEQUERY",
            MessageType::LeaseQueryReply => "LEASEQUERY-REPLY",
            MessageType::LeaseQueryDone => "LEASEQUERY-DONE",
            MessageType::LeaseQueryData => "LEASEQUERY-DATA",
            MessageType::Unknown(n) => return write!(f, "unknown ({n})"),
        };
        f.write_str(name)
    }
}

/// The 3-byte DHCPv6 transaction ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransactionId(pub [u8; 3]);

impl TransactionId {
    pub fn random() -> Self {
        Self(random())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

/// A 16-bit DHCPv6 option code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionCode(pub u16);

impl OptionCode {
    pub const CLIENT_ID: OptionCode = OptionCode(1);
    pub const SERVER_ID: OptionCode = OptionCode(2);
    pub const IA_NA: OptionCode = OptionCode(3);
    pub const IA_TA: OptionCode = OptionCode(4);
    pub const IA_ADDR: OptionCode = OptionCode(5);
    pub const ORO: OptionCode = OptionCode(6);
    pub const PREFERENCE: OptionCode = OptionCode(7);
    pub const ELAPSED_TIME: OptionCode = OptionCode(8);
    pub const RELAY_MSG: OptionCode = OptionCode(9);
    pub const UNICAST: OptionCode = OptionCode(12);
    pub const STATUS_CODE: OptionCode = OptionCode(13);
    pub const RAPID_COMMIT: OptionCode = OptionCode(14);
    pub const USER_CLASS: OptionCode = OptionCode(15);
    pub const VENDOR_CLASS: OptionCode = OptionCode(16);
    pub const VENDOR_OPTS: OptionCode = OptionCode(17);
    pub const INTERFACE_ID: OptionCode = OptionCode(18);
    pub const RECONF_MSG: OptionCode = OptionCode(19);
    pub const RECONF_ACCEPT: OptionCode = OptionCode(20);
    pub const DNS_SERVERS: OptionCode = OptionCode(23);
    pub const DOMAIN_LIST: OptionCode = OptionCode(24);
    pub const IA_PD: OptionCode = OptionCode(25);
    pub const IA_PREFIX: OptionCode = OptionCode(26);
    pub const REMOTE_ID: OptionCode = OptionCode(37);
    pub const FQDN: OptionCode = OptionCode(39);
    pub const INFORMATION_REFRESH_TIME: OptionCode = OptionCode(32);
    pub const BOOTFILE_URL: OptionCode = OptionCode(59);
    pub const BOOTFILE_PARAM: OptionCode = OptionCode(60);
    pub const CLIENT_ARCH_TYPE: OptionCode = OptionCode(61);
    pub const NII: OptionCode = OptionCode(62);
    pub const CLIENT_LINKLAYER_ADDR: OptionCode = OptionCode(79);
    pub const SOL_MAX_RT: OptionCode = OptionCode(82);
    pub const INF_MAX_RT: OptionCode = OptionCode(83);

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::CLIENT_ID => "Client ID",
            Self::SERVER_ID => "Server ID",
            Self::IA_NA => "IA_NA",
            Self::IA_TA => "IA_TA",
            Self::IA_ADDR => "IA Address",
            Self::ORO => "Option Request",
            Self::PREFERENCE => "Preference",
            Self::ELAPSED_TIME => "Elapsed Time",
            Self::RELAY_MSG => "Relay Message",
            Self::UNICAST => "Server Unicast",
            Self::STATUS_CODE => "Status Code",
            Self::RAPID_COMMIT => "Rapid Commit",
            Self::USER_CLASS => "User Class",
            Self::VENDOR_CLASS => "Vendor Class",
            Self::VENDOR_OPTS => "Vendor-specific Information",
            Self::INTERFACE_ID => "Interface-Id",
            Self::RECONF_MSG => "Reconfigure Message",
            Self::RECONF_ACCEPT => "Reconfigure Accept",
            Self::DNS_SERVERS => "DNS Recursive Name Server",
            Self::DOMAIN_LIST => "Domain Search List",
            Self::IA_PD => "IA_PD",
            Self::IA_PREFIX => "IA Prefix",
            Self::REMOTE_ID => "Remote ID",
            Self::FQDN => "FQDN",
            Self::INFORMATION_REFRESH_TIME => "Information Refresh Time",
            Self::BOOTFILE_URL => "Boot File URL",
            Self::BOOTFILE_PARAM => "Boot File Parameters",
            Self::CLIENT_ARCH_TYPE => "Client System Architecture Type",
            Self::NII => "Client Network Interface Identifier",
            Self::CLIENT_LINKLAYER_ADDR => "Client Link-Layer Address",
            Self::SOL_MAX_RT => "SOL_MAX_RT",
            Self::INF_MAX_RT => "INF_MAX_RT",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown ({})", self.0),
        }
    }
}

/// Status codes carried by the Status Code option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    UnspecFail,
    NoAddrsAvail,
    NoBinding,
    NotOnLink,
    UseMulticast,
    NoPrefixAvail,
    Unknown(u16),
}

impl From<u16> for StatusCode {
    fn from(n: u16) -> Self {
        match n {
            0 => StatusCode::Success,
            1 => StatusCode::UnspecFail,
            2 => StatusCode::NoAddrsAvail,
            3 => StatusCode::NoBinding,
            4 => StatusCode::NotOnLink,
            5 => StatusCode::UseMulticast,
            6 => StatusCode::NoPrefixAvail,
            n => StatusCode::Unknown(n),
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(s: StatusCode) -> Self {
        match s {
            StatusCode::Success => 0,
            StatusCode::UnspecFail => 1,
            StatusCode::NoAddrsAvail => 2,
            StatusCode::NoBinding => 3,
            StatusCode::NotOnLink => 4,
            StatusCode::UseMulticast => 5,
            StatusCode::NoPrefixAvail => 6,
            StatusCode::Unknown(n) => n,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Unknown(n) => write!(f, "unknown status ({n})"),
            other => write!(f, "{other:?}"),
        }
    }
}
