//! Scalar DHCPv4 header and option-code types.

use std::fmt;

/// DHCPv4 server port.
pub const SERVER_PORT: u16 = 67;
/// DHCPv4 client port.
pub const CLIENT_PORT: u16 = 68;

/// BOOTP message opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Opcode {
    #[default]
    BootRequest,
    BootReply,
    Unknown(u8),
}

impl From<u8> for Opcode {
    fn from(n: u8) -> Self {
        match n {
            1 => Opcode::BootRequest,
            2 => Opcode::BootReply,
            n => Opcode::Unknown(n),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::BootRequest => 1,
            Opcode::BootReply => 2,
            Opcode::Unknown(n) => n,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::BootRequest => write!(f, "BootRequest"),
            Opcode::BootReply => write!(f, "BootReply"),
            Opcode::Unknown(n) => write!(f, "unknown opcode ({n})"),
        }
    }
}

/// ARP hardware type of the `chaddr` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HType {
    #[default]
    Eth,
    Ieee802,
    Infiniband,
    Unknown(u8),
}

impl From<u8> for HType {
    fn from(n: u8) -> Self {
        match n {
            1 => HType::Eth,
            6 => HType::Ieee802,
            32 => HType::Infiniband,
            n => HType::Unknown(n),
        }
    }
}

impl From<HType> for u8 {
    fn from(t: HType) -> Self {
        match t {
            HType::Eth => 1,
            HType::Ieee802 => 6,
            HType::Infiniband => 32,
            HType::Unknown(n) => n,
        }
    }
}

impl fmt::Display for HType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HType::Eth => write!(f, "Ethernet"),
            HType::Ieee802 => write!(f, "IEEE 802"),
            HType::Infiniband => write!(f, "InfiniBand"),
            HType::Unknown(n) => write!(f, "unknown hwtype ({n})"),
        }
    }
}

/// The BOOTP flags field. Only the broadcast bit is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(u16);

impl Flags {
    const BROADCAST: u16 = 0x8000;

    pub fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub fn broadcast(self) -> bool {
        self.0 & Self::BROADCAST != 0
    }

    pub fn set_broadcast(mut self) -> Self {
        self.0 |= Self::BROADCAST;
        self
    }

    pub fn set_unicast(mut self) -> Self {
        self.0 &= !Self::BROADCAST;
        self
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.broadcast() {
            write!(f, "Broadcast")
        } else {
            write!(f, "Unicast")
        }
    }
}

/// The 4-byte DHCPv4 transaction ID.
///
/// Distinct from the 3-byte DHCPv6 `TransactionId`; the two never convert
/// into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransactionId(pub [u8; 4]);

impl TransactionId {
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl From<u32> for TransactionId {
    fn from(n: u32) -> Self {
        Self(n.to_be_bytes())
    }
}

impl From<TransactionId> for u32 {
    fn from(xid: TransactionId) -> Self {
        u32::from_be_bytes(xid.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", u32::from(*self))
    }
}

/// DHCP message type carried in option 53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
    ForceRenew,
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(n: u8) -> Self {
        match n {
            1 => MessageType::Discover,
            2 => MessageType::Offer,
            3 => MessageType::Request,
            4 => MessageType::Decline,
            5 => MessageType::Ack,
            6 => MessageType::Nak,
            7 => MessageType::Release,
            8 => MessageType::Inform,
            9 => MessageType::ForceRenew,
            n => MessageType::Unknown(n),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::Discover => 1,
            MessageType::Offer => 2,
            MessageType::Request => 3,
            MessageType::Decline => 4,
            MessageType::Ack => 5,
            MessageType::Nak => 6,
            MessageType::Release => 7,
            MessageType::Inform => 8,
            MessageType::ForceRenew => 9,
            MessageType::Unknown(n) => n,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Discover => write!(f, "DISCOVER"),
            MessageType::Offer => write!(f, "OFFER"),
            MessageType::Request => write!(f, "REQUEST"),
            MessageType::Decline => write!(f, "DECLINE"),
            MessageType::Ack => write!(f, "ACK"),
            MessageType::Nak => write!(f, "NAK"),
            MessageType::Release => write!(f, "RELEASE"),
            MessageType::Inform => write!(f, "INFORM"),
            MessageType::ForceRenew => write!(f, "FORCERENEW"),
            MessageType::Unknown(n) => write!(f, "unknown ({n})"),
        }
    }
}

/// One-byte DHCPv4 option code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionCode(pub u8);

impl OptionCode {
    pub const PAD: Self = Self(0);
    pub const SUBNET_MASK: Self = Self(1);
    pub const TIME_OFFSET: Self = Self(2);
    pub const ROUTER: Self = Self(3);
    pub const TIME_SERVER: Self = Self(4);
    pub const NAME_SERVER: Self = Self(5);
    pub const DOMAIN_NAME_SERVER: Self = Self(6);
    pub const LOG_SERVER: Self = Self(7);
    pub const HOST_NAME: Self = Self(12);
    pub const DOMAIN_NAME: Self = Self(15);
    pub const ROOT_PATH: Self = Self(17);
    pub const INTERFACE_MTU: Self = Self(26);
    pub const BROADCAST_ADDRESS: Self = Self(28);
    pub const NTP_SERVERS: Self = Self(42);
    pub const VENDOR_SPECIFIC: Self = Self(43);
    pub const REQUESTED_IP_ADDRESS: Self = Self(50);
    pub const ADDRESS_LEASE_TIME: Self = Self(51);
    pub const OPTION_OVERLOAD: Self = Self(52);
    pub const MESSAGE_TYPE: Self = Self(53);
    pub const SERVER_IDENTIFIER: Self = Self(54);
    pub const PARAMETER_REQUEST_LIST: Self = Self(55);
    pub const MESSAGE: Self = Self(56);
    pub const MAX_MESSAGE_SIZE: Self = Self(57);
    pub const RENEWAL_TIME: Self = Self(58);
    pub const REBINDING_TIME: Self = Self(59);
    pub const CLASS_IDENTIFIER: Self = Self(60);
    pub const CLIENT_IDENTIFIER: Self = Self(61);
    pub const TFTP_SERVER_NAME: Self = Self(66);
    pub const BOOTFILE_NAME: Self = Self(67);
    pub const USER_CLASS: Self = Self(77);
    pub const RELAY_AGENT_INFORMATION: Self = Self(82);
    pub const CLIENT_SYSTEM_ARCHITECTURE: Self = Self(93);
    pub const CLIENT_NETWORK_INTERFACE_ID: Self = Self(94);
    pub const CLIENT_MACHINE_ID: Self = Self(97);
    pub const DOMAIN_SEARCH: Self = Self(119);
    pub const CLASSLESS_STATIC_ROUTE: Self = Self(121);
    pub const VENDOR_IDENTIFYING_VENDOR_CLASS: Self = Self(124);
    pub const END: Self = Self(255);

    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::PAD => "Pad",
            Self::SUBNET_MASK => "Subnet Mask",
            Self::TIME_OFFSET => "Time Offset",
            Self::ROUTER => "Router",
            Self::TIME_SERVER => "Time Server",
            Self::NAME_SERVER => "Name Server",
            Self::DOMAIN_NAME_SERVER => "Domain Name Server",
            Self::LOG_SERVER => "Log Server",
            Self::HOST_NAME => "Host Name",
            Self::DOMAIN_NAME => "Domain Name",
            Self::ROOT_PATH => "Root Path",
            Self::INTERFACE_MTU => "Interface MTU",
            Self::BROADCAST_ADDRESS => "Broadcast Address",
            Self::NTP_SERVERS => "NTP Servers",
            Self::VENDOR_SPECIFIC => "Vendor Specific Information",
            Self::REQUESTED_IP_ADDRESS => "Requested IP Address",
            Self::ADDRESS_LEASE_TIME => "IP Addresses Lease Time",
            Self::OPTION_OVERLOAD => "Option Overload",
            Self::MESSAGE_TYPE => "DHCP Message Type",
            Self::SERVER_IDENTIFIER => "Server Identifier",
            Self::PARAMETER_REQUEST_LIST => "Parameter Request List",
            Self::MESSAGE => "Message",
            Self::MAX_MESSAGE_SIZE => "Maximum DHCP Message Size",
            Self::RENEWAL_TIME => "Renew Time Value",
            Self::REBINDING_TIME => "Rebinding Time Value",
            Self::CLASS_IDENTIFIER => "Class Identifier",
            Self::CLIENT_IDENTIFIER => "Client identifier",
            Self::TFTP_SERVER_NAME => "TFTP Server Name",
            Self::BOOTFILE_NAME => "Bootfile Name",
            Self::USER_CLASS => "User Class Information",
            Self::RELAY_AGENT_INFORMATION => "Relay Agent Information",
            Self::CLIENT_SYSTEM_ARCHITECTURE => "Client System Architecture Type",
            Self::CLIENT_NETWORK_INTERFACE_ID => "Client Network Interface Identifier",
            Self::CLIENT_MACHINE_ID => "Client Machine Identifier",
            Self::DOMAIN_SEARCH => "DNS Domain Search List",
            Self::CLASSLESS_STATIC_ROUTE => "Classless Static Route",
            Self::VENDOR_IDENTIFYING_VENDOR_CLASS => "Vendor-Identifying Vendor Class",
            Self::END => "End",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u8> for OptionCode {
    fn from(n: u8) -> Self {
        Self(n)
    }
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "unknown ({})", self.0),
        }
    }
}
