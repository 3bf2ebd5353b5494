//! DHCPv6 protocol implementation
//!
//! This module contains the DHCPv6-specific implementation including:
//! - DUIDs, option values and the options container
//! - Client/server and relay message encoding
//! - Message builders and relay encapsulation
//! - The SOLICIT/ADVERTISE/REQUEST/REPLY state machine

pub mod duid;
pub mod handler;
pub mod message;
pub mod option;
pub mod options;
pub mod packet;
pub mod types;

#[cfg(test)]
mod tests;

pub use duid::Duid;
pub use handler::DhcpV6Handler;
pub use message::{
    decapsulate_relay, decapsulate_relay_index, encapsulate_relay, new_advertise_from_solicit,
    new_information_request, new_relay_reply_from_forward, new_renew_from_reply,
    new_reply_from_message, new_request_from_advertise, new_solicit, new_solicit_with_cid,
};
pub use option::{DhcpOption, IaAddr, IaNa, IaPd, IaPrefix, StatusCodeOption};
pub use options::Options;
pub use packet::{Message, Packet, RelayMessage};
pub use types::{MessageType, OptionCode, StatusCode, TransactionId};
