//! DHCPv4 protocol implementation
//!
//! This module contains the DHCPv4-specific implementation including:
//! - Option codec and the options container
//! - Packet encoding and decoding
//! - Message builders for the DORA exchange
//! - State machine handling
//! - BSDP vendor extensions

pub mod bsdp;
pub mod handler;
pub mod message;
pub mod option;
pub mod options;
pub mod packet;
pub mod types;


pub use handler::DhcpV4Handler;
pub use message::{
    new_discovery, new_inform, new_release_from_ack, new_reply_from_request,
    new_request_from_offer,
};
pub use option::{DhcpOption, RelayAgentInformation, Route, UserClass, VendorClass};
pub use options::{Options, MAGIC_COOKIE};
pub use packet::Message;
pub use types::{Flags, HType, MessageType, Opcode, OptionCode, TransactionId};
