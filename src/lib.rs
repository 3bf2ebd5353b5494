//! # dhcpkit - DHCPv4 and DHCPv6 building blocks
//!
//! dhcpkit encodes and decodes DHCPv4 and DHCPv6 packets, builds each
//! message of an exchange from the one before it, and drives complete
//! exchanges over UDP.
//!
//! ## Features
//!
//! - DHCPv4 options with RFC 3396 long option concatenation
//! - DHCPv6 messages, relay encapsulation and DUIDs
//! - Message builders for DORA and SOLICIT/ADVERTISE/REQUEST/REPLY
//! - A sequential exchange client and a concurrent client keyed by transaction ID
//! - Apple BSDP vendor options
//!
//! ## Example
//!
//! ```rust,no_run
//! use dhcpkit::{Client, ClientConfig};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mac_addr = Bytes::from_static(&[0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4]);
//!     let config = ClientConfig::new("eth0".to_string(), mac_addr);
//!     let client = Client::new(config).await?;
//!     match client.exchange_v4(None).await {
//!         Ok(conversation) => {
//!             for msg in &conversation {
//!                 println!("{}", msg.summary());
//!             }
//!         }
//!         Err(e) => eprintln!("{e}: got {} message(s)", e.conversation.len()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod async_client;
pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod network;
pub mod rfc1035label;
pub mod v4;
pub mod v6;

pub use async_client::{AsyncClient, Exchangeable};
pub use client::{Client, ExchangeError};
pub use config::{Args, ClientConfig};
pub use error::{BuildError, ClientError, DecodeError};
