//! DHCP Unique Identifiers (RFC 8415 §11).

use crate::cursor::Cursor;
use crate::error::DecodeError;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// ARP hardware type for Ethernet.
pub const HW_TYPE_ETHERNET: u16 = 1;

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z, the DUID-LLT epoch.
const DUID_EPOCH_OFFSET: u64 = 946_684_800;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Duid {
    /// Link-layer address plus time (type 1).
    Llt {
        hw_type: u16,
        time: u32,
        link_layer_addr: Vec<u8>,
    },
    /// Vendor-assigned, based on enterprise number (type 2).
    En {
        enterprise_number: u32,
        identifier: Vec<u8>,
    },
    /// Link-layer address (type 3).
    Ll {
        hw_type: u16,
        link_layer_addr: Vec<u8>,
    },
    /// UUID (type 4, RFC 6355).
    Uuid([u8; 16]),
    /// Any other DUID type, kept verbatim.
    Opaque { duid_type: u16, data: Vec<u8> },
}

impl Duid {
    pub const TYPE_LLT: u16 = 1;
    pub const TYPE_EN: u16 = 2;
    pub const TYPE_LL: u16 = 3;
    pub const TYPE_UUID: u16 = 4;

    /// A DUID-LL for an Ethernet hardware address.
    pub fn from_hardware_address(hw_addr: &[u8]) -> Self {
        Duid::Ll {
            hw_type: HW_TYPE_ETHERNET,
            link_layer_addr: hw_addr.to_vec(),
        }
    }

    /// A DUID-LLT for an Ethernet hardware address, stamped with the current time.
    pub fn llt(hw_addr: &[u8]) -> Self {
        let epoch = UNIX_EPOCH + Duration::from_secs(DUID_EPOCH_OFFSET);
        let time = SystemTime::now()
            .duration_since(epoch)
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or(0);
        Duid::Llt {
            hw_type: HW_TYPE_ETHERNET,
            time,
            link_layer_addr: hw_addr.to_vec(),
        }
    }

    pub fn duid_type(&self) -> u16 {
        match self {
            Duid::Llt { .. } => Self::TYPE_LLT,
            Duid::En { .. } => Self::TYPE_EN,
            Duid::Ll { .. } => Self::TYPE_LL,
            Duid::Uuid(_) => Self::TYPE_UUID,
            Duid::Opaque { duid_type, .. } => *duid_type,
        }
    }

    /// The link-layer address, for the DUID types that carry one.
    pub fn link_layer_addr(&self) -> Option<&[u8]> {
        match self {
            Duid::Llt {
                link_layer_addr, ..
            }
            | Duid::Ll {
                link_layer_addr, ..
            } => Some(link_layer_addr),
            _ => None,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < 2 {
            return Err(DecodeError::length("DUID", data.len()));
        }
        let mut cursor = Cursor::new(data);
        let duid_type = cursor.read_u16();
        let duid = match duid_type {
            Self::TYPE_LLT => Duid::Llt {
                hw_type: cursor.read_u16(),
                time: cursor.read_u32(),
                link_layer_addr: cursor.read_all().to_vec(),
            },
            Self::TYPE_EN => Duid::En {
                enterprise_number: cursor.read_u32(),
                identifier: cursor.read_all().to_vec(),
            },
            Self::TYPE_LL => Duid::Ll {
                hw_type: cursor.read_u16(),
                link_layer_addr: cursor.read_all().to_vec(),
            },
            Self::TYPE_UUID => match cursor.array::<16>() {
                Some(uuid) => Duid::Uuid(uuid),
                None => return Err(DecodeError::length("DUID-UUID", data.len())),
            },
            _ => Duid::Opaque {
                duid_type,
                data: cursor.read_all().to_vec(),
            },
        };
        cursor.finish()?;
        Ok(duid)
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.duid_type());
        match self {
            Duid::Llt {
                hw_type,
                time,
                link_layer_addr,
            } => {
                buf.put_u16(*hw_type);
                buf.put_u32(*time);
                buf.put_slice(link_layer_addr);
            }
            Duid::En {
                enterprise_number,
                identifier,
            } => {
                buf.put_u32(*enterprise_number);
                buf.put_slice(identifier);
            }
            Duid::Ll {
                hw_type,
                link_layer_addr,
            } => {
                buf.put_u16(*hw_type);
                buf.put_slice(link_layer_addr);
            }
            Duid::Uuid(uuid) => buf.put_slice(uuid),
            Duid::Opaque { data, .. } => buf.put_slice(data),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.to_vec()
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8], sep: &str) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

impl fmt::Display for Duid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duid::Llt {
                hw_type,
                time,
                link_layer_addr,
            } => {
                write!(f, "DUID-LLT hwtype={hw_type} time={time} hwaddr=")?;
                write_hex(f, link_layer_addr, ":")
            }
            Duid::En {
                enterprise_number,
                identifier,
            } => {
                write!(f, "DUID-EN enterprise={enterprise_number} id=")?;
                write_hex(f, identifier, "")
            }
            Duid::Ll {
                hw_type,
                link_layer_addr,
            } => {
                write!(f, "DUID-LL hwtype={hw_type} hwaddr=")?;
                write_hex(f, link_layer_addr, ":")
            }
            Duid::Uuid(uuid) => {
                f.write_str("DUID-UUID ")?;
                write_hex(f, uuid, "")
            }
            Duid::Opaque { duid_type, data } => {
                write!(f, "DUID type {duid_type} ")?;
                write_hex(f, data, "")
            }
        }
    }
}
