//! Apple Boot Service Discovery Protocol, carried as sub-options of the
//! DHCPv4 vendor-specific information option (43).

use super::message::default_parameter_request_list;
use super::option::DhcpOption;
use super::options::{split_frames, write_tlv, Frame};
use super::packet::Message;
use super::types::{HType, MessageType as DhcpMessageType, OptionCode};
use crate::cursor::Cursor;
use crate::error::{BuildError, DecodeError};
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::Ipv4Addr;

/// Vendor class identifier sent by BSDP clients.
pub const CLASS_IDENTIFIER: &str = "AAPLBSDPC";
/// BSDP protocol version 1.1.
pub const VERSION_1_1: u16 = 0x0101;

pub mod code {
    pub const MESSAGE_TYPE: u8 = 1;
    pub const VERSION: u8 = 2;
    pub const SERVER_IDENTIFIER: u8 = 3;
    pub const SERVER_PRIORITY: u8 = 4;
    pub const REPLY_PORT: u8 = 5;
    pub const DEFAULT_BOOT_IMAGE_ID: u8 = 7;
    pub const SELECTED_BOOT_IMAGE_ID: u8 = 8;
    pub const BOOT_IMAGE_LIST: u8 = 9;
    pub const MACHINE_NAME: u8 = 130;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    List,
    Select,
    Failed,
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(n: u8) -> Self {
        match n {
            1 => MessageType::List,
            2 => MessageType::Select,
            3 => MessageType::Failed,
            n => MessageType::Unknown(n),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(t: MessageType) -> Self {
        match t {
            MessageType::List => 1,
            MessageType::Select => 2,
            MessageType::Failed => 3,
            MessageType::Unknown(n) => n,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::List => write!(f, "LIST"),
            MessageType::Select => write!(f, "SELECT"),
            MessageType::Failed => write!(f, "FAILED"),
            MessageType::Unknown(n) => write!(f, "unknown ({n})"),
        }
    }
}

/// The 4-byte boot image identifier.
///
/// ```text
/// byte 0: install flag (bit 7) | image kind (bits 0-6)
/// byte 1: reserved
/// byte 2-3: index
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BootImageId {
    pub is_install: bool,
    pub image_kind: u8,
    pub index: u16,
}

impl BootImageId {
    pub const LEN: usize = 4;

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let id = Self::read(&mut cursor);
        cursor.finish()?;
        Ok(id)
    }

    fn read(cursor: &mut Cursor<'_>) -> Self {
        let attributes = cursor.read_u8();
        let _reserved = cursor.read_u8();
        let index = cursor.read_u16();
        Self {
            is_install: attributes & 0x80 != 0,
            image_kind: attributes & 0x7f,
            index,
        }
    }

    fn write_to(&self, buf: &mut BytesMut) {
        let install = if self.is_install { 0x80 } else { 0 };
        buf.put_u8(install | (self.image_kind & 0x7f));
        buf.put_u8(0);
        buf.put_u16(self.index);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        self.write_to(&mut buf);
        buf.to_vec()
    }
}

impl fmt::Display for BootImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_install { "install" } else { "boot" };
        write!(f, "[{}] {} image kind {}", self.index, kind, self.image_kind)
    }
}

/// A boot image entry: identifier plus a length-prefixed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootImage {
    pub id: BootImageId,
    pub name: String,
}

impl BootImage {
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let image = Self::read(&mut cursor)?;
        cursor.finish()?;
        Ok(image)
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let id = BootImageId::read(cursor);
        let len = cursor.read_u8() as usize;
        let name = String::from_utf8_lossy(cursor.read_n(len)).into_owned();
        cursor.error()?;
        Ok(Self { id, name })
    }

    fn write_to(&self, buf: &mut BytesMut) {
        self.id.write_to(buf);
        let name = &self.name.as_bytes()[..self.name.len().min(255)];
        buf.put_u8(name.len() as u8);
        buf.put_slice(name);
    }
}

impl fmt::Display for BootImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.name)
    }
}

/// Boot images packed back to back until the data runs out.
pub fn boot_image_list_from_bytes(data: &[u8]) -> Result<Vec<BootImage>, DecodeError> {
    let mut cursor = Cursor::new(data);
    let mut images = Vec::new();
    while cursor.has(1) {
        images.push(BootImage::read(&mut cursor)?);
    }
    cursor.finish()?;
    Ok(images)
}

/// One decoded BSDP sub-option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BsdpOption {
    MessageType(MessageType),
    Version(u16),
    ServerIdentifier(Ipv4Addr),
    ServerPriority(u16),
    ReplyPort(u16),
    DefaultBootImageId(BootImageId),
    SelectedBootImageId(BootImageId),
    BootImageList(Vec<BootImage>),
    MachineName(String),
    Unknown(u8, Vec<u8>),
}

impl BsdpOption {
    pub fn parse(code: u8, data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let opt = match code {
            code::MESSAGE_TYPE => BsdpOption::MessageType(cursor.read_u8().into()),
            code::VERSION => BsdpOption::Version(cursor.read_u16()),
            code::SERVER_IDENTIFIER => BsdpOption::ServerIdentifier(cursor.read_ipv4()),
            code::SERVER_PRIORITY => BsdpOption::ServerPriority(cursor.read_u16()),
            code::REPLY_PORT => BsdpOption::ReplyPort(cursor.read_u16()),
            code::DEFAULT_BOOT_IMAGE_ID => {
                BsdpOption::DefaultBootImageId(BootImageId::read(&mut cursor))
            }
            code::SELECTED_BOOT_IMAGE_ID => {
                BsdpOption::SelectedBootImageId(BootImageId::read(&mut cursor))
            }
            code::BOOT_IMAGE_LIST => {
                BsdpOption::BootImageList(boot_image_list_from_bytes(cursor.read_all())?)
            }
            code::MACHINE_NAME => {
                BsdpOption::MachineName(String::from_utf8_lossy(cursor.read_all()).into_owned())
            }
            _ => BsdpOption::Unknown(code, cursor.read_all().to_vec()),
        };
        cursor.finish().map_err(|_| {
            DecodeError::length(format!("BSDP sub-option {code}"), data.len())
        })?;
        Ok(opt)
    }

    pub fn code(&self) -> u8 {
        match self {
            BsdpOption::MessageType(_) => code::MESSAGE_TYPE,
            BsdpOption::Version(_) => code::VERSION,
            BsdpOption::ServerIdentifier(_) => code::SERVER_IDENTIFIER,
            BsdpOption::ServerPriority(_) => code::SERVER_PRIORITY,
            BsdpOption::ReplyPort(_) => code::REPLY_PORT,
            BsdpOption::DefaultBootImageId(_) => code::DEFAULT_BOOT_IMAGE_ID,
            BsdpOption::SelectedBootImageId(_) => code::SELECTED_BOOT_IMAGE_ID,
            BsdpOption::BootImageList(_) => code::BOOT_IMAGE_LIST,
            BsdpOption::MachineName(_) => code::MACHINE_NAME,
            BsdpOption::Unknown(code, _) => *code,
        }
    }

    fn value_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        match self {
            BsdpOption::MessageType(t) => buf.put_u8(u8::from(*t)),
            BsdpOption::Version(n) | BsdpOption::ServerPriority(n) | BsdpOption::ReplyPort(n) => {
                buf.put_u16(*n)
            }
            BsdpOption::ServerIdentifier(ip) => buf.put_slice(&ip.octets()),
            BsdpOption::DefaultBootImageId(id) | BsdpOption::SelectedBootImageId(id) => {
                id.write_to(&mut buf)
            }
            BsdpOption::BootImageList(images) => {
                for image in images {
                    image.write_to(&mut buf);
                }
            }
            BsdpOption::MachineName(name) => buf.put_slice(name.as_bytes()),
            BsdpOption::Unknown(_, data) => buf.put_slice(data),
        }
        buf.to_vec()
    }
}

/// The decoded content of a BSDP vendor-specific information option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorOptions {
    pub options: Vec<BsdpOption>,
}

impl VendorOptions {
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let options = split_frames(data)?
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Tlv { code, data } => Some(BsdpOption::parse(code, &data)),
                Frame::Pad | Frame::End => None,
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { options })
    }

    /// Decodes option 43 of `msg`, if present.
    pub fn from_message(msg: &Message) -> Result<Option<Self>, DecodeError> {
        msg.vendor_specific().map(Self::from_bytes).transpose()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for opt in &self.options {
            write_tlv(&mut buf, opt.code(), &opt.value_bytes());
        }
        buf.to_vec()
    }

    pub fn get(&self, code: u8) -> Option<&BsdpOption> {
        self.options.iter().find(|o| o.code() == code)
    }

    pub fn message_type(&self) -> Option<MessageType> {
        match self.get(code::MESSAGE_TYPE) {
            Some(BsdpOption::MessageType(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn boot_images(&self) -> &[BootImage] {
        match self.get(code::BOOT_IMAGE_LIST) {
            Some(BsdpOption::BootImageList(images)) => images,
            _ => &[],
        }
    }

    pub fn default_boot_image(&self) -> Option<&BootImage> {
        let Some(BsdpOption::DefaultBootImageId(id)) = self.get(code::DEFAULT_BOOT_IMAGE_ID)
        else {
            return None;
        };
        self.boot_images().iter().find(|image| image.id == *id)
    }
}

/// Builds an INFORM[LIST] asking BSDP servers for their boot images.
pub fn new_inform_list(
    hw_addr: &[u8],
    local_ip: Ipv4Addr,
    reply_port: u16,
) -> Result<Message, BuildError> {
    let mut msg = super::message::new_inform(hw_addr, local_ip)?;
    msg.set_htype(HType::Eth);

    let mut vendor = VendorOptions::default();
    vendor.options.push(BsdpOption::MessageType(MessageType::List));
    vendor.options.push(BsdpOption::Version(VERSION_1_1));
    if reply_port != super::types::CLIENT_PORT {
        vendor.options.push(BsdpOption::ReplyPort(reply_port));
    }

    let mut prl = default_parameter_request_list();
    prl.push(OptionCode::VENDOR_SPECIFIC);
    prl.push(OptionCode::CLASS_IDENTIFIER);

    let opts = msg.opts_mut();
    opts.update(DhcpOption::ParameterRequestList(prl));
    opts.add(DhcpOption::ClassIdentifier(CLASS_IDENTIFIER.to_string()));
    opts.add(DhcpOption::VendorSpecific(vendor.to_bytes()));
    Ok(msg)
}

/// Builds an INFORM[SELECT] choosing `image` from the ACK[LIST] `ack`.
pub fn new_inform_select_from_ack(
    ack: &Message,
    image: &BootImage,
) -> Result<Message, BuildError> {
    match ack.message_type() {
        Some(DhcpMessageType::Ack) => {}
        other => {
            return Err(BuildError::unexpected(
                DhcpMessageType::Ack,
                other.map_or_else(|| "none".to_string(), |t| t.to_string()),
            ))
        }
    }
    let vendor = VendorOptions::from_message(ack)
        .ok()
        .flatten()
        .ok_or(BuildError::MissingOption("Vendor Specific Information"))?;
    let server = match vendor.get(code::SERVER_IDENTIFIER) {
        Some(BsdpOption::ServerIdentifier(ip)) => *ip,
        _ => ack
            .server_identifier()
            .ok_or(BuildError::MissingOption("Server Identifier"))?,
    };

    let mut msg = super::message::new_inform(ack.chaddr(), ack.ciaddr())?;
    msg.set_xid(ack.xid());

    let mut selected = VendorOptions::default();
    selected
        .options
        .push(BsdpOption::MessageType(MessageType::Select));
    selected.options.push(BsdpOption::Version(VERSION_1_1));
    selected.options.push(BsdpOption::ServerIdentifier(server));
    selected
        .options
        .push(BsdpOption::SelectedBootImageId(image.id));

    let opts = msg.opts_mut();
    opts.add(DhcpOption::ClassIdentifier(CLASS_IDENTIFIER.to_string()));
    opts.add(DhcpOption::VendorSpecific(selected.to_bytes()));
    Ok(msg)
}
