//! DHCPv6 option framing and the ordered options container.
//!
//! Every option is a 2-byte code, a 2-byte length and that many bytes of
//! data. Each TLV occurrence is decoded as its own option: several IA_NA,
//! IA Address or Vendor Class options in one message are distinct values,
//! so same-code fragments are never merged.

use super::option::DhcpOption;
use super::types::OptionCode;
use crate::cursor::Cursor;
use crate::error::DecodeError;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Deepest level of encapsulated options accepted when decoding. IA_NA,
/// IA Address and Status Code only need three.
pub const MAX_NESTING_DEPTH: usize = 8;

/// Splits `data` into `(code, value)` pairs.
pub(crate) fn split_tlvs(data: &[u8]) -> Result<Vec<(u16, &[u8])>, DecodeError> {
    let mut cursor = Cursor::new(data);
    let mut tlvs = Vec::new();
    while cursor.has(4) {
        let code = cursor.read_u16();
        let len = cursor.read_u16() as usize;
        let Some(value) = cursor.consume(len) else {
            break;
        };
        tlvs.push((code, value));
    }
    cursor.error()?;
    if !cursor.is_empty() {
        return Err(DecodeError::InvalidOptions(format!(
            "{} trailing byte(s) after last option",
            cursor.remaining()
        )));
    }
    Ok(tlvs)
}

/// Writes one TLV. Values longer than 65535 bytes cannot be framed and are
/// truncated with a warning.
pub(crate) fn write_tlv(buf: &mut BytesMut, code: u16, value: &[u8]) {
    let value = if value.len() > usize::from(u16::MAX) {
        tracing::warn!(
            "DHCPv6 option {} value of {} bytes truncated",
            code,
            value.len()
        );
        &value[..usize::from(u16::MAX)]
    } else {
        value
    };
    buf.put_u16(code);
    buf.put_u16(value.len() as u16);
    buf.put_slice(value);
}

/// Ordered DHCPv6 options. Duplicate codes are legal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    list: Vec<DhcpOption>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        Self::from_bytes_nested(data, 0)
    }

    /// Decodes options encapsulated `depth` levels deep, e.g. 1 for the
    /// options inside an IA_NA.
    pub(crate) fn from_bytes_nested(data: &[u8], depth: usize) -> Result<Self, DecodeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::InvalidOptions(format!(
                "options nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        let list = split_tlvs(data)?
            .into_iter()
            .map(|(code, value)| DhcpOption::parse_nested(OptionCode(code), value, depth))
            .collect();
        Ok(Self { list })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf.to_vec()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        for opt in &self.list {
            write_tlv(buf, opt.code().0, &opt.value_bytes());
        }
    }

    /// Wire length of [`Options::to_bytes`].
    pub fn encoded_len(&self) -> usize {
        self.list.iter().map(|o| 4 + o.value_bytes().len()).sum()
    }

    pub fn add(&mut self, opt: DhcpOption) {
        self.list.push(opt);
    }

    /// Replaces the first option with the same code, or appends it.
    pub fn update(&mut self, opt: DhcpOption) {
        let code = opt.code();
        match self.list.iter_mut().find(|o| o.code() == code) {
            Some(slot) => *slot = opt,
            None => self.list.push(opt),
        }
    }

    /// Removes every option with `code`.
    pub fn del(&mut self, code: OptionCode) {
        self.list.retain(|o| o.code() != code);
    }

    pub fn get(&self, code: OptionCode) -> Option<&DhcpOption> {
        self.list.iter().find(|o| o.code() == code)
    }

    pub fn get_all(&self, code: OptionCode) -> Vec<&DhcpOption> {
        self.list.iter().filter(|o| o.code() == code).collect()
    }

    pub fn has(&self, code: OptionCode) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DhcpOption> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl From<Vec<DhcpOption>> for Options {
    fn from(list: Vec<DhcpOption>) -> Self {
        Self { list }
    }
}

impl FromIterator<DhcpOption> for Options {
    fn from_iter<I: IntoIterator<Item = DhcpOption>>(iter: I) -> Self {
        Self {
            list: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Options {
    type Item = &'a DhcpOption;
    type IntoIter = std::slice::Iter<'a, DhcpOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for opt in &self.list {
            writeln!(f, "    {opt}")?;
        }
        Ok(())
    }
}
