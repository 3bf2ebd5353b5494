//! The DHCPv4 options container and its TLV framing.
//!
//! ```text
//!  code   len   data...          Pad (0) and End (255) are a bare code byte
//! +-----+-----+-----+-----+--
//! |  c  |  n  |  d1 |  d2 | ...
//! +-----+-----+-----+-----+--
//! ```
//!
//! Options whose code repeats are reassembled before parsing (RFC 3396),
//! and values longer than 255 bytes are split across consecutive TLVs when
//! encoding.

use super::option::DhcpOption;
use super::types::OptionCode;
use crate::cursor::Cursor;
use crate::error::DecodeError;
use bytes::{BufMut, BytesMut};
use std::collections::HashMap;
use std::fmt;

/// `99.130.83.99`, marks the start of the options area.
pub const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const MAX_FRAGMENT_LEN: usize = 255;

/// A single framed option before type dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    Pad,
    End,
    Tlv { code: u8, data: Vec<u8> },
}

/// Splits `data` into frames, concatenating the data of repeated codes into
/// the position of their first occurrence.
///
/// Anything other than Pad after End is rejected, including a second End.
pub(crate) fn split_frames(data: &[u8]) -> Result<Vec<Frame>, DecodeError> {
    let mut frames = Vec::new();
    let mut seen: HashMap<u8, usize> = HashMap::new();
    let mut cursor = Cursor::new(data);
    let mut ended = false;

    while cursor.has(1) {
        let code = cursor.read_u8();
        match OptionCode(code) {
            OptionCode::PAD => frames.push(Frame::Pad),
            OptionCode::END if ended => {
                return Err(DecodeError::InvalidOptions(
                    "option 255 found after End".to_string(),
                ));
            }
            OptionCode::END => {
                ended = true;
                frames.push(Frame::End);
            }
            _ if ended => {
                return Err(DecodeError::InvalidOptions(format!(
                    "option {code} found after End"
                )));
            }
            _ => {
                let len = cursor.read_u8() as usize;
                let Some(value) = cursor.consume(len) else {
                    break;
                };
                match seen.get(&code) {
                    Some(&index) => {
                        if let Frame::Tlv { data, .. } = &mut frames[index] {
                            data.extend_from_slice(value);
                        }
                    }
                    None => {
                        seen.insert(code, frames.len());
                        frames.push(Frame::Tlv {
                            code,
                            data: value.to_vec(),
                        });
                    }
                }
            }
        }
    }

    cursor.error()?;
    Ok(frames)
}

/// Writes one option as one or more TLVs of at most 255 data bytes.
pub(crate) fn write_tlv(buf: &mut BytesMut, code: u8, value: &[u8]) {
    if value.is_empty() {
        buf.put_u8(code);
        buf.put_u8(0);
        return;
    }
    for chunk in value.chunks(MAX_FRAGMENT_LEN) {
        buf.put_u8(code);
        buf.put_u8(chunk.len() as u8);
        buf.put_slice(chunk);
    }
}

/// An ordered list of decoded DHCPv4 options.
///
/// Order follows the wire. Duplicate codes are allowed at this level, and
/// [`Options::add`] keeps a trailing End option last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    list: Vec<DhcpOption>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an options area that does not start with the magic cookie.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let list = split_frames(data)?
            .into_iter()
            .map(|frame| match frame {
                Frame::Pad => Ok(DhcpOption::Pad),
                Frame::End => Ok(DhcpOption::End),
                Frame::Tlv { code, data } => DhcpOption::parse(OptionCode(code), &data),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = Self { list };
        if !options.has_end() {
            tracing::warn!("DHCPv4 options are not terminated by an End option");
        }
        Ok(options)
    }

    /// Decodes an options area preceded by the 4-byte magic cookie.
    pub fn from_bytes_with_cookie(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < MAGIC_COOKIE.len() {
            return Err(DecodeError::PacketTooShort {
                needed: MAGIC_COOKIE.len(),
                length: data.len(),
            });
        }
        let (cookie, rest) = data.split_at(MAGIC_COOKIE.len());
        if cookie != MAGIC_COOKIE {
            let mut bad = [0u8; 4];
            bad.copy_from_slice(cookie);
            return Err(DecodeError::InvalidMagicCookie(bad));
        }
        Self::from_bytes(rest)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.to_vec()
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        for opt in &self.list {
            match opt {
                DhcpOption::Pad | DhcpOption::End => buf.put_u8(opt.code().0),
                _ => write_tlv(buf, opt.code().0, &opt.value_bytes()),
            }
        }
    }

    /// Appends `opt`, keeping a trailing End option in last position.
    pub fn add(&mut self, opt: DhcpOption) {
        if matches!(opt, DhcpOption::End) || !matches!(self.list.last(), Some(DhcpOption::End)) {
            self.list.push(opt);
        } else {
            let at = self.list.len() - 1;
            self.list.insert(at, opt);
        }
    }

    /// Replaces the first option with the same code, or adds it.
    pub fn update(&mut self, opt: DhcpOption) {
        let code = opt.code();
        match self.list.iter_mut().find(|o| o.code() == code) {
            Some(slot) => *slot = opt,
            None => self.add(opt),
        }
    }

    /// Removes every option with `code`.
    pub fn del(&mut self, code: OptionCode) {
        self.list.retain(|o| o.code() != code);
    }

    /// First option with `code`.
    pub fn get(&self, code: OptionCode) -> Option<&DhcpOption> {
        self.list.iter().find(|o| o.code() == code)
    }

    /// Every option with `code`, in order.
    pub fn get_all(&self, code: OptionCode) -> Vec<&DhcpOption> {
        self.list.iter().filter(|o| o.code() == code).collect()
    }

    pub fn has(&self, code: OptionCode) -> bool {
        self.get(code).is_some()
    }

    pub fn has_end(&self) -> bool {
        self.has(OptionCode::END)
    }

    /// The options up to the first End, without Pad or End.
    pub fn stripped(&self) -> Options {
        let list = self
            .list
            .iter()
            .take_while(|o| !matches!(o, DhcpOption::End))
            .filter(|o| !matches!(o, DhcpOption::Pad))
            .cloned()
            .collect();
        Options { list }
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
        for opt in self.stripped().iter() {
            writeln!(f, "    {opt}")?;
        }
        Ok(())
    }
}
