//! RFC 1035 domain name lists as used by DHCPv4 option 119 and the
//! DHCPv6 domain search list.
//!
//! Names are sequences of length-prefixed labels closed by a zero byte.
//! Decoding understands compression pointers (RFC 1035 section 4.1.4) as
//! long as they point strictly backwards; that rule alone rules out
//! pointer loops. Encoding never compresses.

use crate::error::DecodeError;
use bytes::{BufMut, BytesMut};
use std::fmt;

const POINTER_MASK: u8 = 0xc0;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    pub labels: Vec<String>,
}

impl Labels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut labels = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let (name, next) = read_name(data, pos)?;
            labels.push(name);
            pos = next;
        }
        Ok(Self { labels })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for name in &self.labels {
            for label in split_name(name) {
                buf.put_u8(label.len() as u8);
                buf.put_slice(label.as_bytes());
            }
            buf.put_u8(0);
        }
        buf.to_vec()
    }

    /// Wire length of [`Labels::to_bytes`].
    pub fn encoded_len(&self) -> usize {
        self.labels
            .iter()
            .map(|name| split_name(name).map(|l| l.len() + 1).sum::<usize>() + 1)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.labels.join(", "))
    }
}

fn split_name(name: &str) -> impl Iterator<Item = &str> {
    name.trim_end_matches('.')
        .split('.')
        .filter(|l| !l.is_empty())
        .map(truncate_label)
}

fn truncate_label(label: &str) -> &str {
    let mut end = label.len().min(MAX_LABEL_LEN);
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    &label[..end]
}

/// Reads one name starting at `start`; returns it with the offset of the
/// byte following the name in the uncompressed stream.
fn read_name(data: &[u8], start: usize) -> Result<(String, usize), DecodeError> {
    let mut parts: Vec<String> = Vec::new();
    let mut pos = start;
    let mut resume: Option<usize> = None;
    let mut name_len = 0;

    loop {
        let Some(&len) = data.get(pos) else {
            return Err(DecodeError::InvalidLabel(format!(
                "name at offset {start} is not terminated"
            )));
        };

        match len & POINTER_MASK {
            0x00 => {
                if len == 0 {
                    pos += 1;
                    break;
                }
                let len = len as usize;
                let end = pos + 1 + len;
                if end > data.len() {
                    return Err(DecodeError::InvalidLabel(format!(
                        "label of {len} bytes overruns the buffer at offset {pos}"
                    )));
                }
                name_len += len + 1;
                if name_len > MAX_NAME_LEN {
                    return Err(DecodeError::InvalidLabel(format!(
                        "name at offset {start} exceeds {MAX_NAME_LEN} bytes"
                    )));
                }
                let label = std::str::from_utf8(&data[pos + 1..end]).map_err(|_| {
                    DecodeError::InvalidLabel(format!("label at offset {pos} is not UTF-8"))
                })?;
                parts.push(label.to_owned());
                pos = end;
            }
            POINTER_MASK => {
                let Some(&low) = data.get(pos + 1) else {
                    return Err(DecodeError::InvalidLabel(format!(
                        "truncated compression pointer at offset {pos}"
                    )));
                };
                let target = (usize::from(len & !POINTER_MASK) << 8) | usize::from(low);
                if target >= pos {
                    return Err(DecodeError::InvalidLabel(format!(
                        "compression pointer at offset {pos} does not point backwards (target {target})"
                    )));
                }
                if resume.is_none() {
                    resume = Some(pos + 2);
                }
                pos = target;
            }
            _ => {
                return Err(DecodeError::InvalidLabel(format!(
                    "reserved label type {len:#04x} at offset {pos}"
                )));
            }
        }
    }

    Ok((parts.join("."), resume.unwrap_or(pos)))
}
