//! Big-endian read cursor with a sticky error.
//!
//! Every read that runs past the end of the buffer records a
//! [`DecodeError::ShortBuffer`] and returns a zero value; later reads are
//! no-ops. Decoders perform their whole sequence of reads and check
//! [`Cursor::finish`] or [`Cursor::error`] once at the end.

use crate::error::DecodeError;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    err: Option<DecodeError>,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            err: None,
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn has(&self, n: usize) -> bool {
        self.err.is_none() && self.remaining() >= n
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Slices out `n` bytes and advances, or records a short-buffer error
    /// and returns `None`.
    pub fn consume(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.err.is_some() {
            return None;
        }
        if self.remaining() < n {
            self.err = Some(DecodeError::ShortBuffer {
                needed: n,
                remaining: self.remaining(),
            });
            return None;
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    /// Same as [`Cursor::consume`] but an error yields an empty slice.
    pub fn read_n(&mut self, n: usize) -> &'a [u8] {
        self.consume(n).unwrap_or(&[])
    }

    /// Copies `dst.len()` bytes into `dst`; on error `dst` is left untouched.
    pub fn copy_n(&mut self, dst: &mut [u8]) {
        if let Some(src) = self.consume(dst.len()) {
            dst.copy_from_slice(src);
        }
    }

    /// Everything left in the buffer.
    pub fn read_all(&mut self) -> &'a [u8] {
        let n = self.remaining();
        self.read_n(n)
    }

    pub fn read_u8(&mut self) -> u8 {
        self.consume(1).map_or(0, |b| b[0])
    }

    pub fn read_u16(&mut self) -> u16 {
        self.array::<2>().map_or(0, u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> u32 {
        self.array::<4>().map_or(0, u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> u64 {
        self.array::<8>().map_or(0, u64::from_be_bytes)
    }

    pub fn read_ipv4(&mut self) -> Ipv4Addr {
        self.array::<4>()
            .map_or(Ipv4Addr::UNSPECIFIED, Ipv4Addr::from)
    }

    pub fn read_ipv6(&mut self) -> Ipv6Addr {
        self.array::<16>()
            .map_or(Ipv6Addr::UNSPECIFIED, Ipv6Addr::from)
    }

    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        self.consume(N)?;
        out.copy_from_slice(&self.data[self.pos - N..self.pos]);
        Some(out)
    }

    /// The sticky error, if any read failed.
    pub fn error(&self) -> Result<(), DecodeError> {
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Like [`Cursor::error`], but also rejects unread bytes.
    pub fn finish(&self) -> Result<(), DecodeError> {
        self.error()?;
        if self.remaining() > 0 {
            return Err(DecodeError::TrailingData(self.remaining()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let mut c = Cursor::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(c.read_u8(), 0x01);
        assert_eq!(c.read_u16(), 0x0203);
        assert_eq!(c.read_u32(), 0x04050607);
        assert!(c.finish().is_ok());
    }

    #[test]
    fn error_is_sticky() {
        let mut c = Cursor::new(&[0xaa, 0xbb, 0xcc]);
        assert_eq!(c.read_u32(), 0);
        // Enough bytes remain for this read, but the cursor already failed.
        assert_eq!(c.read_u8(), 0);
        assert_eq!(
            c.error(),
            Err(DecodeError::ShortBuffer {
                needed: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn consume_returns_none_when_short() {
        let mut c = Cursor::new(&[1, 2]);
        assert_eq!(c.consume(2), Some(&[1u8, 2][..]));
        assert_eq!(c.consume(1), None);
        assert!(c.error().is_err());
    }

    #[test]
    fn finish_rejects_trailing_bytes() {
        let mut c = Cursor::new(&[0, 0, 0, 0, 9]);
        c.read_ipv4();
        assert_eq!(c.finish(), Err(DecodeError::TrailingData(1)));
    }

    #[test]
    fn copy_n_fills_destination() {
        let mut c = Cursor::new(&[9, 8, 7]);
        let mut dst = [0u8; 2];
        c.copy_n(&mut dst);
        assert_eq!(dst, [9, 8]);
        assert_eq!(c.remaining(), 1);
    }
}
