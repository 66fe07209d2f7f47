//! Cursor over a packet payload.
//!
//! All reads return `Option`; a `None` means the payload was shorter than
//! the format requires, and call sites turn that into a protocol error.

#![allow(clippy::cast_possible_truncation)]

/// A non-allocating cursor over one payload.
#[derive(Debug)]
pub struct PacketReader<'a> {
    data: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Consume `len` bytes.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.data.len() < len {
            return None;
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Some(head)
    }

    pub fn take_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn take_u16_le(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn take_u24_le(&mut self) -> Option<u32> {
        self.take(3)
            .map(|b| u32::from(b[0]) | (u32::from(b[1]) << 8) | (u32::from(b[2]) << 16))
    }

    pub fn take_u32_le(&mut self) -> Option<u32> {
        self.take(4)
            .map(|b| u32::from_le_bytes(b.try_into().unwrap_or([0; 4])))
    }

    pub fn take_u64_le(&mut self) -> Option<u64> {
        self.take(8)
            .map(|b| u64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
    }

    /// Consume a length-encoded integer.
    ///
    /// - 0x00..=0xFA: the value itself
    /// - 0xFC: 2-byte value follows
    /// - 0xFD: 3-byte value follows
    /// - 0xFE: 8-byte value follows
    /// - 0xFB: NULL marker, not an integer
    pub fn take_lenenc_int(&mut self) -> Option<u64> {
        match self.take_u8()? {
            first @ 0x00..=0xFA => Some(u64::from(first)),
            0xFC => self.take_u16_le().map(u64::from),
            0xFD => self.take_u24_le().map(u64::from),
            0xFE => self.take_u64_le(),
            0xFB | 0xFF => None,
        }
    }

    /// Consume a length-encoded byte string.
    pub fn take_lenenc_bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.take_lenenc_int()? as usize;
        self.take(len)
    }

    /// Consume a length-encoded string, lossily decoding UTF-8.
    pub fn take_lenenc_string(&mut self) -> Option<String> {
        self.take_lenenc_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Consume up to the next NUL byte; the terminator is discarded.
    pub fn take_null_string(&mut self) -> Option<String> {
        let end = self.data.iter().position(|&b| b == 0)?;
        let s = String::from_utf8_lossy(&self.data[..end]).into_owned();
        self.data = &self.data[end + 1..];
        Some(s)
    }

    /// Consume a fixed-length string.
    pub fn take_string(&mut self, len: usize) -> Option<String> {
        self.take(len)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Consume everything left as a string.
    pub fn take_rest_string(&mut self) -> String {
        String::from_utf8_lossy(self.take_rest()).into_owned()
    }

    /// Consume everything left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.data)
    }

    /// Discard `n` bytes. Returns false when fewer remain.
    pub fn skip(&mut self, n: usize) -> bool {
        self.take(n).is_some()
    }
}
