//! Payload builder for outgoing packets.

#![allow(clippy::cast_possible_truncation)]

/// Accumulates one payload before framing.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buffer: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::with_capacity(128)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn put_u16_le(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u24_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes()[..3]);
    }

    pub fn put_u32_le(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64_le(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a length-encoded integer.
    pub fn put_lenenc_int(&mut self, value: u64) {
        if value < 251 {
            self.put_u8(value as u8);
        } else if value < 0x1_0000 {
            self.put_u8(0xFC);
            self.put_u16_le(value as u16);
        } else if value < 0x100_0000 {
            self.put_u8(0xFD);
            self.put_u24_le(value as u32);
        } else {
            self.put_u8(0xFE);
            self.put_u64_le(value);
        }
    }

    /// Append a length-encoded byte string.
    pub fn put_lenenc_bytes(&mut self, data: &[u8]) {
        self.put_lenenc_int(data.len() as u64);
        self.buffer.extend_from_slice(data);
    }

    /// Append a length-encoded string.
    pub fn put_lenenc_string(&mut self, s: &str) {
        self.put_lenenc_bytes(s.as_bytes());
    }

    /// Append a string followed by a NUL terminator.
    pub fn put_null_string(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(0);
    }

    pub fn put_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Append `count` zero bytes.
    pub fn put_zeros(&mut self, count: usize) {
        self.buffer.resize(self.buffer.len() + count, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_encoding() {
        let mut writer = PacketWriter::new();
        writer.put_u8(0x42);
        writer.put_u16_le(0x1234);
        writer.put_u24_le(0x0012_3456);
        writer.put_u32_le(0x1234_5678);
        assert_eq!(
            writer.as_bytes(),
            &[0x42, 0x34, 0x12, 0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]
        );
    }

    #[test]
    fn lenenc_int_thresholds() {
        let mut writer = PacketWriter::new();
        writer.put_lenenc_int(250);
        assert_eq!(writer.as_bytes(), &[250]);

        let mut writer = PacketWriter::new();
        writer.put_lenenc_int(251);
        assert_eq!(writer.as_bytes(), &[0xFC, 251, 0]);

        let mut writer = PacketWriter::new();
        writer.put_lenenc_int(0x0012_3456);
        assert_eq!(writer.as_bytes(), &[0xFD, 0x56, 0x34, 0x12]);

        let mut writer = PacketWriter::new();
        writer.put_lenenc_int(0x0100_0000);
        assert_eq!(writer.as_bytes(), &[0xFE, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn null_and_lenenc_strings() {
        let mut writer = PacketWriter::new();
        writer.put_null_string("user");
        writer.put_lenenc_string("db");
        assert_eq!(writer.as_bytes(), b"user\0\x02db");
    }

    #[test]
    fn zero_padding() {
        let mut writer = PacketWriter::new();
        writer.put_u8(1);
        writer.put_zeros(3);
        assert_eq!(writer.as_bytes(), &[1, 0, 0, 0]);
    }
}
