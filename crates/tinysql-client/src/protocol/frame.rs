//! Packet framing over a byte stream.
//!
//! One logical payload maps to one packet unless it reaches the 16MB - 1
//! limit, in which case it continues in follow-up packets and a payload of
//! exactly the limit is terminated by an empty packet. Sequence numbers
//! increment per packet and are verified on every read; a gap means the
//! stream is out of sync and the connection cannot be trusted any more.

#![allow(clippy::cast_possible_truncation)]

use std::io::{Read, Write};

use tinysql_core::Result;
use tinysql_core::error::{ConnectionError, ConnectionErrorKind, Error, ProtocolError};

use crate::protocol::{MAX_PAYLOAD_SIZE, PacketHeader};

/// Read one logical payload, reassembling continuation packets.
///
/// `sequence_id` holds the next expected sequence number and is advanced
/// past every packet consumed.
pub fn read_payload<S: Read>(stream: &mut S, sequence_id: &mut u8) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    loop {
        let header = read_header(stream, sequence_id)?;
        let chunk_len = header.payload_length as usize;
        if chunk_len > 0 {
            let start = payload.len();
            payload.resize(start + chunk_len, 0);
            stream
                .read_exact(&mut payload[start..])
                .map_err(|e| disconnected("failed to read packet payload", e))?;
        }
        if chunk_len < MAX_PAYLOAD_SIZE {
            return Ok(payload);
        }
    }
}

/// Write one logical payload, splitting it at the packet size limit.
pub fn write_payload<S: Write>(stream: &mut S, sequence_id: &mut u8, payload: &[u8]) -> Result<()> {
    let mut offset = 0;
    loop {
        let chunk_len = (payload.len() - offset).min(MAX_PAYLOAD_SIZE);
        let header = PacketHeader {
            payload_length: chunk_len as u32,
            sequence_id: *sequence_id,
        };
        *sequence_id = sequence_id.wrapping_add(1);
        stream
            .write_all(&header.to_bytes())
            .map_err(|e| disconnected("failed to write packet", e))?;
        stream
            .write_all(&payload[offset..offset + chunk_len])
            .map_err(|e| disconnected("failed to write packet", e))?;
        offset += chunk_len;
        // A payload ending exactly on the limit needs an empty terminator
        // packet, which the next iteration emits.
        if offset == payload.len() && chunk_len < MAX_PAYLOAD_SIZE {
            break;
        }
    }
    stream
        .flush()
        .map_err(|e| disconnected("failed to flush stream", e))
}

fn read_header<S: Read>(stream: &mut S, sequence_id: &mut u8) -> Result<PacketHeader> {
    let mut buf = [0u8; PacketHeader::SIZE];
    stream
        .read_exact(&mut buf)
        .map_err(|e| disconnected("failed to read packet header", e))?;
    let header = PacketHeader::from_bytes(&buf);
    if header.sequence_id != *sequence_id {
        return Err(Error::Protocol(ProtocolError {
            message: format!(
                "sequence mismatch: expected {}, got {}",
                *sequence_id, header.sequence_id
            ),
            raw_data: Some(buf.to_vec()),
            source: None,
        }));
    }
    *sequence_id = header.sequence_id.wrapping_add(1);
    Ok(header)
}

pub(crate) fn disconnected(context: &str, e: std::io::Error) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Disconnected,
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_small_payload() {
        let mut wire = Vec::new();
        let mut seq = 0u8;
        write_payload(&mut wire, &mut seq, b"SELECT 1").unwrap();
        assert_eq!(seq, 1);
        assert_eq!(&wire[..4], &[0x08, 0x00, 0x00, 0x00]);

        let mut seq = 0u8;
        let payload = read_payload(&mut Cursor::new(&wire), &mut seq).unwrap();
        assert_eq!(payload, b"SELECT 1");
        assert_eq!(seq, 1);
    }

    #[test]
    fn empty_payload() {
        let mut wire = Vec::new();
        let mut seq = 3u8;
        write_payload(&mut wire, &mut seq, b"").unwrap();
        assert_eq!(wire, [0x00, 0x00, 0x00, 0x03]);

        let mut seq = 3u8;
        let payload = read_payload(&mut Cursor::new(&wire), &mut seq).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn oversize_payload_splits_and_reassembles() {
        let payload = vec![0xAB; MAX_PAYLOAD_SIZE + 10];
        let mut wire = Vec::new();
        let mut seq = 0u8;
        write_payload(&mut wire, &mut seq, &payload).unwrap();
        // Two packets: a full one and a 10-byte tail.
        assert_eq!(seq, 2);
        assert_eq!(wire.len(), payload.len() + 2 * PacketHeader::SIZE);

        let mut seq = 0u8;
        let back = read_payload(&mut Cursor::new(&wire), &mut seq).unwrap();
        assert_eq!(back.len(), payload.len());
        assert_eq!(seq, 2);
    }

    #[test]
    fn exact_limit_payload_gets_empty_terminator() {
        let payload = vec![0xCD; MAX_PAYLOAD_SIZE];
        let mut wire = Vec::new();
        let mut seq = 0u8;
        write_payload(&mut wire, &mut seq, &payload).unwrap();
        // Full packet plus an empty terminator packet.
        assert_eq!(seq, 2);
        assert_eq!(wire.len(), payload.len() + 2 * PacketHeader::SIZE);
        assert_eq!(&wire[wire.len() - 4..], &[0x00, 0x00, 0x00, 0x01]);

        let mut seq = 0u8;
        let back = read_payload(&mut Cursor::new(&wire), &mut seq).unwrap();
        assert_eq!(back.len(), MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn sequence_gap_is_a_protocol_error() {
        let wire = [0x01, 0x00, 0x00, 0x05, 0xAA];
        let mut seq = 0u8;
        let err = read_payload(&mut Cursor::new(&wire), &mut seq).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn truncated_stream_is_a_connection_error() {
        let wire = [0x10, 0x00, 0x00, 0x00, 0xAA];
        let mut seq = 0u8;
        let err = read_payload(&mut Cursor::new(&wire), &mut seq).unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(err.is_fatal());
    }
}
