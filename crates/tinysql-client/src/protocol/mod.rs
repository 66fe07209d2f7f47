//! MySQL wire protocol definitions.
//!
//! Every packet starts with a 4-byte header: a 3-byte little-endian
//! payload length followed by a 1-byte sequence number. Payloads of
//! exactly 2^24 - 1 bytes continue in the next packet.

pub mod frame;
pub mod reader;
pub mod writer;

pub use reader::PacketReader;
pub use writer::PacketWriter;

/// Maximum payload carried by a single packet (2^24 - 1 bytes).
pub const MAX_PAYLOAD_SIZE: usize = 0xFF_FF_FF;

/// Capability flags exchanged during the handshake.
#[allow(dead_code)]
pub mod capabilities {
    pub const CLIENT_LONG_PASSWORD: u32 = 1;
    pub const CLIENT_FOUND_ROWS: u32 = 1 << 1;
    pub const CLIENT_LONG_FLAG: u32 = 1 << 2;
    pub const CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
    pub const CLIENT_COMPRESS: u32 = 1 << 5;
    pub const CLIENT_LOCAL_FILES: u32 = 1 << 7;
    pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
    pub const CLIENT_INTERACTIVE: u32 = 1 << 10;
    pub const CLIENT_SSL: u32 = 1 << 11;
    pub const CLIENT_TRANSACTIONS: u32 = 1 << 13;
    pub const CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
    pub const CLIENT_MULTI_STATEMENTS: u32 = 1 << 16;
    pub const CLIENT_MULTI_RESULTS: u32 = 1 << 17;
    pub const CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
    pub const CLIENT_CONNECT_ATTRS: u32 = 1 << 20;
    pub const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 1 << 21;
    pub const CLIENT_SESSION_TRACK: u32 = 1 << 23;
    pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;
    pub const CLIENT_QUERY_ATTRIBUTES: u32 = 1 << 27;
}

/// Command codes this client issues (COM_xxx).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Close the session
    Quit = 0x01,
    /// Switch the default database
    InitDb = 0x02,
    /// Text protocol query
    Query = 0x03,
    /// Liveness check
    Ping = 0x0e,
    /// Re-authenticate as a different user
    ChangeUser = 0x11,
}

/// Server status flags carried in OK and EOF packets.
#[allow(dead_code)]
pub mod server_status {
    pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
    pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;
    pub const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;
    pub const SERVER_STATUS_NO_INDEX_USED: u16 = 0x0020;
    pub const SERVER_STATUS_LAST_ROW_SENT: u16 = 0x0080;
    pub const SERVER_SESSION_STATE_CHANGED: u16 = 0x4000;
}

/// Character set codes.
#[allow(dead_code)]
pub mod charset {
    pub const LATIN1_SWEDISH_CI: u8 = 8;
    pub const UTF8_GENERAL_CI: u8 = 33;
    pub const UTF8MB4_GENERAL_CI: u8 = 45;
    pub const BINARY: u8 = 63;
    pub const UTF8MB4_0900_AI_CI: u8 = 255;

    /// Default charset for new sessions (utf8mb4).
    pub const DEFAULT_CHARSET: u8 = UTF8MB4_0900_AI_CI;
}

/// The 4-byte packet header.
#[derive(Debug, Clone, Copy)]
pub struct PacketHeader {
    /// Payload length, at most [`MAX_PAYLOAD_SIZE`]
    pub payload_length: u32,
    /// Sequence number, wraps at 255
    pub sequence_id: u8,
}

impl PacketHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 4;

    /// Decode a header from its wire form.
    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        Self {
            payload_length: u32::from(bytes[0])
                | (u32::from(bytes[1]) << 8)
                | (u32::from(bytes[2]) << 16),
            sequence_id: bytes[3],
        }
    }

    /// Encode the header to its wire form.
    pub fn to_bytes(self) -> [u8; 4] {
        [
            (self.payload_length & 0xFF) as u8,
            ((self.payload_length >> 8) & 0xFF) as u8,
            ((self.payload_length >> 16) & 0xFF) as u8,
            self.sequence_id,
        ]
    }
}

/// Classification of a server response payload by its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// OK packet (0x00)
    Ok,
    /// Error packet (0xFF)
    Error,
    /// EOF packet (0xFE with payload shorter than 9 bytes)
    Eof,
    /// LOCAL INFILE request (0xFB)
    LocalInfile,
    /// Anything else: result set header, column definition, or row
    Data,
}

impl PacketType {
    /// Classify a payload. The length matters because 0xFE also starts
    /// length-encoded integers in row data; only short payloads are EOF.
    pub fn classify(first_byte: u8, payload_len: usize) -> Self {
        match first_byte {
            0x00 => PacketType::Ok,
            0xFF => PacketType::Error,
            0xFE if payload_len < 9 => PacketType::Eof,
            0xFB => PacketType::LocalInfile,
            _ => PacketType::Data,
        }
    }
}

/// Decoded OK packet.
#[derive(Debug, Clone, Default)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
    /// Human-readable info string, often empty
    pub info: String,
}

impl OkPacket {
    /// Decode an OK payload (leading 0x00 or 0xFE marker included).
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let mut reader = PacketReader::new(payload);
        reader.take_u8()?;
        let affected_rows = reader.take_lenenc_int()?;
        let last_insert_id = reader.take_lenenc_int()?;
        let status_flags = reader.take_u16_le()?;
        let warnings = reader.take_u16_le()?;
        let info = reader.take_rest_string();
        Some(Self {
            affected_rows,
            last_insert_id,
            status_flags,
            warnings,
            info,
        })
    }
}

/// Decoded Error packet.
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub code: u16,
    /// Five-character SQLSTATE, present when the server sends the '#' marker
    pub sql_state: Option<String>,
    pub message: String,
}

impl ErrPacket {
    /// Decode an ERR payload (leading 0xFF marker included).
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let mut reader = PacketReader::new(payload);
        if reader.take_u8()? != 0xFF {
            return None;
        }
        let code = reader.take_u16_le()?;
        let sql_state = if reader.peek() == Some(b'#') {
            reader.skip(1);
            Some(reader.take_string(5)?)
        } else {
            None
        };
        let message = reader.take_rest_string();
        Some(Self {
            code,
            sql_state,
            message,
        })
    }
}

/// Decoded EOF packet (legacy, pre CLIENT_DEPRECATE_EOF).
#[derive(Debug, Clone, Copy, Default)]
pub struct EofPacket {
    pub warnings: u16,
    pub status_flags: u16,
}

impl EofPacket {
    /// Decode an EOF payload (leading 0xFE marker included).
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let mut reader = PacketReader::new(payload);
        if reader.take_u8()? != 0xFE {
            return None;
        }
        // A bare 0xFE is a valid EOF on very old servers.
        let warnings = reader.take_u16_le().unwrap_or(0);
        let status_flags = reader.take_u16_le().unwrap_or(0);
        Some(Self {
            warnings,
            status_flags,
        })
    }
}
