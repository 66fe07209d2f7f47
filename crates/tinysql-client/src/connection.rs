//! Client connection and session state machine.
//!
//! A connection moves through Connecting and Authenticating during
//! [`Connection::connect`], then alternates between Ready and Streaming
//! for the rest of its life. The protocol is strictly half-duplex: one
//! command at a time, and a streaming result set must be consumed before
//! the next command is sent.
//!
//! Transport and protocol errors poison the connection: once a read or
//! write fails, or the stream desynchronizes, the connection is marked
//! broken and refuses further commands. Server-side errors (an Error
//! packet answering a command) leave the session usable.

#![allow(clippy::cast_possible_truncation)]

use std::net::{TcpStream, ToSocketAddrs};

use tinysql_core::Result;
use tinysql_core::error::{
    ConnectionError, ConnectionErrorKind, Error, ProtocolError, QueryError, UsageError,
    UsageErrorKind,
};

use crate::auth;
use crate::config::ClientConfig;
use crate::protocol::{
    Command, ErrPacket, OkPacket, PacketReader, PacketType, PacketWriter, capabilities, frame,
    server_status,
};
use crate::result::ResultSet;
use crate::types::{ColumnDef, FieldType};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Idle, accepting commands
    Ready,
    /// A result set is being streamed; no new commands until it finishes
    Streaming,
    /// COM_QUIT sent or the stream was torn down
    Closed,
}

/// Server identity and negotiation results from the handshake.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Protocol version, always 10
    pub protocol_version: u8,
    /// Server version string, e.g. "8.0.36"
    pub server_version: String,
    /// Server-assigned connection (thread) id
    pub connection_id: u32,
    /// Capabilities the server advertised
    pub capabilities: u32,
    /// Server default charset
    pub charset: u8,
}

/// Parsed HandshakeV10 greeting.
struct Greeting {
    server: ServerInfo,
    status_flags: u16,
    auth_plugin: String,
    seed: Vec<u8>,
}

/// A single client session over TCP.
pub struct Connection {
    stream: TcpStream,
    state: ConnectionState,
    /// Set on the first fatal error; a broken session refuses commands
    broken: bool,
    server: ServerInfo,
    /// Capabilities in effect: the intersection of ours and the server's
    capabilities: u32,
    /// Handshake seed, kept for COM_CHANGE_USER
    seed: Vec<u8>,
    /// Plugin negotiated at connect time
    auth_plugin: String,
    status_flags: u16,
    affected_rows: u64,
    last_insert_id: u64,
    warnings: u16,
    config: ClientConfig,
    sequence_id: u8,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("broken", &self.broken)
            .field("connection_id", &self.server.connection_id)
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Open a TCP connection and run the full handshake.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let addr = config
            .socket_addr()
            .to_socket_addrs()
            .map_err(|e| connect_error(&config, &e.to_string(), Some(Box::new(e))))?
            .next()
            .ok_or_else(|| connect_error(&config, "address resolved to nothing", None))?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout).map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::ConnectionRefused {
                ConnectionErrorKind::Refused
            } else {
                ConnectionErrorKind::Connect
            };
            Error::Connection(ConnectionError {
                kind,
                message: format!("failed to connect to {}: {}", config.socket_addr(), e),
                source: Some(Box::new(e)),
            })
        })?;

        stream.set_nodelay(true).ok();
        stream.set_read_timeout(Some(config.connect_timeout)).ok();
        stream.set_write_timeout(Some(config.connect_timeout)).ok();

        let mut conn = Self {
            stream,
            state: ConnectionState::Ready,
            broken: false,
            server: ServerInfo {
                protocol_version: 0,
                server_version: String::new(),
                connection_id: 0,
                capabilities: 0,
                charset: 0,
            },
            capabilities: 0,
            seed: Vec::new(),
            auth_plugin: String::new(),
            status_flags: 0,
            affected_rows: 0,
            last_insert_id: 0,
            warnings: 0,
            config,
            sequence_id: 0,
        };

        let greeting = conn.read_greeting()?;
        conn.capabilities = conn.config.capability_flags() & greeting.server.capabilities;
        conn.status_flags = greeting.status_flags;
        conn.server = greeting.server;
        conn.seed = greeting.seed;
        conn.auth_plugin = greeting.auth_plugin;

        if conn.server.capabilities & capabilities::CLIENT_PROTOCOL_41 == 0 {
            return Err(protocol_error("server does not support protocol 4.1"));
        }
        if !auth::is_supported(&conn.auth_plugin) {
            return Err(auth::unsupported_plugin(&conn.auth_plugin));
        }

        conn.send_handshake_response()?;
        conn.expect_auth_ok()?;

        tracing::debug!(
            connection_id = conn.server.connection_id,
            server_version = %conn.server.server_version,
            "connected"
        );
        Ok(conn)
    }

    /// Current session state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True once a fatal transport or protocol error has occurred.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Server identity from the handshake.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    /// Server version string.
    pub fn server_version(&self) -> &str {
        &self.server.server_version
    }

    /// Server-assigned connection id.
    pub fn connection_id(&self) -> u32 {
        self.server.connection_id
    }

    /// Rows affected by the last statement.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Auto-increment id assigned by the last INSERT.
    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    /// Warning count from the last statement.
    pub fn warnings(&self) -> u16 {
        self.warnings
    }

    /// Is the session inside an open transaction?
    pub fn in_transaction(&self) -> bool {
        self.status_flags & server_status::SERVER_STATUS_IN_TRANS != 0
    }

    /// Run a text-protocol query and stream its result set.
    ///
    /// Statements without rows (INSERT, UPDATE, DDL) come back as a result
    /// set with zero columns; check [`Connection::affected_rows`] after
    /// draining it or use [`Connection::execute`].
    pub fn query(&mut self, sql: &str) -> Result<ResultSet<'_>> {
        self.ensure_ready()?;
        tracing::trace!(sql, "sending query");
        self.send_command(Command::Query, sql.as_bytes())?;
        let payload = self.read_response_payload()?;

        match classify(&payload) {
            PacketType::Ok => {
                let ok = self.apply_ok(&payload)?;
                tracing::trace!(affected_rows = ok.affected_rows, "statement ok");
                Ok(ResultSet::empty(self))
            }
            PacketType::Error => Err(self.server_error(&payload)),
            PacketType::LocalInfile => {
                // Refuse the transfer: an empty data packet tells the
                // server there is no file, and it answers with OK or ERR.
                self.write_response_payload(&[])?;
                let answer = self.read_response_payload()?;
                if classify(&answer) == PacketType::Error {
                    return Err(self.server_error(&answer));
                }
                self.apply_ok(&answer)?;
                Err(Error::Query(QueryError {
                    code: 0,
                    sqlstate: None,
                    message: "LOCAL INFILE is not supported".to_string(),
                }))
            }
            PacketType::Eof => Err(self.corrupt("unexpected EOF answering a query", &payload)),
            PacketType::Data => {
                let columns = self.read_column_block(&payload)?;
                self.state = ConnectionState::Streaming;
                Ok(ResultSet::streaming(self, columns))
            }
        }
    }

    /// Run a statement and return the affected row count.
    pub fn execute(&mut self, sql: &str) -> Result<u64> {
        let result = self.query(sql)?;
        drop(result);
        Ok(self.affected_rows)
    }

    /// Run a query and collect every row.
    pub fn query_rows(&mut self, sql: &str) -> Result<Vec<tinysql_core::Row>> {
        self.query(sql)?.collect()
    }

    /// Run a query and return the first row, if any.
    pub fn query_one(&mut self, sql: &str) -> Result<Option<tinysql_core::Row>> {
        let mut result = self.query(sql)?;
        result.next_row()
    }

    /// Liveness check via COM_PING.
    pub fn ping(&mut self) -> Result<()> {
        self.ensure_ready()?;
        self.send_command(Command::Ping, &[])?;
        let payload = self.read_response_payload()?;
        if classify(&payload) == PacketType::Error {
            return Err(self.server_error(&payload));
        }
        self.apply_ok(&payload)?;
        Ok(())
    }

    /// Switch the default database via COM_INIT_DB.
    pub fn select_db(&mut self, database: &str) -> Result<()> {
        self.ensure_ready()?;
        self.send_command(Command::InitDb, database.as_bytes())?;
        let payload = self.read_response_payload()?;
        if classify(&payload) == PacketType::Error {
            return Err(self.server_error(&payload));
        }
        self.apply_ok(&payload)?;
        self.config.database = Some(database.to_string());
        Ok(())
    }

    /// Re-authenticate as a different user via COM_CHANGE_USER, resetting
    /// session state on the server.
    pub fn change_user(
        &mut self,
        user: &str,
        password: &str,
        database: Option<&str>,
    ) -> Result<()> {
        self.ensure_ready()?;

        let scramble = auth::initial_response(&self.auth_plugin, password, &self.seed)?;
        let mut writer = PacketWriter::new();
        writer.put_u8(Command::ChangeUser as u8);
        writer.put_null_string(user);
        writer.put_u8(scramble.len() as u8);
        writer.put_bytes(&scramble);
        writer.put_null_string(database.unwrap_or(""));
        writer.put_u16_le(u16::from(self.config.charset));
        if self.capabilities & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            writer.put_null_string(&self.auth_plugin);
        }

        self.sequence_id = 0;
        self.write_response_payload(writer.as_bytes())?;
        self.expect_auth_ok_for(password)?;

        self.config.user = user.to_string();
        self.config.password = Some(password.to_string());
        self.config.database = database.map(str::to_string);
        Ok(())
    }

    /// Open a transaction.
    pub fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN").map(drop)
    }

    /// Commit the open transaction.
    pub fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT").map(drop)
    }

    /// Roll back the open transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK").map(drop)
    }

    /// Send COM_QUIT and tear the session down. Best effort; the server
    /// side may already be gone.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if !self.broken {
            self.sequence_id = 0;
            let _ = frame::write_payload(
                &mut self.stream,
                &mut self.sequence_id,
                &[Command::Quit as u8],
            );
        }
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.state = ConnectionState::Closed;
    }

    // ---- handshake ----

    fn read_greeting(&mut self) -> Result<Greeting> {
        let payload = self.read_response_payload()?;
        if classify(&payload) == PacketType::Error {
            // Server refused the session before the handshake, e.g. too
            // many connections or a host block.
            let err = ErrPacket::decode(&payload)
                .ok_or_else(|| self.corrupt("malformed pre-handshake error", &payload))?;
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Refused,
                message: format!("server refused connection: {} ({})", err.message, err.code),
                source: None,
            }));
        }

        let mut reader = PacketReader::new(&payload);

        let protocol_version = reader
            .take_u8()
            .ok_or_else(|| protocol_error("greeting missing protocol version"))?;
        if protocol_version != 10 {
            return Err(protocol_error(format!(
                "unsupported protocol version {protocol_version}"
            )));
        }

        let server_version = reader
            .take_null_string()
            .ok_or_else(|| protocol_error("greeting missing server version"))?;
        let connection_id = reader
            .take_u32_le()
            .ok_or_else(|| protocol_error("greeting missing connection id"))?;

        let mut seed = reader
            .take(8)
            .ok_or_else(|| protocol_error("greeting missing auth seed"))?
            .to_vec();
        reader.skip(1); // filler

        let caps_lower = reader
            .take_u16_le()
            .ok_or_else(|| protocol_error("greeting missing capability flags"))?;
        let charset = reader.take_u8().unwrap_or(0);
        let status_flags = reader.take_u16_le().unwrap_or(0);
        let caps_upper = reader.take_u16_le().unwrap_or(0);
        let server_caps = u32::from(caps_lower) | (u32::from(caps_upper) << 16);

        let seed_total = if server_caps & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader.take_u8().unwrap_or(0) as usize
        } else {
            0
        };
        reader.skip(10); // reserved

        if server_caps & capabilities::CLIENT_SECURE_CONNECTION != 0 {
            let tail_len = seed_total.saturating_sub(8).max(13);
            if let Some(tail) = reader.take(tail_len) {
                // The second seed half carries a trailing NUL.
                let tail = if tail.last() == Some(&0) {
                    &tail[..tail.len() - 1]
                } else {
                    tail
                };
                seed.extend_from_slice(tail);
            }
        }

        let auth_plugin = if server_caps & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            reader
                .take_null_string()
                .unwrap_or_else(|| String::from_utf8_lossy(reader.take_rest()).into_owned())
        } else {
            auth::plugins::MYSQL_NATIVE_PASSWORD.to_string()
        };

        Ok(Greeting {
            server: ServerInfo {
                protocol_version,
                server_version,
                connection_id,
                capabilities: server_caps,
                charset,
            },
            status_flags,
            auth_plugin,
            seed,
        })
    }

    fn send_handshake_response(&mut self) -> Result<()> {
        let password = self.config.password.clone().unwrap_or_default();
        let scramble = auth::initial_response(&self.auth_plugin, &password, &self.seed)?;

        let mut writer = PacketWriter::new();
        writer.put_u32_le(self.capabilities);
        writer.put_u32_le(self.config.max_packet_size);
        writer.put_u8(self.config.charset);
        writer.put_zeros(23);
        writer.put_null_string(&self.config.user);

        if self.capabilities & capabilities::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
            writer.put_lenenc_bytes(&scramble);
        } else if self.capabilities & capabilities::CLIENT_SECURE_CONNECTION != 0 {
            // Scrambles are 20 or 32 bytes, always below 256.
            writer.put_u8(scramble.len() as u8);
            writer.put_bytes(&scramble);
        } else {
            writer.put_bytes(&scramble);
            writer.put_u8(0);
        }

        if self.capabilities & capabilities::CLIENT_CONNECT_WITH_DB != 0 {
            writer.put_null_string(self.config.database.as_deref().unwrap_or(""));
        }
        if self.capabilities & capabilities::CLIENT_PLUGIN_AUTH != 0 {
            writer.put_null_string(&self.auth_plugin);
        }
        if self.capabilities & capabilities::CLIENT_CONNECT_ATTRS != 0 {
            let mut attrs = PacketWriter::new();
            for (key, value) in &self.config.attributes {
                attrs.put_lenenc_string(key);
                attrs.put_lenenc_string(value);
            }
            writer.put_lenenc_bytes(attrs.as_bytes());
        }

        self.write_response_payload(writer.as_bytes())
    }

    fn expect_auth_ok(&mut self) -> Result<()> {
        let password = self.config.password.clone().unwrap_or_default();
        self.expect_auth_ok_for(&password)
    }

    /// Drive the post-response part of authentication: plain OK, an auth
    /// switch to another plugin, or the caching_sha2 continuation bytes.
    ///
    /// During authentication the first byte is matched directly instead of
    /// going through [`PacketType`]: an auth switch packet starts with
    /// 0xFE like an EOF but has no length limit.
    fn expect_auth_ok_for(&mut self, password: &str) -> Result<()> {
        loop {
            let payload = self.read_response_payload()?;
            match payload.first() {
                Some(0x00) => {
                    self.apply_ok(&payload)?;
                    return Ok(());
                }
                Some(0xFF) => {
                    let err = ErrPacket::decode(&payload)
                        .ok_or_else(|| self.corrupt("malformed error packet", &payload))?;
                    return Err(auth::auth_error(format!(
                        "authentication failed: {} ({})",
                        err.message, err.code
                    )));
                }
                Some(0xFE) => {
                    // Auth switch request: new plugin, new seed.
                    let mut reader = PacketReader::new(&payload[1..]);
                    let plugin = reader
                        .take_null_string()
                        .ok_or_else(|| self.corrupt("auth switch without plugin", &payload))?;
                    if !auth::is_supported(&plugin) {
                        return Err(auth::unsupported_plugin(&plugin));
                    }
                    tracing::debug!(plugin, "auth switch");
                    self.auth_plugin = plugin;
                    self.seed = reader.take_rest().to_vec();
                    let response =
                        auth::initial_response(&self.auth_plugin, password, &self.seed)?;
                    self.write_response_payload(&response)?;
                }
                Some(0x01) => self.handle_auth_continuation(&payload, password)?,
                _ => return Err(self.corrupt("unexpected authentication response", &payload)),
            }
        }
    }

    /// AuthMoreData packets (0x01 marker) in the caching_sha2 exchange.
    fn handle_auth_continuation(&mut self, payload: &[u8], password: &str) -> Result<()> {
        if payload.first() != Some(&0x01) || payload.len() < 2 {
            return Err(self.corrupt("unexpected packet during authentication", payload));
        }
        match payload[1] {
            auth::caching_sha2::FAST_AUTH_SUCCESS => {
                // Server found its cache entry; the OK packet follows.
                Ok(())
            }
            auth::caching_sha2::PERFORM_FULL_AUTH => {
                tracing::debug!("caching_sha2 full auth, requesting server public key");
                self.write_response_payload(&[auth::caching_sha2::REQUEST_PUBLIC_KEY])?;
                let key_payload = self.read_response_payload()?;
                let pem = match key_payload.split_first() {
                    Some((0x01, rest)) => rest,
                    _ => {
                        return Err(
                            self.corrupt("expected server public key packet", &key_payload)
                        );
                    }
                };
                let encrypted = auth::encrypt_password(password, &self.seed, pem)?;
                self.write_response_payload(&encrypted)
            }
            other => Err(self.corrupt(
                &format!("unknown auth continuation status {other:#04x}"),
                payload,
            )),
        }
    }

    // ---- result set plumbing (used by ResultSet) ----

    /// Read the column definition block that follows a result set header.
    fn read_column_block(&mut self, header_payload: &[u8]) -> Result<Vec<ColumnDef>> {
        let mut reader = PacketReader::new(header_payload);
        let column_count = reader
            .take_lenenc_int()
            .ok_or_else(|| self.corrupt("malformed result set header", header_payload))?
            as usize;
        if column_count == 0 || !reader.is_empty() {
            return Err(self.corrupt("malformed result set header", header_payload));
        }

        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let payload = self.read_response_payload()?;
            columns.push(self.parse_column_def(&payload)?);
        }

        // Legacy servers delimit columns and rows with an EOF packet.
        if !self.uses_deprecate_eof() {
            let payload = self.read_response_payload()?;
            if classify(&payload) != PacketType::Eof {
                return Err(self.corrupt("expected EOF after column definitions", &payload));
            }
        }

        Ok(columns)
    }

    fn parse_column_def(&mut self, payload: &[u8]) -> Result<ColumnDef> {
        decode_column_def(payload)
            .ok_or_else(|| self.corrupt("malformed column definition", payload))
    }

    pub(crate) fn uses_deprecate_eof(&self) -> bool {
        self.capabilities & capabilities::CLIENT_DEPRECATE_EOF != 0
    }

    /// Called by the result set when its terminator arrives.
    pub(crate) fn finish_streaming(&mut self, status_flags: u16, warnings: u16) {
        self.status_flags = status_flags;
        self.warnings = warnings;
        if self.state == ConnectionState::Streaming {
            self.state = ConnectionState::Ready;
        }
    }

    /// Called by the result set when the server aborts it with an Error
    /// packet; the session itself stays usable.
    pub(crate) fn abort_streaming(&mut self) {
        if self.state == ConnectionState::Streaming {
            self.state = ConnectionState::Ready;
        }
    }

    // ---- framing with fatal-error bookkeeping ----

    pub(crate) fn read_response_payload(&mut self) -> Result<Vec<u8>> {
        let result = frame::read_payload(&mut self.stream, &mut self.sequence_id);
        self.note_fatal(&result);
        result
    }

    fn write_response_payload(&mut self, payload: &[u8]) -> Result<()> {
        let result = frame::write_payload(&mut self.stream, &mut self.sequence_id, payload);
        self.note_fatal(&result);
        result
    }

    fn send_command(&mut self, command: Command, args: &[u8]) -> Result<()> {
        self.sequence_id = 0;
        let mut payload = Vec::with_capacity(1 + args.len());
        payload.push(command as u8);
        payload.extend_from_slice(args);
        self.write_response_payload(&payload)
    }

    fn note_fatal<T>(&mut self, result: &Result<T>) {
        if let Err(e) = result {
            if e.is_fatal() {
                self.broken = true;
            }
        }
    }

    fn ensure_ready(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Streaming => Err(Error::Usage(UsageError {
                kind: UsageErrorKind::ResultSetPending,
                message: "a result set is still being streamed".to_string(),
            })),
            ConnectionState::Closed => Err(Error::Usage(UsageError {
                kind: UsageErrorKind::NotReady,
                message: "connection is closed".to_string(),
            })),
            ConnectionState::Ready if self.broken => Err(Error::Usage(UsageError {
                kind: UsageErrorKind::NotReady,
                message: "connection is broken".to_string(),
            })),
            ConnectionState::Ready => Ok(()),
        }
    }

    fn apply_ok(&mut self, payload: &[u8]) -> Result<OkPacket> {
        let ok = OkPacket::decode(payload)
            .ok_or_else(|| self.corrupt("malformed OK packet", payload))?;
        self.affected_rows = ok.affected_rows;
        self.last_insert_id = ok.last_insert_id;
        self.status_flags = ok.status_flags;
        self.warnings = ok.warnings;
        Ok(ok)
    }

    /// Map a server Error packet to a query error. Non-fatal.
    pub(crate) fn server_error(&mut self, payload: &[u8]) -> Error {
        match ErrPacket::decode(payload) {
            Some(err) => Error::Query(QueryError {
                code: err.code,
                sqlstate: err.sql_state,
                message: err.message,
            }),
            None => self.corrupt("malformed error packet", payload),
        }
    }

    /// Build a protocol error and poison the connection.
    pub(crate) fn corrupt(&mut self, message: &str, payload: &[u8]) -> Error {
        self.broken = true;
        Error::Protocol(ProtocolError {
            message: message.to_string(),
            raw_data: Some(payload.to_vec()),
            source: None,
        })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Decode a column definition packet (protocol 4.1 layout).
fn decode_column_def(payload: &[u8]) -> Option<ColumnDef> {
    let mut reader = PacketReader::new(payload);

    let catalog = reader.take_lenenc_string()?;
    let schema = reader.take_lenenc_string()?;
    let table = reader.take_lenenc_string()?;
    let org_table = reader.take_lenenc_string()?;
    let name = reader.take_lenenc_string()?;
    let org_name = reader.take_lenenc_string()?;

    reader.take_lenenc_int()?; // fixed-length fields marker, always 0x0c

    let charset = reader.take_u16_le()?;
    let column_length = reader.take_u32_le()?;
    let column_type = FieldType::from_code(reader.take_u8()?);
    let flags = reader.take_u16_le()?;
    let decimals = reader.take_u8()?;

    Some(ColumnDef {
        catalog,
        schema,
        table,
        org_table,
        name,
        org_name,
        charset,
        column_length,
        column_type,
        flags,
        decimals,
    })
}

fn classify(payload: &[u8]) -> PacketType {
    payload
        .first()
        .map_or(PacketType::Data, |&b| PacketType::classify(b, payload.len()))
}

fn protocol_error(msg: impl Into<String>) -> Error {
    Error::Protocol(ProtocolError {
        message: msg.into(),
        raw_data: None,
        source: None,
    })
}

fn connect_error(
    config: &ClientConfig,
    detail: &str,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message: format!("cannot resolve {}: {detail}", config.socket_addr()),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_helpers() {
        let err = protocol_error("boom");
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn classify_empty_payload_is_data() {
        assert_eq!(classify(&[]), PacketType::Data);
    }
}
