//! Streaming result sets.
//!
//! A [`ResultSet`] borrows its connection and decodes rows one packet at
//! a time, so large results never sit fully in memory. Dropping an
//! unfinished result set drains the remaining packets to keep the stream
//! in sync for the next command.

use std::sync::Arc;

use tinysql_core::{ColumnInfo, Result, Row, Value};

use crate::connection::Connection;
use crate::protocol::{EofPacket, OkPacket, PacketReader};
use crate::types::{ColumnDef, decode_text_value};

/// One query's result set, streamed lazily off the wire.
///
/// The exclusive borrow of the connection enforces one-shot consumption:
/// no other command can be issued until the result set is dropped or
/// drained.
pub struct ResultSet<'a> {
    conn: &'a mut Connection,
    columns: Vec<ColumnDef>,
    info: Arc<ColumnInfo>,
    done: bool,
}

impl<'a> ResultSet<'a> {
    /// A finished result set with no columns (OK-answered statements).
    pub(crate) fn empty(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            columns: Vec::new(),
            info: Arc::new(ColumnInfo::new(Vec::new())),
            done: true,
        }
    }

    pub(crate) fn streaming(conn: &'a mut Connection, columns: Vec<ColumnDef>) -> Self {
        let names = columns.iter().map(|c| c.name.clone()).collect();
        Self {
            conn,
            columns,
            info: Arc::new(ColumnInfo::new(names)),
            done: false,
        }
    }

    /// Column metadata, in server order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Shared name/index metadata, the same `Arc` every row holds.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.info)
    }

    /// Did the statement produce rows at all?
    pub fn has_rows(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Fetch the next row, or `None` once the terminator has arrived.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }

        let payload = match self.conn.read_response_payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.done = true;
                self.conn.abort_streaming();
                return Err(e);
            }
        };

        match payload.first() {
            // Terminator: an EOF packet, or an EOF-headed OK packet when
            // CLIENT_DEPRECATE_EOF was negotiated. Row data never starts
            // with 0xFE below the packet size limit.
            Some(0xFE) if payload.len() < crate::protocol::MAX_PAYLOAD_SIZE => {
                self.done = true;
                if self.conn.uses_deprecate_eof() {
                    match OkPacket::decode(&payload) {
                        Some(ok) => self.conn.finish_streaming(ok.status_flags, ok.warnings),
                        None => {
                            return Err(self.conn.corrupt("malformed result terminator", &payload));
                        }
                    }
                } else {
                    match EofPacket::decode(&payload) {
                        Some(eof) => self.conn.finish_streaming(eof.status_flags, eof.warnings),
                        None => {
                            return Err(self.conn.corrupt("malformed result terminator", &payload));
                        }
                    }
                }
                Ok(None)
            }
            Some(0xFF) => {
                // The server aborted the result set mid-stream.
                self.done = true;
                let err = self.conn.server_error(&payload);
                self.conn.abort_streaming();
                Err(err)
            }
            Some(_) => match self.decode_row(&payload) {
                Some(row) => Ok(Some(row)),
                None => {
                    self.done = true;
                    let err = self
                        .conn
                        .corrupt("row does not match column count", &payload);
                    self.conn.abort_streaming();
                    Err(err)
                }
            },
            None => {
                self.done = true;
                let err = self.conn.corrupt("empty row packet", &payload);
                self.conn.abort_streaming();
                Err(err)
            }
        }
    }

    /// Decode a text-protocol row. Returns `None` when the payload has
    /// too few or too many cells for the column block.
    fn decode_row(&self, payload: &[u8]) -> Option<Row> {
        let mut reader = PacketReader::new(payload);
        let mut values = Vec::with_capacity(self.columns.len());

        for col in &self.columns {
            if reader.peek() == Some(0xFB) {
                reader.skip(1);
                values.push(Value::Null);
            } else {
                let cell = reader.take_lenenc_bytes()?;
                values.push(decode_text_value(col.column_type, cell, col.is_unsigned()));
            }
        }
        if !reader.is_empty() {
            return None;
        }

        Some(Row::with_columns(Arc::clone(&self.info), values))
    }
}

impl Iterator for ResultSet<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl Drop for ResultSet<'_> {
    fn drop(&mut self) {
        // Drain whatever the server still has queued so the connection is
        // usable afterwards. Errors here already poisoned the connection.
        while !self.done {
            match self.next_row() {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
    }
}

impl std::fmt::Debug for ResultSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("columns", &self.columns.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
