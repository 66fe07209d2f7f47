//! Connection configuration.

use std::collections::HashMap;
use std::time::Duration;

use crate::protocol::{capabilities, charset};

/// Connection parameters for a Tiny-SQL server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hostname or IP address
    pub host: String,
    /// Port number (default: 3306)
    pub port: u16,
    /// Username for authentication
    pub user: String,
    /// Password; `None` and `Some("")` both authenticate as empty
    pub password: Option<String>,
    /// Database selected at connect time
    pub database: Option<String>,
    /// Character set (default: utf8mb4)
    pub charset: u8,
    /// TCP connect deadline, also used as the initial read/write timeout
    pub connect_timeout: Duration,
    /// Additional connection attributes sent in the handshake
    pub attributes: HashMap<String, String>,
    /// Max packet size advertised to the server (default: 64MB)
    pub max_packet_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: None,
            database: None,
            charset: charset::DEFAULT_CHARSET,
            connect_timeout: Duration::from_secs(30),
            attributes: HashMap::new(),
            max_packet_size: 64 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn charset(mut self, charset: u8) -> Self {
        self.charset = charset;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a connection attribute (e.g. `program_name`).
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    /// The `host:port` string used for the TCP connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Capability flags this client offers. The effective flags are the
    /// intersection with what the server advertised.
    pub fn capability_flags(&self) -> u32 {
        let mut flags = capabilities::CLIENT_PROTOCOL_41
            | capabilities::CLIENT_LONG_PASSWORD
            | capabilities::CLIENT_TRANSACTIONS
            | capabilities::CLIENT_SECURE_CONNECTION
            | capabilities::CLIENT_PLUGIN_AUTH
            | capabilities::CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
            | capabilities::CLIENT_DEPRECATE_EOF;

        if self.database.is_some() {
            flags |= capabilities::CLIENT_CONNECT_WITH_DB;
        }
        if !self.attributes.is_empty() {
            flags |= capabilities::CLIENT_CONNECT_ATTRS;
        }

        flags
    }
}
