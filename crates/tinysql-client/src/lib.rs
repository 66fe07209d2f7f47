//! MySQL wire protocol client for Tiny-SQL servers.
//!
//! This crate implements the client half of the MySQL text protocol over
//! plain TCP:
//!
//! - Packet framing with sequence numbers and 16MB reassembly
//! - Authentication (mysql_native_password, caching_sha2_password)
//! - Text protocol queries with lazily streamed result sets
//! - A session state machine that poisons connections on fatal errors
//! - Pool integration via `tinysql-pool`
//!
//! # Example
//!
//! ```rust,ignore
//! use tinysql_client::{ClientConfig, Connection};
//!
//! let config = ClientConfig::new()
//!     .host("localhost")
//!     .port(3306)
//!     .user("root")
//!     .database("test");
//!
//! let mut conn = Connection::connect(config)?;
//! for row in conn.query("SELECT id, name FROM users")? {
//!     let row = row?;
//!     println!("{}: {}", row.get_named::<i64>("id")?, row.get_named::<String>("name")?);
//! }
//! ```

pub mod auth;
pub mod config;
pub mod connection;
pub mod pool;
pub mod protocol;
pub mod result;
pub mod types;

pub use config::ClientConfig;
pub use connection::{Connection, ConnectionState, ServerInfo};
pub use pool::{ClientPool, Connector, PooledSession, connect_pool};
pub use result::ResultSet;
pub use types::{ColumnDef, FieldType};

pub use tinysql_core::{Error, Result, Row, Value};
pub use tinysql_pool::{PoolConfig, PoolStats};
