//! Pooling glue: lets [`Connection`] live inside a [`tinysql_pool::Pool`].

use tinysql_core::Result;
use tinysql_pool::{Connect, Pool, PoolConfig, PooledConnection, PooledLink};

use crate::config::ClientConfig;
use crate::connection::Connection;

impl PooledLink for Connection {
    fn is_broken(&self) -> bool {
        Connection::is_broken(self)
    }

    fn close(&mut self) {
        Connection::close(self);
    }
}

/// Opens pooled connections from a fixed [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct Connector {
    config: ClientConfig,
}

impl Connector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// The configuration new connections are opened with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Connect for Connector {
    type Conn = Connection;

    fn connect(&self) -> Result<Connection> {
        Connection::connect(self.config.clone())
    }
}

/// A pool of client connections.
pub type ClientPool = Pool<Connector>;

/// A connection borrowed from a [`ClientPool`].
pub type PooledSession = PooledConnection<Connector>;

/// Build a pool over the given server. Connections open lazily.
pub fn connect_pool(config: ClientConfig, pool_config: PoolConfig) -> ClientPool {
    Pool::new(Connector::new(config), pool_config)
}
