//! Error types for Tiny-SQL client operations.

use std::fmt;

/// The primary error type for all client operations.
#[derive(Debug)]
pub enum Error {
    /// Transport and handshake errors (connect, auth, disconnect)
    Connection(ConnectionError),
    /// The server answered a well-formed command with an Error packet
    Query(QueryError),
    /// Malformed bytes on the wire
    Protocol(ProtocolError),
    /// Pool acquisition failures
    Pool(PoolError),
    /// Caller violated the client contract (programming error)
    Usage(UsageError),
    /// Type conversion errors when reading row values
    Type(TypeError),
    /// I/O errors outside the packet stream
    Io(std::io::Error),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish the TCP connection
    Connect,
    /// Connection refused by the server
    Refused,
    /// Connection lost mid-operation
    Disconnected,
    /// Server rejected the credentials
    Authentication,
    /// Server demanded an auth method this client does not implement
    UnsupportedAuth,
}

/// An Error packet from the server: the command was framed correctly but
/// the server refused it. The connection itself stays usable.
#[derive(Debug)]
pub struct QueryError {
    /// Server error code (e.g. 1064 for a syntax error)
    pub code: u16,
    /// Five-character SQLSTATE, when the server sent one
    pub sqlstate: Option<String>,
    pub message: String,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    /// Offending payload bytes, when available
    pub raw_data: Option<Vec<u8>>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct PoolError {
    pub kind: PoolErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    /// Pool full and queueing disabled or the queue is at its cap
    Saturated,
    /// Queued acquire waited past its deadline
    Timeout,
    /// Pool has been shut down
    Closed,
}

/// Caller-side contract violations. Never retried, never recovered.
#[derive(Debug)]
pub struct UsageError {
    pub kind: UsageErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// A new command was issued while a result set was still streaming
    ResultSetPending,
    /// The connection is not in a state that accepts commands
    NotReady,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

impl Error {
    /// Does this error poison the connection? A fatal error means the
    /// connection must be closed and, if pooled, evicted instead of reused.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Connect
                    | ConnectionErrorKind::Refused
                    | ConnectionErrorKind::Disconnected
            ),
            Error::Protocol(_) | Error::Io(_) => true,
            Error::Query(_) | Error::Pool(_) | Error::Usage(_) | Error::Type(_) => false,
        }
    }

    /// Get the server SQLSTATE if this is a query error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => match &e.sqlstate {
                Some(state) => write!(
                    f,
                    "Query error {} (SQLSTATE {}): {}",
                    e.code, state, e.message
                ),
                None => write!(f, "Query error {}: {}", e.code, e.message),
            },
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Pool(e) => write!(f, "Pool error: {}", e.message),
            Error::Usage(e) => write!(f, "Usage error: {}", e.message),
            Error::Type(e) => match &e.column {
                Some(col) => write!(
                    f,
                    "Type error in column '{}': expected {}, found {}",
                    col, e.expected, e.actual
                ),
                None => write!(f, "Type error: expected {}, found {}", e.expected, e.actual),
            },
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<PoolError> for Error {
    fn from(err: PoolError) -> Self {
        Error::Pool(err)
    }
}

impl From<UsageError> for Error {
    fn from(err: UsageError) -> Self {
        Error::Usage(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        let disconnected = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: "lost connection".to_string(),
            source: None,
        });
        assert!(disconnected.is_fatal());

        let malformed = Error::Protocol(ProtocolError {
            message: "bad sentinel".to_string(),
            raw_data: None,
            source: None,
        });
        assert!(malformed.is_fatal());

        let rejected = Error::Query(QueryError {
            code: 1064,
            sqlstate: Some("42000".to_string()),
            message: "syntax error".to_string(),
        });
        assert!(!rejected.is_fatal());

        let auth = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Authentication,
            message: "access denied".to_string(),
            source: None,
        });
        assert!(!auth.is_fatal());

        let pending = Error::Usage(UsageError {
            kind: UsageErrorKind::ResultSetPending,
            message: "result set pending".to_string(),
        });
        assert!(!pending.is_fatal());
    }

    #[test]
    fn sqlstate_accessor() {
        let err = Error::Query(QueryError {
            code: 1045,
            sqlstate: Some("28000".to_string()),
            message: "Access denied".to_string(),
        });
        assert_eq!(err.sqlstate(), Some("28000"));

        let io = Error::Io(std::io::Error::other("boom"));
        assert_eq!(io.sqlstate(), None);
    }

    #[test]
    fn display_includes_code_and_state() {
        let err = Error::Query(QueryError {
            code: 1064,
            sqlstate: Some("42000".to_string()),
            message: "near 'SELEC'".to_string(),
        });
        let text = err.to_string();
        assert!(text.contains("1064"));
        assert!(text.contains("42000"));
    }
}
