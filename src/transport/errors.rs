use std::sync::Arc;

use thiserror::Error;

/// Error returned when the codec rejects a request before it is ever sent.
///
/// Never retried -- an encode failure is a caller bug (bad CQL, oversized
/// values), not a transient condition.
#[derive(Error, Debug, Clone)]
pub enum EncodeError {
    #[error("statement text is empty")]
    EmptyStatement,

    #[error("too many bound values for statement: {0}")]
    TooManyValues(usize),

    #[error("invalid keyspace name: {0}")]
    BadKeyspaceName(String),
}

/// A single write/read against one connection failed.
///
/// Handled by the Worker: consult the retry predicate, try the next
/// candidate connection, and surface the last error once candidates are
/// exhausted.
#[derive(Error, Debug, Clone)]
pub enum ConnectionFailure {
    #[error("IO error: {0}")]
    IOError(Arc<std::io::Error>),

    #[error("connection closed before a reply arrived")]
    Closed,

    #[error("request timed out")]
    Timeout,
}

impl From<std::io::Error> for ConnectionFailure {
    fn from(io_error: std::io::Error) -> Self {
        ConnectionFailure::IOError(Arc::new(io_error))
    }
}

/// A protocol-level error reply from the server.
///
/// Surfaced to the caller; not retried by default -- the default retry
/// predicate only ever sees [`ConnectionFailure`], never this, since a
/// `CqlError` means the server answered, it just didn't like the request.
#[derive(Error, Debug, Clone)]
#[error("database returned an error ({code}): {message}")]
pub struct CqlError {
    pub code: i32,
    pub message: String,
}

/// Top-level error returned to a `send`/`prepare`/`execute` caller.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// Caller passed an invalid request; never retried.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// No open connections exist and the implementation chose to bound the
    /// pending queue rather than queue indefinitely.
    #[error("no open connections available")]
    NoConnectionsAvailable,

    /// Input/output error has occurred, connection broken etc.
    #[error(transparent)]
    Connection(#[from] ConnectionFailure),

    /// Database sent a response containing some error with a message.
    #[error(transparent)]
    Cql(#[from] CqlError),

    /// The cluster handle was lost; the Session has shut down and failed
    /// every pending caller with this error.
    #[error("cluster handle is gone, session is shutting down")]
    ClusterGone,

    /// The Session actor task is gone (e.g. after a hard shutdown) and the
    /// caller's event could not even be enqueued.
    #[error("session has shut down")]
    SessionGone,
}

/// Error that occurred while establishing a [`Session`](crate::Session).
#[derive(Error, Debug, Clone)]
pub enum NewSessionError {
    /// List of known nodes passed to Session constructor is empty. There
    /// needs to be at least one node to connect to.
    #[error("empty known nodes list")]
    EmptyKnownNodesList,

    #[error(transparent)]
    Connection(#[from] ConnectionFailure),
}
