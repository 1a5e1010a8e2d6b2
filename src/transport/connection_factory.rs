use std::sync::Arc;

use futures::future::BoxFuture;

use crate::transport::connection::ConnectionHandle;
use crate::transport::errors::ConnectionFailure;
use crate::transport::host::HostId;

/// Opens one new connection to `host`.
///
/// Modeled as a boxed closure returning a future rather than a trait object
/// with an async method -- callers can plug in a plain closure instead of
/// defining a type. The actual TCP/TLS/auth handshake belongs to the
/// connection subsystem; this crate only needs something it can call to get
/// a [`ConnectionHandle`] back.
pub type ConnectionFactory =
    Arc<dyn Fn(HostId) -> BoxFuture<'static, Result<Arc<ConnectionHandle>, ConnectionFailure>> + Send + Sync>;
