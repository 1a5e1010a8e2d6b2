use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::transport::errors::ConnectionFailure;

/// Identity of a single connection, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

impl ConnId {
    fn next() -> Self {
        ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
impl ConnId {
    pub(crate) fn for_test(n: u64) -> Self {
        ConnId(n)
    }
}

/// A single write/await-reply round trip submitted to a connection's opaque
/// I/O loop.
pub struct PendingCall {
    pub frame: Bytes,
    pub reply: oneshot::Sender<Result<Bytes, ConnectionFailure>>,
}

/// A reference to one connection to one cluster node.
///
/// This is deliberately a thin handle, not a trait object: the actual I/O
/// loop that drains `inbox` and produces replies belongs to the connection
/// subsystem and is treated as an opaque endpoint here. The Session and
/// Worker only ever call [`roundtrip`].
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnId,
    inbox: mpsc::UnboundedSender<PendingCall>,
}

impl ConnectionHandle {
    pub fn new(inbox: mpsc::UnboundedSender<PendingCall>) -> Self {
        ConnectionHandle {
            id: ConnId::next(),
            inbox,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Writes `frame` to the connection and awaits its reply. Used directly
    /// by the Worker -- it never goes through the Session.
    pub async fn roundtrip(&self, frame: Bytes) -> Result<Bytes, ConnectionFailure> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.inbox
            .send(PendingCall {
                frame,
                reply: reply_tx,
            })
            .map_err(|_| ConnectionFailure::Closed)?;
        reply_rx.await.map_err(|_| ConnectionFailure::Closed)?
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for ConnectionHandle {}

/// A minimal in-process stand-in for a connection's I/O loop, used by tests
/// and the demo binary. Every call it receives is answered with an
/// echo of the request frame.
pub struct LoopbackConnection;

impl LoopbackConnection {
    /// Spawns a task that answers every call with the request frame echoed
    /// back, and returns a handle to it plus the raw receiver in case the
    /// test wants to drive replies itself instead.
    pub fn new() -> (ConnectionHandle, mpsc::UnboundedReceiver<PendingCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(tx), rx)
    }

    /// Convenience: spawns the handle *and* the echoing task, for tests that
    /// don't need to script individual replies.
    pub fn spawn_echoing() -> ConnectionHandle {
        let (handle, mut rx) = Self::new();
        tokio::spawn(async move {
            while let Some(call) = rx.recv().await {
                let _ = call.reply.send(Ok(call.frame));
            }
        });
        handle
    }

    /// Spawns a handle whose I/O loop always fails, to exercise retry paths.
    pub fn spawn_failing() -> ConnectionHandle {
        let (handle, mut rx) = Self::new();
        tokio::spawn(async move {
            while let Some(call) = rx.recv().await {
                let _ = call.reply.send(Err(ConnectionFailure::Closed));
            }
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoing_loopback_returns_the_frame_sent() {
        let conn = LoopbackConnection::spawn_echoing();
        let reply = conn.roundtrip(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(reply, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn failing_loopback_returns_connection_failure() {
        let conn = LoopbackConnection::spawn_failing();
        let err = conn.roundtrip(Bytes::from_static(b"hello")).await;
        assert!(err.is_err());
    }
}
