use std::sync::Arc;

use bytes::Bytes;

use crate::transport::fingerprint::Fingerprint;

/// Opaque, server-produced statement id, recorded per host in the
/// [`HostRegistry`](crate::transport::host::HostRegistry).
///
/// Only valid on the node that issued it, until that node forgets it
/// (`host_down`).
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    id: Bytes,
}

impl PreparedStatement {
    pub fn new(id: Bytes) -> Self {
        PreparedStatement { id }
    }

    pub fn id(&self) -> &Bytes {
        &self.id
    }
}

/// The stable handle a client gets back from `prepare()` and later passes to
/// `execute()`.
///
/// Carries the original statement text (useful for diagnostics/logging) and
/// the fingerprint computed once at `prepare()` time, so `execute()` never
/// has to recompute the MD5 of the encoded `PREPARE` frame for a handle it
/// already holds.
#[derive(Debug, Clone)]
pub struct PreparedHandle {
    text: Arc<str>,
    fingerprint: Fingerprint,
}

impl PreparedHandle {
    pub fn new(text: impl Into<Arc<str>>, fingerprint: Fingerprint) -> Self {
        PreparedHandle {
            text: text.into(),
            fingerprint,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

impl std::fmt::Display for PreparedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
