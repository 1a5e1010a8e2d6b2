use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::transport::connection::{ConnId, ConnectionHandle};
use crate::transport::fingerprint::Fingerprint;
use crate::PreparedStatement;

/// Opaque identifier of a cluster node, typically its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub SocketAddr);

impl From<SocketAddr> for HostId {
    fn from(addr: SocketAddr) -> Self {
        HostId(addr)
    }
}

impl std::fmt::Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Open,
    Closed,
}

/// Per-host record: its connections (each open or closed), the set of
/// prepared statements the server-side node has acknowledged, and whether
/// the cluster currently considers it up. `alive` is independent of
/// connection state -- a host can be up with zero open connections (just
/// reconnecting) or reported down while a connection is still draining.
#[derive(Debug)]
pub struct Host {
    connections: HashMap<ConnId, (Arc<ConnectionHandle>, ConnState)>,
    prepared: HashMap<Fingerprint, PreparedStatement>,
    alive: bool,
}

impl Default for Host {
    fn default() -> Self {
        Host {
            connections: HashMap::new(),
            prepared: HashMap::new(),
            alive: true,
        }
    }
}

impl Host {
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn open_connection_count(&self) -> usize {
        self.connections
            .values()
            .filter(|(_, state)| *state == ConnState::Open)
            .count()
    }

    pub fn open_connections(&self) -> impl Iterator<Item = Arc<ConnectionHandle>> + '_ {
        self.connections
            .values()
            .filter(|(_, state)| *state == ConnState::Open)
            .map(|(conn, _)| conn.clone())
    }

    pub fn has_prepared(&self, fingerprint: Fingerprint) -> bool {
        self.prepared.contains_key(&fingerprint)
    }

    pub fn get_prepared(&self, fingerprint: Fingerprint) -> Option<&PreparedStatement> {
        self.prepared.get(&fingerprint)
    }
}

/// Owns all per-host bookkeeping. Every operation is total: callers may pass
/// a `conn` that isn't currently tracked and get a no-op, since connection
/// and host events can race each other.
#[derive(Debug, Default)]
pub struct HostRegistry {
    hosts: HashMap<HostId, Host>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `host` exists in the registry, defaulting to alive. A host
    /// already present keeps whatever liveness it had -- this only seeds a
    /// first-time record.
    pub fn ensure_host(&mut self, host: HostId) -> &mut Host {
        self.hosts.entry(host).or_insert_with(Host::default)
    }

    pub fn get(&self, host: HostId) -> Option<&Host> {
        self.hosts.get(&host)
    }

    pub fn contains(&self, host: HostId) -> bool {
        self.hosts.contains_key(&host)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HostId, &Host)> {
        self.hosts.iter()
    }

    pub fn add_connection(&mut self, host: HostId, conn: Arc<ConnectionHandle>) {
        let record = self.ensure_host(host);
        record
            .connections
            .insert(conn.id(), (conn, ConnState::Open));
    }

    /// Marks `conn` open or closed on `host`. No-op if `host` or `conn` is
    /// unknown.
    pub fn toggle_connection(&mut self, host: HostId, conn: ConnId, state: ConnState) {
        if let Some(record) = self.hosts.get_mut(&host) {
            if let Some(entry) = record.connections.get_mut(&conn) {
                entry.1 = state;
            }
        }
    }

    /// Removes `conn` from `host` entirely (process death). No-op if
    /// unknown.
    pub fn delete_connection(&mut self, host: HostId, conn: ConnId) {
        if let Some(record) = self.hosts.get_mut(&host) {
            record.connections.remove(&conn);
        }
    }

    /// Removes `conn` from every host -- used when we only know the
    /// connection died, not which host it belonged to.
    pub fn delete_connection_everywhere(&mut self, conn: ConnId) {
        for record in self.hosts.values_mut() {
            record.connections.remove(&conn);
        }
    }

    pub fn put_prepared(&mut self, host: HostId, fingerprint: Fingerprint, prepared: PreparedStatement) {
        self.ensure_host(host).prepared.insert(fingerprint, prepared);
    }

    /// Clears all prepared statements the given host holds -- the server
    /// discards prepared state once it's reported down.
    pub fn clear_prepared(&mut self, host: HostId) {
        if let Some(record) = self.hosts.get_mut(&host) {
            record.prepared.clear();
        }
    }

    /// Marks `host` alive, creating its record if this is the first time
    /// it's been seen.
    pub fn mark_alive(&mut self, host: HostId) {
        self.ensure_host(host).alive = true;
    }

    /// Marks `host` down without removing it -- its connections and
    /// prepared-statement cache are handled separately by the caller.
    pub fn mark_down(&mut self, host: HostId) {
        self.ensure_host(host).alive = false;
    }

    pub fn has_prepared(&self, host: HostId, fingerprint: Fingerprint) -> bool {
        self.hosts
            .get(&host)
            .map(|record| record.has_prepared(fingerprint))
            .unwrap_or(false)
    }

    pub fn open_count(&self, host: HostId) -> usize {
        self.hosts
            .get(&host)
            .map(Host::open_connection_count)
            .unwrap_or(0)
    }

    /// A host we've never heard of is treated as down, same as one we've
    /// heard of and marked down.
    pub fn is_down(&self, host: HostId) -> bool {
        self.hosts.get(&host).map(|record| !record.alive).unwrap_or(true)
    }

    /// Total number of open connections across all hosts.
    pub fn total_open_connections(&self) -> usize {
        self.hosts.values().map(Host::open_connection_count).sum()
    }

    /// Hosts that hold a prepared statement for `fingerprint` and have at
    /// least one open connection ("preferred hosts").
    pub fn preferred_hosts(&self, fingerprint: Fingerprint) -> Vec<HostId> {
        self.hosts
            .iter()
            .filter(|(_, record)| {
                record.has_prepared(fingerprint) && record.open_connection_count() > 0
            })
            .map(|(id, _)| *id)
            .collect()
    }
}
