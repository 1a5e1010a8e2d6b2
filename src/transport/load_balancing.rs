use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::transport::connection::ConnectionHandle;
use crate::transport::host::{HostId, HostRegistry};

/// Given a request and the set of hosts, decides how many connections to
/// keep open per host and in what order to try candidate connections. The
/// Session treats this purely as data: no I/O, no mutation of the registry.
pub trait LoadBalancer: fmt::Debug + Send + Sync {
    /// How many connections to open per host.
    fn target_count(&self, host: HostId) -> u32;

    /// Ordered list of candidate connections to try for one dispatch, each
    /// paired with the host it belongs to -- the Worker needs the host id to
    /// report a `prepared` event back to the Session.
    ///
    /// `restrict_to`, when given, limits candidates to that subset of hosts
    /// -- used for prepare-then-execute dispatch, which must only ever be
    /// routed to a "preferred host" that holds the statement.
    fn select(
        &self,
        registry: &HostRegistry,
        restrict_to: Option<&[HostId]>,
    ) -> Vec<(HostId, Arc<ConnectionHandle>)>;
}

/// Rotates the host visiting order on every call and flattens each host's
/// open connections in turn -- the simplest strategy that still spreads load
/// evenly across a round.
#[derive(Debug, Default)]
pub struct RoundRobinPolicy {
    cursor: AtomicUsize,
    connections_per_host: u32,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        RoundRobinPolicy {
            cursor: AtomicUsize::new(0),
            connections_per_host: 1,
        }
    }

    pub fn with_connections_per_host(connections_per_host: u32) -> Self {
        RoundRobinPolicy {
            cursor: AtomicUsize::new(0),
            connections_per_host,
        }
    }
}

impl LoadBalancer for RoundRobinPolicy {
    fn target_count(&self, _host: HostId) -> u32 {
        self.connections_per_host
    }

    fn select(
        &self,
        registry: &HostRegistry,
        restrict_to: Option<&[HostId]>,
    ) -> Vec<(HostId, Arc<ConnectionHandle>)> {
        let mut hosts: Vec<HostId> = match restrict_to {
            Some(subset) => subset
                .iter()
                .copied()
                .filter(|h| registry.contains(*h))
                .collect(),
            None => registry.iter().map(|(id, _)| *id).collect(),
        };
        // Deterministic order before rotating, so the rotation offset is
        // meaningful across calls.
        hosts.sort();

        if hosts.is_empty() {
            return Vec::new();
        }

        let offset = self.cursor.fetch_add(1, Ordering::Relaxed) % hosts.len();
        hosts.rotate_left(offset);

        hosts
            .into_iter()
            .filter_map(|h| registry.get(h).map(|host| (h, host)))
            .flat_map(|(h, host)| host.open_connections().map(move |conn| (h, conn)))
            .collect()
    }
}
