use crate::transport::host::HostId;
use crate::transport::session::SessionHandle;

/// Topology events the external cluster discoverer reports into a running
/// Session.
///
/// This crate does not implement discovery -- gossip, control connections,
/// `system.peers` polling, whatever a real implementation uses -- it only
/// defines the event shape and how one gets delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Up(HostId),
    Down(HostId),
}

impl HostEvent {
    pub fn deliver(self, session: &SessionHandle) {
        match self {
            HostEvent::Up(host) => session.notify_host_up(host),
            HostEvent::Down(host) => session.notify_host_down(host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::connection::LoopbackConnection;
    use crate::transport::load_balancing::RoundRobinPolicy;
    use crate::transport::reconnection_policy::ExponentialReconnectionPolicy;
    use crate::transport::retry_policy::AlwaysRetry;
    use crate::transport::session_builder::SessionBuilder;
    use futures::future::FutureExt;
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn addr(port: u16) -> HostId {
        HostId(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    #[tokio::test]
    async fn host_down_event_clears_prepared_cache() {
        let factory: crate::transport::connection_factory::ConnectionFactory =
            Arc::new(|_host| async move { Ok(Arc::new(LoopbackConnection::spawn_echoing())) }.boxed());
        let session = SessionBuilder::new(factory)
            .known_node(addr(1))
            .balancer(Arc::new(RoundRobinPolicy::new()))
            .retry_predicate(Arc::new(AlwaysRetry))
            .reconnection_policy(Arc::new(ExponentialReconnectionPolicy::default()))
            .build()
            .await
            .unwrap();

        let handle = session.handle();
        HostEvent::Down(addr(1)).deliver(&handle);
        tokio::task::yield_now().await;
        // No panic, no assertion beyond "it was accepted" -- clearing an
        // already-empty prepared set is a no-op.
        session.shutdown().await;
    }
}
