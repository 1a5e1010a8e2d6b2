use std::sync::Arc;

use tracing::{info, warn};

use crate::transport::connection_factory::ConnectionFactory;
use crate::transport::host::HostId;
use crate::transport::reconnection_policy::ReconnectionPolicy;
use crate::transport::session::SessionHandle;

/// The minimal stand-in for the "connection subsystem" collaborator: it owns
/// the [`ConnectionFactory`] and the [`ReconnectionPolicy`], and is what
/// actually paces reopen attempts after a connection is lost. The Session
/// itself never touches the policy -- it only calls [`Connector::open_one`]
/// and reacts to whatever `connection_opened` event gets pushed back into
/// its inbox.
#[derive(Clone)]
pub struct Connector {
    factory: ConnectionFactory,
    reconnection_policy: Arc<dyn ReconnectionPolicy>,
}

impl Connector {
    pub fn new(factory: ConnectionFactory, reconnection_policy: Arc<dyn ReconnectionPolicy>) -> Self {
        Connector {
            factory,
            reconnection_policy,
        }
    }

    /// Opens a single connection to `host` immediately (used for `connect`
    /// and `host_up`). On success, pushes `connection_opened` into the
    /// session; on failure, falls back to
    /// [`spawn_reconnect_loop`] so the attempt keeps retrying in the
    /// background according to the reconnection policy, instead of the
    /// caller blocking on it.
    pub fn open_one(&self, session: SessionHandle, host: HostId) {
        let factory = self.factory.clone();
        let policy = self.reconnection_policy.clone();
        tokio::spawn(async move {
            match factory(host).await {
                Ok(conn) => {
                    info!(%host, "connection opened");
                    session.notify_connection_opened(host, conn);
                }
                Err(e) => {
                    warn!(%host, error = %e, "initial connection attempt failed, scheduling retries");
                    Connector::spawn_reconnect_loop_inner(factory, policy, session, host);
                }
            }
        });
    }

    /// Opens `count` connections to `host` (used when the balancer wants
    /// more than one connection per host).
    pub fn open_many(&self, session: SessionHandle, host: HostId, count: u32) {
        for _ in 0..count {
            self.open_one(session.clone(), host);
        }
    }

    fn spawn_reconnect_loop_inner(
        factory: ConnectionFactory,
        policy: Arc<dyn ReconnectionPolicy>,
        session: SessionHandle,
        host: HostId,
    ) {
        tokio::spawn(async move {
            let mut schedule = policy.new_schedule();
            loop {
                let delay = schedule.next().expect("reconnection schedule is infinite");
                tokio::time::sleep(delay).await;
                match factory(host).await {
                    Ok(conn) => {
                        info!(%host, "reconnected");
                        session.notify_connection_opened(host, conn);
                        return;
                    }
                    Err(e) => {
                        warn!(%host, error = %e, "reconnection attempt failed, retrying");
                    }
                }
            }
        });
    }
}
