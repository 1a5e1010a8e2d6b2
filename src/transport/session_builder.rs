use std::sync::Arc;

use crate::transport::connection_factory::ConnectionFactory;
use crate::transport::errors::NewSessionError;
use crate::transport::host::HostId;
use crate::transport::load_balancing::{LoadBalancer, RoundRobinPolicy};
use crate::transport::reconnection_policy::{ExponentialReconnectionPolicy, ReconnectionPolicy};
use crate::transport::retry_policy::{AlwaysRetry, RetryPredicate};
use crate::transport::session::Session;

/// Configuration options for [`Session`].
///
/// Can be constructed directly, but [`SessionBuilder`] is the ergonomic
/// entry point.
#[derive(Clone)]
pub struct SessionConfig {
    /// Addresses known at startup; `Session::connect` opens
    /// `balancer.target_count(host)` connections to each.
    pub known_nodes: Vec<HostId>,
    pub balancer: Arc<dyn LoadBalancer>,
    pub retry_predicate: Arc<dyn RetryPredicate>,
    pub reconnection_policy: Arc<dyn ReconnectionPolicy>,
    /// Opens one new connection to a host. Supplied by the connection
    /// subsystem; there is no sensible built-in default.
    pub connection_factory: ConnectionFactory,
}

impl SessionConfig {
    pub fn new(connection_factory: ConnectionFactory) -> Self {
        SessionConfig {
            known_nodes: Vec::new(),
            balancer: Arc::new(RoundRobinPolicy::new()),
            retry_predicate: Arc::new(AlwaysRetry),
            reconnection_policy: Arc::new(ExponentialReconnectionPolicy::default()),
            connection_factory,
        }
    }
}

/// Fluent builder over [`SessionConfig`]: plain config data lives in one
/// type, setters and the async `build` step live in another.
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new(connection_factory: ConnectionFactory) -> Self {
        SessionBuilder {
            config: SessionConfig::new(connection_factory),
        }
    }

    pub fn known_node(mut self, host: HostId) -> Self {
        self.config.known_nodes.push(host);
        self
    }

    pub fn known_nodes(mut self, hosts: impl IntoIterator<Item = HostId>) -> Self {
        self.config.known_nodes.extend(hosts);
        self
    }

    pub fn balancer(mut self, balancer: Arc<dyn LoadBalancer>) -> Self {
        self.config.balancer = balancer;
        self
    }

    pub fn retry_predicate(mut self, retry_predicate: Arc<dyn RetryPredicate>) -> Self {
        self.config.retry_predicate = retry_predicate;
        self
    }

    pub fn reconnection_policy(mut self, reconnection_policy: Arc<dyn ReconnectionPolicy>) -> Self {
        self.config.reconnection_policy = reconnection_policy;
        self
    }

    pub async fn build(self) -> Result<Session, NewSessionError> {
        Session::connect(self.config).await
    }
}
