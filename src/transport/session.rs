use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::statement::prepared_statement::{PreparedHandle, PreparedStatement};
use crate::statement::query_params::{QueryParams, Statement};
use crate::transport::connection::{ConnId, ConnectionHandle};
use crate::transport::connector::Connector;
use crate::transport::errors::{EncodeError, NewSessionError, SessionError};
use crate::transport::fingerprint::Fingerprint;
use crate::transport::host::{ConnState, HostId, HostRegistry};
use crate::transport::load_balancing::LoadBalancer;
use crate::transport::metrics::{Metrics, MetricsView};
use crate::transport::request::Request;
use crate::transport::retry_policy::RetryPredicate;
use crate::transport::session_builder::SessionConfig;
use crate::transport::worker::{self, Dispatch};

/// Handle to a running [`Session`] actor. Cheap to clone; every clone shares
/// the same inbox and metrics. This is what [`Connector`] and the Worker
/// hold so they can push events back without going through a public
/// `Session` method.
#[derive(Clone)]
pub struct SessionHandle {
    inbox: mpsc::UnboundedSender<SessionEvent>,
    metrics: Arc<Metrics>,
}

impl SessionHandle {
    #[cfg(test)]
    pub(crate) fn for_test(inbox: mpsc::UnboundedSender<SessionEvent>) -> Self {
        SessionHandle {
            inbox,
            metrics: Arc::new(Metrics::new()),
        }
    }

    fn send_event(&self, event: SessionEvent) {
        // A closed inbox means the Session has shut down; events pushed
        // after that point are dropped, matching a fire-and-forget
        // notification (the originating Connector/Worker task has nothing
        // useful to do with the error).
        let _ = self.inbox.send(event);
    }

    pub fn notify_connection_opened(&self, host: HostId, conn: Arc<ConnectionHandle>) {
        self.send_event(SessionEvent::ConnectionOpened { host, conn });
    }

    pub fn notify_connection_closed(&self, host: HostId, conn: ConnId) {
        self.send_event(SessionEvent::ConnectionClosed { host, conn });
    }

    pub fn notify_connection_stopped(&self, host: HostId, conn: ConnId) {
        self.send_event(SessionEvent::ConnectionStopped { host, conn });
    }

    pub fn notify_connection_process_down(&self, conn: ConnId) {
        self.send_event(SessionEvent::ConnectionProcessDown { conn });
    }

    pub fn notify_prepared(&self, host: HostId, fingerprint: Fingerprint, prepared: PreparedStatement) {
        self.send_event(SessionEvent::Prepared {
            host,
            fingerprint,
            prepared,
        });
    }

    pub fn notify_host_up(&self, host: HostId) {
        self.send_event(SessionEvent::HostUp { host });
    }

    pub fn notify_host_down(&self, host: HostId) {
        self.send_event(SessionEvent::HostDown { host });
    }

    pub fn metrics(&self) -> MetricsView {
        self.metrics.view()
    }

    pub async fn execute(&self, statement: Statement, params: QueryParams) -> Result<Bytes, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send_event(SessionEvent::Execute {
            statement,
            params,
            reply,
        });
        rx.await.map_err(|_| SessionError::SessionGone)?
    }

    pub async fn prepare(&self, text: Arc<str>) -> Result<PreparedHandle, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send_event(SessionEvent::Prepare { text, reply });
        rx.await.map_err(|_| SessionError::SessionGone)?
    }

    pub async fn send(&self, frame: Bytes) -> Result<Bytes, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send_event(SessionEvent::Send { frame, reply });
        rx.await.map_err(|_| SessionError::SessionGone)?
    }
}

/// Everything that crosses into the Session's single inbox: client calls and
/// cluster/connection notifications alike.
pub(crate) enum SessionEvent {
    Connect,
    Send {
        frame: Bytes,
        reply: oneshot::Sender<Result<Bytes, SessionError>>,
    },
    Prepare {
        text: Arc<str>,
        reply: oneshot::Sender<Result<PreparedHandle, SessionError>>,
    },
    Execute {
        statement: Statement,
        params: QueryParams,
        reply: oneshot::Sender<Result<Bytes, SessionError>>,
    },
    ConnectionOpened {
        host: HostId,
        conn: Arc<ConnectionHandle>,
    },
    ConnectionClosed {
        host: HostId,
        conn: ConnId,
    },
    ConnectionStopped {
        host: HostId,
        conn: ConnId,
    },
    ConnectionProcessDown {
        conn: ConnId,
    },
    Prepared {
        host: HostId,
        fingerprint: Fingerprint,
        prepared: PreparedStatement,
    },
    HostUp {
        host: HostId,
    },
    HostDown {
        host: HostId,
    },
}

struct PendingRequest {
    request: Request,
    frame: Bytes,
    caller: Option<oneshot::Sender<Result<Bytes, SessionError>>>,
}

struct PendingPrepare {
    text: Arc<str>,
    reply: oneshot::Sender<Result<PreparedHandle, SessionError>>,
}

struct PendingExecute {
    params: QueryParams,
    reply: oneshot::Sender<Result<Bytes, SessionError>>,
}

/// Owns every piece of mutable session state; processes one [`SessionEvent`]
/// at a time to completion, which is what makes the `hosts`/`pending_*`
/// bookkeeping safe without locks.
struct SessionActor {
    hosts: HostRegistry,
    pending_requests: Vec<PendingRequest>,
    pending_prepares: HashMap<Fingerprint, Vec<PendingPrepare>>,
    pending_executes: HashMap<Fingerprint, Vec<PendingExecute>>,
    balancer: Arc<dyn LoadBalancer>,
    retry_predicate: Arc<dyn RetryPredicate>,
    connector: Connector,
    metrics: Arc<Metrics>,
    initial_hosts: Vec<HostId>,
    self_handle: SessionHandle,
}

impl SessionActor {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = inbox.recv().await {
            match event {
                SessionEvent::Connect => self.handle_connect(),
                SessionEvent::Send { frame, reply } => self.handle_send(frame, reply),
                SessionEvent::Prepare { text, reply } => self.handle_prepare(text, reply),
                SessionEvent::Execute {
                    statement,
                    params,
                    reply,
                } => self.handle_execute(statement, params, reply),
                SessionEvent::ConnectionOpened { host, conn } => self.handle_connection_opened(host, conn),
                SessionEvent::ConnectionClosed { host, conn } => {
                    debug!(%host, "connection closed");
                    self.hosts.toggle_connection(host, conn, ConnState::Closed);
                }
                SessionEvent::ConnectionStopped { host, conn } => {
                    debug!(%host, "connection stopped");
                    self.hosts.delete_connection(host, conn);
                }
                SessionEvent::ConnectionProcessDown { conn } => {
                    debug!("connection process down, removing from all hosts");
                    self.hosts.delete_connection_everywhere(conn);
                }
                SessionEvent::Prepared {
                    host,
                    fingerprint,
                    prepared,
                } => self.handle_prepared(host, fingerprint, prepared),
                SessionEvent::HostUp { host } => self.handle_host_up(host),
                SessionEvent::HostDown { host } => {
                    info!(%host, "host down, clearing prepared statements");
                    self.hosts.mark_down(host);
                    self.hosts.clear_prepared(host);
                }
            }
        }
        debug!("session inbox closed, actor exiting");
        self.fail_all_pending();
    }

    /// Fails every caller still waiting on a reply with `ClusterGone` instead
    /// of silently dropping their reply channel, which would otherwise
    /// surface as the less specific `SessionGone`.
    fn fail_all_pending(&mut self) {
        for pending in std::mem::take(&mut self.pending_requests) {
            if let Some(caller) = pending.caller {
                let _ = caller.send(Err(SessionError::ClusterGone));
            }
        }
        for waiters in std::mem::take(&mut self.pending_prepares).into_values() {
            for waiter in waiters {
                let _ = waiter.reply.send(Err(SessionError::ClusterGone));
            }
        }
        for execs in std::mem::take(&mut self.pending_executes).into_values() {
            for exec in execs {
                let _ = exec.reply.send(Err(SessionError::ClusterGone));
            }
        }
    }

    fn handle_connect(&mut self) {
        let hosts: Vec<HostId> = self.initial_hosts.clone();
        for host in hosts {
            self.hosts.mark_alive(host);
            let count = self.balancer.target_count(host);
            info!(%host, count, "opening initial connections");
            self.connector.open_many(self.self_handle.clone(), host, count);
        }
    }

    fn handle_host_up(&mut self, host: HostId) {
        self.hosts.mark_alive(host);
        let existing = self.hosts.open_count(host);
        let target = self.balancer.target_count(host) as usize;
        if target > existing {
            info!(%host, needed = target - existing, "host up, opening more connections");
            self.connector
                .open_many(self.self_handle.clone(), host, (target - existing) as u32);
        }
    }

    fn handle_connection_opened(&mut self, host: HostId, conn: Arc<ConnectionHandle>) {
        info!(%host, "connection opened");
        self.hosts.add_connection(host, conn);
        self.drain_pending_requests();
    }

    /// Empties `pending_requests` in one step before dispatching any of them,
    /// so a second `connection_opened` arriving mid-drain can't observe a
    /// non-empty queue and re-send the same work.
    fn drain_pending_requests(&mut self) {
        let drained = std::mem::take(&mut self.pending_requests);
        if drained.is_empty() {
            return;
        }
        debug!(count = drained.len(), "draining pending requests");
        for pending in drained {
            self.dispatch(pending.request, pending.frame, pending.caller, None);
        }
    }

    fn handle_send(&mut self, frame: Bytes, reply: oneshot::Sender<Result<Bytes, SessionError>>) {
        // The escape hatch: the caller already encoded the frame, so there's
        // nothing for us to build beyond a generic request tag for the
        // retry predicate and load balancer to reason about.
        let request = Request::Query {
            text: Arc::from(""),
            params: QueryParams::new(),
        };
        self.send_or_queue(request, frame, Some(reply));
    }

    fn handle_prepare(&mut self, text: Arc<str>, reply: oneshot::Sender<Result<PreparedHandle, SessionError>>) {
        let frame = match encode_prepare(&text) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = reply.send(Err(SessionError::Encode(e)));
                return;
            }
        };
        let fingerprint = Fingerprint::of_encoded_prepare(&frame);

        // Warm cache: some host already knows this fingerprint. Reply
        // immediately rather than re-preparing.
        if !self.hosts.preferred_hosts(fingerprint).is_empty() {
            let _ = reply.send(Ok(PreparedHandle::new(text, fingerprint)));
            return;
        }

        self.pending_prepares
            .entry(fingerprint)
            .or_insert_with(Vec::new)
            .push(PendingPrepare {
                text: text.clone(),
                reply,
            });

        let request = Request::Prepare { text };
        self.send_or_queue(request, frame, None);
    }

    fn handle_execute(
        &mut self,
        statement: Statement,
        params: QueryParams,
        reply: oneshot::Sender<Result<Bytes, SessionError>>,
    ) {
        if !params.is_prepared_execution() {
            let text = statement.text().to_owned();
            let frame = match encode_query(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    let _ = reply.send(Err(SessionError::Encode(e)));
                    return;
                }
            };
            let request = Request::Query {
                text: Arc::from(text),
                params,
            };
            self.send_or_queue(request, frame, Some(reply));
            return;
        }

        let (text, fingerprint) = match &statement {
            Statement::Prepared(handle) => (Arc::<str>::from(handle.text()), handle.fingerprint()),
            Statement::Text(t) => {
                let text: Arc<str> = Arc::from(t.as_str());
                let prepare_frame = match encode_prepare(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        let _ = reply.send(Err(SessionError::Encode(e)));
                        return;
                    }
                };
                (text, Fingerprint::of_encoded_prepare(&prepare_frame))
            }
        };

        if self.dispatch_execute_if_preferred(fingerprint, params, reply) {
            return;
        }

        // No preferred host: `dispatch_execute_if_preferred` already queued
        // `{params, reply}` in `pending_executes`. We still owe the `PREPARE`
        // dispatch that will eventually produce the `prepared` event to pop it.
        let prepare_frame = match encode_prepare(&text) {
            Ok(frame) => frame,
            Err(e) => {
                if let Some(exec) = self.pending_executes.get_mut(&fingerprint).and_then(Vec::pop) {
                    let _ = exec.reply.send(Err(SessionError::Encode(e)));
                }
                return;
            }
        };
        let prepare_request = Request::Prepare { text };
        self.send_or_queue(prepare_request, prepare_frame, None);
    }

    /// If a preferred host exists for `fingerprint`, encodes and dispatches
    /// the `EXECUTE` immediately and returns `true`, consuming `reply`.
    /// Otherwise stashes `{params, reply}` in `pending_executes` and returns
    /// `false` -- the caller still owes a `PREPARE` dispatch.
    fn dispatch_execute_if_preferred(
        &mut self,
        fingerprint: Fingerprint,
        params: QueryParams,
        reply: oneshot::Sender<Result<Bytes, SessionError>>,
    ) -> bool {
        let preferred = self.hosts.preferred_hosts(fingerprint);
        let statement_id = preferred
            .iter()
            .find_map(|h| self.hosts.get(*h).and_then(|host| host.get_prepared(fingerprint)))
            .map(|p| p.id().clone());

        let statement_id = match statement_id {
            Some(id) => id,
            None => {
                self.pending_executes
                    .entry(fingerprint)
                    .or_insert_with(Vec::new)
                    .push(PendingExecute { params, reply });
                return false;
            }
        };

        let frame = match encode_execute(&statement_id, &params) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = reply.send(Err(SessionError::Encode(e)));
                return true;
            }
        };
        let request = Request::Execute {
            fingerprint,
            statement_id,
            params,
        };
        self.dispatch(request, frame, Some(reply), Some(preferred));
        true
    }

    fn handle_prepared(&mut self, host: HostId, fingerprint: Fingerprint, prepared: PreparedStatement) {
        info!(%host, fingerprint = %fingerprint, "prepared");
        self.hosts.put_prepared(host, fingerprint, prepared);

        if let Some(waiters) = self.pending_prepares.remove(&fingerprint) {
            for waiter in waiters {
                let _ = waiter.reply.send(Ok(PreparedHandle::new(waiter.text, fingerprint)));
            }
        }

        if let Some(executes) = self.pending_executes.remove(&fingerprint) {
            for exec in executes {
                self.dispatch_execute_if_preferred(fingerprint, exec.params, exec.reply);
            }
        }
    }

    fn send_or_queue(
        &mut self,
        request: Request,
        frame: Bytes,
        caller: Option<oneshot::Sender<Result<Bytes, SessionError>>>,
    ) {
        if self.hosts.total_open_connections() == 0 {
            self.pending_requests.push(PendingRequest {
                request,
                frame,
                caller,
            });
        } else {
            self.dispatch(request, frame, caller, None);
        }
    }

    fn dispatch(
        &self,
        request: Request,
        frame: Bytes,
        caller: Option<oneshot::Sender<Result<Bytes, SessionError>>>,
        restrict_to: Option<Vec<HostId>>,
    ) {
        let candidates = self.balancer.select(&self.hosts, restrict_to.as_deref());
        worker::dispatch(Dispatch {
            request,
            frame,
            caller,
            candidates,
            retry_predicate: self.retry_predicate.clone(),
            metrics: self.metrics.clone(),
            session: self.self_handle.clone(),
        });
    }
}

fn encode_query(text: &str) -> Result<Bytes, EncodeError> {
    if text.is_empty() {
        return Err(EncodeError::EmptyStatement);
    }
    Ok(Bytes::copy_from_slice(text.as_bytes()))
}

fn encode_prepare(text: &str) -> Result<Bytes, EncodeError> {
    if text.is_empty() {
        return Err(EncodeError::EmptyStatement);
    }
    let mut buf = Vec::with_capacity(text.len() + 8);
    buf.extend_from_slice(b"PREPARE:");
    buf.extend_from_slice(text.as_bytes());
    Ok(Bytes::from(buf))
}

fn encode_execute(statement_id: &Bytes, params: &QueryParams) -> Result<Bytes, EncodeError> {
    let mut buf = Vec::with_capacity(statement_id.len() + 8);
    buf.extend_from_slice(b"EXECUTE:");
    buf.extend_from_slice(statement_id);
    for value in &params.values {
        buf.extend_from_slice(value);
    }
    Ok(Bytes::from(buf))
}

/// Entry point into the session core. Wraps a [`SessionHandle`] plus the
/// actor's task handle so [`Session::shutdown`] can wait for it to drain.
pub struct Session {
    handle: SessionHandle,
    actor_task: JoinHandle<()>,
}

impl Session {
    /// Seeds the host registry with `config.known_nodes` and fires the
    /// initial `connect` event.
    pub async fn connect(config: SessionConfig) -> Result<Session, NewSessionError> {
        if config.known_nodes.is_empty() {
            return Err(NewSessionError::EmptyKnownNodesList);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(Metrics::new());
        let handle = SessionHandle {
            inbox: tx,
            metrics: metrics.clone(),
        };

        let actor = SessionActor {
            hosts: HostRegistry::new(),
            pending_requests: Vec::new(),
            pending_prepares: HashMap::new(),
            pending_executes: HashMap::new(),
            balancer: config.balancer.clone(),
            retry_predicate: config.retry_predicate.clone(),
            connector: Connector::new(config.connection_factory.clone(), config.reconnection_policy.clone()),
            metrics,
            initial_hosts: config.known_nodes.clone(),
            self_handle: handle.clone(),
        };

        let actor_task = tokio::spawn(actor.run(rx));
        handle.send_event(SessionEvent::Connect);

        Ok(Session { handle, actor_task })
    }

    pub async fn execute(&self, statement: impl Into<Statement>, params: QueryParams) -> Result<Bytes, SessionError> {
        self.handle.execute(statement.into(), params).await
    }

    pub async fn prepare(&self, text: impl Into<Arc<str>>) -> Result<PreparedHandle, SessionError> {
        self.handle.prepare(text.into()).await
    }

    pub async fn send(&self, frame: Bytes) -> Result<Bytes, SessionError> {
        self.handle.send(frame).await
    }

    pub fn notify_host_up(&self, host: HostId) {
        self.handle.notify_host_up(host);
    }

    pub fn notify_host_down(&self, host: HostId) {
        self.handle.notify_host_down(host);
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> MetricsView {
        self.handle.metrics()
    }

    /// Drops the inbox sender, which ends the actor's event loop once the
    /// last in-flight event drains, then awaits the actor task. In-flight
    /// Workers are left for the runtime shutdown to abort, since they hold
    /// no Session state that needs to be unwound cleanly.
    pub async fn shutdown(self) {
        drop(self.handle);
        let _ = self.actor_task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::connection::LoopbackConnection;
    use crate::transport::load_balancing::RoundRobinPolicy;
    use crate::transport::reconnection_policy::ExponentialReconnectionPolicy;
    use crate::transport::retry_policy::AlwaysRetry;
    use futures::future::FutureExt;
    use std::net::SocketAddr;

    fn addr(port: u16) -> HostId {
        HostId(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn echoing_config(hosts: Vec<HostId>) -> SessionConfig {
        let factory: crate::transport::connection_factory::ConnectionFactory = Arc::new(|_host| {
            async move { Ok(Arc::new(LoopbackConnection::spawn_echoing())) }.boxed()
        });
        SessionConfig {
            known_nodes: hosts,
            balancer: Arc::new(RoundRobinPolicy::new()),
            retry_predicate: Arc::new(AlwaysRetry),
            reconnection_policy: Arc::new(ExponentialReconnectionPolicy::default()),
            connection_factory: factory,
        }
    }

    #[tokio::test]
    async fn connect_rejects_empty_known_nodes() {
        let err = Session::connect(echoing_config(Vec::new())).await.unwrap_err();
        assert!(matches!(err, NewSessionError::EmptyKnownNodesList));
    }

    #[tokio::test]
    async fn simple_query_round_trips_through_echoing_connection() {
        let session = Session::connect(echoing_config(vec![addr(1)])).await.unwrap();
        let reply = session.execute("SELECT * FROM t", QueryParams::new()).await.unwrap();
        assert_eq!(reply, Bytes::from_static(b"SELECT * FROM t"));
    }

    #[tokio::test]
    async fn empty_statement_text_is_an_encode_error() {
        let session = Session::connect(echoing_config(vec![addr(1)])).await.unwrap();
        let err = session.execute("", QueryParams::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::Encode(EncodeError::EmptyStatement)));
    }

    #[tokio::test]
    async fn prepare_then_execute_dispatches_execute_after_prepared() {
        let session = Session::connect(echoing_config(vec![addr(1)])).await.unwrap();
        let params = QueryParams::with_values(vec![Bytes::from_static(b"1")]).unwrap();
        let reply = session
            .execute("INSERT INTO t (k) VALUES (?)", params)
            .await
            .unwrap();
        assert!(reply.starts_with(b"EXECUTE:"));
    }

    #[tokio::test]
    async fn warm_cache_execute_skips_prepare() {
        let session = Session::connect(echoing_config(vec![addr(1)])).await.unwrap();
        let handle = session.prepare("INSERT INTO t (k) VALUES (?)").await.unwrap();
        let params = QueryParams::with_values(vec![Bytes::from_static(b"1")]).unwrap();
        let reply = session.execute(handle, params).await.unwrap();
        assert!(reply.starts_with(b"EXECUTE:"));
    }

    #[tokio::test]
    async fn host_down_clears_prepared_and_forces_reprepare() {
        let session = Session::connect(echoing_config(vec![addr(1)])).await.unwrap();
        let handle = session.prepare("SELECT 1").await.unwrap();
        let fingerprint = handle.fingerprint();

        session.notify_host_down(addr(1));
        // Give the actor a chance to process the event before asserting.
        tokio::task::yield_now().await;

        let second = session.prepare("SELECT 1").await.unwrap();
        assert_eq!(second.fingerprint(), fingerprint);
    }

    #[tokio::test]
    async fn cold_start_queues_until_connection_opens() {
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(Metrics::new());
        let handle = SessionHandle {
            inbox: tx,
            metrics: metrics.clone(),
        };
        let connector = Connector::new(
            Arc::new(|_host| async move { Ok(Arc::new(LoopbackConnection::spawn_echoing())) }.boxed()),
            Arc::new(ExponentialReconnectionPolicy::default()),
        );
        let actor = SessionActor {
            hosts: HostRegistry::new(),
            pending_requests: Vec::new(),
            pending_prepares: HashMap::new(),
            pending_executes: HashMap::new(),
            balancer: Arc::new(RoundRobinPolicy::new()),
            retry_predicate: Arc::new(AlwaysRetry),
            connector,
            metrics,
            initial_hosts: Vec::new(),
            self_handle: handle.clone(),
        };
        tokio::spawn(actor.run(rx));

        let reply_future = handle.execute(
            Statement::Text("SELECT 1".into()),
            QueryParams::new(),
        );
        // No connection has opened yet -- dispatch it manually once we're
        // sure the call is parked in `pending_requests`.
        tokio::task::yield_now().await;
        handle.notify_connection_opened(addr(1), Arc::new(LoopbackConnection::spawn_echoing()));

        let reply = reply_future.await.unwrap();
        assert_eq!(reply, Bytes::from_static(b"SELECT 1"));
    }

    #[tokio::test]
    async fn shutdown_fails_pending_callers_with_cluster_gone() {
        let factory: crate::transport::connection_factory::ConnectionFactory =
            Arc::new(|_host| async move { Err(crate::transport::errors::ConnectionFailure::Closed) }.boxed());
        let session = Session::connect(SessionConfig {
            known_nodes: vec![addr(1)],
            balancer: Arc::new(RoundRobinPolicy::new()),
            retry_predicate: Arc::new(AlwaysRetry),
            reconnection_policy: Arc::new(ExponentialReconnectionPolicy::default()),
            connection_factory: factory,
        })
        .await
        .unwrap();

        let handle = session.handle();
        let call = tokio::spawn(async move {
            handle
                .execute(Statement::Text("SELECT 1".into()), QueryParams::new())
                .await
        });
        // Make sure the request is parked in `pending_requests` before the
        // actor shuts down.
        tokio::task::yield_now().await;

        session.shutdown().await;

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::ClusterGone));
    }
}
