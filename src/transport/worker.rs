use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::statement::prepared_statement::PreparedStatement;
use crate::transport::connection::ConnectionHandle;
use crate::transport::errors::SessionError;
use crate::transport::fingerprint::Fingerprint;
use crate::transport::host::HostId;
use crate::transport::metrics::Metrics;
use crate::transport::request::Request;
use crate::transport::retry_policy::RetryPredicate;
use crate::transport::session::SessionHandle;

/// Everything one dispatch attempt needs, bundled so `dispatch` has a single
/// argument instead of a long parameter list.
pub struct Dispatch {
    pub request: Request,
    pub frame: Bytes,
    /// `None` for `PREPARE` dispatches -- those are answered through the
    /// `prepared` event path, not a direct reply.
    pub caller: Option<oneshot::Sender<Result<Bytes, SessionError>>>,
    /// Ordered candidates, each paired with the host it belongs to.
    pub candidates: Vec<(HostId, Arc<ConnectionHandle>)>,
    pub retry_predicate: Arc<dyn RetryPredicate>,
    pub metrics: Arc<Metrics>,
    pub session: SessionHandle,
}

/// Spawns the Worker task and returns immediately; the Session never awaits
/// this -- dispatch happens off the actor's event loop so one slow or
/// retrying request can't stall every other caller.
pub fn dispatch(work: Dispatch) {
    tokio::spawn(run(work));
}

async fn run(work: Dispatch) {
    let Dispatch {
        request,
        frame,
        mut caller,
        candidates,
        retry_predicate,
        metrics,
        session,
    } = work;

    metrics.inc_total_dispatches();
    let started = Instant::now();

    if candidates.is_empty() {
        warn!("dispatch attempted with no candidate connections");
        reply(caller, Err(SessionError::NoConnectionsAvailable));
        metrics.inc_failed_dispatches();
        return;
    }

    let mut last_err = None;
    for (attempt, (host, conn)) in candidates.iter().enumerate() {
        match conn.roundtrip(frame.clone()).await {
            Ok(reply_bytes) => {
                metrics.log_dispatch_latency(started.elapsed());
                if let Request::Prepare { .. } = &request {
                    let fingerprint = Fingerprint::of_encoded_prepare(&frame);
                    let prepared = PreparedStatement::new(reply_bytes.clone());
                    session.notify_prepared(*host, fingerprint, prepared);
                    // The original `prepare()` caller is answered by the
                    // `prepared` event handler inside the Session, not here.
                } else {
                    reply(caller, Ok(reply_bytes));
                    caller = None;
                }
                return;
            }
            Err(e) => {
                debug!(%host, attempt, error = %e, "dispatch attempt failed");
                last_err = Some(e);
                if attempt + 1 < candidates.len() && retry_predicate.should_retry(&request) {
                    metrics.inc_retries();
                    continue;
                } else {
                    break;
                }
            }
        }
    }

    metrics.inc_failed_dispatches();
    let err = last_err.expect("loop body always sets last_err before breaking on failure");
    reply(caller, Err(SessionError::Connection(err)));
}

fn reply(caller: Option<oneshot::Sender<Result<Bytes, SessionError>>>, result: Result<Bytes, SessionError>) {
    if let Some(tx) = caller {
        let _ = tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::query_params::QueryParams;
    use crate::transport::connection::LoopbackConnection;
    use crate::transport::retry_policy::AlwaysRetry;
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn addr(port: u16) -> HostId {
        HostId(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    /// A `SessionHandle` with no actor behind it. Fine for these tests:
    /// only `Request::Prepare` dispatch would ever call back into it, and
    /// none of the cases here exercise that path.
    fn detached_session() -> SessionHandle {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        SessionHandle::for_test(tx)
    }

    #[tokio::test]
    async fn successful_query_replies_to_caller() {
        let session = detached_session();
        let conn = Arc::new(LoopbackConnection::spawn_echoing());
        let (tx, rx) = oneshot::channel();
        dispatch(Dispatch {
            request: Request::Query {
                text: Arc::from("SELECT 1"),
                params: QueryParams::new(),
            },
            frame: Bytes::from_static(b"frame"),
            caller: Some(tx),
            candidates: vec![(addr(1), conn)],
            retry_predicate: Arc::new(AlwaysRetry),
            metrics: Arc::new(Metrics::new()),
            session,
        });

        let reply = rx.await.unwrap().unwrap();
        assert_eq!(reply, Bytes::from_static(b"frame"));
    }

    #[tokio::test]
    async fn exhausted_candidates_surface_last_error() {
        let session = detached_session();
        let failing = Arc::new(LoopbackConnection::spawn_failing());
        let (tx, rx) = oneshot::channel();
        dispatch(Dispatch {
            request: Request::Query {
                text: Arc::from("SELECT 1"),
                params: QueryParams::new(),
            },
            frame: Bytes::from_static(b"frame"),
            caller: Some(tx),
            candidates: vec![(addr(1), failing)],
            retry_predicate: Arc::new(AlwaysRetry),
            metrics: Arc::new(Metrics::new()),
            session,
        });

        let reply = rx.await.unwrap();
        assert!(reply.is_err());
    }

    #[tokio::test]
    async fn retries_next_candidate_after_failure() {
        let session = detached_session();
        let failing = Arc::new(LoopbackConnection::spawn_failing());
        let echoing = Arc::new(LoopbackConnection::spawn_echoing());
        let (tx, rx) = oneshot::channel();
        dispatch(Dispatch {
            request: Request::Query {
                text: Arc::from("SELECT 1"),
                params: QueryParams::new(),
            },
            frame: Bytes::from_static(b"frame"),
            caller: Some(tx),
            candidates: vec![(addr(1), failing), (addr(2), echoing)],
            retry_predicate: Arc::new(AlwaysRetry),
            metrics: Arc::new(Metrics::new()),
            session,
        });

        let reply = rx.await.unwrap().unwrap();
        assert_eq!(reply, Bytes::from_static(b"frame"));
    }
}
