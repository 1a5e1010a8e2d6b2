use std::fmt;

use crate::transport::request::Request;

/// Consulted by the Worker after a [`ConnectionFailure`](crate::ConnectionFailure)
/// to decide whether to try the next candidate connection.
///
/// Runs in Worker context and must not touch Session state. CQL-protocol
/// errors (`CqlError`) are never passed through this predicate -- they're
/// surfaced to the caller directly, since the server answered and retrying
/// the same request would just get the same answer.
pub trait RetryPredicate: fmt::Debug + Send + Sync {
    fn should_retry(&self, request: &Request) -> bool;
}

/// Retries every request across every remaining candidate. This is the
/// default -- safe because the only requests that reach the worker are
/// ones the caller already chose to send, and a connection failure says
/// nothing about whether the request itself was idempotent.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysRetry;

impl RetryPredicate for AlwaysRetry {
    fn should_retry(&self, _request: &Request) -> bool {
        true
    }
}

/// Only retries requests the caller has marked idempotent -- a safer choice
/// once writes are in the mix, since blindly retrying a non-idempotent
/// write after an ambiguous failure can apply it twice.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdempotentOnlyRetry;

impl RetryPredicate for IdempotentOnlyRetry {
    fn should_retry(&self, request: &Request) -> bool {
        request.is_idempotent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::query_params::QueryParams;
    use std::sync::Arc;

    fn query(is_idempotent: bool) -> Request {
        Request::Query {
            text: Arc::from("SELECT 1"),
            params: QueryParams {
                is_idempotent,
                ..QueryParams::new()
            },
        }
    }

    #[test]
    fn always_retry_retries_everything() {
        let policy = AlwaysRetry;
        assert!(policy.should_retry(&query(false)));
        assert!(policy.should_retry(&query(true)));
    }

    #[test]
    fn idempotent_only_skips_non_idempotent_requests() {
        let policy = IdempotentOnlyRetry;
        assert!(!policy.should_retry(&query(false)));
        assert!(policy.should_retry(&query(true)));
    }

    #[test]
    fn idempotent_only_always_retries_prepare() {
        let policy = IdempotentOnlyRetry;
        let prepare = Request::Prepare {
            text: Arc::from("SELECT 1"),
        };
        assert!(policy.should_retry(&prepare));
    }
}
