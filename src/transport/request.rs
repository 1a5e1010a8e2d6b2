use std::sync::Arc;

use bytes::Bytes;

use crate::statement::query_params::QueryParams;
use crate::transport::fingerprint::Fingerprint;

/// The three CQL request variants the session core dispatches. Framing and
/// serialization of the variant into wire bytes is the codec's job; this
/// enum only carries what the Session, LoadBalancer and retry predicate
/// need to reason about the request.
#[derive(Debug, Clone)]
pub enum Request {
    Query { text: Arc<str>, params: QueryParams },
    Prepare { text: Arc<str> },
    Execute {
        fingerprint: Fingerprint,
        statement_id: Bytes,
        params: QueryParams,
    },
}

impl Request {
    pub fn is_idempotent(&self) -> bool {
        match self {
            Request::Query { params, .. } | Request::Execute { params, .. } => {
                params.is_idempotent
            }
            // PREPARE has no observable side effect on data, it's always
            // safe to send to more than one candidate.
            Request::Prepare { .. } => true,
        }
    }
}
