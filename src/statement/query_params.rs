use bytes::Bytes;

use crate::statement::consistency::Consistency;
use crate::statement::prepared_statement::PreparedHandle;
use crate::transport::errors::EncodeError;

/// Parameters attached to a `query`/`execute` call.
///
/// `values` is the one field that changes dispatch behaviour: an empty (or
/// absent) value list means "simple query", a non-empty one means
/// "prepare-then-execute".
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pub consistency: Consistency,
    pub serial_consistency: Option<Consistency>,
    pub page_size: Option<i32>,
    /// Opaque paging state, passed through to the codec unchanged. This
    /// crate does not orchestrate pagination itself.
    pub paging_state: Option<Bytes>,
    pub timestamp: Option<i64>,
    pub values: Vec<Bytes>,
    /// `true` if the caller knows this statement can be applied more than
    /// once without changing the result. Consulted by
    /// [`IdempotentOnlyRetry`](crate::transport::retry_policy::IdempotentOnlyRetry).
    pub is_idempotent: bool,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds params bound to `values`, accepting anything that implements
    /// [`ToValues`] (a `Vec<Bytes>`, a `&[Bytes]`, or `()` for no values).
    pub fn with_values(values: impl ToValues) -> Result<Self, EncodeError> {
        Ok(Self {
            values: values.serialized()?,
            ..Self::default()
        })
    }

    pub fn set_consistency(&mut self, c: Consistency) {
        self.consistency = c;
    }

    /// Whether this call should be routed as prepare-then-execute.
    pub fn is_prepared_execution(&self) -> bool {
        !self.values.is_empty()
    }
}

/// Either raw statement text or an already-obtained prepared handle.
///
/// `execute(text, params)` and `execute(handle, params)` are both valid:
/// the fingerprint of a given text is deterministic, so passing raw text
/// every time is fine, but callers that already hold a [`PreparedHandle`]
/// can skip recomputing it.
#[derive(Debug, Clone)]
pub enum Statement {
    Text(String),
    Prepared(PreparedHandle),
}

impl From<String> for Statement {
    fn from(s: String) -> Self {
        Statement::Text(s)
    }
}

impl<'a> From<&'a str> for Statement {
    fn from(s: &'a str) -> Self {
        Statement::Text(s.to_owned())
    }
}

impl From<PreparedHandle> for Statement {
    fn from(h: PreparedHandle) -> Self {
        Statement::Prepared(h)
    }
}

impl Statement {
    pub fn text(&self) -> &str {
        match self {
            Statement::Text(t) => t,
            Statement::Prepared(h) => h.text(),
        }
    }
}

/// Converts caller-supplied bound parameters into already-serialized values.
///
/// Actual CQL type serialization is the codec's job; this trait only covers
/// the session-facing ergonomics of accepting pre-serialized bytes in a few
/// common shapes.
pub trait ToValues {
    fn serialized(self) -> Result<Vec<Bytes>, EncodeError>;
}

impl ToValues for Vec<Bytes> {
    fn serialized(self) -> Result<Vec<Bytes>, EncodeError> {
        Ok(self)
    }
}

impl<'a> ToValues for &'a [Bytes] {
    fn serialized(self) -> Result<Vec<Bytes>, EncodeError> {
        Ok(self.to_vec())
    }
}

impl ToValues for () {
    fn serialized(self) -> Result<Vec<Bytes>, EncodeError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_is_simple_query() {
        let params = QueryParams::new();
        assert!(!params.is_prepared_execution());
    }

    #[test]
    fn non_empty_values_is_prepared_execution() {
        let params = QueryParams::with_values(vec![Bytes::from_static(b"1")]).unwrap();
        assert!(params.is_prepared_execution());
    }

    #[test]
    fn unit_values_is_simple_query() {
        let params = QueryParams::with_values(()).unwrap();
        assert!(!params.is_prepared_execution());
    }
}
