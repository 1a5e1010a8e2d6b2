//! Session core for a Cassandra/CQL client driver.
//!
//! [`Session`](transport::session::Session) multiplexes `query`/`prepare`/`execute`
//! calls from client code across a load-balanced pool of connections to cluster
//! nodes, maintaining a per-host prepared-statement cache and retrying failed
//! dispatches across candidate connections.

pub mod cluster;
pub mod statement;
pub mod transport;

pub use statement::consistency::Consistency;
pub use statement::prepared_statement::{PreparedHandle, PreparedStatement};
pub use statement::query_params::{QueryParams, Statement};
pub use transport::errors::{ConnectionFailure, EncodeError, NewSessionError, SessionError};
pub use transport::host::HostId;
pub use transport::session::{Session, SessionHandle};
pub use transport::session_builder::SessionBuilder;
