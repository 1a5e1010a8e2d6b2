pub mod consistency;
pub mod prepared_statement;
pub mod query_params;

pub use consistency::Consistency;
pub use prepared_statement::{PreparedHandle, PreparedStatement};
pub use query_params::{QueryParams, Statement, ToValues};
