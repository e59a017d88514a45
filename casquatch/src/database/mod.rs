pub mod connection;
pub mod consistency;
pub mod query_builder;

pub use connection::ScyllaConnection;
pub use consistency::{ConsistencyResolver, TableConfigSource, TableConsistency};
pub use query_builder::{split_statements, QueryBuilder};
