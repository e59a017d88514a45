//! # casquatch
//!
//! Object-mapping driver for Apache Cassandra and ScyllaDB, built on the
//! `scylla` CQL driver.
//!
//! A row type derives the driver's row (de)serialization and implements
//! [`Entity`] to describe its table. The [`CassandraDriver`] then saves,
//! deletes and looks rows up by key, with per-table consistency optionally
//! read from the `driver_config` table.
//!
//! ```rust,no_run
//! use casquatch::{CassandraDriver, Entity, Key, TableMeta};
//! use scylla::value::CqlValue;
//! use scylla::{DeserializeRow, SerializeRow};
//!
//! #[derive(Debug, Clone, PartialEq, SerializeRow, DeserializeRow)]
//! struct TableName {
//!     key_one: i32,
//!     key_two: i32,
//!     col_one: Option<String>,
//!     col_two: Option<String>,
//! }
//!
//! impl Entity for TableName {
//!     const TABLE: TableMeta = TableMeta {
//!         name: "table_name",
//!         partition_keys: &["key_one"],
//!         clustering_keys: &["key_two"],
//!         columns: &["key_one", "key_two", "col_one", "col_two"],
//!     };
//!
//!     fn key(&self) -> Key {
//!         Key::new()
//!             .with(CqlValue::Int(self.key_one))
//!             .with(CqlValue::Int(self.key_two))
//!     }
//! }
//!
//! # async fn run() -> Result<(), casquatch::DriverError> {
//! let db = CassandraDriver::builder()
//!     .with_local_dc("datacenter1")
//!     .with_keyspace("junitTest")
//!     .connect()
//!     .await?;
//!
//! let row = TableName {
//!     key_one: 1,
//!     key_two: 1,
//!     col_one: Some("ColumnOne".into()),
//!     col_two: Some("ColumnTwo".into()),
//! };
//! db.save(&row).await?;
//! assert_eq!(db.get_by_id::<TableName>(&row.key()).await?, Some(row.clone()));
//!
//! db.delete_async::<TableName>(row.key()).wait().await?;
//! assert!(!db.exists_by_id::<TableName>(&row.key()).await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod driver;
pub mod errors;
pub mod mapping;
pub mod metrics;
pub mod operation;
pub mod types;

pub use config::{load_config, CasquatchConfig, DriverSettings, ObservabilityConfig};
pub use database::TableConsistency;
pub use driver::{CassandraDriver, CassandraDriverBuilder, DriverStats};
pub use errors::DriverError;
pub use mapping::{Entity, Key, TableMeta};
pub use operation::OperationHandle;
pub use types::{ConsistencyLevel, TableConfig};
