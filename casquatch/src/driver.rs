use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use scylla::client::session::Session;
use scylla::value::CqlValue;
use tracing::{debug, info};

use crate::config::DriverSettings;
use crate::database::connection::{all_rows, first_row, row_count};
use crate::database::{ConsistencyResolver, QueryBuilder, ScyllaConnection, TableConsistency};
use crate::errors::DriverError;
use crate::mapping::{Entity, Key};
use crate::metrics;
use crate::operation::OperationHandle;
use crate::types::{ConsistencyLevel, TableConfig};

const CQL_LABEL: &str = "cql";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DriverStats {
    pub reads: u64,
    pub writes: u64,
    pub deletes: u64,
    pub executes: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Copy)]
enum OperationKind {
    Read,
    Write,
    Delete,
    Execute,
}

/// Object-mapping façade over a CQL session.
///
/// Cloning is cheap: clones share the session, statement cache and
/// consistency cache.
#[derive(Clone)]
pub struct CassandraDriver {
    connection: Arc<ScyllaConnection>,
    consistency: Arc<ConsistencyResolver>,
    stats: Arc<Mutex<DriverStats>>,
}

impl CassandraDriver {
    pub fn builder() -> CassandraDriverBuilder {
        CassandraDriverBuilder::new()
    }

    /// Connect with settings that were already validated by the builder
    pub async fn connect(settings: DriverSettings) -> Result<Self, DriverError> {
        settings.validate()?;
        let connection = ScyllaConnection::new(&settings).await?;

        let consistency = ConsistencyResolver::new(
            settings.driver_config,
            &settings.local_dc,
            TableConsistency {
                read: settings.read_consistency,
                write: settings.write_consistency,
            },
            settings.driver_config_ttl(),
        );

        if settings.driver_config {
            info!("Per-table consistency enabled from {}", TableConfig::TABLE.name);
        }

        Ok(Self {
            connection: Arc::new(connection),
            consistency: Arc::new(consistency),
            stats: Arc::new(Mutex::new(DriverStats::default())),
        })
    }

    pub fn settings(&self) -> &DriverSettings {
        self.connection.settings()
    }

    pub fn get_session(&self) -> &Session {
        self.connection.get_session()
    }

    pub fn stats(&self) -> DriverStats {
        self.stats.lock().clone()
    }

    /// Number of distinct statements prepared on this session so far
    pub fn prepared_statements(&self) -> usize {
        self.connection.prepared_count()
    }

    /// Run a statement verbatim, e.g. schema DDL
    pub async fn execute(&self, cql: &str) -> Result<(), DriverError> {
        let start = Instant::now();
        debug!("Executing: {}", cql);
        let result = self
            .connection
            .execute_simple(cql, self.consistency.defaults().write)
            .await
            .map(|_| ());
        self.finish("execute", CQL_LABEL, OperationKind::Execute, start, &result);
        result
    }

    /// Run a query verbatim at `T`'s read consistency and map its first row
    pub async fn execute_one<T: Entity>(&self, cql: &str) -> Result<Option<T>, DriverError> {
        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let result = match self.connection.execute_simple(cql, consistency.read).await {
            Ok(rows) => first_row(rows),
            Err(e) => Err(e),
        };
        self.finish("execute_one", T::TABLE.name, OperationKind::Read, start, &result);
        result
    }

    /// Run a query verbatim at `T`'s read consistency and map every row
    pub async fn execute_all<T: Entity>(&self, cql: &str) -> Result<Vec<T>, DriverError> {
        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let result = match self.connection.execute_simple(cql, consistency.read).await {
            Ok(rows) => all_rows(rows),
            Err(e) => Err(e),
        };
        self.finish("execute_all", T::TABLE.name, OperationKind::Read, start, &result);
        result
    }

    pub async fn save<T: Entity>(&self, entity: &T) -> Result<(), DriverError> {
        let start = Instant::now();
        let result = self.save_inner(entity).await;
        self.finish("save", T::TABLE.name, OperationKind::Write, start, &result);
        result
    }

    async fn save_inner<T: Entity>(&self, entity: &T) -> Result<(), DriverError> {
        let consistency = self.table_consistency::<T>().await;
        let query = QueryBuilder::build_insert_query(&T::TABLE);
        self.connection
            .execute_prepared(&query, entity, consistency.write)
            .await?;
        Ok(())
    }

    /// Save every entity in one logged batch
    pub async fn save_all<T: Entity>(&self, entities: &[T]) -> Result<(), DriverError> {
        if entities.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let query = QueryBuilder::build_insert_query(&T::TABLE);
        let values: Vec<&T> = entities.iter().collect();
        let result = self
            .connection
            .execute_batch(&query, values.len(), values, consistency.write)
            .await;
        self.finish("save_all", T::TABLE.name, OperationKind::Write, start, &result);
        result
    }

    /// Save in the background; await the handle to observe the outcome
    pub fn save_async<T: Entity>(&self, entity: T) -> OperationHandle {
        let driver = self.clone();
        OperationHandle::spawn("save_async", T::TABLE.name, async move {
            driver.save(&entity).await
        })
    }

    pub async fn delete<T: Entity>(&self, key: &Key) -> Result<(), DriverError> {
        let start = Instant::now();
        let result = self.delete_inner::<T>(key).await;
        self.finish("delete", T::TABLE.name, OperationKind::Delete, start, &result);
        result
    }

    async fn delete_inner<T: Entity>(&self, key: &Key) -> Result<(), DriverError> {
        T::TABLE.check_full_key(key)?;
        let consistency = self.table_consistency::<T>().await;
        let query = QueryBuilder::build_delete_query(&T::TABLE);
        self.connection
            .execute_prepared(&query, key.values(), consistency.write)
            .await?;
        Ok(())
    }

    /// Delete every key in one logged batch
    pub async fn delete_all<T: Entity>(&self, keys: &[Key]) -> Result<(), DriverError> {
        if keys.is_empty() {
            return Ok(());
        }
        for key in keys {
            T::TABLE.check_full_key(key)?;
        }

        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let query = QueryBuilder::build_delete_query(&T::TABLE);
        let values: Vec<&[CqlValue]> = keys.iter().map(Key::values).collect();
        let result = self
            .connection
            .execute_batch(&query, values.len(), values, consistency.write)
            .await;
        self.finish("delete_all", T::TABLE.name, OperationKind::Delete, start, &result);
        result
    }

    /// Delete in the background; await the handle to observe the outcome
    pub fn delete_async<T: Entity>(&self, key: Key) -> OperationHandle {
        let driver = self.clone();
        OperationHandle::spawn("delete_async", T::TABLE.name, async move {
            driver.delete::<T>(&key).await
        })
    }

    /// Look up one row by its full primary key
    pub async fn get_by_id<T: Entity>(&self, key: &Key) -> Result<Option<T>, DriverError> {
        T::TABLE.check_full_key(key)?;
        let query = QueryBuilder::build_select_by_key(&T::TABLE, key.len(), None);
        self.read_one::<T>("get_by_id", &query, key).await
    }

    /// First row matching a partition key and optional clustering prefix
    pub async fn get_one_by_id<T: Entity>(&self, key: &Key) -> Result<Option<T>, DriverError> {
        T::TABLE.check_partial_key(key)?;
        let query = QueryBuilder::build_select_by_key(&T::TABLE, key.len(), Some(1));
        self.read_one::<T>("get_one_by_id", &query, key).await
    }

    /// Every row matching a partition key and optional clustering prefix
    pub async fn get_all_by_id<T: Entity>(&self, key: &Key) -> Result<Vec<T>, DriverError> {
        T::TABLE.check_partial_key(key)?;
        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let query = QueryBuilder::build_select_by_key(&T::TABLE, key.len(), None);
        let result = match self
            .connection
            .execute_prepared(&query, key.values(), consistency.read)
            .await
        {
            Ok(rows) => all_rows(rows),
            Err(e) => Err(e),
        };
        self.finish("get_all_by_id", T::TABLE.name, OperationKind::Read, start, &result);
        result
    }

    pub async fn exists_by_id<T: Entity>(&self, key: &Key) -> Result<bool, DriverError> {
        T::TABLE.check_full_key(key)?;
        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let query = QueryBuilder::build_exists_query(&T::TABLE);
        let result = match self
            .connection
            .execute_prepared(&query, key.values(), consistency.read)
            .await
        {
            Ok(rows) => row_count(rows).map(|count| count > 0),
            Err(e) => Err(e),
        };
        self.finish("exists_by_id", T::TABLE.name, OperationKind::Read, start, &result);
        result
    }

    async fn read_one<T: Entity>(
        &self,
        operation: &'static str,
        query: &str,
        key: &Key,
    ) -> Result<Option<T>, DriverError> {
        let start = Instant::now();
        let consistency = self.table_consistency::<T>().await;
        let result = match self
            .connection
            .execute_prepared(query, key.values(), consistency.read)
            .await
        {
            Ok(rows) => first_row(rows),
            Err(e) => Err(e),
        };
        self.finish(operation, T::TABLE.name, OperationKind::Read, start, &result);
        result
    }

    /// Consistency applied to reads and writes of `T`'s table
    pub async fn table_consistency<T: Entity>(&self) -> TableConsistency {
        self.consistency
            .resolve(T::TABLE.name, &*self.connection)
            .await
    }

    /// Store a `driver_config` row and drop cached lookups
    pub async fn save_table_config(&self, config: &TableConfig) -> Result<(), DriverError> {
        self.save(config).await?;
        self.consistency.invalidate();
        Ok(())
    }

    pub fn refresh_driver_config(&self) {
        self.consistency.invalidate();
    }

    pub async fn health_check(&self) -> Result<(), DriverError> {
        self.connection.health_check().await
    }

    /// Release this handle on the session. The session closes once every
    /// clone and pending async operation has finished with it.
    pub fn close(self) {
        let stats = self.stats();
        info!(
            "Closing driver for keyspace {} (reads: {}, writes: {}, deletes: {}, failures: {})",
            self.settings().keyspace,
            stats.reads,
            stats.writes,
            stats.deletes,
            stats.failures
        );
    }

    fn finish<T>(
        &self,
        operation: &'static str,
        table: &str,
        kind: OperationKind,
        start: Instant,
        result: &Result<T, DriverError>,
    ) {
        let success = result.is_ok();
        metrics::record_operation(operation, table, success, start.elapsed());

        let mut stats = self.stats.lock();
        match kind {
            OperationKind::Read => stats.reads += 1,
            OperationKind::Write => stats.writes += 1,
            OperationKind::Delete => stats.deletes += 1,
            OperationKind::Execute => stats.executes += 1,
        }
        if !success {
            stats.failures += 1;
        }
    }
}

/// Collects [`DriverSettings`]; `build` validates, `connect` also opens the
/// session. Local data center and keyspace are required.
#[derive(Debug, Clone, Default)]
pub struct CassandraDriverBuilder {
    settings: DriverSettings,
}

impl CassandraDriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: DriverSettings) -> Self {
        Self { settings }
    }

    pub fn with_contact_points<I, S>(mut self, contact_points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.contact_points = contact_points.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.settings.port = port;
        self
    }

    pub fn with_local_dc(mut self, local_dc: impl Into<String>) -> Self {
        self.settings.local_dc = local_dc.into();
        self
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.settings.keyspace = keyspace.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.settings.username = Some(username.into());
        self.settings.password = Some(password.into());
        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.settings.pool_size = pool_size;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.settings.connection_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.settings.read_consistency = level;
        self
    }

    pub fn with_write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.settings.write_consistency = level;
        self
    }

    /// Resolve consistency per table from the `driver_config` table
    pub fn with_driver_config(mut self, enabled: bool) -> Self {
        self.settings.driver_config = enabled;
        self
    }

    pub fn with_driver_config_ttl(mut self, ttl: Duration) -> Self {
        self.settings.driver_config_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_speculative_execution(mut self, delay: Duration) -> Self {
        self.settings.speculative_execution = true;
        self.settings.speculative_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn build(self) -> Result<DriverSettings, DriverError> {
        self.settings.validate()?;
        Ok(self.settings)
    }

    pub async fn connect(self) -> Result<CassandraDriver, DriverError> {
        let settings = self.build()?;
        CassandraDriver::connect(settings).await
    }
}
