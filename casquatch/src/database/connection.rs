use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::client::PoolSize;
use scylla::policies::load_balancing::DefaultPolicy;
use scylla::policies::speculative_execution::{
    SimpleSpeculativeExecutionPolicy, SpeculativeExecutionPolicy,
};
use scylla::response::query_result::QueryResult;
use scylla::serialize::batch::BatchValues;
use scylla::serialize::row::SerializeRow;
use scylla::statement::batch::{Batch, BatchType};
use scylla::statement::prepared::PreparedStatement;
use scylla::statement::unprepared::Statement;
use tracing::{debug, error, info};

use super::consistency::TableConfigSource;
use super::query_builder::QueryBuilder;
use crate::config::DriverSettings;
use crate::errors::DriverError;
use crate::mapping::Entity;
use crate::types::{ConsistencyLevel, TableConfig};

/// ScyllaDB/Cassandra session wrapper with a prepared statement cache
pub struct ScyllaConnection {
    session: Arc<Session>,
    settings: DriverSettings,
    prepared: DashMap<String, PreparedStatement>,
}

impl ScyllaConnection {
    /// Connect to the cluster described by already validated settings
    pub async fn new(settings: &DriverSettings) -> Result<Self, DriverError> {
        let known_nodes = settings.known_nodes();
        info!(
            "Connecting to Cassandra cluster {:?} (local DC: {}, keyspace: {})",
            known_nodes, settings.local_dc, settings.keyspace
        );

        let load_balancing = DefaultPolicy::builder()
            .prefer_datacenter(settings.local_dc.clone())
            .token_aware(true)
            .permit_dc_failover(false)
            .build();

        let mut profile = ExecutionProfile::builder()
            .load_balancing_policy(load_balancing)
            .consistency(settings.read_consistency.to_scylla())
            .request_timeout(Some(settings.request_timeout()));

        if settings.speculative_execution {
            info!("Speculative execution enabled (delay: {}ms)", settings.speculative_delay_ms);
            let policy: Arc<dyn SpeculativeExecutionPolicy> =
                Arc::new(SimpleSpeculativeExecutionPolicy {
                    max_retry_count: 2,
                    retry_interval: Duration::from_millis(settings.speculative_delay_ms),
                });
            profile = profile.speculative_execution_policy(Some(policy));
        }

        let pool_size = NonZeroUsize::new(settings.pool_size as usize)
            .ok_or_else(|| DriverError::Config("pool size must be non-zero".to_string()))?;

        let mut session_builder = SessionBuilder::new()
            .known_nodes(&known_nodes)
            .connection_timeout(settings.connection_timeout())
            .pool_size(PoolSize::PerHost(pool_size))
            .default_execution_profile_handle(profile.build().into_handle())
            .use_keyspace(&settings.keyspace, false);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            session_builder = session_builder.user(username, password);
        }

        let session = session_builder.build().await.map_err(|e| {
            error!("Failed to connect to Cassandra: {}", e);
            DriverError::Database(format!("Connection failed: {}", e))
        })?;

        info!("Successfully connected to keyspace: {}", settings.keyspace);

        Ok(Self {
            session: Arc::new(session),
            settings: settings.clone(),
            prepared: DashMap::new(),
        })
    }

    /// Get the underlying session
    pub fn get_session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    /// Prepare a statement, reusing the cached one for identical CQL
    pub async fn prepare(&self, query: &str) -> Result<PreparedStatement, DriverError> {
        if let Some(statement) = self.prepared.get(query) {
            return Ok(statement.clone());
        }

        debug!("Preparing statement: {}", query);
        let statement = self
            .session
            .prepare(query)
            .await
            .map_err(|e| DriverError::Database(format!("Failed to prepare statement: {}", e)))?;

        self.prepared.insert(query.to_string(), statement.clone());
        Ok(statement)
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.len()
    }

    /// Execute CQL verbatim without bind values
    pub async fn execute_simple(
        &self,
        query: &str,
        consistency: ConsistencyLevel,
    ) -> Result<QueryResult, DriverError> {
        let mut statement = Statement::new(query);
        statement.set_consistency(consistency.to_scylla());

        self.session
            .query_unpaged(statement, ())
            .await
            .map_err(|e| DriverError::Database(format!("Query execution failed: {}", e)))
    }

    /// Prepare (or reuse) `query` and execute it with `values`
    pub async fn execute_prepared<V: SerializeRow>(
        &self,
        query: &str,
        values: V,
        consistency: ConsistencyLevel,
    ) -> Result<QueryResult, DriverError> {
        let mut statement = self.prepare(query).await?;
        statement.set_consistency(consistency.to_scylla());

        self.session
            .execute_unpaged(&statement, values)
            .await
            .map_err(|e| DriverError::Database(format!("Query execution failed: {}", e)))
    }

    /// Run `query` once per entry of `values` inside one LOGGED batch
    pub async fn execute_batch<V: BatchValues>(
        &self,
        query: &str,
        count: usize,
        values: V,
        consistency: ConsistencyLevel,
    ) -> Result<(), DriverError> {
        let statement = self.prepare(query).await?;

        let mut batch = Batch::new(BatchType::Logged);
        for _ in 0..count {
            batch.append_statement(statement.clone());
        }
        batch.set_consistency(consistency.to_scylla());

        self.session
            .batch(&batch, values)
            .await
            .map_err(|e| DriverError::Database(format!("Batch execution failed: {}", e)))?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), DriverError> {
        self.execute_simple("SELECT now() FROM system.local", self.settings.read_consistency)
            .await
            .map_err(|e| DriverError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl TableConfigSource for ScyllaConnection {
    async fn load_table_config(&self, table: &str) -> Result<Option<TableConfig>, DriverError> {
        let query = QueryBuilder::build_select_by_key(&TableConfig::TABLE, 1, None);
        let result = self
            .execute_prepared(&query, (table,), self.settings.read_consistency)
            .await?;
        first_row(result)
    }
}

/// Map every row of a result set
pub fn all_rows<T: Entity>(result: QueryResult) -> Result<Vec<T>, DriverError> {
    let rows = result
        .into_rows_result()
        .map_err(|e| DriverError::Mapping(format!("Expected rows in result: {}", e)))?;

    rows.rows::<T>()
        .map_err(|e| {
            DriverError::Mapping(format!("Row type mismatch for {}: {}", T::TABLE.name, e))
        })?
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| DriverError::Mapping(format!("Failed to map {} row: {}", T::TABLE.name, e)))
}

/// Map the first row of a result set, if any
pub fn first_row<T: Entity>(result: QueryResult) -> Result<Option<T>, DriverError> {
    let rows = result
        .into_rows_result()
        .map_err(|e| DriverError::Mapping(format!("Expected rows in result: {}", e)))?;

    rows.maybe_first_row::<T>()
        .map_err(|e| DriverError::Mapping(format!("Failed to map {} row: {}", T::TABLE.name, e)))
}

/// Number of rows in a result set
pub fn row_count(result: QueryResult) -> Result<usize, DriverError> {
    let rows = result
        .into_rows_result()
        .map_err(|e| DriverError::Mapping(format!("Expected rows in result: {}", e)))?;
    Ok(rows.rows_num())
}
