use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::errors::DriverError;
use crate::mapping::Entity;
use crate::types::{ConsistencyLevel, TableConfig};

/// Where `driver_config` rows come from
#[async_trait]
pub trait TableConfigSource: Send + Sync {
    async fn load_table_config(&self, table: &str) -> Result<Option<TableConfig>, DriverError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConsistency {
    pub read: ConsistencyLevel,
    pub write: ConsistencyLevel,
}

#[derive(Debug, Clone, Copy)]
struct CachedConsistency {
    value: TableConsistency,
    loaded_at: Instant,
}

/// Resolves read/write consistency per table.
///
/// Precedence: the table's own `driver_config` row, then the `default` row,
/// then the configured defaults. Rows scoped to another data center are
/// ignored. Results are cached per table for `ttl`.
pub struct ConsistencyResolver {
    enabled: bool,
    local_dc: String,
    defaults: TableConsistency,
    ttl: Duration,
    cache: DashMap<String, CachedConsistency>,
}

impl ConsistencyResolver {
    pub fn new(enabled: bool, local_dc: &str, defaults: TableConsistency, ttl: Duration) -> Self {
        Self {
            enabled,
            local_dc: local_dc.to_string(),
            defaults,
            ttl,
            cache: DashMap::new(),
        }
    }

    pub fn defaults(&self) -> TableConsistency {
        self.defaults
    }

    pub async fn resolve(&self, table: &str, source: &dyn TableConfigSource) -> TableConsistency {
        if !self.enabled || table == TableConfig::TABLE.name {
            return self.defaults;
        }

        if let Some(cached) = self.cache.get(table).map(|entry| *entry) {
            if cached.loaded_at.elapsed() < self.ttl {
                return cached.value;
            }
        }

        let mut resolved = self.defaults;
        let mut complete = true;

        let lookups = if table == TableConfig::DEFAULT_TABLE {
            vec![table]
        } else {
            vec![TableConfig::DEFAULT_TABLE, table]
        };

        for lookup in lookups {
            match source.load_table_config(lookup).await {
                Ok(Some(row)) if row.applies_to(&self.local_dc) => {
                    resolved = self.overlay(resolved, &row);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to load driver_config for {}: {}", lookup, e);
                    complete = false;
                }
            }
        }

        debug!(
            "Resolved consistency for {}: read={}, write={}",
            table, resolved.read, resolved.write
        );

        if complete {
            self.cache.insert(
                table.to_string(),
                CachedConsistency {
                    value: resolved,
                    loaded_at: Instant::now(),
                },
            );
        }
        resolved
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }

    fn overlay(&self, base: TableConsistency, row: &TableConfig) -> TableConsistency {
        TableConsistency {
            read: parse_or(row.read_consistency.as_deref(), base.read, &row.table_name),
            write: parse_or(row.write_consistency.as_deref(), base.write, &row.table_name),
        }
    }
}

fn parse_or(value: Option<&str>, fallback: ConsistencyLevel, table: &str) -> ConsistencyLevel {
    match value {
        None => fallback,
        Some(raw) if raw.trim().is_empty() => fallback,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Ignoring driver_config consistency for {}: {}", table, e);
            fallback
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        rows: HashMap<String, TableConfig>,
        lookups: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeSource {
        fn with(mut self, row: TableConfig) -> Self {
            self.rows.insert(row.table_name.clone(), row);
            self
        }

        fn lookups(&self) -> usize {
            self.lookups.lock().len()
        }
    }

    #[async_trait]
    impl TableConfigSource for FakeSource {
        async fn load_table_config(&self, table: &str) -> Result<Option<TableConfig>, DriverError> {
            self.lookups.lock().push(table.to_string());
            if self.fail {
                return Err(DriverError::Database("unavailable".to_string()));
            }
            Ok(self.rows.get(table).cloned())
        }
    }

    const DEFAULTS: TableConsistency = TableConsistency {
        read: ConsistencyLevel::LocalOne,
        write: ConsistencyLevel::LocalQuorum,
    };

    fn resolver(enabled: bool) -> ConsistencyResolver {
        ConsistencyResolver::new(enabled, "dc1", DEFAULTS, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_disabled_uses_defaults_without_lookup() {
        let source = FakeSource::default().with(
            TableConfig::new("table_name", "junit").with_read_consistency(ConsistencyLevel::All),
        );

        assert_eq!(resolver(false).resolve("table_name", &source).await, DEFAULTS);
        assert_eq!(source.lookups(), 0);
    }

    #[tokio::test]
    async fn test_table_row_overrides_default_row() {
        let source = FakeSource::default()
            .with(
                TableConfig::new("default", "junit")
                    .with_read_consistency(ConsistencyLevel::Quorum)
                    .with_write_consistency(ConsistencyLevel::Quorum),
            )
            .with(
                TableConfig::new("table_name", "junit")
                    .with_write_consistency(ConsistencyLevel::All),
            );

        let resolved = resolver(true).resolve("table_name", &source).await;
        assert_eq!(resolved.read, ConsistencyLevel::Quorum);
        assert_eq!(resolved.write, ConsistencyLevel::All);
    }

    #[tokio::test]
    async fn test_rows_for_other_data_center_are_ignored() {
        let source = FakeSource::default().with(
            TableConfig::new("table_name", "junit")
                .with_data_center("dc2")
                .with_read_consistency(ConsistencyLevel::All),
        );

        assert_eq!(resolver(true).resolve("table_name", &source).await, DEFAULTS);
    }

    #[tokio::test]
    async fn test_unparseable_value_falls_back() {
        let mut row = TableConfig::new("table_name", "junit");
        row.read_consistency = Some("SOMETIMES".to_string());
        row.write_consistency = Some("each-quorum".to_string());
        let source = FakeSource::default().with(row);

        let resolved = resolver(true).resolve("table_name", &source).await;
        assert_eq!(resolved.read, ConsistencyLevel::LocalOne);
        assert_eq!(resolved.write, ConsistencyLevel::EachQuorum);
    }

    #[tokio::test]
    async fn test_results_are_cached_until_invalidated() {
        let source = FakeSource::default();
        let resolver = resolver(true);

        resolver.resolve("table_name", &source).await;
        resolver.resolve("table_name", &source).await;
        assert_eq!(source.lookups(), 2);

        resolver.invalidate();
        resolver.resolve("table_name", &source).await;
        assert_eq!(source.lookups(), 4);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_cached() {
        let source = FakeSource { fail: true, ..Default::default() };
        let resolver = resolver(true);

        assert_eq!(resolver.resolve("table_name", &source).await, DEFAULTS);
        resolver.resolve("table_name", &source).await;
        assert_eq!(source.lookups(), 4);
    }

    #[tokio::test]
    async fn test_driver_config_table_is_never_looked_up() {
        let source = FakeSource::default();
        assert_eq!(resolver(true).resolve("driver_config", &source).await, DEFAULTS);
        assert_eq!(source.lookups(), 0);
    }
}
