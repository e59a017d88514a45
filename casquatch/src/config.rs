use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::DriverError;
use crate::types::ConsistencyLevel;

/// Connection and mapping settings for [`crate::CassandraDriver`].
///
/// An empty `local_dc` or `keyspace` counts as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub contact_points: Vec<String>,
    pub port: u16,
    pub local_dc: String,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool_size: u32,
    pub connection_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub read_consistency: ConsistencyLevel,
    pub write_consistency: ConsistencyLevel,
    pub driver_config: bool,
    pub driver_config_ttl_secs: u64,
    pub speculative_execution: bool,
    pub speculative_delay_ms: u64,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            contact_points: vec!["localhost".to_string()],
            port: 9042,
            local_dc: String::new(),
            keyspace: String::new(),
            username: None,
            password: None,
            pool_size: 4,
            connection_timeout_ms: 5_000,
            request_timeout_ms: 10_000,
            read_consistency: ConsistencyLevel::LocalOne,
            write_consistency: ConsistencyLevel::LocalQuorum,
            driver_config: false,
            driver_config_ttl_secs: 60,
            speculative_execution: false,
            speculative_delay_ms: 50,
        }
    }
}

impl DriverSettings {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.keyspace.trim().is_empty() {
            return Err(DriverError::Config("keyspace is required".to_string()));
        }
        if self.local_dc.trim().is_empty() {
            return Err(DriverError::Config("local data center is required".to_string()));
        }
        if self.contact_points.iter().all(|c| c.trim().is_empty()) {
            return Err(DriverError::Config("at least one contact point is required".to_string()));
        }
        if self.port == 0 {
            return Err(DriverError::Config("port must be non-zero".to_string()));
        }
        if self.pool_size == 0 {
            return Err(DriverError::Config("pool size must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Contact points as `host:port`, keeping any port already given.
    ///
    /// Bare IPv6 literals are bracketed: `::1` becomes `[::1]:9042`.
    pub fn known_nodes(&self) -> Vec<String> {
        self.contact_points
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(|c| self.with_port(c))
            .collect()
    }

    fn with_port(&self, contact_point: &str) -> String {
        if let Some(rest) = contact_point.strip_prefix('[') {
            return match rest.split_once(']') {
                Some((_, port)) if port.starts_with(':') => contact_point.to_string(),
                _ => format!("{}:{}", contact_point, self.port),
            };
        }
        match contact_point.matches(':').count() {
            0 => format!("{}:{}", contact_point, self.port),
            1 => contact_point.to_string(),
            _ => format!("[{}]:{}", contact_point, self.port),
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn driver_config_ttl(&self) -> Duration {
        Duration::from_secs(self.driver_config_ttl_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasquatchConfig {
    pub driver: DriverSettings,
    pub observability: ObservabilityConfig,
}

/// Load settings from `path`, overridden by `CASQUATCH_<SECTION>__<KEY>`
/// environment variables, and validate the driver section.
pub fn load_config(path: &str) -> Result<CasquatchConfig, DriverError> {
    let config = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("CASQUATCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("driver.contact_points")
                .try_parsing(true),
        )
        .build()?;

    let loaded: CasquatchConfig = config.try_deserialize()?;
    loaded.driver.validate()?;
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal() -> DriverSettings {
        DriverSettings {
            local_dc: "dc1".to_string(),
            keyspace: "junitTest".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_known_nodes_brackets_ipv6() {
        let settings = DriverSettings {
            contact_points: vec!["::1".into(), "[fe80::1]".into(), "[fe80::2]:19042".into()],
            ..minimal()
        };
        assert_eq!(
            settings.known_nodes(),
            vec!["[::1]:9042", "[fe80::1]:9042", "[fe80::2]:19042"]
        );
    }

    #[test]
    fn test_validate_requires_keyspace_and_dc() {
        assert!(DriverSettings::default().validate().is_err());
        let keyspace_only = DriverSettings {
            keyspace: "ks".into(),
            ..Default::default()
        };
        let dc_only = DriverSettings {
            local_dc: "dc1".into(),
            ..Default::default()
        };
        assert!(keyspace_only.validate().is_err());
        assert!(dc_only.validate().is_err());
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_degenerate_connection_settings() {
        assert!(DriverSettings { contact_points: vec![], ..minimal() }.validate().is_err());
        assert!(DriverSettings { port: 0, ..minimal() }.validate().is_err());
        assert!(DriverSettings { pool_size: 0, ..minimal() }.validate().is_err());
    }

    #[test]
    fn test_known_nodes_appends_port() {
        let settings = DriverSettings {
            contact_points: vec!["10.0.0.1".into(), "10.0.0.2:19042".into(), " ".into()],
            ..minimal()
        };
        assert_eq!(settings.known_nodes(), vec!["10.0.0.1:9042", "10.0.0.2:19042"]);
    }

    #[test]
    fn test_load_config_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "driver:\n  local_dc: dc1\n  keyspace: junitTest\n  write_consistency: ALL\n  \
             driver_config: true\nobservability:\n  log_level: debug\n"
        )
        .unwrap();

        let loaded = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(loaded.driver.keyspace, "junitTest");
        assert_eq!(loaded.driver.write_consistency, ConsistencyLevel::All);
        assert_eq!(loaded.driver.read_consistency, ConsistencyLevel::LocalOne);
        assert!(loaded.driver.driver_config);
        assert_eq!(loaded.driver.port, 9042);
        assert_eq!(loaded.observability.log_level, "debug");
    }

    #[test]
    fn test_load_config_rejects_missing_keyspace() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "driver:\n  local_dc: dc1\n").unwrap();

        let err = load_config(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }
}
