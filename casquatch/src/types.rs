use chrono::{DateTime, Utc};
use scylla::statement::Consistency;
use scylla::value::CqlValue;
use scylla::{DeserializeRow, SerializeRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DriverError;
use crate::mapping::{Entity, Key, TableMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
    Serial,
    LocalSerial,
}

impl ConsistencyLevel {
    pub fn to_scylla(self) -> Consistency {
        match self {
            ConsistencyLevel::Any => Consistency::Any,
            ConsistencyLevel::One => Consistency::One,
            ConsistencyLevel::Two => Consistency::Two,
            ConsistencyLevel::Three => Consistency::Three,
            ConsistencyLevel::Quorum => Consistency::Quorum,
            ConsistencyLevel::All => Consistency::All,
            ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
            ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
            ConsistencyLevel::LocalOne => Consistency::LocalOne,
            ConsistencyLevel::Serial => Consistency::Serial,
            ConsistencyLevel::LocalSerial => Consistency::LocalSerial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
            ConsistencyLevel::Serial => "SERIAL",
            ConsistencyLevel::LocalSerial => "LOCAL_SERIAL",
        }
    }
}

impl FromStr for ConsistencyLevel {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ANY" => Ok(ConsistencyLevel::Any),
            "ONE" => Ok(ConsistencyLevel::One),
            "TWO" => Ok(ConsistencyLevel::Two),
            "THREE" => Ok(ConsistencyLevel::Three),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            "ALL" => Ok(ConsistencyLevel::All),
            "LOCAL_QUORUM" => Ok(ConsistencyLevel::LocalQuorum),
            "EACH_QUORUM" => Ok(ConsistencyLevel::EachQuorum),
            "LOCAL_ONE" => Ok(ConsistencyLevel::LocalOne),
            "SERIAL" => Ok(ConsistencyLevel::Serial),
            "LOCAL_SERIAL" => Ok(ConsistencyLevel::LocalSerial),
            other => Err(DriverError::Config(format!(
                "Unknown consistency level: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `driver_config` table overriding read/write consistency for
/// one mapped table. The row for table `default` applies to every table.
#[derive(Debug, Clone, PartialEq, SerializeRow, DeserializeRow)]
pub struct TableConfig {
    pub table_name: String,
    pub data_center: Option<String>,
    pub read_consistency: Option<String>,
    pub write_consistency: Option<String>,
    pub create_dttm: Option<DateTime<Utc>>,
    pub create_user: Option<String>,
    pub mod_dttm: Option<DateTime<Utc>>,
    pub mod_user: Option<String>,
}

impl TableConfig {
    pub const DEFAULT_TABLE: &'static str = "default";

    pub fn new(table_name: impl Into<String>, user: impl Into<String>) -> Self {
        let now = Utc::now();
        let user = user.into();
        Self {
            table_name: table_name.into(),
            data_center: None,
            read_consistency: None,
            write_consistency: None,
            create_dttm: Some(now),
            create_user: Some(user.clone()),
            mod_dttm: Some(now),
            mod_user: Some(user),
        }
    }

    pub fn with_data_center(mut self, data_center: impl Into<String>) -> Self {
        self.data_center = Some(data_center.into());
        self
    }

    pub fn with_read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.read_consistency = Some(level.to_string());
        self
    }

    pub fn with_write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.write_consistency = Some(level.to_string());
        self
    }

    /// True when the row is unscoped or scoped to `data_center`.
    pub fn applies_to(&self, data_center: &str) -> bool {
        match &self.data_center {
            None => true,
            Some(dc) => dc.is_empty() || dc.eq_ignore_ascii_case(data_center),
        }
    }
}

impl Entity for TableConfig {
    const TABLE: TableMeta = TableMeta {
        name: "driver_config",
        partition_keys: &["table_name"],
        clustering_keys: &[],
        columns: &[
            "table_name",
            "data_center",
            "read_consistency",
            "write_consistency",
            "create_dttm",
            "create_user",
            "mod_dttm",
            "mod_user",
        ],
    };

    fn key(&self) -> Key {
        Key::new().with(CqlValue::Text(self.table_name.clone()))
    }
}
