#![allow(dead_code)]

use std::env;

use casquatch::{CassandraDriver, DriverError, Entity, Key, TableMeta};
use scylla::value::CqlValue;
use scylla::{DeserializeRow, DeserializeValue, SerializeRow, SerializeValue};
use uuid::Uuid;

pub const KEYSPACE: &str = "junitTest";

const SCHEMA: &[&str] = &[
    "CREATE KEYSPACE IF NOT EXISTS junitTest \
     WITH replication = { 'class' : 'SimpleStrategy', 'replication_factor' : 1} \
     AND durable_writes = true",
    "CREATE TABLE IF NOT EXISTS junitTest.table_name \
     (key_one int,key_two int,col_one text,col_two text,PRIMARY KEY ((key_one), key_two))",
    "CREATE TABLE IF NOT EXISTS junitTest.driver_config (
        table_name text PRIMARY KEY,
        data_center text,
        read_consistency text,
        write_consistency text,
        create_dttm timestamp,
        create_user text,
        mod_dttm timestamp,
        mod_user text
    )",
    "CREATE TYPE IF NOT EXISTS junitTest.junit_udt (val1 text, val2 int)",
    "CREATE TABLE IF NOT EXISTS junitTest.junit_udt_table \
     (id uuid primary key, udt frozen<junit_udt>)",
    "CREATE TABLE IF NOT EXISTS junitTest.read_level_row (id int PRIMARY KEY, val text)",
];

#[derive(Debug, Clone, PartialEq, SerializeRow, DeserializeRow)]
pub struct TableName {
    pub key_one: i32,
    pub key_two: i32,
    pub col_one: Option<String>,
    pub col_two: Option<String>,
}

impl TableName {
    pub fn new(key_one: i32, key_two: i32) -> Self {
        Self {
            key_one,
            key_two,
            col_one: None,
            col_two: None,
        }
    }

    pub fn with_columns(mut self, col_one: &str, col_two: &str) -> Self {
        self.col_one = Some(col_one.to_string());
        self.col_two = Some(col_two.to_string());
        self
    }

    pub fn id(key_one: i32, key_two: i32) -> Key {
        Key::new().with(CqlValue::Int(key_one)).with(CqlValue::Int(key_two))
    }

    pub fn partition(key_one: i32) -> Key {
        Key::new().with(CqlValue::Int(key_one))
    }
}

impl Entity for TableName {
    const TABLE: TableMeta = TableMeta {
        name: "table_name",
        partition_keys: &["key_one"],
        clustering_keys: &["key_two"],
        columns: &["key_one", "key_two", "col_one", "col_two"],
    };

    fn key(&self) -> Key {
        Self::id(self.key_one, self.key_two)
    }
}

#[derive(Debug, Clone, PartialEq, SerializeValue, DeserializeValue)]
pub struct JunitUdt {
    pub val1: Option<String>,
    pub val2: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, SerializeRow, DeserializeRow)]
pub struct JunitUdtTable {
    pub id: Uuid,
    pub udt: Option<JunitUdt>,
}

impl JunitUdtTable {
    pub fn generate() -> Self {
        let val2 = (Uuid::new_v4().as_u128() % 100) as i32 + 1;
        Self {
            id: Uuid::new_v4(),
            udt: Some(JunitUdt {
                val1: Some(Uuid::new_v4().to_string()),
                val2: Some(val2),
            }),
        }
    }

    pub fn id(id: Uuid) -> Key {
        Key::new().with(CqlValue::Uuid(id))
    }
}

impl Entity for JunitUdtTable {
    const TABLE: TableMeta = TableMeta {
        name: "junit_udt_table",
        partition_keys: &["id"],
        clustering_keys: &[],
        columns: &["id", "udt"],
    };

    fn key(&self) -> Key {
        Self::id(self.id)
    }
}

/// Row of a table the driver_config tests may tune without disturbing the
/// other fixtures.
#[derive(Debug, Clone, PartialEq, SerializeRow, DeserializeRow)]
pub struct ReadLevelRow {
    pub id: i32,
    pub val: Option<String>,
}

impl ReadLevelRow {
    pub fn new(id: i32, val: &str) -> Self {
        Self {
            id,
            val: Some(val.to_string()),
        }
    }
}

impl Entity for ReadLevelRow {
    const TABLE: TableMeta = TableMeta {
        name: "read_level_row",
        partition_keys: &["id"],
        clustering_keys: &[],
        columns: &["id", "val"],
    };

    fn key(&self) -> Key {
        Key::new().with(CqlValue::Int(self.id))
    }
}

fn contact_point() -> String {
    env::var("CASSANDRA_URI").unwrap_or_else(|_| "127.0.0.1:9042".to_string())
}

fn local_dc() -> String {
    env::var("CASSANDRA_DC").unwrap_or_else(|_| "datacenter1".to_string())
}

/// Create the test schema, then connect to the test keyspace
pub async fn connect() -> Result<CassandraDriver, DriverError> {
    let bootstrap = CassandraDriver::builder()
        .with_contact_points([contact_point()])
        .with_local_dc(local_dc())
        .with_keyspace("system")
        .connect()
        .await?;
    for statement in SCHEMA {
        bootstrap.execute(statement).await?;
    }
    bootstrap.close();

    CassandraDriver::builder()
        .with_contact_points([contact_point()])
        .with_local_dc(local_dc())
        .with_keyspace(KEYSPACE)
        .with_driver_config(true)
        .connect()
        .await
}
