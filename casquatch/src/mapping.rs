//! Row mapping: how a Rust type describes the table it is stored in.
//!
//! A mapped type derives `SerializeRow` and `DeserializeRow` (both match
//! columns by name) and implements [`Entity`] to declare its table layout and
//! primary key. User-defined types used as column values derive
//! `SerializeValue` and `DeserializeValue`.

use scylla::deserialize::row::DeserializeRow;
use scylla::serialize::row::SerializeRow;
use scylla::value::CqlValue;

use crate::errors::DriverError;

/// Static description of a mapped table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMeta {
    pub name: &'static str,
    pub partition_keys: &'static [&'static str],
    pub clustering_keys: &'static [&'static str],
    /// Every column, including key columns. Must match the struct fields.
    pub columns: &'static [&'static str],
}

impl TableMeta {
    /// Partition keys followed by clustering keys.
    pub fn key_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.partition_keys
            .iter()
            .chain(self.clustering_keys.iter())
            .copied()
    }

    pub fn key_len(&self) -> usize {
        self.partition_keys.len() + self.clustering_keys.len()
    }

    /// A full key binds every key column.
    pub fn check_full_key(&self, key: &Key) -> Result<(), DriverError> {
        if key.len() != self.key_len() {
            return Err(DriverError::InvalidKey(format!(
                "{} expects {} key values ({}), got {}",
                self.name,
                self.key_len(),
                self.key_columns().collect::<Vec<_>>().join(", "),
                key.len()
            )));
        }
        Ok(())
    }

    /// A partial key binds every partition column plus a prefix of the
    /// clustering columns.
    pub fn check_partial_key(&self, key: &Key) -> Result<(), DriverError> {
        if key.len() < self.partition_keys.len() {
            return Err(DriverError::InvalidKey(format!(
                "{} needs the full partition key ({}), got {} value(s)",
                self.name,
                self.partition_keys.join(", "),
                key.len()
            )));
        }
        if key.len() > self.key_len() {
            return Err(DriverError::InvalidKey(format!(
                "{} has {} key columns, got {} values",
                self.name,
                self.key_len(),
                key.len()
            )));
        }
        Ok(())
    }
}

/// Ordered primary key values: partition keys first, then clustering keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Key {
    values: Vec<CqlValue>,
}

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: CqlValue) -> Self {
        self.values.push(value);
        self
    }

    pub fn values(&self) -> &[CqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<CqlValue>> for Key {
    fn from(values: Vec<CqlValue>) -> Self {
        Self { values }
    }
}

/// A Rust type stored as one row of a Cassandra table.
pub trait Entity:
    SerializeRow + for<'frame, 'metadata> DeserializeRow<'frame, 'metadata> + Send + Sync + 'static
{
    const TABLE: TableMeta;

    /// Full primary key of this row.
    fn key(&self) -> Key;
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_NAME: TableMeta = TableMeta {
        name: "table_name",
        partition_keys: &["key_one"],
        clustering_keys: &["key_two"],
        columns: &["key_one", "key_two", "col_one", "col_two"],
    };

    #[test]
    fn test_key_columns_order() {
        let cols: Vec<_> = TABLE_NAME.key_columns().collect();
        assert_eq!(cols, vec!["key_one", "key_two"]);
        assert_eq!(TABLE_NAME.key_len(), 2);
    }

    #[test]
    fn test_full_key_validation() {
        let full = Key::new().with(CqlValue::Int(1)).with(CqlValue::Int(1));
        assert!(TABLE_NAME.check_full_key(&full).is_ok());

        let partial = Key::new().with(CqlValue::Int(18));
        let err = TABLE_NAME.check_full_key(&partial).unwrap_err();
        assert!(matches!(err, DriverError::InvalidKey(_)));
        assert!(err.to_string().contains("key_one, key_two"));
    }

    #[test]
    fn test_partial_key_validation() {
        let partition_only = Key::new().with(CqlValue::Int(18));
        assert!(TABLE_NAME.check_partial_key(&partition_only).is_ok());

        let empty = Key::new();
        assert!(TABLE_NAME.check_partial_key(&empty).is_err());

        let too_long: Key = vec![CqlValue::Int(1), CqlValue::Int(2), CqlValue::Int(3)].into();
        assert!(TABLE_NAME.check_partial_key(&too_long).is_err());
    }
}
