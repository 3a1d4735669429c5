//! Immutable in-memory tables.
//!
//! A [`Dataset`] is built once (by the loader or the derivation engine) and
//! never mutated afterwards. Operations that change shape return a new
//! dataset that shares nothing with the input.

use std::collections::{HashMap, HashSet};
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::SchemaError;
use crate::value::{DataType, Value};

/// Identity of a dataset: logical name plus the hash of its source bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DatasetId {
    pub name: String,
    /// Hex sha256 of the source file. Derived datasets carry their parent's hash.
    pub sha256: String,
}

impl DatasetId {
    #[must_use]
    pub fn new(name: impl Into<String>, sha256: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sha256: sha256.into(),
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.sha256.get(..12).unwrap_or(&self.sha256);
        write!(f, "{}@{short}", self.name)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DataType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, checking every non-null value against `dtype`.
    ///
    /// `Int` values are widened when the column is `Float`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TypeMismatch`] for the first value of another type.
    pub fn new(
        name: impl Into<String>,
        dtype: DataType,
        values: Vec<Value>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut checked = Vec::with_capacity(values.len());
        for value in values {
            let value = match (dtype, value) {
                (DataType::Float, Value::Int(v)) => Value::from(v as f64),
                (_, value) => value,
            };
            if let Some(found) = value.data_type()
                && found != dtype
            {
                return Err(SchemaError::TypeMismatch {
                    column: name,
                    expected: dtype.to_string(),
                    found: found.to_string(),
                });
            }
            checked.push(value);
        }
        Ok(Self {
            name,
            dtype,
            values: checked,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn dtype(&self) -> DataType {
        self.dtype
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `row`, `Null` when out of range.
    #[must_use]
    pub fn get(&self, row: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(row).unwrap_or(&NULL)
    }

    /// Distinct non-null values in first-appearance order.
    #[must_use]
    pub fn distinct_in_order(&self) -> Vec<Value> {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert((*v).clone()))
            .cloned()
            .collect()
    }

    fn take(&self, rows: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            dtype: self.dtype,
            values: rows.iter().map(|&r| self.get(r).clone()).collect(),
        }
    }
}

/// Required type class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    Any,
    Str,
    Numeric,
    Bool,
    Date,
}

impl TypeClass {
    #[must_use]
    pub const fn accepts(self, dtype: DataType) -> bool {
        match self {
            Self::Any => true,
            Self::Str => matches!(dtype, DataType::Str),
            Self::Numeric => dtype.is_numeric(),
            Self::Bool => matches!(dtype, DataType::Bool),
            Self::Date => matches!(dtype, DataType::Date),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Str => "str",
            Self::Numeric => "numeric",
            Self::Bool => "bool",
            Self::Date => "date",
        }
    }
}

/// What a consuming report needs from a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRequirement {
    pub columns: Vec<(String, TypeClass)>,
    /// Subject identifier column. Always required when set.
    pub key: Option<String>,
    /// Reject the dataset when `key` has duplicate values.
    pub unique_key: bool,
}

impl SchemaRequirement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn column(mut self, name: impl Into<String>, class: TypeClass) -> Self {
        let name = name.into();
        if !self.columns.iter().any(|(existing, _)| *existing == name) {
            self.columns.push((name, class));
        }
        self
    }

    #[must_use]
    pub fn key(mut self, name: impl Into<String>, unique: bool) -> Self {
        self.key = Some(name.into());
        self.unique_key = unique;
        self
    }
}

/// An immutable named table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    id: DatasetId,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl Dataset {
    /// Assemble a dataset from columns of equal length.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateColumn`] or [`SchemaError::RaggedColumns`].
    pub fn new(id: DatasetId, columns: Vec<Column>) -> Result<Self, SchemaError> {
        let rows = columns.first().map_or(0, Column::len);
        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if index.insert(column.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
            if column.len() != rows {
                return Err(SchemaError::RaggedColumns {
                    column: column.name.clone(),
                    expected: rows,
                    found: column.len(),
                });
            }
        }
        Ok(Self {
            id,
            columns,
            index,
            rows,
        })
    }

    #[must_use]
    pub const fn id(&self) -> &DatasetId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.id.name
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Column lookup that reports a schema error when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingColumn`].
    pub fn require(&self, name: &str) -> Result<&Column, SchemaError> {
        self.column(name).ok_or_else(|| SchemaError::MissingColumn {
            dataset: self.id.name.clone(),
            column: name.to_string(),
        })
    }

    /// New dataset holding only `rows`, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let columns: Vec<Column> = self.columns.iter().map(|c| c.take(rows)).collect();
        Self {
            id: self.id.clone(),
            index: self.index.clone(),
            rows: rows.len(),
            columns,
        }
    }

    /// New dataset with `column` added, or replacing a column of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RaggedColumns`] if the column length differs.
    pub fn with_column(&self, column: Column) -> Result<Self, SchemaError> {
        if column.len() != self.rows && !self.columns.is_empty() {
            return Err(SchemaError::RaggedColumns {
                column: column.name.clone(),
                expected: self.rows,
                found: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        match self.index.get(&column.name) {
            Some(&position) => columns[position] = column,
            None => columns.push(column),
        }
        Self::new(self.id.clone(), columns)
    }

    /// Check the dataset against a report's requirements.
    ///
    /// # Errors
    ///
    /// Returns the first violated requirement as a [`SchemaError`].
    pub fn validate(&self, requirement: &SchemaRequirement) -> Result<(), SchemaError> {
        if let Some(key) = &requirement.key {
            self.require(key)?;
        }

        for (name, class) in &requirement.columns {
            let column = self.require(name)?;
            if !class.accepts(column.dtype) {
                return Err(SchemaError::TypeMismatch {
                    column: name.clone(),
                    expected: class.as_str().to_string(),
                    found: column.dtype.to_string(),
                });
            }
        }

        if let Some(key) = &requirement.key
            && requirement.unique_key
        {
            let column = self.require(key)?;
            let mut seen = HashSet::with_capacity(column.len());
            for value in column.values() {
                if !seen.insert(value) {
                    return Err(SchemaError::DuplicateKey {
                        dataset: self.id.name.clone(),
                        column: key.clone(),
                        value: value.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn adsl() -> Dataset {
        Dataset::new(
            DatasetId::new("adsl", "abc"),
            vec![
                Column::new(
                    "USUBJID",
                    DataType::Str,
                    vec!["01".into(), "02".into(), "03".into()],
                )
                .expect("column"),
                Column::new(
                    "AGE",
                    DataType::Float,
                    vec![Value::Int(60), Value::Float(71.5), Value::Null],
                )
                .expect("column"),
            ],
        )
        .expect("dataset")
    }

    #[test]
    fn int_values_widen_into_float_columns() {
        let ds = adsl();
        assert_eq!(ds.column("AGE").expect("AGE").get(0), &Value::Float(60.0));
    }

    #[test]
    fn column_rejects_values_of_another_type() {
        let err = Column::new("AGE", DataType::Int, vec![Value::from("x")]).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn validate_reports_missing_key_column() {
        let req = SchemaRequirement::new().key("SUBJID", true);
        let err = adsl().validate(&req).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { ref column, .. } if column == "SUBJID"));
    }

    #[test]
    fn validate_rejects_duplicate_keys_when_unique() {
        let ds = adsl().take_rows(&[0, 1, 0]);
        let unique = SchemaRequirement::new().key("USUBJID", true);
        let err = ds.validate(&unique).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKey { ref value, .. } if value == "01"));

        let repeated = SchemaRequirement::new().key("USUBJID", false);
        assert!(ds.validate(&repeated).is_ok());
    }

    #[test]
    fn validate_checks_type_class() {
        let req = SchemaRequirement::new().column("USUBJID", TypeClass::Numeric);
        assert!(matches!(
            adsl().validate(&req),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn with_column_replaces_by_name() {
        let ds = adsl();
        let flag = Column::new("AGE", DataType::Bool, vec![true.into(), false.into(), Value::Null])
            .expect("column");
        let replaced = ds.with_column(flag).expect("replace");
        assert_eq!(replaced.column_names(), vec!["USUBJID", "AGE"]);
        assert_eq!(replaced.column("AGE").expect("AGE").dtype(), DataType::Bool);
        // source untouched
        assert_eq!(ds.column("AGE").expect("AGE").dtype(), DataType::Float);
    }

    #[test]
    fn distinct_in_order_skips_nulls() {
        let col = Column::new(
            "SEX",
            DataType::Str,
            vec!["F".into(), Value::Null, "M".into(), "F".into()],
        )
        .expect("column");
        assert_eq!(col.distinct_in_order(), vec![Value::from("F"), Value::from("M")]);
    }
}
