//! Dataset loader.
//!
//! Resolves a dataset name to `<data_dir>/<name>.parquet`, falling back to
//! `<name>.arrow` / `<name>.ipc`. Parquet is scanned through an in-memory
//! `DuckDB` connection; Arrow IPC files are decoded with `arrow-ipc`.
//! Either way the result is an immutable [`Dataset`] whose id carries the
//! sha256 of the source bytes.
//!
//! The file is read once. Those bytes are hashed and decoded, so the recorded
//! checksum always matches the data analysed even if the file is replaced
//! mid-load. `DuckDB` scans parquet by path, so it is handed a private temp
//! copy of the bytes.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use arrow_array::cast::AsArray;
use arrow_array::temporal_conversions::date32_to_datetime;
use arrow_array::types::{
    Date32Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type,
};
use arrow_array::{Array, ArrowPrimitiveType};
use arrow_ipc::reader::FileReader;
use arrow_schema::DataType as ArrowType;
use chrono::NaiveDate;
use duckdb::Connection;
use sha2::{Digest, Sha256};
use tlf_core::{Column, DataType, Dataset, DatasetId, SchemaError, Value};

use crate::error::DataError;

/// On-disk encoding of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    ArrowIpc,
}

impl SourceFormat {
    /// Extensions tried in order when resolving a dataset name.
    const CANDIDATES: [(&'static str, Self); 3] = [
        ("parquet", Self::Parquet),
        ("arrow", Self::ArrowIpc),
        ("ipc", Self::ArrowIpc),
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::ArrowIpc => "arrow_ipc",
        }
    }
}

/// Reads named datasets from a data directory.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    data_dir: PathBuf,
}

impl DatasetLoader {
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Locate the source file for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] when no candidate file exists or the
    /// name would escape the data directory.
    pub fn resolve(&self, name: &str) -> Result<(PathBuf, SourceFormat), DataError> {
        let not_found = || DataError::NotFound {
            name: name.to_string(),
            dir: self.data_dir.clone(),
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(not_found());
        }
        SourceFormat::CANDIDATES
            .iter()
            .map(|(ext, format)| (self.data_dir.join(format!("{name}.{ext}")), *format))
            .find(|(path, _)| path.is_file())
            .ok_or_else(not_found)
    }

    /// Load `name` into memory.
    ///
    /// Loading the same unchanged file twice yields equal datasets.
    ///
    /// # Errors
    ///
    /// [`DataError::NotFound`] for a missing file, [`DataError::Schema`] for
    /// column types the dataset model cannot represent, and the underlying
    /// `DuckDB`/Arrow/IO error when the file cannot be decoded.
    pub fn load(&self, name: &str) -> Result<Dataset, DataError> {
        let (path, format) = self.resolve(name)?;
        let bytes = std::fs::read(&path)?;
        let id = DatasetId::new(name, format!("{:x}", Sha256::digest(&bytes)));

        let columns = match format {
            SourceFormat::Parquet => read_parquet(&bytes)?,
            SourceFormat::ArrowIpc => read_arrow_ipc(bytes)?,
        };
        let dataset = Dataset::new(id, columns)?;

        tracing::debug!(
            dataset = %dataset.id(),
            format = format.as_str(),
            rows = dataset.row_count(),
            columns = dataset.columns().len(),
            "loaded dataset"
        );
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// Parquet via DuckDB
// ---------------------------------------------------------------------------

fn read_parquet(bytes: &[u8]) -> Result<Vec<Column>, DataError> {
    let mut snapshot = tempfile::Builder::new()
        .prefix("tlf-")
        .suffix(".parquet")
        .tempfile()?;
    snapshot.write_all(bytes)?;
    snapshot.flush()?;

    let conn = Connection::open_in_memory()?;
    let source = format!(
        "read_parquet('{}')",
        snapshot.path().to_string_lossy().replace('\'', "''")
    );

    let mut describe = conn.prepare(&format!("DESCRIBE SELECT * FROM {source}"))?;
    let described: Vec<(String, String)> = describe
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    let mut schema = Vec::with_capacity(described.len());
    for (name, duck_type) in described {
        let dtype = duckdb_type(&name, &duck_type)?;
        schema.push((name, dtype));
    }
    if schema.is_empty() {
        return Ok(Vec::new());
    }

    let select = schema
        .iter()
        .map(|(name, dtype)| {
            let ident = format!("\"{}\"", name.replace('"', "\"\""));
            match dtype {
                DataType::Int => format!("CAST({ident} AS BIGINT)"),
                DataType::Float => format!("CAST({ident} AS DOUBLE)"),
                DataType::Date => format!("CAST({ident} AS VARCHAR)"),
                DataType::Str | DataType::Bool => ident,
            }
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); schema.len()];
    let mut stmt = conn.prepare(&format!("SELECT {select} FROM {source}"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, (name, dtype)) in schema.iter().enumerate() {
            let value = match dtype {
                DataType::Str => row.get::<_, Option<String>>(i)?.map(Value::Str),
                DataType::Int => row.get::<_, Option<i64>>(i)?.map(Value::Int),
                DataType::Float => row.get::<_, Option<f64>>(i)?.map(Value::Float),
                DataType::Bool => row.get::<_, Option<bool>>(i)?.map(Value::Bool),
                DataType::Date => row
                    .get::<_, Option<String>>(i)?
                    .map(|text| parse_date(name, &text))
                    .transpose()?,
            };
            values[i].push(value.unwrap_or_default());
        }
    }

    schema
        .into_iter()
        .zip(values)
        .map(|((name, dtype), values)| Column::new(name, dtype, values).map_err(DataError::from))
        .collect()
}

fn duckdb_type(column: &str, duck_type: &str) -> Result<DataType, SchemaError> {
    let upper = duck_type.to_ascii_uppercase();
    let dtype = match upper.as_str() {
        "VARCHAR" => DataType::Str,
        "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "UTINYINT" | "USMALLINT" | "UINTEGER" => {
            DataType::Int
        }
        "FLOAT" | "REAL" | "DOUBLE" => DataType::Float,
        "BOOLEAN" => DataType::Bool,
        "DATE" => DataType::Date,
        other if other.starts_with("DECIMAL") => DataType::Float,
        _ => {
            return Err(SchemaError::UnsupportedType {
                column: column.to_string(),
                found: duck_type.to_string(),
            });
        }
    };
    Ok(dtype)
}

fn parse_date(column: &str, text: &str) -> Result<Value, SchemaError> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|_| SchemaError::UnsupportedType {
            column: column.to_string(),
            found: format!("DATE value '{text}'"),
        })
}

// ---------------------------------------------------------------------------
// Arrow IPC
// ---------------------------------------------------------------------------

fn read_arrow_ipc(bytes: Vec<u8>) -> Result<Vec<Column>, DataError> {
    let reader = FileReader::try_new(Cursor::new(bytes), None)?;
    let schema = reader.schema();

    let mut dtypes = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        dtypes.push(arrow_type(field.name(), field.data_type())?);
    }

    let mut values: Vec<Vec<Value>> = vec![Vec::new(); dtypes.len()];
    for batch in reader {
        let batch = batch?;
        for (i, array) in batch.columns().iter().enumerate() {
            push_arrow_values(array.as_ref(), &mut values[i]);
        }
    }

    schema
        .fields()
        .iter()
        .zip(dtypes)
        .zip(values)
        .map(|((field, dtype), values)| {
            Column::new(field.name().clone(), dtype, values).map_err(DataError::from)
        })
        .collect()
}

fn arrow_type(column: &str, arrow: &ArrowType) -> Result<DataType, SchemaError> {
    let dtype = match arrow {
        ArrowType::Utf8 | ArrowType::LargeUtf8 | ArrowType::Utf8View => DataType::Str,
        ArrowType::Int8
        | ArrowType::Int16
        | ArrowType::Int32
        | ArrowType::Int64
        | ArrowType::UInt8
        | ArrowType::UInt16
        | ArrowType::UInt32 => DataType::Int,
        ArrowType::Float32 | ArrowType::Float64 => DataType::Float,
        ArrowType::Boolean => DataType::Bool,
        ArrowType::Date32 => DataType::Date,
        other => {
            return Err(SchemaError::UnsupportedType {
                column: column.to_string(),
                found: other.to_string(),
            });
        }
    };
    Ok(dtype)
}

fn push_ints<T>(array: &dyn Array, out: &mut Vec<Value>)
where
    T: ArrowPrimitiveType,
    T::Native: Into<i64>,
{
    out.extend(
        array
            .as_primitive::<T>()
            .iter()
            .map(|v| v.map_or(Value::Null, |v| Value::Int(v.into()))),
    );
}

fn push_floats<T>(array: &dyn Array, out: &mut Vec<Value>)
where
    T: ArrowPrimitiveType,
    T::Native: Into<f64>,
{
    out.extend(
        array
            .as_primitive::<T>()
            .iter()
            .map(|v| v.map_or(Value::Null, |v| Value::Float(v.into()))),
    );
}

/// Append one batch column. Types were checked against the schema already.
fn push_arrow_values(array: &dyn Array, out: &mut Vec<Value>) {
    match array.data_type() {
        ArrowType::Utf8 => out.extend(array.as_string::<i32>().iter().map(Value::from)),
        ArrowType::LargeUtf8 => out.extend(array.as_string::<i64>().iter().map(Value::from)),
        ArrowType::Utf8View => out.extend(array.as_string_view().iter().map(Value::from)),
        ArrowType::Int8 => push_ints::<Int8Type>(array, out),
        ArrowType::Int16 => push_ints::<Int16Type>(array, out),
        ArrowType::Int32 => push_ints::<Int32Type>(array, out),
        ArrowType::Int64 => push_ints::<Int64Type>(array, out),
        ArrowType::UInt8 => push_ints::<UInt8Type>(array, out),
        ArrowType::UInt16 => push_ints::<UInt16Type>(array, out),
        ArrowType::UInt32 => push_ints::<UInt32Type>(array, out),
        ArrowType::Float32 => push_floats::<Float32Type>(array, out),
        ArrowType::Float64 => push_floats::<Float64Type>(array, out),
        ArrowType::Boolean => out.extend(array.as_boolean().iter().map(Value::from)),
        ArrowType::Date32 => out.extend(array.as_primitive::<Date32Type>().iter().map(|v| {
            v.and_then(date32_to_datetime)
                .map_or(Value::Null, |dt| Value::Date(dt.date()))
        })),
        _ => out.extend(std::iter::repeat_n(Value::Null, array.len())),
    }
}
